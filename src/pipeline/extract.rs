//! Structured extractors: raw report text in, [`ExtractionResult`] out.
//!
//! The two extractors share everything except their failure policy. An
//! inspection response that cannot be repaired degrades to an empty result
//! (an inspection with no findings is a meaningful state). A thermal
//! response that cannot be repaired is fatal, since an empty reading list
//! would silently claim "no thermal data".

use crate::error::DdrError;
use crate::gateway::GenerationGateway;
use crate::model::{ExtractionResult, InspectionData, ThermalData};
use crate::pipeline::json_repair::parse_model_json_as;
use crate::prompts;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cut `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Extracts impacted areas and general observations from inspection text.
#[derive(Debug, Clone)]
pub struct InspectionExtractor {
    gateway: Arc<GenerationGateway>,
    temperature: f32,
    max_input_chars: usize,
}

impl InspectionExtractor {
    pub fn new(gateway: Arc<GenerationGateway>, temperature: f32, max_input_chars: usize) -> Self {
        Self {
            gateway,
            temperature,
            max_input_chars,
        }
    }

    /// Run extraction. Only gateway failures are errors.
    pub async fn extract(&self, raw_text: &str) -> Result<ExtractionResult, DdrError> {
        let text = truncate_chars(raw_text, self.max_input_chars);
        let prompt = prompts::inspection_prompt(text);
        let response = self.gateway.generate(&prompt, self.temperature).await?;

        let data = match parse_model_json_as::<InspectionData>(&response) {
            Ok(data) => data,
            Err(e) => {
                warn!("Inspection response unusable ({}); continuing with no areas", e);
                debug!("Raw inspection response: {}", response);
                InspectionData::default()
            }
        };

        debug!(
            "Inspection extraction: {} areas, {} general observations",
            data.areas.len(),
            data.general_observations.len()
        );
        Ok(ExtractionResult::Inspection(data))
    }
}

/// Extracts temperature readings from thermal report text.
#[derive(Debug, Clone)]
pub struct ThermalExtractor {
    gateway: Arc<GenerationGateway>,
    temperature: f32,
    max_input_chars: usize,
}

impl ThermalExtractor {
    pub fn new(gateway: Arc<GenerationGateway>, temperature: f32, max_input_chars: usize) -> Self {
        Self {
            gateway,
            temperature,
            max_input_chars,
        }
    }

    /// Run extraction. An unrepairable response is [`DdrError::ExtractionParse`].
    pub async fn extract(&self, raw_text: &str) -> Result<ExtractionResult, DdrError> {
        let text = truncate_chars(raw_text, self.max_input_chars);
        let prompt = prompts::thermal_prompt(text);
        let response = self.gateway.generate(&prompt, self.temperature).await?;

        let data = parse_model_json_as::<ThermalData>(&response).map_err(|e| {
            debug!("Raw thermal response: {}", response);
            DdrError::ExtractionParse {
                detail: e.to_string(),
            }
        })?;

        debug!("Thermal extraction: {} readings", data.thermal_readings.len());
        Ok(ExtractionResult::Thermal(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::error::BackendError;
    use crate::gateway::GenerationBackend;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns a fixed reply and remembers the last prompt.
    struct Fixed {
        reply: String,
        last_prompt: Mutex<String>,
    }

    #[async_trait]
    impl GenerationBackend for Fixed {
        async fn generate(&self, prompt: &str, _: f32, _: usize) -> Result<String, BackendError> {
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            Ok(self.reply.clone())
        }

        fn identity(&self) -> String {
            "fixed".into()
        }
    }

    fn gateway(reply: &str) -> (Arc<GenerationGateway>, Arc<Fixed>) {
        let backend = Arc::new(Fixed {
            reply: reply.to_string(),
            last_prompt: Mutex::new(String::new()),
        });
        let gw = GenerationGateway::new(
            backend.clone(),
            RetryPolicy::default(),
            256,
            Duration::from_secs(5),
        );
        (Arc::new(gw), backend)
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("°C°C", 3), "°C°");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn inspection_parses_fenced_response() {
        let (gw, _) = gateway(
            "```json\n{\"areas\": [{\"area_name\": \"Hall\", \"negative_findings\": \"Damp\",}], \"general_observations\": []}\n```",
        );
        let result = InspectionExtractor::new(gw, 0.0, 100).extract("text").await.unwrap();
        assert_eq!(result.areas().len(), 1);
        assert_eq!(result.areas()[0].negative_findings, vec!["Damp".to_string()]);
    }

    #[tokio::test]
    async fn inspection_degrades_on_garbage() {
        let (gw, _) = gateway("I am unable to help with that.");
        let result = InspectionExtractor::new(gw, 0.0, 100).extract("text").await.unwrap();
        assert_eq!(result, ExtractionResult::Inspection(InspectionData::default()));
    }

    #[tokio::test]
    async fn thermal_fails_without_json() {
        let (gw, _) = gateway("No readings here.");
        let err = ThermalExtractor::new(gw, 0.0, 100).extract("text").await.unwrap_err();
        assert!(matches!(err, DdrError::ExtractionParse { .. }));
    }

    #[tokio::test]
    async fn thermal_keeps_values_verbatim() {
        let (gw, _) = gateway(
            "Here: {\"thermal_readings\": [{\"image_id\": \"IMG_Hall_01\", \"hotspot\": \"31.2 °C\", \"coldspot\": 22}]} thanks",
        );
        let result = ThermalExtractor::new(gw, 0.0, 100).extract("text").await.unwrap();
        let reading = &result.thermal_readings()[0];
        assert_eq!(reading.hotspot, "31.2 °C");
        assert_eq!(reading.coldspot, "22");
    }

    #[tokio::test]
    async fn input_is_truncated_before_prompting() {
        let (gw, backend) = gateway("{\"thermal_readings\": []}");
        let long = format!("{}TAIL", "a".repeat(50));
        ThermalExtractor::new(gw, 0.0, 50).extract(&long).await.unwrap();
        let prompt = backend.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains(&"a".repeat(50)));
        assert!(!prompt.contains("TAIL"));
    }
}
