//! Report builder: ask the generation backend for the seven report sections.
//!
//! Unlike inspection extraction there is no safe fallback. A response that
//! cannot be repaired into all seven string fields fails the run with
//! [`DdrError::ReportGeneration`].

use crate::error::DdrError;
use crate::gateway::GenerationGateway;
use crate::model::{Conflict, MissingInfo, NormalizedData, ReportSections};
use crate::pipeline::json_repair::parse_model_json_as;
use crate::prompts;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    gateway: Arc<GenerationGateway>,
    temperature: f32,
}

impl ReportBuilder {
    pub fn new(gateway: Arc<GenerationGateway>, temperature: f32) -> Self {
        Self {
            gateway,
            temperature,
        }
    }

    pub async fn build(
        &self,
        data: &NormalizedData,
        conflicts: &[Conflict],
        missing: &[MissingInfo],
    ) -> Result<ReportSections, DdrError> {
        let data_json = serde_json::to_string_pretty(data)
            .map_err(|e| DdrError::Internal(format!("Failed to serialize normalized data: {e}")))?;
        let prompt = prompts::report_prompt(data, &data_json, conflicts, missing);

        let response = self.gateway.generate(&prompt, self.temperature).await?;

        parse_model_json_as::<ReportSections>(&response).map_err(|e| {
            debug!("Raw report response: {}", response);
            DdrError::ReportGeneration {
                detail: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::error::BackendError;
    use crate::gateway::GenerationBackend;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Reply(&'static str);

    #[async_trait]
    impl GenerationBackend for Reply {
        async fn generate(&self, _: &str, _: f32, _: usize) -> Result<String, BackendError> {
            Ok(self.0.to_string())
        }

        fn identity(&self) -> String {
            "reply".into()
        }
    }

    fn builder(reply: &'static str) -> ReportBuilder {
        let gw = GenerationGateway::new(
            Arc::new(Reply(reply)),
            RetryPolicy::default(),
            256,
            Duration::from_secs(5),
        );
        ReportBuilder::new(Arc::new(gw), 0.3)
    }

    #[tokio::test]
    async fn mock_gateway_yields_all_sections() {
        let b = ReportBuilder::new(Arc::new(GenerationGateway::mock()), 0.3);
        let sections = b
            .build(&NormalizedData::default(), &[], &[MissingInfo::NoAreas])
            .await
            .unwrap();
        assert_eq!(sections.missing_info, "Not Available");
        assert!(sections.property_summary.contains("Hall"));
    }

    #[tokio::test]
    async fn missing_key_is_fatal() {
        let err = builder("{\"property_summary\": \"x\"}")
            .build(&NormalizedData::default(), &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DdrError::ReportGeneration { .. }));
    }

    #[tokio::test]
    async fn prose_response_is_fatal() {
        let err = builder("Sorry, I cannot write this report.")
            .build(&NormalizedData::default(), &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DdrError::ReportGeneration { .. }));
    }

    #[tokio::test]
    async fn fenced_response_with_trailing_comma_parses() {
        let sections = builder(
            "```json\n{\"property_summary\": \"a\", \"area_observations\": \"b\", \"root_cause\": \"c\", \"severity\": \"d\", \"recommendations\": \"e\", \"additional_notes\": \"f\", \"missing_info\": \"Not Available\",}\n```",
        )
        .build(&NormalizedData::default(), &[], &[])
        .await
        .unwrap();
        assert_eq!(sections.severity, "d");
    }
}
