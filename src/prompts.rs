//! Prompts for structured extraction and report generation.
//!
//! Every prompt the pipeline sends lives here, so the exact wording can be
//! reviewed and unit-tested without a backend. Prompts are deterministic
//! functions of their input: the same text always yields the same prompt,
//! which is what makes the response cache effective.
//!
//! Each prompt embeds the literal JSON keys it expects back. The mock
//! backend keys its canned answers off those same literals.

use crate::model::{Conflict, MissingInfo, NormalizedData};

/// Build the inspection-extraction prompt around (already truncated) text.
pub fn inspection_prompt(inspection_text: &str) -> String {
    format!(
        r#"You are extracting structured data from an Inspection Report.

CRITICAL RULES:
- Extract only explicitly stated facts
- Do NOT assume or infer anything
- Do NOT summarize
- Do NOT add new facts
- Return ONLY valid JSON - no markdown, no explanation, no comments
- Ensure all JSON is properly formatted with correct commas and brackets
- Do NOT include trailing commas before closing brackets

Return this EXACT JSON structure:

{{
  "areas": [
    {{
      "area_name": "string",
      "negative_findings": ["string"],
      "positive_findings": ["string"]
    }}
  ],
  "general_observations": ["string"]
}}

Inspection Report:
{inspection_text}

Return only the JSON object, nothing else:
"#
    )
}

/// Build the thermal-extraction prompt around (already truncated) text.
pub fn thermal_prompt(thermal_text: &str) -> String {
    format!(
        r#"You are extracting structured thermal data from a Thermal Report.

STRICT RULES:
- Extract only explicitly written temperature readings.
- Preserve temperature values exactly as written, including units.
- Do NOT interpret.
- Do NOT conclude moisture or leakage.
- Do NOT add new facts.
- Return ONLY valid JSON.

Return format:

{{
  "thermal_readings": [
    {{
      "image_id": "",
      "hotspot": "",
      "coldspot": ""
    }}
  ]
}}

Thermal Report:
{thermal_text}
"#
    )
}

/// Build the report-generation prompt from the analysed data.
///
/// `normalized_json` is the pretty-printed [`NormalizedData`]; the caller
/// serializes it so a serialization failure surfaces as a typed error.
pub fn report_prompt(
    normalized: &NormalizedData,
    normalized_json: &str,
    conflicts: &[Conflict],
    missing: &[MissingInfo],
) -> String {
    let thermal_rule = if normalized.thermal_readings.is_empty() {
        "- Thermal data is EMPTY: do NOT mention thermal readings, hotspots or coldspots anywhere"
    } else {
        "- Quote thermal readings exactly as given, with their image ids"
    };

    format!(
        r#"Generate a professional Detailed Diagnostic Report (DDR) for a property inspection.

CRITICAL RULES:
- Use ONLY the provided data below - do NOT invent facts
- If data is empty or missing for a field, write "Not Available"
{thermal_rule}
- Be specific and use simple language
- Explain technical terms in parentheses

Return ONLY valid JSON in this structure (ALL values must be STRINGS with \n for line breaks):

{{
  "property_summary": "2-3 sentence overview of issues and severity based on the data",
  "area_observations": "**[Area Name]:**\n- Finding 1\n- Finding 2\n\n(Use actual area names from data)",
  "root_cause": "Likely causes based on evidence. If insufficient data, state what's missing.",
  "severity": "**Severity Level:** [Level]\n\n**Reasoning:**\n- Point 1\n- Point 2\n- Point 3",
  "recommendations": "**Immediate Actions (1-2 days):**\n1. Action\n\n**Short-term (1-2 weeks):**\n2. Action\n\n**Long-term:**\n3. Action",
  "additional_notes": "Patterns observed, further investigation needs, preventive advice",
  "missing_info": "List missing data OR write: All necessary information was available."
}}

DATA:

{normalized_json}

Conflicts:
{conflicts}

Missing:
{missing}

Return ONLY the JSON object. Start with {{ and end with }}.
"#,
        conflicts = bullet_list(conflicts),
        missing = bullet_list(missing),
    )
}

fn bullet_list<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "- None".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
