//! Markdown rendering of the seven report sections.
//!
//! Layout: title, generation timestamp, then one numbered `##` section per
//! [`ReportSections`] field separated by horizontal rules, then a footer.
//! A blank section body is rendered as "Not Available".

use crate::model::{ReportSections, NOT_AVAILABLE};
use chrono::NaiveDateTime;
use std::fmt::Write;

const TITLE: &str = "# Detailed Diagnostic Report (DDR)";

const FOOTER: &str = "*This report was generated using AI-powered analysis of inspection and \
thermal imaging data. All findings are based strictly on the provided documentation.*";

/// Render `sections` as a Markdown document stamped with `generated_at`.
pub fn render_markdown(sections: &ReportSections, generated_at: NaiveDateTime) -> String {
    let mut md = String::new();
    md.push_str(TITLE);
    md.push_str("\n\n");
    let _ = write!(
        md,
        "**Generated:** {}\n\n---\n\n",
        generated_at.format("%B %d, %Y at %I:%M %p")
    );

    for (idx, (heading, body)) in sections.sections().into_iter().enumerate() {
        if idx > 0 {
            md.push_str("---\n\n");
        }
        let body = match body.trim() {
            "" => NOT_AVAILABLE,
            trimmed => trimmed,
        };
        let _ = write!(md, "## {}. {}\n\n{}\n\n", idx + 1, heading, body);
    }

    md.push_str("---\n\n");
    md.push_str(FOOTER);
    md.trim().to_string()
}
