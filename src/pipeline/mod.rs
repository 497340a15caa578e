//! Pipeline stages for diagnostic report generation.
//!
//! Each submodule implements exactly one step, so every stage can be
//! tested on its own and the reasoning stages need no backend at all.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ preprocess ──▶ extract ──▶ normalize ──▶ dedup ──▶ link
//! (text)    (clean/filter)  (LLM)        (merge)      (sets)    (thermal)
//!                                                                  │
//!                  render ◀── report ◀── conflicts + missing ◀────┘
//!                 (Markdown)   (LLM)        (lexical checks)
//! ```
//!
//! 1. [`input`]: read a PDF text layer or a plain-text file
//! 2. [`preprocess`]: whitespace cleanup and keyword line filter
//! 3. [`extract`]: inspection and thermal extractors; the only stages
//!    besides [`report`] that call the generation gateway
//! 4. [`normalize`], [`dedup`], [`link`]: build the canonical per-area view
//! 5. [`conflicts`], [`missing`]: deterministic checks fed to the report
//! 6. [`report`]: generate the seven report sections
//! 7. [`render`]: Markdown output
//!
//! [`json_repair`] is shared by the extractors and the report builder.

pub mod conflicts;
pub mod dedup;
pub mod extract;
pub mod input;
pub mod json_repair;
pub mod link;
pub mod missing;
pub mod normalize;
pub mod preprocess;
pub mod render;
pub mod report;
