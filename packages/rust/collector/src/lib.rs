//! Source Collector: citation extraction and list accumulation.
//!
//! This crate provides:
//! - [`extract`] — cascading citation extraction from result-page HTML
//! - [`list`] — the persisted numbered source-list format
//! - [`collect`] — policy-driven accumulation across document sequences

pub mod collect;
pub mod extract;
pub mod list;

pub use collect::{CollectSummary, collect};
pub use extract::{ExtractVariant, extract_sources, extract_sources_exact, extract_with};
pub use list::{SourceList, append_records};
