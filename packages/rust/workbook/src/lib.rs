//! Excel aggregation: discover exported workbooks and merge them.
//!
//! Each export downloaded from the site is a two-sheet workbook (data
//! records plus logs). This crate finds the exports by filename pattern,
//! concatenates their sheets column-union-wise, and writes one combined
//! workbook out.

pub mod combine;
pub mod discover;
pub mod table;
pub mod write;

pub use combine::{CombineOutcome, CombineSummary, CombinedDataset, combine};
pub use discover::discover;
pub use table::Table;
pub use write::write_workbook;
