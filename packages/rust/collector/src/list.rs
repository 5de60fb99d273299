//! The persisted source list.
//!
//! On disk the list is a sequence of numbered blocks separated by blank
//! lines:
//!
//! ```text
//! 1. Smith J. (2001) J. Food Prot. 64
//!
//! 2. Jones K. (1998) Int. J. Food Microbiol. 40
//! ```
//!
//! Indexes are 1-based, strictly increasing, with no gaps. Surrounding
//! whitespace in the citation text is not significant; it is trimmed on
//! write and on read-back.

use std::io::Write;
use std::path::Path;

use tracing::warn;

use harvester_shared::{DedupPolicy, HarvestError, Result};

/// An ordered, in-memory accumulation of citation records, mirroring the
/// persisted numbered-list file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    records: Vec<String>,
}

impl SourceList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from already-collected records (trimming each).
    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            records: records
                .into_iter()
                .map(|r| r.as_ref().trim().to_string())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The records in insertion order.
    pub fn records(&self) -> &[String] {
        &self.records
    }

    /// Whether a trimmed-equal record already exists (case-sensitive).
    ///
    /// Linear scan; lists stay small (tens to low thousands of entries).
    pub fn contains(&self, source: &str) -> bool {
        let trimmed = source.trim();
        self.records.iter().any(|r| r == trimmed)
    }

    /// Apply the dedup policy to one extracted record.
    ///
    /// Returns `true` if the record was appended.
    pub fn push(&mut self, source: &str, policy: DedupPolicy) -> bool {
        let trimmed = source.trim();
        if policy == DedupPolicy::Deduplicate && self.contains(trimmed) {
            return false;
        }
        self.records.push(trimmed.to_string());
        true
    }

    /// Parse a previously persisted list back into an ordered sequence.
    ///
    /// Fails gracefully: an absent or unreadable file yields an empty list
    /// with a warning, so a fresh run can always start.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::new();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => Self {
                records: parse_blocks(&content),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read existing source list");
                Self::new()
            }
        }
    }

    /// Render the whole list in its persisted form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, record) in self.records.iter().enumerate() {
            out.push_str(&format!("{}. {record}\n\n", i + 1));
        }
        out
    }

    /// Truncate `path` and write the whole list (used at run start).
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()).map_err(|e| HarvestError::io(path, e))
    }
}

/// Append a batch of records to the persisted list in one open/write/close.
///
/// `start_index` is the 1-based index of the first record in the batch.
/// The file is held open only for the duration of this call, so a crash
/// between documents leaves a valid prefix of the list on disk.
pub fn append_records(path: &Path, start_index: usize, records: &[String]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HarvestError::io(path, e))?;

    for (offset, record) in records.iter().enumerate() {
        write!(file, "{}. {}\n\n", start_index + offset, record.trim())
            .map_err(|e| HarvestError::io(path, e))?;
    }

    Ok(())
}

/// Split file content on blank-line boundaries and strip the leading
/// `"N. "` index prefix from each block.
fn parse_blocks(content: &str) -> Vec<String> {
    content
        .split("\n\n")
        .filter_map(|block| {
            let block = block.trim();
            if block.is_empty() {
                return None;
            }
            block.split_once(". ").map(|(_, text)| text.trim().to_string())
        })
        .collect()
}
