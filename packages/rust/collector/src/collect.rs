//! Collection of citation records across a sequence of saved result pages.
//!
//! Documents are visited in the caller-supplied order; within a document,
//! matches arrive in document order. Per-document failures (missing file,
//! unreadable content) are isolated — they never abort the run. Only a
//! failure to append to the persisted list is fatal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use harvester_shared::{DedupPolicy, Result};

use crate::extract::{ExtractVariant, extract_with};
use crate::list::{SourceList, append_records};

/// Summary of a completed collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectSummary {
    /// Documents read and extracted.
    pub documents_processed: usize,
    /// Documents skipped, with reasons (missing file, read failure).
    pub documents_skipped: Vec<(PathBuf, String)>,
    /// Records extracted across all processed documents, including repeats.
    pub records_found: usize,
    /// Records actually appended to the list under the active policy.
    pub records_added: usize,
    /// Total elapsed time.
    pub duration: Duration,
}

/// Extract citations from each document and append them to `list` and to
/// the persisted file at `output`.
///
/// The accumulator is explicit: callers resume a prior run by passing the
/// list loaded from disk, or start fresh with an empty one. The output
/// file is opened and closed once per document, so an interrupted run
/// leaves a valid prefix of the list behind.
pub fn collect(
    documents: &[PathBuf],
    variant: ExtractVariant,
    policy: DedupPolicy,
    list: &mut SourceList,
    output: &Path,
) -> Result<CollectSummary> {
    let start = std::time::Instant::now();
    let mut summary = CollectSummary::default();

    for document in documents {
        if !document.exists() {
            warn!(document = %document.display(), "document not found, skipping");
            summary
                .documents_skipped
                .push((document.clone(), "not found".into()));
            continue;
        }

        let html = match std::fs::read_to_string(document) {
            Ok(html) => html,
            Err(e) => {
                warn!(document = %document.display(), error = %e, "could not read document, skipping");
                summary
                    .documents_skipped
                    .push((document.clone(), e.to_string()));
                continue;
            }
        };

        let extracted = extract_with(&html, variant);
        summary.records_found += extracted.len();

        let mut appended: Vec<String> = Vec::new();
        for record in &extracted {
            if list.push(record, policy) {
                appended.push(record.trim().to_string());
            }
        }

        // One append per document; a failure here is output-unwritable and fatal.
        let start_index = list.len() - appended.len() + 1;
        append_records(output, start_index, &appended)?;

        info!(
            document = %document.display(),
            found = extracted.len(),
            added = appended.len(),
            "document collected"
        );

        summary.documents_processed += 1;
        summary.records_added += appended.len();
    }

    summary.duration = start.elapsed();

    info!(
        processed = summary.documents_processed,
        skipped = summary.documents_skipped.len(),
        found = summary.records_found,
        added = summary.records_added,
        total = list.len(),
        "collection complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_ONE: &str = r#"
    <html><body>
      <span id="lblSource0">Smith J. (2001) J. Food Prot. 64</span>
      <span id="lblSource1">Jones K. (1998) Int. J. Food Microbiol. 40</span>
    </body></html>"#;

    const PAGE_TWO: &str = r#"
    <html><body>
      <span id="lblSource0">Jones K. (1998) Int. J. Food Microbiol. 40</span>
      <span id="lblSource1">Brown L. (2005) Appl. Environ. Microbiol. 71</span>
    </body></html>"#;

    fn write_pages(dir: &Path) -> Vec<PathBuf> {
        let p1 = dir.join("combase_page_1.html");
        let p2 = dir.join("combase_page_2.html");
        std::fs::write(&p1, PAGE_ONE).unwrap();
        std::fs::write(&p2, PAGE_TWO).unwrap();
        vec![p1, p2]
    }

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let dir = tempfile::tempdir().unwrap();
        let docs = write_pages(dir.path());
        let output = dir.path().join("sources.txt");

        let mut list = SourceList::new();
        let summary = collect(
            &docs,
            ExtractVariant::PrefixId,
            DedupPolicy::Deduplicate,
            &mut list,
            &output,
        )
        .unwrap();

        assert_eq!(summary.documents_processed, 2);
        assert_eq!(summary.records_found, 4);
        assert_eq!(summary.records_added, 3);
        assert_eq!(
            list.records(),
            [
                "Smith J. (2001) J. Food Prot. 64",
                "Jones K. (1998) Int. J. Food Microbiol. 40",
                "Brown L. (2005) Appl. Environ. Microbiol. 71",
            ]
        );
    }

    #[test]
    fn dedupe_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let docs = write_pages(dir.path());
        let output = dir.path().join("sources.txt");

        let mut list = SourceList::new();
        collect(
            &docs,
            ExtractVariant::PrefixId,
            DedupPolicy::Deduplicate,
            &mut list,
            &output,
        )
        .unwrap();
        let after_first = list.records().to_vec();

        let summary = collect(
            &docs,
            ExtractVariant::PrefixId,
            DedupPolicy::Deduplicate,
            &mut list,
            &output,
        )
        .unwrap();

        assert_eq!(summary.records_added, 0);
        assert_eq!(list.records(), after_first);
        // The persisted file matches the in-memory list.
        assert_eq!(SourceList::load(&output).records(), after_first);
    }

    #[test]
    fn append_all_keeps_every_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let docs = write_pages(dir.path());
        let output = dir.path().join("sources.txt");

        let mut list = SourceList::new();
        let summary = collect(
            &docs,
            ExtractVariant::PrefixId,
            DedupPolicy::AppendAll,
            &mut list,
            &output,
        )
        .unwrap();

        // Every match counts, including the repeat across pages.
        assert_eq!(summary.records_added, 4);
        assert_eq!(list.len(), 4);

        // Re-running doubles the count; that is the documented policy.
        collect(
            &docs,
            ExtractVariant::PrefixId,
            DedupPolicy::AppendAll,
            &mut list,
            &output,
        )
        .unwrap();
        assert_eq!(list.len(), 8);
        assert_eq!(SourceList::load(&output).len(), 8);
    }

    #[test]
    fn missing_documents_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut docs = write_pages(dir.path());
        docs.insert(1, dir.path().join("combase_page_99.html"));
        let output = dir.path().join("sources.txt");

        let mut list = SourceList::new();
        let summary = collect(
            &docs,
            ExtractVariant::PrefixId,
            DedupPolicy::Deduplicate,
            &mut list,
            &output,
        )
        .unwrap();

        assert_eq!(summary.documents_processed, 2);
        assert_eq!(summary.documents_skipped.len(), 1);
        assert_eq!(summary.documents_skipped[0].1, "not found");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn unwritable_output_is_fatal() {
        use harvester_shared::HarvestError;

        let dir = tempfile::tempdir().unwrap();
        let docs = write_pages(dir.path());
        // Parent directory does not exist, so the append cannot open the file.
        let output = dir.path().join("missing").join("sources.txt");

        let mut list = SourceList::new();
        let err = collect(
            &docs,
            ExtractVariant::PrefixId,
            DedupPolicy::Deduplicate,
            &mut list,
            &output,
        )
        .unwrap_err();

        assert!(matches!(err, HarvestError::Io { .. }));
    }

    #[test]
    fn resume_continues_numbering_from_existing_list() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("sources.txt");

        let prior = SourceList::from_records(["Existing A", "Existing B"]);
        prior.write_to(&output).unwrap();

        let doc = dir.path().join("page.html");
        std::fs::write(&doc, PAGE_ONE).unwrap();

        let mut list = SourceList::load(&output);
        collect(
            &[doc],
            ExtractVariant::PrefixId,
            DedupPolicy::AppendAll,
            &mut list,
            &output,
        )
        .unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("3. Smith J. (2001) J. Food Prot. 64"));
        assert!(content.contains("4. Jones K. (1998) Int. J. Food Microbiol. 40"));
    }
}
