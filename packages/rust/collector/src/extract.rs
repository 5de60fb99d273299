//! Citation extraction from result-page HTML.
//!
//! The site labels each result row's citation with a `span` whose id is
//! either exactly `lblSource` or `lblSource` followed by a per-row suffix,
//! depending on which page variant served the results. When neither id
//! shape is present the markup still carries a stable "Source" label near
//! the citation text, so extraction falls back through a cascade of
//! locator strategies, each tried only when the previous yielded nothing.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Landmark text that labels the citation cell when ids are absent.
const SOURCE_LABEL: &str = "Source";

// ---------------------------------------------------------------------------
// Strategy cascade
// ---------------------------------------------------------------------------

/// One locator strategy: a name for tracing plus an extractor over the
/// parsed document. Strategies are evaluated in order; the first one that
/// yields any records wins.
struct Strategy {
    name: &'static str,
    run: fn(&Html) -> Vec<String>,
}

/// Cascade for documents where each row's span id carries a suffix
/// (`lblSource0`, `lblSource1`, ...).
const PREFIX_CASCADE: &[Strategy] = &[
    Strategy {
        name: "id-prefix",
        run: by_id_prefix,
    },
    Strategy {
        name: "landmark-label",
        run: by_landmark_label,
    },
    Strategy {
        name: "row-structure",
        run: by_row_structure,
    },
];

/// Cascade for documents where the span id is the bare literal `lblSource`.
const EXACT_CASCADE: &[Strategy] = &[
    Strategy {
        name: "id-exact",
        run: by_id_exact,
    },
    Strategy {
        name: "landmark-label",
        run: by_landmark_label,
    },
    Strategy {
        name: "row-structure",
        run: by_row_structure,
    },
];

/// Which primary id-match the cascade starts from.
///
/// Both variants share the landmark and row-structure fallbacks; they
/// differ only in how the first stage matches the span id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractVariant {
    /// Span id starts with `lblSource` (per-row suffix).
    #[default]
    PrefixId,
    /// Span id is exactly `lblSource`.
    ExactId,
}

/// Extract citation strings using the given variant's cascade.
pub fn extract_with(html: &str, variant: ExtractVariant) -> Vec<String> {
    match variant {
        ExtractVariant::PrefixId => extract_sources(html),
        ExtractVariant::ExactId => extract_sources_exact(html),
    }
}

/// Extract all citation strings from a result page, prefix-id variant.
///
/// Returns records in document order, trimmed of surrounding whitespace.
/// A document with no matches (or unparsable markup) yields an empty
/// vector; extraction never fails.
pub fn extract_sources(html: &str) -> Vec<String> {
    run_cascade(html, PREFIX_CASCADE)
}

/// Extract all citation strings from a result page, exact-id variant.
///
/// Used for pages that render a single `span#lblSource` per row instead of
/// suffixed ids. Shares the fallback cascade with [`extract_sources`].
pub fn extract_sources_exact(html: &str) -> Vec<String> {
    run_cascade(html, EXACT_CASCADE)
}

fn run_cascade(html: &str, cascade: &[Strategy]) -> Vec<String> {
    let doc = Html::parse_document(html);

    for strategy in cascade {
        let records = (strategy.run)(&doc);
        if !records.is_empty() {
            debug!(
                strategy = strategy.name,
                count = records.len(),
                "citation strategy matched"
            );
            return records;
        }
        debug!(strategy = strategy.name, "citation strategy yielded nothing");
    }

    Vec::new()
}

// ---------------------------------------------------------------------------
// Stage 1: direct id lookup
// ---------------------------------------------------------------------------

fn by_id_exact(doc: &Html) -> Vec<String> {
    let sel = Selector::parse(r#"span[id="lblSource"]"#).unwrap();
    doc.select(&sel).map(trimmed_text).collect()
}

fn by_id_prefix(doc: &Html) -> Vec<String> {
    let sel = Selector::parse(r#"span[id^="lblSource"]"#).unwrap();
    doc.select(&sel).map(trimmed_text).collect()
}

// ---------------------------------------------------------------------------
// Stage 2: landmark label navigation
// ---------------------------------------------------------------------------

/// Find `span.text-primary` elements whose text is exactly the "Source"
/// label, then walk to the parent `div`'s next sibling `div` and take its
/// first `span` — the cell holding the citation text.
fn by_landmark_label(doc: &Html) -> Vec<String> {
    let label_sel = Selector::parse("span.text-primary").unwrap();
    let span_sel = Selector::parse("span").unwrap();

    let mut records = Vec::new();
    for label in doc.select(&label_sel) {
        if trimmed_text(label) != SOURCE_LABEL {
            continue;
        }
        let Some(parent) = ancestor_element(label, "div") else {
            continue;
        };
        let Some(cell) = next_sibling_element(parent, "div") else {
            continue;
        };
        if let Some(span) = cell.select(&span_sel).next() {
            records.push(trimmed_text(span));
        }
    }
    records
}

// ---------------------------------------------------------------------------
// Stage 3: result-row structure navigation
// ---------------------------------------------------------------------------

/// Walk each result row (`div.cbRowSummaryResult`), locate the leaf `div`
/// whose text mentions the "Source" label, and take the first `span` of
/// its next sibling `div`.
fn by_row_structure(doc: &Html) -> Vec<String> {
    let row_sel = Selector::parse("div.cbRowSummaryResult").unwrap();
    let div_sel = Selector::parse("div").unwrap();
    let span_sel = Selector::parse("span").unwrap();

    let mut records = Vec::new();
    for row in doc.select(&row_sel) {
        let label = row.select(&div_sel).find(|d| {
            is_leaf_element(*d) && d.text().collect::<String>().contains(SOURCE_LABEL)
        });
        let Some(label) = label else {
            continue;
        };
        let Some(cell) = next_sibling_element(label, "div") else {
            continue;
        };
        if let Some(span) = cell.select(&span_sel).next() {
            records.push(trimmed_text(span));
        }
    }
    records
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

fn trimmed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Nearest ancestor element with the given tag name.
fn ancestor_element<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == tag)
}

/// Next following sibling element with the given tag name, skipping text nodes.
fn next_sibling_element<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|s| s.value().name() == tag)
}

/// True if the element has no child elements (text-only content).
fn is_leaf_element(el: ElementRef<'_>) -> bool {
    el.children().filter_map(ElementRef::wrap).next().is_none()
}
