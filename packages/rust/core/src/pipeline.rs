//! End-to-end harvest pipeline: login → search → page loop → export.
//!
//! Drives a [`Session`] through the site the way an operator would:
//! authenticate, run the organism search, then walk every result page,
//! saving the raw HTML, collecting citations, and triggering the Excel
//! export for the selected records.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use harvester_collector::{SourceList, append_records, extract_sources};
use harvester_shared::{AppConfig, Credentials, DedupPolicy, HarvestError, Result, resolve_credentials};

use crate::session::{Locator, Session};

/// Configuration for a full harvest run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Site entry point.
    pub base_url: Url,
    /// Organism term typed into the search box.
    pub search_term: String,
    /// Login credentials.
    pub credentials: Credentials,
    /// Settle time after navigation and postbacks.
    pub wait_secs: u64,
    /// Directory where each result page's HTML is saved.
    pub pages_dir: PathBuf,
    /// Path of the accumulated source list.
    pub sources_file: PathBuf,
    /// How repeated citations are folded into the list.
    pub policy: DedupPolicy,
}

impl RunConfig {
    /// Build a run configuration from the application config, reading the
    /// credentials from the environment variables it names.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let base_url = Url::parse(&config.browser.base_url).map_err(|e| {
            HarvestError::config(format!(
                "invalid base_url '{}': {e}",
                config.browser.base_url
            ))
        })?;

        Ok(Self {
            base_url,
            search_term: config.browser.search_term.clone(),
            credentials: resolve_credentials(config)?,
            wait_secs: config.browser.wait_secs,
            pages_dir: PathBuf::from(&config.defaults.pages_dir),
            sources_file: PathBuf::from(&config.defaults.sources_file),
            policy: config.defaults.dedup.parse()?,
        })
    }
}

/// Result of a completed harvest run.
#[derive(Debug)]
pub struct RunResult {
    /// Result pages walked.
    pub pages_processed: usize,
    /// Citations appended to the source list this run.
    pub sources_collected: usize,
    /// Export clicks that actually had selected records behind them.
    pub exports_triggered: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each result page is processed.
    fn page_done(&self, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_done(&self, _current: usize, _total: usize) {}
    fn done(&self, _result: &RunResult) {}
}

// --- Locator cascades ---
//
// The site has shipped several markup variants over the years; each step
// lists the ids/selectors seen in the wild, newest first.

fn browser_link_cascade() -> Vec<Locator> {
    vec![
        Locator::link_text("Browser"),
        Locator::css("a[href*='Search.aspx']"),
    ]
}

fn search_input_cascade() -> Vec<Locator> {
    vec![
        Locator::css("div.ms-sel-ctn input"),
        Locator::id("ContentPlaceHolder1_txtOrganism"),
        Locator::css("input[name*='txtOrganism']"),
    ]
}

fn search_button_cascade() -> Vec<Locator> {
    vec![
        Locator::id("btnDoSearch"),
        Locator::id("ContentPlaceHolder1_btnDoSearch"),
        Locator::css("input[type='submit'][value='Search']"),
    ]
}

fn export_button_cascade() -> Vec<Locator> {
    vec![
        Locator::id("cbBtnExportToExcel"),
        Locator::id("ContentPlaceHolder1_cbBtnExportToExcel"),
    ]
}

fn next_page_cascade(next_page: usize) -> Vec<Locator> {
    vec![
        Locator::css("a.next[data-action='next']"),
        Locator::link_text(next_page.to_string()),
    ]
}

/// Run the full harvest.
///
/// 1. Log in
/// 2. Open the search page and submit the organism term
/// 3. Walk every result page: save HTML, collect citations, export records
pub fn run_harvest<S: Session>(
    session: &mut S,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();
    let settle = Duration::from_secs(config.wait_secs);

    info!(url = %config.base_url, term = %config.search_term, "starting harvest");

    // --- Phase 1: Login ---
    progress.phase("Logging in");
    login(session, config, settle)?;

    // --- Phase 2: Search ---
    progress.phase("Submitting search");
    submit_search(session, config, settle)?;

    let landing = session.current_url()?;
    if !landing.contains("SearchResults.aspx") {
        return Err(HarvestError::Session(format!(
            "search did not land on a results page (at {landing})"
        )));
    }

    let first_page = session.page_source()?;
    let total = total_pages(&first_page);
    info!(total_pages = total, "search results loaded");

    // --- Phase 3: Page loop ---
    progress.phase("Walking result pages");

    // Resume: new records continue the numbering of whatever is on disk.
    let mut list = SourceList::load(&config.sources_file);
    let already_on_disk = list.len();
    let mut exports_triggered = 0usize;

    std::fs::create_dir_all(&config.pages_dir)
        .map_err(|e| HarvestError::io(&config.pages_dir, e))?;

    for page in 1..=total {
        let html = if page == 1 {
            first_page.clone()
        } else {
            session.page_source()?
        };

        let page_path = config.pages_dir.join(format!("combase_page_{page}.html"));
        std::fs::write(&page_path, &html).map_err(|e| HarvestError::io(&page_path, e))?;

        let mut appended = Vec::new();
        for source in extract_sources(&html) {
            if list.push(&source, config.policy) {
                appended.push(source);
            }
        }
        let start_index = list.len() - appended.len() + 1;
        append_records(&config.sources_file, start_index, &appended)?;

        if export_page(session, settle)? {
            exports_triggered += 1;
        } else {
            warn!(page, "no exportable records on page");
        }

        progress.page_done(page, total);

        if page < total {
            session.click_any(&next_page_cascade(page + 1))?;
            session.wait(settle);
        }
    }

    let result = RunResult {
        pages_processed: total,
        sources_collected: list.len() - already_on_disk,
        exports_triggered,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        pages = result.pages_processed,
        sources = result.sources_collected,
        exports = result.exports_triggered,
        elapsed_ms = result.elapsed.as_millis(),
        "harvest complete"
    );

    Ok(result)
}

/// Authenticate on the landing page.
fn login<S: Session>(session: &mut S, config: &RunConfig, settle: Duration) -> Result<()> {
    session.goto(config.base_url.as_str())?;
    session.wait(settle);

    session.fill(
        &Locator::id("Login1_UserName"),
        &config.credentials.username,
    )?;
    session.fill(
        &Locator::id("Login1_Password"),
        &config.credentials.password,
    )?;
    session.click(&Locator::id("Login1_Button1"))?;
    session.wait(settle);

    // Failure leaves us on the login form with a populated message span.
    if let Ok(message) = session.text_of(&Locator::id("Login1_FailureText")) {
        let message = message.trim();
        if !message.is_empty() {
            return Err(HarvestError::Session(format!("login failed: {message}")));
        }
    }

    Ok(())
}

/// Open the search page, type the organism term, submit.
fn submit_search<S: Session>(session: &mut S, config: &RunConfig, settle: Duration) -> Result<()> {
    session.click_any(&browser_link_cascade())?;
    session.wait(settle);

    session.fill_any(&search_input_cascade(), &config.search_term)?;
    session.wait(settle);

    // The autocomplete dropdown only renders on the newer markup; picking
    // the first suggestion is optional.
    if session.click(&Locator::css("div.ms-res-item")).is_ok() {
        session.wait(settle);
    }

    session.click_any(&search_button_cascade())?;
    session.wait(settle);
    Ok(())
}

/// Select every record on the page and trigger the Excel export.
///
/// Returns `false` when the page had no export checkboxes.
fn export_page<S: Session>(session: &mut S, settle: Duration) -> Result<bool> {
    let selected = session.click_all(&Locator::css("input.exportchk"))?;
    if selected == 0 {
        return Ok(false);
    }

    session.click_any(&export_button_cascade())?;
    session.wait(settle);

    // Deselect so the next page's export doesn't double-count.
    session.click_all(&Locator::css("input.exportchk"))?;
    Ok(true)
}

/// Read the result-page count from the `HiddenTotalPages` hidden input.
/// Missing or malformed values mean a single page.
fn total_pages(html: &str) -> usize {
    let document = Html::parse_document(html);
    let selector = Selector::parse("input#HiddenTotalPages").unwrap();
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("value"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result_page(page: usize, total: usize, citation: &str) -> String {
        format!(
            r##"<html><body>
            <input type="hidden" id="HiddenTotalPages" value="{total}" />
            <div class="cbRowSummaryResult">
              <input type="checkbox" class="exportchk" />
              <span id="lblSource{page}">{citation}</span>
            </div>
            <a class="next" data-action="next" href="#">&gt;</a>
            </body></html>"##
        )
    }

    /// Scripted session: serves a fixed page sequence, records every action.
    struct MockSession {
        pages: Vec<String>,
        current_page: usize,
        url: String,
        filled: HashMap<String, String>,
        clicks: Vec<String>,
        fail_login: bool,
    }

    impl MockSession {
        fn new(pages: Vec<String>) -> Self {
            Self {
                pages,
                current_page: 0,
                url: String::new(),
                filled: HashMap::new(),
                clicks: Vec::new(),
                fail_login: false,
            }
        }
    }

    impl Session for MockSession {
        fn goto(&mut self, url: &str) -> Result<()> {
            self.url = url.to_string();
            Ok(())
        }

        fn current_url(&self) -> Result<String> {
            Ok(self.url.clone())
        }

        fn fill(&mut self, locator: &Locator, value: &str) -> Result<()> {
            match locator {
                Locator::Id(id) if id.starts_with("Login1_") => {
                    self.filled.insert(id.clone(), value.to_string());
                    Ok(())
                }
                // Only the legacy organism input exists in this mock.
                Locator::Id(id) if id == "ContentPlaceHolder1_txtOrganism" => {
                    self.filled.insert(id.clone(), value.to_string());
                    Ok(())
                }
                other => Err(HarvestError::Session(format!("{other} not present"))),
            }
        }

        fn click(&mut self, locator: &Locator) -> Result<()> {
            match locator {
                Locator::Id(id) if id == "Login1_Button1" => {
                    self.clicks.push(id.clone());
                    Ok(())
                }
                Locator::LinkText(text) if text == "Browser" => {
                    self.clicks.push("Browser".into());
                    Ok(())
                }
                Locator::Id(id) if id == "btnDoSearch" => {
                    self.clicks.push(id.clone());
                    self.url = "https://example.test/SearchResults.aspx".into();
                    Ok(())
                }
                Locator::Id(id) if id == "cbBtnExportToExcel" => {
                    self.clicks.push(id.clone());
                    Ok(())
                }
                Locator::Css(sel) if sel == "a.next[data-action='next']" => {
                    self.clicks.push("next".into());
                    self.current_page += 1;
                    Ok(())
                }
                other => Err(HarvestError::Session(format!("{other} not present"))),
            }
        }

        fn click_all(&mut self, locator: &Locator) -> Result<usize> {
            match locator {
                Locator::Css(sel) if sel == "input.exportchk" => Ok(1),
                _ => Ok(0),
            }
        }

        fn text_of(&self, locator: &Locator) -> Result<String> {
            match locator {
                Locator::Id(id) if id == "Login1_FailureText" && self.fail_login => {
                    Ok("Your login attempt was not successful.".into())
                }
                other => Err(HarvestError::Session(format!("{other} not present"))),
            }
        }

        fn page_source(&self) -> Result<String> {
            Ok(self.pages[self.current_page].clone())
        }

        fn wait(&mut self, _duration: Duration) {}
    }

    fn run_config(dir: &std::path::Path) -> RunConfig {
        RunConfig {
            base_url: Url::parse("https://example.test/").unwrap(),
            search_term: "salmonella spp".into(),
            credentials: Credentials {
                username: "user".into(),
                password: "pass".into(),
            },
            wait_secs: 0,
            pages_dir: dir.join("pages"),
            sources_file: dir.join("combase_sources.txt"),
            policy: DedupPolicy::AppendAll,
        }
    }

    #[test]
    fn walks_all_pages_and_collects_sources() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![
            result_page(1, 3, "Mackey B.M. (1988) Int. J. Food Microbiol. 6, 57-65"),
            result_page(2, 3, "Oscar T.P. (1999) J. Food Prot. 62, 106-111"),
            result_page(3, 3, "Ross T. (1996) J. Appl. Bacteriol. 81, 501-508"),
        ];
        let mut session = MockSession::new(pages);

        let result = run_harvest(&mut session, &run_config(dir.path()), &SilentProgress).unwrap();

        assert_eq!(result.pages_processed, 3);
        assert_eq!(result.sources_collected, 3);
        assert_eq!(result.exports_triggered, 3);

        // Each page's HTML landed on disk.
        for page in 1..=3 {
            assert!(dir.path().join(format!("pages/combase_page_{page}.html")).exists());
        }

        // The list is numbered across pages.
        let saved = std::fs::read_to_string(dir.path().join("combase_sources.txt")).unwrap();
        assert!(saved.starts_with("1. Mackey"));
        assert!(saved.contains("3. Ross"));

        // Two next-page clicks for three pages.
        assert_eq!(session.clicks.iter().filter(|c| *c == "next").count(), 2);
    }

    #[test]
    fn failed_login_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MockSession::new(vec![result_page(1, 1, "x")]);
        session.fail_login = true;

        let err = run_harvest(&mut session, &run_config(dir.path()), &SilentProgress).unwrap_err();
        assert!(err.to_string().contains("login failed"));
        assert!(!dir.path().join("pages").exists());
    }

    #[test]
    fn rerun_appends_and_continues_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![result_page(1, 1, "Oscar T.P. (1999) J. Food Prot. 62, 106-111")];

        let mut session = MockSession::new(pages.clone());
        run_harvest(&mut session, &run_config(dir.path()), &SilentProgress).unwrap();

        let mut session = MockSession::new(pages);
        let result = run_harvest(&mut session, &run_config(dir.path()), &SilentProgress).unwrap();
        assert_eq!(result.sources_collected, 1);

        let saved = std::fs::read_to_string(dir.path().join("combase_sources.txt")).unwrap();
        assert!(saved.contains("1. Oscar"));
        assert!(saved.contains("2. Oscar"));
    }

    #[test]
    fn from_app_config_rejects_bad_base_url() {
        let mut config = AppConfig::default();
        config.browser.base_url = "not a url".into();
        let err = RunConfig::from_app_config(&config).unwrap_err();
        assert!(err.to_string().contains("invalid base_url"));
    }

    #[test]
    fn from_app_config_requires_credentials_in_env() {
        let mut config = AppConfig::default();
        config.credentials.username_env = "HV_TEST_RUNCFG_USER_98765".into();
        config.credentials.password_env = "HV_TEST_RUNCFG_PASS_98765".into();
        assert!(RunConfig::from_app_config(&config).is_err());
    }

    #[test]
    fn missing_total_pages_defaults_to_one() {
        assert_eq!(total_pages("<html><body></body></html>"), 1);
        assert_eq!(
            total_pages(r#"<input id="HiddenTotalPages" value="oops" />"#),
            1
        );
        assert_eq!(
            total_pages(r#"<input id="HiddenTotalPages" value="12" />"#),
            12
        );
    }

    #[test]
    fn search_landing_elsewhere_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = MockSession::new(vec![result_page(1, 1, "x")]);
        // Sabotage: search button leaves us on the login page.
        struct NoResults(MockSession);
        impl Session for NoResults {
            fn goto(&mut self, url: &str) -> Result<()> {
                self.0.goto(url)
            }
            fn current_url(&self) -> Result<String> {
                Ok("https://example.test/Login.aspx".into())
            }
            fn fill(&mut self, l: &Locator, v: &str) -> Result<()> {
                self.0.fill(l, v)
            }
            fn click(&mut self, l: &Locator) -> Result<()> {
                self.0.click(l)
            }
            fn click_all(&mut self, l: &Locator) -> Result<usize> {
                self.0.click_all(l)
            }
            fn text_of(&self, l: &Locator) -> Result<String> {
                self.0.text_of(l)
            }
            fn page_source(&self) -> Result<String> {
                self.0.page_source()
            }
            fn wait(&mut self, d: Duration) {
                self.0.wait(d)
            }
        }
        session.fail_login = false;
        let mut session = NoResults(session);

        let err = run_harvest(&mut session, &run_config(dir.path()), &SilentProgress).unwrap_err();
        assert!(err.to_string().contains("did not land on a results page"));
    }
}
