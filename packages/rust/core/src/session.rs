//! Browser session abstraction.
//!
//! The harvest pipeline drives a browser through this trait instead of a
//! concrete WebDriver client, so tests can run against a scripted session
//! and production can plug in whatever automation backend is at hand.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use harvester_shared::{HarvestError, Result};

/// How to find an element on the current page.
///
/// The site's markup drifts between deployments, so callers usually hold a
/// short ordered list of these and try them via [`Session::click_any`] or
/// [`Session::fill_any`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Element id attribute.
    Id(String),
    /// CSS selector.
    Css(String),
    /// Anchor matched by its visible link text.
    LinkText(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Css(sel) => write!(f, "css={sel}"),
            Self::LinkText(text) => write!(f, "link-text={text}"),
        }
    }
}

/// A live browser session.
///
/// Every method that touches an element returns `Err` when the locator
/// matches nothing, so cascades can fall through to the next candidate.
pub trait Session {
    /// Navigate to a URL.
    fn goto(&mut self, url: &str) -> Result<()>;

    /// The URL the browser is currently on.
    fn current_url(&self) -> Result<String>;

    /// Clear and type into an input element.
    fn fill(&mut self, locator: &Locator, value: &str) -> Result<()>;

    /// Click an element.
    fn click(&mut self, locator: &Locator) -> Result<()>;

    /// Click every element the locator matches, returning how many were hit.
    fn click_all(&mut self, locator: &Locator) -> Result<usize>;

    /// Visible text of the first matching element.
    fn text_of(&self, locator: &Locator) -> Result<String>;

    /// Full HTML source of the current page.
    fn page_source(&self) -> Result<String>;

    /// Let the page settle (scripted results, postback reloads).
    fn wait(&mut self, duration: Duration);

    /// Try each locator in order until one clicks.
    fn click_any(&mut self, locators: &[Locator]) -> Result<()> {
        for locator in locators {
            match self.click(locator) {
                Ok(()) => {
                    debug!(%locator, "clicked");
                    return Ok(());
                }
                Err(e) => debug!(%locator, error = %e, "click failed, trying next"),
            }
        }
        Err(HarvestError::Session(format!(
            "no locator matched for click: {}",
            join_locators(locators)
        )))
    }

    /// Try each locator in order until one accepts the value.
    fn fill_any(&mut self, locators: &[Locator], value: &str) -> Result<()> {
        for locator in locators {
            match self.fill(locator, value) {
                Ok(()) => {
                    debug!(%locator, "filled");
                    return Ok(());
                }
                Err(e) => debug!(%locator, error = %e, "fill failed, trying next"),
            }
        }
        Err(HarvestError::Session(format!(
            "no locator matched for fill: {}",
            join_locators(locators)
        )))
    }
}

fn join_locators(locators: &[Locator]) -> String {
    locators
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
