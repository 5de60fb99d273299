//! Harvest orchestration.
//!
//! Ties the session abstraction and the source collector into the
//! end-to-end login → search → page-walk → export workflow.
//!
//! This crate is the integration library for a browser-automation
//! backend: no WebDriver client ships in this workspace. A backend
//! implements [`Session`] and hands it to [`run_harvest`]; the `harvester`
//! binary covers only the browserless `extract` and `combine` modes.

pub mod pipeline;
pub mod session;

pub use pipeline::{ProgressReporter, RunConfig, RunResult, SilentProgress, run_harvest};
pub use session::{Locator, Session};
