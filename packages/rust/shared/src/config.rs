//! Application configuration for the harvester.
//!
//! User config lives at `~/.harvester/harvester.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never stored in the file; the config names the
//! environment variables that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};
use crate::types::Credentials;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "harvester.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".harvester";

// ---------------------------------------------------------------------------
// Config structs (matching harvester.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Login credential settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Browser session settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Exported-workbook settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Persisted source-list file.
    #[serde(default = "default_sources_file")]
    pub sources_file: String,

    /// Combined output workbook name.
    #[serde(default = "default_combined_workbook")]
    pub combined_workbook: String,

    /// Directory where per-page HTML snapshots are written and read back.
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Default dedup policy: "dedupe" or "append-all".
    #[serde(default = "default_dedup")]
    pub dedup: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sources_file: default_sources_file(),
            combined_workbook: default_combined_workbook(),
            pages_dir: default_pages_dir(),
            dedup: default_dedup(),
        }
    }
}

fn default_sources_file() -> String {
    "combase_sources.txt".into()
}
fn default_combined_workbook() -> String {
    "ComBaseCombined.xlsx".into()
}
fn default_pages_dir() -> String {
    ".".into()
}
fn default_dedup() -> String {
    "append-all".into()
}

/// `[credentials]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Name of the env var holding the login username (never the value itself).
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Name of the env var holding the login password (never the value itself).
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username_env: default_username_env(),
            password_env: default_password_env(),
        }
    }
}

fn default_username_env() -> String {
    "COMBASE_USERNAME".into()
}
fn default_password_env() -> String {
    "COMBASE_PASSWORD".into()
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Origin of the ComBase browser site.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Organism search term entered on the search page.
    #[serde(default = "default_search_term")]
    pub search_term: String,

    /// Seconds to wait between browser steps.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    /// Whether to run the browser headless.
    #[serde(default)]
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_term: default_search_term(),
            wait_secs: default_wait_secs(),
            headless: false,
        }
    }
}

fn default_base_url() -> String {
    "https://combasebrowser.errc.ars.usda.gov".into()
}
fn default_search_term() -> String {
    "salmonella spp".into()
}
fn default_wait_secs() -> u64 {
    5
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory holding the exported workbooks. Empty = platform Downloads dir.
    #[serde(default)]
    pub downloads_dir: String,

    /// Glob pattern matching the site's exported workbook names.
    #[serde(default = "default_export_pattern")]
    pub pattern: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            downloads_dir: String::new(),
            pattern: default_export_pattern(),
        }
    }
}

fn default_export_pattern() -> String {
    "ComBaseExport*.xlsx".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.harvester/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| HarvestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.harvester/harvester.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| HarvestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| HarvestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| HarvestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| HarvestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the directory holding exported workbooks.
///
/// An explicit `downloads_dir` wins; otherwise the platform Downloads
/// directory, falling back to the current directory if the platform has none.
pub fn resolve_downloads_dir(config: &AppConfig) -> PathBuf {
    if !config.export.downloads_dir.is_empty() {
        return PathBuf::from(&config.export.downloads_dir);
    }
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Read the login credentials from the configured environment variables.
pub fn resolve_credentials(config: &AppConfig) -> Result<Credentials> {
    let username_var = &config.credentials.username_env;
    let password_var = &config.credentials.password_env;

    let username = match std::env::var(username_var) {
        Ok(val) if !val.is_empty() => val,
        _ => {
            return Err(HarvestError::config(format!(
                "login username not found. Set the {username_var} environment variable."
            )));
        }
    };

    let password = match std::env::var(password_var) {
        Ok(val) if !val.is_empty() => val,
        _ => {
            return Err(HarvestError::config(format!(
                "login password not found. Set the {password_var} environment variable."
            )));
        }
    };

    Ok(Credentials { username, password })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("sources_file"));
        assert!(toml_str.contains("COMBASE_USERNAME"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.sources_file, "combase_sources.txt");
        assert_eq!(parsed.browser.wait_secs, 5);
        assert_eq!(parsed.export.pattern, "ComBaseExport*.xlsx");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[browser]
search_term = "listeria monocytogenes"

[export]
downloads_dir = "/tmp/exports"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.browser.search_term, "listeria monocytogenes");
        assert_eq!(config.browser.base_url, default_base_url());
        assert_eq!(resolve_downloads_dir(&config), PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn credentials_validation() {
        let mut config = AppConfig::default();
        // Use unique env var names to avoid interfering with other tests
        config.credentials.username_env = "HV_TEST_NONEXISTENT_USER_12345".into();
        config.credentials.password_env = "HV_TEST_NONEXISTENT_PASS_12345".into();
        let result = resolve_credentials(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("username not found"));
    }
}
