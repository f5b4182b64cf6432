//! Configuration for mdlocal.
//!
//! [`Settings`] is the raw, serializable form merged from every source by
//! [`figment`]. [`Config`] is what the rest of the workspace consumes: the
//! same settings after validation, with the include pattern compiled and the
//! intervals turned into [`Duration`]s.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. `config.{toml,yaml,json}` in the user configuration directory,
//! 3. `mdlocal.toml` at the vault root,
//! 4. an explicit `--config` file,
//! 5. `MDLOCAL_*` environment variables.

pub mod error;
mod pattern;

pub use crate::pattern::{IncludePattern, MAX_REPETITIONS};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up at the vault root.
pub const VAULT_CONFIG_FILE: &str = "mdlocal.toml";
/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "MDLOCAL_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Regex selecting which documents are processed.
    pub include: String,
    /// Vault-relative directory downloaded media is stored under.
    pub media_root_directory: String,
    /// Repair `[![[alt]]](target)` artifacts before scanning.
    pub clean_content: bool,
    /// Process documents as they change while watching.
    pub real_time_update: bool,
    /// Milliseconds between drains of the change queue.
    pub real_time_update_interval: u64,
    /// Log per-document summaries at `info` instead of `debug`.
    pub show_notifications: bool,
    /// Seconds before a single download is abandoned.
    pub fetch_timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            include: r".*\.md".to_string(),
            media_root_directory: "media".to_string(),
            clean_content: true,
            real_time_update: true,
            real_time_update_interval: 1000,
            show_notifications: true,
            fetch_timeout: 30,
        }
    }
}

impl Settings {
    /// Every configuration source layered for `vault`.
    pub fn figment(vault: &Path, explicit: Option<&Path>) -> Figment {
        let user = ProjectDirs::from("", "", "mdlocal").map(|dirs| dirs.config_dir().to_path_buf());
        Self::layered(user.as_deref(), vault, explicit)
    }

    fn layered(user: Option<&Path>, vault: &Path, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(dir) = user {
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        figment = figment.merge(Toml::file(vault.join(VAULT_CONFIG_FILE)));
        if let Some(path) = explicit {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => figment.merge(Toml::file_exact(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "include = {:?}", self.include)?;
        writeln!(f, "media_root_directory = {:?}", self.media_root_directory)?;
        writeln!(f, "clean_content = {}", self.clean_content)?;
        writeln!(f, "real_time_update = {}", self.real_time_update)?;
        writeln!(f, "real_time_update_interval = {}", self.real_time_update_interval)?;
        writeln!(f, "show_notifications = {}", self.show_notifications)?;
        write!(f, "fetch_timeout = {}", self.fetch_timeout)
    }
}

/// Validated settings.
#[derive(Clone, Debug)]
pub struct Config {
    pub include: IncludePattern,
    pub media_root: PathBuf,
    pub clean_content: bool,
    /// `None` when real-time updates are switched off.
    pub real_time: Option<Duration>,
    pub show_notifications: bool,
    pub fetch_timeout: Duration,
    settings: Settings,
}

impl Config {
    /// Load and validate the configuration for `vault`.
    pub fn load(vault: &Path, explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Settings::figment(vault, explicit))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let settings: Settings = figment.extract().or_raise(|| ErrorKind::Load)?;
        Self::try_from(settings)
    }

    /// The settings this configuration was validated from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl TryFrom<Settings> for Config {
    type Error = error::Error;

    fn try_from(settings: Settings) -> Result<Self> {
        let include = IncludePattern::new(&settings.include)?;
        if settings.real_time_update_interval == 0 {
            exn::bail!(ErrorKind::InvalidInterval);
        }
        let media_root = mdlocal_storage::validate_path(&settings.media_root_directory)
            .or_raise(|| ErrorKind::InvalidMediaRoot(settings.media_root_directory.clone()))?;
        let real_time = settings
            .real_time_update
            .then(|| Duration::from_millis(settings.real_time_update_interval));
        tracing::debug!(include = %include, media_root = %media_root.display(), "Validated configuration");
        Ok(Self {
            include,
            media_root,
            clean_content: settings.clean_content,
            real_time,
            show_notifications: settings.show_notifications,
            // A zero timeout would fail every download.
            fetch_timeout: Duration::from_secs(settings.fetch_timeout.max(1)),
            settings,
        })
    }
}
