use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// External extractor invocation (optional `[extractor]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Program to execute (looked up in PATH when not absolute).
    pub program: String,
    /// Leading arguments passed before the mode flags (e.g. a script path).
    #[serde(default)]
    pub args: Vec<String>,
    /// Template for the source URL handed to `--download`; `{video_id}` is substituted.
    pub watch_url_template: String,
    /// Upper bound for a metadata (`--info`) run.
    pub info_timeout_secs: u64,
    /// Time between the polite termination signal and the forced kill.
    pub kill_grace_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: "vdm-extractor".to_string(),
            args: Vec::new(),
            watch_url_template: "https://www.youtube.com/watch?v={video_id}".to_string(),
            info_timeout_secs: 60,
            kill_grace_secs: 5,
        }
    }
}

impl ExtractorConfig {
    /// Source URL for a video id.
    pub fn watch_url(&self, video_id: &str) -> String {
        self.watch_url_template.replace("{video_id}", video_id)
    }

    pub fn info_timeout(&self) -> Duration {
        Duration::from_secs(self.info_timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}

/// Global configuration loaded from `~/.config/vdm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdmConfig {
    /// Socket address the HTTP service listens on.
    pub bind_addr: String,
    /// Directory finished artifacts are written to (None = XDG data dir).
    #[serde(default)]
    pub downloads_dir: Option<PathBuf>,
    /// SQLite database file (None = XDG state dir).
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Default number of history records returned by a listing.
    pub history_limit: u32,
    /// Sampling interval for speed/ETA, in milliseconds.
    pub progress_sample_ms: u64,
    /// How long a finished job stays in the live registry before eviction.
    pub terminal_retention_secs: u64,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

impl Default for VdmConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            downloads_dir: None,
            database_path: None,
            history_limit: 10,
            progress_sample_ms: 500,
            terminal_retention_secs: 30,
            extractor: ExtractorConfig::default(),
        }
    }
}

impl VdmConfig {
    /// Configured downloads directory, or `~/.local/share/vdm/downloads`.
    pub fn resolved_downloads_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.downloads_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vdm")?;
        Ok(xdg_dirs.get_data_home().join("downloads"))
    }

    /// Configured database path, or `~/.local/state/vdm/vdm.db`.
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vdm")?;
        Ok(xdg_dirs.get_state_home().join("vdm.db"))
    }

    pub fn progress_sample_interval(&self) -> Duration {
        Duration::from_millis(self.progress_sample_ms.max(1))
    }

    pub fn terminal_retention(&self) -> Duration {
        Duration::from_secs(self.terminal_retention_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file (no default is written).
pub fn load_from_path(path: &Path) -> Result<VdmConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: VdmConfig = toml::from_str(&data)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}
