use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::ClassificationMap;
use crate::orchestrator::DEFAULT_CONCURRENCY;
use crate::progress::DEFAULT_PROGRESS_INTERVAL;
use crate::retry::RetryPolicy;

/// Size-probe retry parameters (optional `[probe]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Maximum number of HEAD attempts (including the first).
    pub max_attempts: u32,
    /// Fixed pause between attempts, in milliseconds.
    pub delay_ms: u64,
    /// Upper bound on one attempt, in milliseconds.
    pub attempt_timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_attempts: p.max_attempts,
            delay_ms: p.delay.as_millis() as u64,
            attempt_timeout_ms: p.attempt_timeout.as_millis() as u64,
        }
    }
}

impl From<&ProbeConfig> for RetryPolicy {
    fn from(c: &ProbeConfig) -> Self {
        RetryPolicy {
            max_attempts: c.max_attempts.max(1),
            delay: Duration::from_millis(c.delay_ms),
            attempt_timeout: Duration::from_millis(c.attempt_timeout_ms.max(1)),
        }
    }
}

/// Global configuration loaded from `~/.config/dl/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlConfig {
    /// Root download directory; `None` means the current directory with no
    /// classification subfolders.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Default number of concurrent chunks.
    pub concurrency: usize,
    /// Persisted preference only.
    #[serde(default)]
    pub auto_update: bool,
    /// Optional progress tick in milliseconds (default 500).
    #[serde(default)]
    pub progress_interval_ms: Option<u64>,
    /// Optional probe retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub probe: Option<ProbeConfig>,
    /// Subfolder label → extensions.
    #[serde(default)]
    pub sub_dir_map: ClassificationMap,
}

impl Default for DlConfig {
    fn default() -> Self {
        Self {
            directory: None,
            concurrency: DEFAULT_CONCURRENCY,
            auto_update: false,
            progress_interval_ms: None,
            probe: None,
            sub_dir_map: ClassificationMap::with_defaults(),
        }
    }
}

/// Partial update from `dl config`; unset fields leave the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub directory: Option<PathBuf>,
    /// Zero is treated as unset.
    pub concurrency: Option<usize>,
    pub auto_update: Option<bool>,
    pub sub_dir_map: Option<ClassificationMap>,
}

impl DlConfig {
    /// Applies `update`; returns whether anything changed.
    pub fn merge(&mut self, update: ConfigUpdate) -> bool {
        let before = self.clone();
        if let Some(dir) = update.directory.filter(|d| !d.as_os_str().is_empty()) {
            self.directory = Some(dir);
        }
        if let Some(n) = update.concurrency.filter(|n| *n > 0) {
            self.concurrency = n;
        }
        if let Some(flag) = update.auto_update {
            self.auto_update = flag;
        }
        if let Some(map) = update.sub_dir_map {
            self.sub_dir_map.merge(&map);
        }
        *self != before
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.probe
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default()
    }

    pub fn progress_interval(&self) -> Duration {
        self.progress_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PROGRESS_INTERVAL)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<DlConfig> {
    if !path.exists() {
        let default_cfg = DlConfig::default();
        default_cfg.save_to(path)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: DlConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = DlConfig::default();
        assert_eq!(cfg.concurrency, 5);
        assert_eq!(cfg.directory, None);
        assert!(!cfg.auto_update);
        assert_eq!(cfg.sub_dir_map.label_for_extension(".mkv"), Some("video"));
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
        assert_eq!(cfg.progress_interval(), Duration::from_millis(500));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = DlConfig {
            directory: Some(PathBuf::from("/srv/downloads")),
            probe: Some(ProbeConfig::default()),
            ..DlConfig::default()
        };
        let toml = cfg.to_toml_string().unwrap();
        let parsed: DlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let cfg: DlConfig = toml::from_str("concurrency = 8\n").unwrap();
        assert_eq!(cfg.concurrency, 8);
        assert!(cfg.sub_dir_map.is_empty());
        assert_eq!(cfg.retry_policy().max_attempts, 20);
    }

    #[test]
    fn probe_section_overrides_policy() {
        let cfg: DlConfig = toml::from_str(
            "concurrency = 2\n[probe]\nmax_attempts = 3\ndelay_ms = 50\nattempt_timeout_ms = 1000\n",
        )
        .unwrap();
        let p = cfg.retry_policy();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.delay, Duration::from_millis(50));
        assert_eq!(p.attempt_timeout, Duration::from_secs(1));
    }

    #[test]
    fn merge_only_touches_set_fields() {
        let mut cfg = DlConfig::default();
        let changed = cfg.merge(ConfigUpdate {
            concurrency: Some(0),
            ..ConfigUpdate::default()
        });
        assert!(!changed);
        assert_eq!(cfg.concurrency, 5);

        let mut extra = ClassificationMap::new();
        extra.add("video", ".MP4");
        extra.add("video", ".webm");
        let changed = cfg.merge(ConfigUpdate {
            directory: Some(PathBuf::from("/tmp/dl")),
            concurrency: Some(12),
            auto_update: Some(true),
            sub_dir_map: Some(extra),
        });
        assert!(changed);
        assert_eq!(cfg.directory.as_deref(), Some(Path::new("/tmp/dl")));
        assert_eq!(cfg.concurrency, 12);
        assert!(cfg.auto_update);
        let mp4s = cfg
            .sub_dir_map
            .extensions("video")
            .iter()
            .filter(|e| e.eq_ignore_ascii_case(".mp4"))
            .count();
        assert_eq!(mp4s, 1);
        assert_eq!(cfg.sub_dir_map.label_for_extension(".webm"), Some("video"));
    }

    #[test]
    fn load_or_init_creates_then_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let created = load_or_init_at(&path).unwrap();
        assert!(path.exists());

        let mut changed = created.clone();
        changed.concurrency = 9;
        changed.save_to(&path).unwrap();
        let loaded = load_or_init_at(&path).unwrap();
        assert_eq!(loaded.concurrency, 9);
        assert_eq!(loaded.sub_dir_map, created.sub_dir_map);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "concurrency = \"many\"").unwrap();
        assert!(load_or_init_at(&path).is_err());
    }
}
