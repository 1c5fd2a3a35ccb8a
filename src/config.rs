use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "reed";
const SETTINGS_FILE: &str = "config.json";
const SOCKET_NAME: &str = "reed-mpv.sock";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub executable: PathBuf,
    pub socket_path: PathBuf,
    pub extra_args: Vec<String>,
    pub startup_timeout_ms: u64,
    pub retry_interval_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("mpv"),
            socket_path: env::temp_dir().join(SOCKET_NAME),
            extra_args: Vec::new(),
            startup_timeout_ms: 1500,
            retry_interval_ms: 100,
        }
    }
}

impl BackendSettings {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub seek_step_seconds: i32,
    pub volume_step_percent: i32,
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            seek_step_seconds: 5,
            volume_step_percent: 5,
            log_dir: None,
        }
    }
}

pub fn config_root() -> Result<PathBuf> {
    config_root_from(env::var_os("REED_CONFIG_DIR"), env::var_os("HOME"))
}

fn config_root_from(override_dir: Option<OsString>, home: Option<OsString>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let home = home.context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn load_settings() -> Result<Settings> {
    load_from(&settings_path()?)
}

/// A missing file yields the defaults; an unreadable or malformed one is an error.
pub fn load_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let settings = load_from(&dir.path().join(SETTINGS_FILE)).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.backend.executable, PathBuf::from("mpv"));
        assert_eq!(settings.backend.startup_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"{ "seek_step_seconds": 10, "backend": { "extra_args": ["--no-video"] } }"#,
        )
        .expect("write");

        let settings = load_from(&path).expect("load");
        assert_eq!(settings.seek_step_seconds, 10);
        assert_eq!(settings.volume_step_percent, 5);
        assert_eq!(settings.backend.extra_args, vec![String::from("--no-video")]);
        assert_eq!(settings.backend.retry_interval_ms, 100);
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").expect("write");

        let err = load_from(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains(SETTINGS_FILE));
    }

    #[test]
    fn override_dir_is_the_config_root() {
        let root = config_root_from(Some("/tmp/reed-conf".into()), Some("/home/u".into()))
            .expect("root");
        assert_eq!(root, PathBuf::from("/tmp/reed-conf"));
    }

    #[test]
    fn home_fallback_and_missing_home() {
        let root = config_root_from(None, Some("/home/u".into())).expect("root");
        assert_eq!(root, PathBuf::from("/home/u/.config").join(APP_DIR));

        let empty_override = config_root_from(Some(OsString::new()), Some("/home/u".into()));
        assert_eq!(empty_override.expect("root"), root);

        let err = config_root_from(None, None).expect_err("no home");
        assert!(err.to_string().contains("HOME"));
    }
}
