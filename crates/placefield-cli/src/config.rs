//! Configuration Vault – reads/writes `~/.placefield/config.toml`.

use placefield_map::PlaceFieldConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.placefield/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Identity token the agent uses for itself in change records.
    #[serde(default = "default_self_id")]
    pub self_id: String,

    /// Grid and exploration parameters.
    #[serde(default)]
    pub map: PlaceFieldConfig,
}

fn default_self_id() -> String {
    "self".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            self_id: default_self_id(),
            map: PlaceFieldConfig::default(),
        }
    }
}

/// Return the path to `~/.placefield/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".placefield").join("config.toml")
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Load the config, writing the defaults first when no file exists.
///
/// Returns the config and whether it was freshly created.
pub fn load_or_init() -> Result<(Config, bool), String> {
    load_or_init_at(&config_path())
}

pub(crate) fn load_or_init_at(path: &Path) -> Result<(Config, bool), String> {
    if let Some(cfg) = load_from(path)? {
        return Ok((cfg, false));
    }
    let mut cfg = Config::default();
    save_to(&cfg, path)?;
    apply_env_overrides(&mut cfg);
    Ok((cfg, true))
}

/// Apply `PLACEFIELD_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `PLACEFIELD_SELF_ID` | `self_id` |
/// | `PLACEFIELD_RESOLUTION` | `map.resolution` |
/// | `PLACEFIELD_MAX_SIZE` | `map.max_size` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("PLACEFIELD_SELF_ID")
        && !v.trim().is_empty()
    {
        cfg.self_id = v.trim().to_string();
    }
    if let Ok(v) = std::env::var("PLACEFIELD_RESOLUTION")
        && let Ok(res) = v.parse::<f32>()
        && res.is_finite()
        && res > 0.0
    {
        cfg.map.resolution = res;
    }
    if let Ok(v) = std::env::var("PLACEFIELD_MAX_SIZE")
        && let Ok(size) = v.parse::<usize>()
    {
        cfg.map.max_size = size;
    }
}

/// Save the config to `path`, creating its directory if necessary.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use placefield_map::{MAP_INIT_SIZE, MAX_MAP_SIZE};

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.map.initial_size, MAP_INIT_SIZE);
        assert_eq!(loaded.map.max_size, MAX_MAP_SIZE);
        assert_eq!(loaded.map.exploration.max_visits, 2);
    }

    #[test]
    fn config_path_points_to_placefield_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".placefield"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn load_or_init_writes_defaults_once() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let (_, created) = load_or_init_at(&path).expect("init");
        assert!(created);
        assert!(path.exists());

        let (_, created) = load_or_init_at(&path).expect("reload");
        assert!(!created);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[map]\ninitial_size = 11\nmax_size = 21\n").expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.map.initial_size, 11);
        assert_eq!(cfg.map.max_size, 21);
        assert!((cfg.map.exploration.proximity_threshold - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "map = 3").expect("write");
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"));
    }

    #[test]
    fn apply_env_overrides_changes_self_id() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("PLACEFIELD_SELF_ID", "robot-7") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.self_id, "robot-7");
        unsafe { std::env::remove_var("PLACEFIELD_SELF_ID") };
    }

    #[test]
    fn apply_env_overrides_changes_resolution() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("PLACEFIELD_RESOLUTION", "2.5") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert!((cfg.map.resolution - 2.5).abs() < f32::EPSILON);
        unsafe { std::env::remove_var("PLACEFIELD_RESOLUTION") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_max_size() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("PLACEFIELD_MAX_SIZE", "huge") };
        let mut cfg = Config::default();
        let original = cfg.map.max_size;
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.map.max_size, original);
        unsafe { std::env::remove_var("PLACEFIELD_MAX_SIZE") };
    }
}
