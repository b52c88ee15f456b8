// Configuration file parser

//! Configuration file parsing
//!
//! Loads a JSON (or TOML, by extension) configuration file and merges it key by
//! key onto the built-in defaults. Loading never fails: a missing file, a
//! broken document or a key with the wrong type falls back to defaults and is
//! reported as a notice for the caller to log once logging is up.

use crate::types::Config;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Configuration plus anything worth telling the operator about it
#[derive(Debug)]
pub struct LoadedConfig {
    /// Effective configuration
    pub config: Config,
    /// Human-readable notes about ignored or defaulted values
    pub notices: Vec<String>,
}

/// Load configuration from a JSON or TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> LoadedConfig {
    let path = path.as_ref();
    let mut notices = Vec::new();

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            notices.push(format!("{} not found, using defaults", path.display()));
            return LoadedConfig {
                config: Config::default(),
                notices,
            };
        }
        Err(e) => {
            notices.push(format!("Failed to read {}: {}, using defaults", path.display(), e));
            return LoadedConfig {
                config: Config::default(),
                notices,
            };
        }
    };

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    let document = if is_toml {
        toml::from_str::<toml::Table>(&contents)
            .map_err(|e| e.to_string())
            .and_then(|table| serde_json::to_value(table).map_err(|e| e.to_string()))
    } else {
        serde_json::from_str::<Value>(&contents).map_err(|e| e.to_string())
    };

    match document {
        Ok(value) => {
            let config = parse_config(&value, &mut notices);
            LoadedConfig { config, notices }
        }
        Err(e) => {
            notices.push(format!(
                "Failed to parse {}: {}, using defaults",
                path.display(),
                e
            ));
            LoadedConfig {
                config: Config::default(),
                notices,
            }
        }
    }
}

/// Merge a parsed document onto the defaults, key by key
pub fn parse_config(document: &Value, notices: &mut Vec<String>) -> Config {
    let mut config = Config::default();

    let Some(map) = document.as_object() else {
        notices.push("Configuration root is not an object, using defaults".to_string());
        return config;
    };

    merge_key(map, "tailscalePath", &mut config.tailscale_path, notices);
    merge_key(map, "trustedSSIDs", &mut config.trusted_ssids, notices);
    merge_key(map, "exitNodes", &mut config.exit_nodes, notices);
    merge_key(map, "logLevel", &mut config.log_level, notices);

    let mut wifi_interface: Option<String> = None;
    merge_key(map, "wifiInterface", &mut wifi_interface, notices);
    config.wifi_interface = wifi_interface.filter(|iface| !iface.is_empty());

    let mut status_file: Option<PathBuf> = None;
    merge_key(map, "statusFile", &mut status_file, notices);
    config.status_file = status_file;

    let mut interval = config.check_interval_secs;
    merge_key(map, "checkIntervalSecs", &mut interval, notices);
    if interval == 0 {
        notices.push("checkIntervalSecs must be > 0, keeping default".to_string());
    } else {
        config.check_interval_secs = interval;
    }

    config
}

/// Overwrite `slot` with `map[key]` when present and well-typed
fn merge_key<T: DeserializeOwned>(
    map: &Map<String, Value>,
    key: &str,
    slot: &mut T,
    notices: &mut Vec<String>,
) {
    let Some(raw) = map.get(key) else {
        return;
    };

    match serde_json::from_value::<T>(raw.clone()) {
        Ok(value) => *slot = value,
        Err(e) => notices.push(format!("Ignoring {}: {}", key, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(dir.path().join("config.json"));
        assert_eq!(loaded.config, Config::default());
        assert_eq!(loaded.notices.len(), 1);
    }

    #[test]
    fn test_full_json_config() {
        let file = write_config(
            ".json",
            r#"{
                "tailscalePath": "/opt/tailscale/tailscale",
                "trustedSSIDs": ["Home", "Office"],
                "exitNodes": ["router", "backup"],
                "checkIntervalSecs": 30,
                "logLevel": "debug",
                "statusFile": "/tmp/aen-status",
                "wifiInterface": "wlan0"
            }"#,
        );

        let loaded = load_config(file.path());
        let config = loaded.config;
        assert!(loaded.notices.is_empty());
        assert_eq!(config.tailscale_path, PathBuf::from("/opt/tailscale/tailscale"));
        assert_eq!(config.trusted_ssids, vec!["Home", "Office"]);
        assert_eq!(config.exit_node_name(), "router");
        assert_eq!(config.check_interval_secs, 30);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.status_file, Some(PathBuf::from("/tmp/aen-status")));
        assert_eq!(config.wifi_interface.as_deref(), Some("wlan0"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let file = write_config(".json", r#"{"trustedSSIDs": ["Home"]}"#);
        let config = load_config(file.path()).config;
        assert_eq!(config.trusted_ssids, vec!["Home"]);
        assert_eq!(config.tailscale_path, Config::default().tailscale_path);
        assert_eq!(config.exit_node_name(), "homeassistant");
    }

    #[test]
    fn test_malformed_json_uses_defaults() {
        let file = write_config(".json", r#"{"trustedSSIDs": ["Home""#);
        let loaded = load_config(file.path());
        assert_eq!(loaded.config, Config::default());
        assert!(loaded.notices[0].contains("Failed to parse"));
    }

    #[test]
    fn test_wrongly_typed_key_is_ignored() {
        let file = write_config(
            ".json",
            r#"{"trustedSSIDs": "Home", "exitNodes": ["router"]}"#,
        );
        let loaded = load_config(file.path());
        assert!(loaded.config.trusted_ssids.is_empty());
        assert_eq!(loaded.config.exit_node_name(), "router");
        assert_eq!(loaded.notices.len(), 1);
        assert!(loaded.notices[0].contains("trustedSSIDs"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut notices = Vec::new();
        let config = parse_config(&serde_json::json!({"checkIntervalSecs": 0}), &mut notices);
        assert_eq!(config.check_interval_secs, 15);
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_non_object_root() {
        let mut notices = Vec::new();
        let config = parse_config(&serde_json::json!(["Home"]), &mut notices);
        assert_eq!(config, Config::default());
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_empty_wifi_interface_means_auto_detect() {
        let mut notices = Vec::new();
        let config = parse_config(&serde_json::json!({"wifiInterface": ""}), &mut notices);
        assert!(config.wifi_interface.is_none());
    }

    #[test]
    fn test_toml_config() {
        let file = write_config(
            ".toml",
            r#"
tailscalePath = "/usr/local/bin/tailscale"
trustedSSIDs = ["Home"]
exitNodes = ["router"]
checkIntervalSecs = 20
"#,
        );
        let loaded = load_config(file.path());
        assert!(loaded.notices.is_empty());
        assert_eq!(
            loaded.config.tailscale_path,
            PathBuf::from("/usr/local/bin/tailscale")
        );
        assert_eq!(loaded.config.trusted_ssids, vec!["Home"]);
        assert_eq!(loaded.config.check_interval_secs, 20);
    }

    #[test]
    fn test_malformed_toml_uses_defaults() {
        let file = write_config(".toml", "trustedSSIDs = [\"Home\"");
        let loaded = load_config(file.path());
        assert_eq!(loaded.config, Config::default());
        assert!(!loaded.notices.is_empty());
    }
}
