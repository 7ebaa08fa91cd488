use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    schema::ConfabConfig,
};

const CONFIG_FILENAME: &str = "confab.toml";

/// Load config from the given path.
pub fn load_config(path: &Path) -> Result<ConfabConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Discover and load config from standard locations, then apply `CONFAB_*`
/// environment overrides.
///
/// Search order:
/// 1. `./confab.toml` (project-local)
/// 2. `~/.config/confab/confab.toml` (user-global)
///
/// Falls back to `ConfabConfig::default()` if no config file is found.
pub fn discover_and_load() -> ConfabConfig {
    let mut cfg = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    ConfabConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            ConfabConfig::default()
        },
    };
    apply_env_overrides(&mut cfg);
    cfg
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    if let Some(dir) = config_dir() {
        let p = dir.join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

/// Returns the user-global config directory (`~/.config/confab/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "confab").map(|d| d.config_dir().to_path_buf())
}

/// Override config fields from `CONFAB_*` environment variables.
pub fn apply_env_overrides(cfg: &mut ConfabConfig) {
    apply_env_overrides_with(cfg, |name| std::env::var(name).ok());
}

/// Override config fields using the provided variable lookup.
/// Unparseable values are skipped with a warning rather than aborting startup.
pub fn apply_env_overrides_with(
    cfg: &mut ConfabConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let var = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(host) = var("CONFAB_HOST") {
        cfg.gateway.host = host;
    }
    if let Some(env_name) = var("CONFAB_ENV") {
        cfg.gateway.environment = env_name;
    }
    override_parsed(&var, "CONFAB_PORT", &mut cfg.gateway.port);
    override_parsed(&var, "CONFAB_DETAILED_HEALTH", &mut cfg.gateway.detailed_health);
    override_parsed(&var, "CONFAB_REQUEST_LOGS", &mut cfg.gateway.request_logs);
    override_parsed(&var, "CONFAB_EVENTS_CAPACITY", &mut cfg.realtime.events_capacity);
    override_parsed(
        &var,
        "CONFAB_OUTGOING_CAPACITY",
        &mut cfg.realtime.outgoing_capacity,
    );
    override_parsed(&var, "CONFAB_PONG_WAIT_SECS", &mut cfg.realtime.pong_wait_secs);
    override_parsed(
        &var,
        "CONFAB_WRITE_TIMEOUT_SECS",
        &mut cfg.realtime.write_timeout_secs,
    );
    override_parsed(&var, "CONFAB_MAX_FRAME_BYTES", &mut cfg.realtime.max_frame_bytes);
}

fn override_parsed<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    slot: &mut T,
) {
    if let Some(raw) = var(name) {
        match raw.parse() {
            Ok(value) => *slot = value,
            Err(_) => warn!(var = name, value = %raw, "ignoring unparseable env override"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confab.toml");
        std::fs::write(&path, "[gateway]\nhost = \"0.0.0.0\"\nport = 9000\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.gateway.host, "0.0.0.0");
        assert_eq!(cfg.gateway.port, 9000);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let lookup = |name: &str| match name {
            "CONFAB_PORT" => Some("9999".to_string()),
            "CONFAB_PONG_WAIT_SECS" => Some("not-a-number".to_string()),
            _ => None,
        };
        let mut cfg = ConfabConfig::default();
        apply_env_overrides_with(&mut cfg, lookup);
        assert_eq!(cfg.gateway.port, 9999);
        // Bad values are skipped, not fatal.
        assert_eq!(cfg.realtime.pong_wait_secs, 60);
    }

    #[test]
    fn blank_values_are_ignored() {
        let lookup = |name: &str| (name == "CONFAB_HOST").then(|| "  ".to_string());
        let mut cfg = ConfabConfig::default();
        apply_env_overrides_with(&mut cfg, lookup);
        assert_eq!(cfg.gateway.host, "127.0.0.1");
    }
}
