//! Configuration loading, validation, and env overrides.
//!
//! Config file: `confab.toml`, searched in `./` then the user config dir
//! (`~/.config/confab/`). Every value has a default, so a missing file is
//! not an error. `CONFAB_*` environment variables override file values.

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{ConfabConfig, GatewayConfig, RealtimeConfig},
};
