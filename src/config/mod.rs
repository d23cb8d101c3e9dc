// src/config/mod.rs

//! Project configuration (`Repack.toml`): raw deserialization, semantic
//! validation and entry-glob expansion.

pub mod entries;
pub mod loader;
pub mod model;
pub mod validate;

pub use entries::collect_entry_files;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{BundleSection, ConfigFile, RawConfigFile, WatchSection};
