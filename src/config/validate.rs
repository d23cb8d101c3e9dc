// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RepackError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RepackError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.bundle, raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_entries(cfg)?;
    validate_entry_patterns(cfg)?;
    validate_output(cfg)?;
    validate_resolution(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn ensure_has_entries(cfg: &RawConfigFile) -> Result<()> {
    if cfg.bundle.entries.is_empty() {
        return Err(RepackError::ConfigError(
            "[bundle].entries must list at least one glob pattern".to_string(),
        ));
    }
    Ok(())
}

fn validate_entry_patterns(cfg: &RawConfigFile) -> Result<()> {
    for pattern in &cfg.bundle.entries {
        if Glob::new(pattern).is_err() {
            return Err(RepackError::ConfigError(format!(
                "[bundle].entries contains an invalid glob pattern: '{pattern}'"
            )));
        }
    }
    Ok(())
}

fn validate_output(cfg: &RawConfigFile) -> Result<()> {
    if cfg.bundle.out_file.trim().is_empty() {
        return Err(RepackError::ConfigError(
            "[bundle].out_file must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_resolution(cfg: &RawConfigFile) -> Result<()> {
    if cfg.bundle.extensions.is_empty() {
        return Err(RepackError::ConfigError(
            "[bundle].extensions must list at least one candidate".to_string(),
        ));
    }
    for ext in &cfg.bundle.extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(RepackError::ConfigError(format!(
                "[bundle].extensions entries must look like '.js' (got '{ext}')"
            )));
        }
    }
    if cfg.bundle.modules_dir.trim().is_empty() {
        return Err(RepackError::ConfigError(
            "[bundle].modules_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(RepackError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
