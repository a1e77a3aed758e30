//! `perceptor-config`: runtime configuration management.
//!
//! Provides:
//! - Typed config schema for server, providers, vision models and pacing
//! - YAML read/write
//! - `${ENV_VAR}` substitution
//! - Default values and credential fallbacks from the environment
//! - Validation with errors and warnings
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults_with;
pub use env::{resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw, write_config};
pub use redact::redact;
pub use schema::{
    GeneratorConfig, GeneratorProviderKind, LoggingConfig, OcrConfig, OcrProviderKind,
    PerceptorConfig, ServerConfig, StreamConfig, UpstreamConfig, VisionConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// A validated config and the warnings validation raised for it.
///
/// Warnings are returned rather than logged so the caller can emit them once
/// its subscriber is installed.
#[derive(Debug)]
pub struct PreparedConfig {
    pub config: PerceptorConfig,
    pub warnings: Vec<ConfigValidationError>,
}

impl PreparedConfig {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
    }
}

/// Load, substitute env vars, apply defaults and validate a config file.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<PreparedConfig> {
    let raw = load_raw(path).await?;
    prepare(raw, &std::env::vars().collect())
}

/// The pure half of [`load_and_prepare`], driven by an explicit env map.
pub fn prepare(raw: Value, env: &HashMap<String, String>) -> Result<PreparedConfig> {
    let value = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;

    let config: PerceptorConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let config = apply_all_defaults_with(config, env);

    let report = validate(&config);
    if !report.is_valid() {
        let errors: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("{} config error(s): {}", errors.len(), errors.join("; "));
    }

    Ok(PreparedConfig {
        config,
        warnings: report.warnings,
    })
}
