//! `perceptor config init|show`

use std::path::Path;

use anyhow::{bail, Context, Result};
use perceptor_config::{redact, write_config, ConfigValidationError, PerceptorConfig};

pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    write_config(&PerceptorConfig::default(), path).await?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub fn show(config: &PerceptorConfig) -> Result<()> {
    println!("{}", render_redacted(config)?);
    Ok(())
}

/// Warnings go to stderr so the YAML on stdout stays parseable.
pub fn print_warnings(warnings: &[ConfigValidationError]) {
    for line in render_warnings(warnings) {
        eprintln!("{line}");
    }
}

fn render_warnings(warnings: &[ConfigValidationError]) -> Vec<String> {
    warnings
        .iter()
        .map(|w| format!("warning: {}: {}", w.path, w.message))
        .collect()
}

fn render_redacted(config: &PerceptorConfig) -> Result<String> {
    let value = serde_json::to_value(config).context("failed to serialize config")?;
    serde_yaml::to_string(&redact(&value)).context("failed to render config as YAML")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_secrets() {
        let mut config = PerceptorConfig::default();
        config.generator.api_key = Some("AIzaSecretValue".into());
        config.ocr.access_token = Some("ya29.token-value".into());

        let rendered = render_redacted(&config).unwrap();
        assert!(!rendered.contains("AIzaSecretValue"));
        assert!(!rendered.contains("ya29.token-value"));
        assert!(rendered.contains("port: 8000"));
    }

    #[test]
    fn warnings_name_the_config_path() {
        let lines = render_warnings(&[ConfigValidationError {
            path: "vision.depth_model".into(),
            message: "Model file not found: models/midas_small.onnx".into(),
        }]);
        assert_eq!(
            lines,
            vec!["warning: vision.depth_model: Model file not found: models/midas_small.onnx"]
        );
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        init(&path, false).await.unwrap();
        assert!(path.exists());
        assert!(init(&path, false).await.is_err());
        init(&path, true).await.unwrap();
    }
}
