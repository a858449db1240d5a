//! Job configuration: JSON file, then `DOCVEIL_*` environment overrides.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docveil_extract::{
    ExtractionChain, ExtractionMode, ExtractionService, HttpExtractionService, RetryPolicy,
    TesseractConfig, TesseractService,
};
use docveil_render::RenderOptions;
use docveil_verify::VerifyOptions;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "DOCVEIL_";

/// A JSON-over-HTTP extraction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteServiceConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub attempt_timeout_secs: u64,
}

impl Default for RemoteServiceConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            endpoint: String::new(),
            api_key: None,
            max_retries: policy.max_retries,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            attempt_timeout_secs: policy.attempt_timeout.as_secs(),
        }
    }
}

impl RemoteServiceConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs.max(1)),
        }
    }

    fn build(&self) -> Result<Arc<dyn ExtractionService>, ConfigError> {
        let service =
            HttpExtractionService::new(&self.endpoint, self.api_key.clone(), self.retry_policy())?;
        Ok(Arc::new(service))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedactionConfig {
    pub fill: [u8; 3],
    pub scrub_text: bool,
    pub producer: Option<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            fill: [0, 0, 0],
            scrub_text: true,
            producer: None,
        }
    }
}

impl RedactionConfig {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            fill: self.fill,
            scrub_text: self.scrub_text,
            producer: self.producer.clone(),
        }
    }
}

pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Pages extracted at once; 1 is strictly sequential.
    pub concurrency: usize,
    /// Bound on the whole extraction phase; `None` (or `0` from env and flags) lifts it.
    pub job_timeout_secs: Option<u64>,
    pub extraction_mode: ExtractionMode,
    /// Primary remote tier.
    pub ocr: Option<RemoteServiceConfig>,
    /// Local Tesseract as the primary remote tier when no `ocr` endpoint is set.
    pub tesseract: Option<TesseractConfig>,
    pub fallback: Option<RemoteServiceConfig>,
    pub redaction: RedactionConfig,
    pub verify: Option<VerifyOptions>,
    /// Log extracted page text in clear at debug level.
    pub log_full_text: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            job_timeout_secs: Some(DEFAULT_JOB_TIMEOUT_SECS),
            extraction_mode: ExtractionMode::Auto,
            ocr: None,
            tesseract: None,
            fallback: None,
            redaction: RedactionConfig::default(),
            verify: Some(VerifyOptions::default()),
            log_full_text: false,
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Apply `DOCVEIL_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(std::env::vars())
    }

    /// Apply `DOCVEIL_*` overrides from `vars`; other keys are ignored.
    pub fn apply_env_from<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "CONCURRENCY" => {
                    self.concurrency = value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| invalid(&key, &value))?;
                }
                "JOB_TIMEOUT_SECS" => {
                    let secs = value.trim().parse::<u64>().map_err(|_| invalid(&key, &value))?;
                    self.job_timeout_secs = (secs > 0).then_some(secs);
                }
                "EXTRACTION_MODE" => {
                    self.extraction_mode = value.parse().map_err(|_| invalid(&key, &value))?;
                }
                "OCR_ENDPOINT" => {
                    self.ocr.get_or_insert_with(RemoteServiceConfig::default).endpoint = value;
                }
                "OCR_API_KEY" => {
                    self.ocr.get_or_insert_with(RemoteServiceConfig::default).api_key = Some(value);
                }
                "FALLBACK_ENDPOINT" => {
                    self.fallback = Some(RemoteServiceConfig::with_endpoint(value));
                }
                "LOG_FULL_TEXT" => {
                    self.log_full_text = parse_bool(&key, &value)?;
                }
                _ => log::debug!("[Config] ignoring {}", key),
            }
        }
        Ok(())
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// The standard tier order with whichever remote services are configured.
    pub fn build_chain(&self) -> Result<ExtractionChain, ConfigError> {
        let remote: Option<Arc<dyn ExtractionService>> = match (&self.ocr, &self.tesseract) {
            (Some(ocr), _) if !ocr.endpoint.is_empty() => Some(ocr.build()?),
            (_, Some(tesseract)) => Some(Arc::new(TesseractService::new(tesseract.clone()))),
            _ => None,
        };
        let fallback = match &self.fallback {
            Some(cfg) if !cfg.endpoint.is_empty() => Some(cfg.build()?),
            _ => None,
        };

        let chain = ExtractionChain::standard(remote, fallback);
        log::info!("[Config] extraction tiers: {:?}", chain.methods());
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_extract::ExtractionMethod;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.job_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"concurrency": 2, "extractionMode": "forms", "redaction": {{"fill": [255, 0, 0]}}}}"#
        )
        .unwrap();

        let mut config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.extraction_mode, ExtractionMode::Forms);
        assert_eq!(config.redaction.fill, [255, 0, 0]);
        assert!(config.redaction.scrub_text);

        config
            .apply_env_from(vars(&[
                ("DOCVEIL_CONCURRENCY", "4"),
                ("DOCVEIL_JOB_TIMEOUT_SECS", "120"),
                ("DOCVEIL_OCR_ENDPOINT", "http://localhost:9000/analyze"),
                ("DOCVEIL_OCR_API_KEY", "secret"),
                ("DOCVEIL_LOG_FULL_TEXT", "yes"),
                ("HOME", "/root"),
            ]))
            .unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.job_timeout(), Some(Duration::from_secs(120)));
        let ocr = config.ocr.as_ref().unwrap();
        assert_eq!(ocr.endpoint, "http://localhost:9000/analyze");
        assert_eq!(ocr.api_key.as_deref(), Some("secret"));
        assert!(config.log_full_text);
    }

    #[test]
    fn test_zero_job_timeout_lifts_the_bound() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.job_timeout_secs, Some(DEFAULT_JOB_TIMEOUT_SECS));
        config
            .apply_env_from(vars(&[("DOCVEIL_JOB_TIMEOUT_SECS", "0")]))
            .unwrap();
        assert!(config.job_timeout().is_none());
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_env_from(vars(&[("DOCVEIL_CONCURRENCY", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(config
            .apply_env_from(vars(&[("DOCVEIL_EXTRACTION_MODE", "psychic")]))
            .is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/docveil.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/docveil.json"));
    }

    #[test]
    fn test_chain_follows_configured_services() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.build_chain().unwrap().methods(),
            vec![ExtractionMethod::DirectParse, ExtractionMethod::LayoutParse]
        );

        let config = PipelineConfig {
            tesseract: Some(TesseractConfig::default()),
            fallback: Some(RemoteServiceConfig::with_endpoint("http://localhost:9001")),
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.build_chain().unwrap().methods(),
            vec![
                ExtractionMethod::DirectParse,
                ExtractionMethod::RemoteOcr,
                ExtractionMethod::LayoutParse,
                ExtractionMethod::FallbackRemote,
            ]
        );
    }
}
