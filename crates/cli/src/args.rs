use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docveil_core::{ExtractionMode, PipelineConfig, RemoteServiceConfig};

#[derive(Debug, Parser)]
#[command(name = "docveil", version, about = "Extract, match and redact document fields")]
pub struct Cli {
    /// JSON pipeline configuration.
    #[arg(long, global = true, env = "DOCVEIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines on stderr.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// More log output (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract fields and match them against a schema.
    Extract(JobArgs),
    /// Extract, then burn the selected fields into a redacted copy.
    Redact(RedactArgs),
}

#[derive(Debug, Args)]
pub struct JobArgs {
    /// Document to process (PDF, PNG, JPEG or TIFF).
    pub input: PathBuf,

    /// JSON array of configured data elements.
    #[arg(short, long)]
    pub schema: PathBuf,

    /// auto, text-only or forms.
    #[arg(long)]
    pub mode: Option<ExtractionMode>,

    /// Pages extracted at once.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Give up on extraction after this many seconds (default 600, 0 for no limit).
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Remote OCR endpoint.
    #[arg(long)]
    pub ocr_endpoint: Option<String>,

    /// Use the local tesseract binary when no OCR endpoint is set.
    #[arg(long)]
    pub tesseract: bool,

    /// Write the JSON report here instead of stdout.
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RedactArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Where to write the redacted copy.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Extra field ids to redact, in order.
    #[arg(long = "select", value_name = "FIELD_ID")]
    pub select: Vec<String>,

    /// JSON array of manual regions.
    #[arg(long)]
    pub regions: Option<PathBuf>,

    /// Only redact what was selected explicitly.
    #[arg(long)]
    pub no_auto_select: bool,

    /// Skip post-render verification.
    #[arg(long)]
    pub no_verify: bool,
}

impl JobArgs {
    /// Flags override whatever the file and environment set.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(mode) = self.mode {
            config.extraction_mode = mode;
        }
        if let Some(concurrency) = self.concurrency.filter(|n| *n > 0) {
            config.concurrency = concurrency;
        }
        if let Some(secs) = self.timeout_secs {
            config.job_timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(endpoint) = &self.ocr_endpoint {
            config
                .ocr
                .get_or_insert_with(RemoteServiceConfig::default)
                .endpoint = endpoint.clone();
        }
        if self.tesseract && config.tesseract.is_none() {
            config.tesseract = Some(Default::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_redact_flags() {
        let cli = Cli::try_parse_from([
            "docveil",
            "-v",
            "redact",
            "passport.pdf",
            "--schema",
            "schema.json",
            "--output",
            "out.pdf",
            "--select",
            "ocr-0-1",
            "--select",
            "ocr-0-0",
            "--mode",
            "text-only",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Command::Redact(args) = cli.command else {
            panic!("expected redact");
        };
        assert_eq!(args.select, vec!["ocr-0-1", "ocr-0-0"]);
        assert_eq!(args.job.mode, Some(ExtractionMode::TextOnly));
        assert!(!args.no_auto_select);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = Cli::try_parse_from(["docveil", "extract", "a.pdf", "-s", "s.json", "--mode", "vibes"])
            .unwrap_err();
        assert!(err.to_string().contains("vibes"));
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "docveil",
            "extract",
            "a.png",
            "-s",
            "s.json",
            "--concurrency",
            "3",
            "--timeout-secs",
            "0",
            "--tesseract",
        ])
        .unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };

        let mut config = PipelineConfig {
            job_timeout_secs: Some(60),
            ..PipelineConfig::default()
        };
        args.apply_to(&mut config);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.job_timeout_secs, None);
        assert!(config.tesseract.is_some());
        assert!(config.ocr.is_none());
    }
}
