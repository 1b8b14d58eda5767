//! CLI argument parsing using clap derive API
//!
//! Purely declarative. Flag values are folded into the loaded configuration by
//! [`ScanArgs::apply`] and [`Cli::apply_globals`], which keeps CLI flags at the
//! top of the precedence chain.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use repowatch_core::config::RepowatchConfig;

/// Default configuration file, read only when it exists.
pub const DEFAULT_CONFIG_FILE: &str = "repowatch.toml";

/// repowatch -- clone repositories, run security scanners, and write reports.
///
/// Use `repowatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "repowatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file. A missing file is an error only when
    /// this flag is given explicitly.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format for command results.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply global flags to the configuration.
    pub fn apply_globals(&self, config: &mut RepowatchConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.to_lowercase();
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan every repository in the repository list.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// AI provider selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AiProviderArg {
    Openai,
    Anthropic,
}

impl AiProviderArg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Scan the repository list and write reports.
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Disable AI analysis.
    #[arg(long)]
    pub no_ai: bool,

    /// Keep cloned repositories on disk after scanning.
    #[arg(long)]
    pub no_cleanup: bool,

    /// AI provider.
    #[arg(long, value_enum)]
    pub ai_provider: Option<AiProviderArg>,

    /// AI model name (default depends on the provider).
    #[arg(long)]
    pub ai_model: Option<String>,

    /// Base URL of an OpenAI- or Anthropic-compatible API.
    #[arg(long)]
    pub ai_base_url: Option<String>,

    /// File listing repository URLs, one per line.
    #[arg(long)]
    pub repos_file: Option<PathBuf>,

    /// Directory for report files.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Disable the Drupal module check.
    #[arg(long)]
    pub no_drupal: bool,

    /// Also write human-readable .txt reports.
    #[arg(long)]
    pub text_reports: bool,
}

impl ScanArgs {
    /// Fold the scan flags into the configuration.
    pub fn apply(&self, config: &mut RepowatchConfig) {
        if self.no_ai {
            config.ai.enabled = false;
        }
        if self.no_cleanup {
            config.repository.cleanup = false;
        }
        if let Some(provider) = self.ai_provider {
            config.ai.provider = provider.as_str().to_owned();
        }
        if let Some(model) = &self.ai_model {
            config.ai.model.clone_from(model);
        }
        if let Some(url) = &self.ai_base_url {
            config.ai.base_url.clone_from(url);
        }
        if let Some(path) = &self.repos_file {
            config.general.repos_file = path.display().to_string();
        }
        if let Some(path) = &self.output_dir {
            config.general.output_dir = path.display().to_string();
        }
        if self.no_drupal {
            config.drupal.enabled = false;
        }
        if self.text_reports {
            config.output.text_reports = true;
        }
    }
}

// ---- config ----

/// Manage repowatch configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, repository, scanner, drupal, ai, output).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse succeeded")
    }

    #[test]
    fn scan_defaults() {
        let cli = parse(&["repowatch", "scan"]);
        assert!(cli.config.is_none());
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Commands::Scan(args) => {
                assert!(!args.no_ai);
                assert!(!args.no_cleanup);
                assert!(args.ai_provider.is_none());
                assert!(args.repos_file.is_none());
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn scan_all_flags() {
        let cli = parse(&[
            "repowatch",
            "scan",
            "--no-ai",
            "--no-cleanup",
            "--ai-provider",
            "anthropic",
            "--ai-model",
            "claude-x",
            "--ai-base-url",
            "http://localhost:9000/v1",
            "--repos-file",
            "targets.txt",
            "--output-dir",
            "out",
            "--no-drupal",
            "--text-reports",
        ]);
        let Commands::Scan(args) = cli.command else {
            panic!("expected Scan command");
        };

        let mut config = RepowatchConfig::default();
        args.apply(&mut config);
        assert!(!config.ai.enabled);
        assert!(!config.repository.cleanup);
        assert_eq!(config.ai.provider, "anthropic");
        assert_eq!(config.ai.model, "claude-x");
        assert_eq!(config.ai.base_url, "http://localhost:9000/v1");
        assert_eq!(config.general.repos_file, "targets.txt");
        assert_eq!(config.general.output_dir, "out");
        assert!(!config.drupal.enabled);
        assert!(config.output.text_reports);
    }

    #[test]
    fn unset_flags_leave_config_untouched() {
        let mut config = RepowatchConfig::default();
        config.ai.model = "from-file".to_owned();
        ScanArgs::default().apply(&mut config);
        assert!(config.ai.enabled);
        assert!(config.drupal.enabled);
        assert_eq!(config.ai.model, "from-file");
    }

    #[test]
    fn invalid_provider_rejected() {
        assert!(Cli::try_parse_from(["repowatch", "scan", "--ai-provider", "mistral"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&[
            "repowatch",
            "config",
            "show",
            "--section",
            "ai",
            "--config",
            "/etc/repowatch.toml",
            "--log-level",
            "DEBUG",
            "--output",
            "json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/repowatch.toml")));
        assert_eq!(cli.output, OutputFormat::Json);

        let mut config = RepowatchConfig::default();
        cli.apply_globals(&mut config);
        assert_eq!(config.general.log_level, "debug");

        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("ai")),
            _ => panic!("expected config show"),
        }
    }

    #[test]
    fn missing_command_fails() {
        assert!(Cli::try_parse_from(["repowatch"]).is_err());
    }

    #[test]
    fn command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "repowatch");
        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(subcommands.contains(&"scan"));
        assert!(subcommands.contains(&"config"));
    }
}
