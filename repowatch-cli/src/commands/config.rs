//! `repowatch config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use repowatch_core::config::RepowatchConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::commands::{config_error, config_source, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
pub const SECTIONS: [&str; 6] = ["general", "repository", "scanner", "drupal", "ai", "output"];

/// Execute the `config` command.
pub async fn execute(
    args: &ConfigArgs,
    explicit: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match &args.action {
        ConfigAction::Validate => execute_validate(explicit, writer).await,
        ConfigAction::Show { section } => {
            execute_show(explicit, section.as_deref(), writer).await
        }
    }
}

/// Load and validate the configuration, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` when the configuration is invalid, after the
/// report has been rendered.
async fn execute_validate(explicit: Option<&Path>, writer: &OutputWriter) -> Result<(), CliError> {
    let (path, _) = config_source(explicit);
    info!(path = %path.display(), "validating configuration");

    let checked = match load_config(explicit).await {
        Ok(config) => config.validate().map_err(config_error),
        Err(e) => Err(e),
    };
    let report = match checked {
        Ok(()) => ConfigValidationReport::valid(path.display().to_string()),
        Err(e) => ConfigValidationReport::invalid(path.display().to_string(), e.to_string()),
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Show the effective configuration (file + env overrides + defaults) with
/// API keys redacted. Invalid values are shown as loaded; `config validate`
/// reports them.
async fn execute_show(
    explicit: Option<&Path>,
    section: Option<&str>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (path, _) = config_source(explicit);
    info!(path = %path.display(), "loading configuration");

    let config = load_config(explicit).await?.redacted();
    let report = build_config_report(path.display().to_string(), &config, section)?;

    writer.render(&report)?;

    Ok(())
}

/// Serialize the whole configuration or a single section, as TOML for text
/// output and as a structured value for JSON output.
pub fn build_config_report(
    source: String,
    config: &RepowatchConfig,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    let (config_toml, value) = match section {
        None => render_section(config),
        Some("general") => render_section(&config.general),
        Some("repository") => render_section(&config.repository),
        Some("scanner") => render_section(&config.scanner),
        Some("drupal") => render_section(&config.drupal),
        Some("ai") => render_section(&config.ai),
        Some("output") => render_section(&config.output),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    }?;

    Ok(ConfigReport {
        source,
        section: section.map(str::to_owned),
        config: value,
        config_toml,
    })
}

fn render_section<T: Serialize>(value: &T) -> Result<(String, serde_json::Value), CliError> {
    let toml = toml::to_string_pretty(value)
        .unwrap_or_else(|e| format!("(serialization error: {})", e));
    Ok((toml, serde_json::to_value(value)?))
}

/// Configuration display report.
///
/// `config_toml` is the text rendering of `config` and is skipped in JSON.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid.
    pub errors: Vec<String>,
}

impl ConfigValidationReport {
    fn valid(source: String) -> Self {
        Self {
            source,
            valid: true,
            errors: Vec::new(),
        }
    }

    fn invalid(source: String, error: String) -> Self {
        Self {
            source,
            valid: false,
            errors: vec![error],
        }
    }
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
