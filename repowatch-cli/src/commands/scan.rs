//! `repowatch scan` command handler

use std::io::Write;
use std::path::Path;

use tracing::info;

use repowatch_core::config::RepowatchConfig;
use repowatch_core::types::ScanStatus;
use repowatch_repo_manager::read_targets;

use crate::cli::{Cli, ScanArgs};
use crate::commands::{config_error, load_config};
use crate::error::CliError;
use crate::logging::init_tracing;
use crate::orchestrator::{Orchestrator, RunOutcome};
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
///
/// Individual repository failures do not fail the command; they are recorded
/// in the reports and the summary.
pub async fn execute(args: &ScanArgs, cli: &Cli, writer: &OutputWriter) -> Result<(), CliError> {
    let config = effective_config(args, cli, cli.config.as_deref()).await?;

    if let Err(e) = init_tracing(&config.general) {
        eprintln!("failed to initialize logging: {e}");
    }

    let targets = read_targets(&config.general.repos_file).await?;
    info!(
        repos_file = %config.general.repos_file,
        repositories = targets.len(),
        "repository list loaded"
    );

    let orchestrator = Orchestrator::from_config(&config).map_err(config_error)?;
    let outcome = orchestrator.run(&targets).await?;

    writer.render(&outcome)?;

    Ok(())
}

/// Configuration after file, env and flag overrides, validated once so that a
/// flag can correct an invalid file or env value.
pub async fn effective_config(
    args: &ScanArgs,
    cli: &Cli,
    explicit: Option<&Path>,
) -> Result<RepowatchConfig, CliError> {
    let mut config = load_config(explicit).await?;
    args.apply(&mut config);
    cli.apply_globals(&mut config);
    config.validate().map_err(config_error)?;
    Ok(config)
}

impl Render for RunOutcome {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let summary = &self.summary;
        writeln!(w, "{}", "Scan Results".bold())?;
        writeln!(
            w,
            "  Repositories: {}  completed: {}  failed: {}  with step errors: {}",
            summary.total_repositories,
            summary.completed.to_string().green(),
            summary.failed.to_string().red(),
            summary.partial.to_string().yellow(),
        )?;
        writeln!(
            w,
            "  Findings: {} dependency vulnerabilities, {} code issues, {} common issues",
            summary.totals.dependency_vulnerabilities,
            summary.totals.code_issues,
            summary.totals.common_issues,
        )?;
        if summary.totals.drupal_modules > 0 {
            writeln!(
                w,
                "  Drupal: {} modules, {} outdated",
                summary.totals.drupal_modules, summary.totals.outdated_modules,
            )?;
        }
        writeln!(w)?;

        for row in &summary.repositories {
            match row.status {
                ScanStatus::Failed => {
                    let cause = row.error.as_deref().unwrap_or("unknown error");
                    writeln!(w, "  {} {} ({})", "FAILED".red().bold(), row.repo_name, cause)?;
                }
                ScanStatus::Completed if row.step_errors > 0 => {
                    writeln!(
                        w,
                        "  {} {} ({} step errors)",
                        "PARTIAL".yellow().bold(),
                        row.repo_name,
                        row.step_errors,
                    )?;
                }
                ScanStatus::Completed => {
                    writeln!(w, "  {} {}", "OK".green().bold(), row.repo_name)?;
                }
            }
        }

        if self.report_failures > 0 {
            writeln!(
                w,
                "\n  {} {} report(s) could not be written",
                "WARNING".yellow().bold(),
                self.report_failures,
            )?;
        }
        if self.text_report_failures > 0 {
            writeln!(
                w,
                "\n  {} {} text report(s) could not be written; the JSON reports exist",
                "WARNING".yellow().bold(),
                self.text_report_failures,
            )?;
        }

        writeln!(w)?;
        writeln!(w, "Summary report: {}", self.summary_file.display())?;

        Ok(())
    }
}
