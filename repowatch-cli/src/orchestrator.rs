//! Scan orchestration -- per-repository state machine and batch run.
//!
//! Each repository moves through
//! `pending -> cloning -> scanning -> drupal-checking -> ai-analyzing -> reporting -> done`.
//! A clone failure sends it straight to `failed` and the report records the
//! cause. Failures in later steps are recorded as step errors and the
//! remaining steps still run.
//!
//! Repositories are processed one at a time. The only filesystem resource is
//! the temporary checkout, released before the next repository starts.
//! Everything logged for a repository runs inside a `repository` span that
//! carries `repo` and `url`.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use repowatch_ai_analyzer::summary_provider;
use repowatch_core::config::RepowatchConfig;
use repowatch_core::error::RepowatchError;
use repowatch_core::pipeline::{
    DisabledAuditor, DisabledSummary, FindingScanner, ModuleAuditor, RepositoryFetcher,
    SummaryProvider,
};
use repowatch_core::types::{Checkout, ScanPhase, ScanResult, ScanTarget, SummaryReport};
use repowatch_drupal_checker::module_auditor;
use repowatch_repo_manager::RepositoryManager;
use repowatch_vuln_scanner::VulnerabilityScanner;

use crate::report::{ReportWriter, WrittenReport};

/// Outcome of one batch run.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    /// Summary report file.
    pub summary_file: PathBuf,
    /// Individual report files, in list order.
    pub report_files: Vec<PathBuf>,
    /// JSON reports that could not be written.
    pub report_failures: usize,
    /// `.txt` twins that could not be written; their JSON reports exist.
    pub text_report_failures: usize,
    pub summary: SummaryReport,
}

/// One repository after the pipeline and its report.
#[derive(Debug)]
pub struct RepositoryRun {
    pub result: ScanResult,
    /// Terminal phase: `Done`, or `Failed` when the clone failed.
    pub phase: ScanPhase,
    pub report: Result<WrittenReport, RepowatchError>,
}

/// Drives every repository in the list through the scan pipeline.
pub struct Orchestrator {
    fetcher: Box<dyn RepositoryFetcher>,
    scanner: Box<dyn FindingScanner>,
    auditor: Box<dyn ModuleAuditor>,
    summary: Box<dyn SummaryProvider>,
    reports: ReportWriter,
    cleanup: bool,
}

impl Orchestrator {
    /// Build from explicit components. Drupal checks and AI analysis start
    /// disabled; enable them with [`with_auditor`](Self::with_auditor) and
    /// [`with_summary`](Self::with_summary).
    pub fn new(
        fetcher: Box<dyn RepositoryFetcher>,
        scanner: Box<dyn FindingScanner>,
        reports: ReportWriter,
    ) -> Self {
        Self {
            fetcher,
            scanner,
            auditor: Box::new(DisabledAuditor),
            summary: Box::new(DisabledSummary),
            reports,
            cleanup: true,
        }
    }

    /// Build the production pipeline from a validated configuration.
    pub fn from_config(config: &RepowatchConfig) -> Result<Self, RepowatchError> {
        let fetcher = RepositoryManager::from_core(&config.general, &config.repository);
        let scanner = VulnerabilityScanner::from_core(&config.scanner);
        let reports = ReportWriter::from_core(&config.general, &config.output);

        Ok(Self::new(Box::new(fetcher), Box::new(scanner), reports)
            .with_auditor(module_auditor(&config.drupal)?)
            .with_summary(summary_provider(&config.ai)?)
            .with_cleanup(config.repository.cleanup))
    }

    pub fn with_auditor(mut self, auditor: Box<dyn ModuleAuditor>) -> Self {
        self.auditor = auditor;
        self
    }

    pub fn with_summary(mut self, summary: Box<dyn SummaryProvider>) -> Self {
        self.summary = summary;
        self
    }

    /// When `false`, checkouts stay on disk and reports carry `local_path`.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Scan every target and write all reports.
    ///
    /// Only a failure to prepare the output directory or to write the summary
    /// is returned as an error. Per-repository failures end up in the reports.
    pub async fn run(&self, targets: &[ScanTarget]) -> Result<RunOutcome, RepowatchError> {
        self.reports.prepare().await?;

        let mut summary = SummaryReport::new(Utc::now());
        let mut report_files = Vec::with_capacity(targets.len());
        let mut report_failures = 0;
        let mut text_report_failures = 0;

        info!(repositories = targets.len(), "scan run started");

        for (index, target) in targets.iter().enumerate() {
            let span = info_span!("repository", repo = %target.name, url = %target.url);
            let run = async {
                info!(position = index + 1, total = targets.len(), "processing repository");
                self.process(target).await
            }
            .instrument(span.clone())
            .await;

            span.in_scope(|| {
                let report_file = match run.report {
                    Ok(written) => {
                        if let Some(e) = &written.text_error {
                            warn!(error = %e, "failed to write text report");
                            text_report_failures += 1;
                        }
                        let name = written
                            .json
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned());
                        report_files.push(written.json);
                        name
                    }
                    Err(e) => {
                        error!(error = %e, "failed to write report");
                        report_failures += 1;
                        None
                    }
                };

                log_outcome(&run.result);
                summary.push(&run.result, report_file);
            });
        }

        let written = self.reports.write_summary(&summary).await?;
        if let Some(e) = &written.text_error {
            warn!(error = %e, "failed to write text summary");
            text_report_failures += 1;
        }
        info!(
            completed = summary.completed,
            failed = summary.failed,
            partial = summary.partial,
            summary = %written.json.display(),
            "scan run finished"
        );

        Ok(RunOutcome {
            summary_file: written.json,
            report_files,
            report_failures,
            text_report_failures,
            summary,
        })
    }

    /// Run the pipeline for one repository and write its report. Never
    /// fails; errors are recorded on the returned result or report.
    pub async fn process(&self, target: &ScanTarget) -> RepositoryRun {
        let mut phase = ScanPhase::Pending;
        let result = self.analyze(target, &mut phase).await;

        if phase == ScanPhase::Failed {
            let report = self.reports.write_result(&result).await;
            return RepositoryRun {
                result,
                phase,
                report,
            };
        }

        advance(&mut phase, ScanPhase::Reporting, &result);
        let report = self.reports.write_result(&result).await;
        advance(&mut phase, ScanPhase::Done, &result);
        RepositoryRun {
            result,
            phase,
            report,
        }
    }

    /// Clone, scan, Drupal check and AI summary. Leaves `phase` at
    /// `AiAnalyzing`, or `Failed` when the clone failed.
    async fn analyze(&self, target: &ScanTarget, phase: &mut ScanPhase) -> ScanResult {
        let mut result = ScanResult::start(target);

        advance(phase, ScanPhase::Cloning, &result);
        let checkout = match self.fetcher.fetch(target).await {
            Ok(checkout) => checkout,
            Err(e) => {
                warn!(error = %e, "clone failed");
                result.fail(e.to_string());
                advance(phase, ScanPhase::Failed, &result);
                return result;
            }
        };
        let repo = checkout.path().to_path_buf();

        advance(phase, ScanPhase::Scanning, &result);
        match self.scanner.scan(&repo).await {
            Ok(scan) => {
                for (tool, status) in &scan.tools {
                    if let Some(reason) = status.failure_reason() {
                        result.record_step_error(*phase, format!("{tool}: {reason}"));
                    }
                }
                result.vulnerability_scan = Some(scan);
            }
            Err(e) => {
                warn!(error = %e, "vulnerability scan failed");
                result.record_step_error(*phase, e.to_string());
            }
        }

        advance(phase, ScanPhase::DrupalChecking, &result);
        match self.auditor.audit(&repo).await {
            Ok(check) => result.drupal_check = check,
            Err(e) => {
                warn!(error = %e, "drupal check failed");
                result.record_step_error(*phase, e.to_string());
            }
        }

        advance(phase, ScanPhase::AiAnalyzing, &result);
        let analysis = self.summary.analyze(&result).await;
        match analysis {
            Ok(analysis) => result.ai_analysis = analysis,
            Err(e) => result.record_step_error(*phase, e.to_string()),
        }

        self.finish_checkout(checkout, &mut result);
        result
    }

    fn finish_checkout(&self, checkout: Checkout, result: &mut ScanResult) {
        if self.cleanup {
            let path = checkout.path().display().to_string();
            if let Err(e) = checkout.release() {
                warn!(path = %path, error = %e, "failed to remove checkout");
            }
        } else {
            let kept = checkout.keep();
            info!(path = %kept.display(), "checkout kept");
            result.local_path = Some(kept.display().to_string());
        }
    }
}

fn advance(phase: &mut ScanPhase, next: ScanPhase, result: &ScanResult) {
    debug!(from = %phase, to = %next, step_errors = result.step_errors.len(), "phase transition");
    *phase = next;
}

fn log_outcome(result: &ScanResult) {
    match (&result.error, result.is_partial()) {
        (Some(cause), _) => warn!(error = %cause, "repository failed"),
        (None, true) => warn!(
            step_errors = result.step_errors.len(),
            "repository completed with step errors"
        ),
        (None, false) => info!("repository completed"),
    }
}
