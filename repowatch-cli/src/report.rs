//! Report files -- one JSON document per repository plus a run summary.
//!
//! File names are `{repo_name}_{YYYYMMDD_HHMMSS}.json` and
//! `summary_report_{YYYYMMDD_HHMMSS}.json`. A name that already exists gets a
//! `_2`, `_3`, ... suffix, so two repositories with the same name scanned in
//! the same second never overwrite each other. With text reports enabled each
//! JSON file gets a `.txt` twin with the same stem.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use repowatch_core::config::{GeneralConfig, OutputConfig};
use repowatch_core::error::RepowatchError;
use repowatch_core::types::{ScanResult, SummaryReport, VulnerabilityFinding};

const SUMMARY_PREFIX: &str = "summary_report";
const RULE: &str = "--------------------------------------------------------------------------------";
const DOUBLE_RULE: &str =
    "================================================================================";
/// Upper bound on collision suffixes before giving up.
const MAX_SUFFIX: u32 = 1000;

/// Writes reports into the output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    text_reports: bool,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, text_reports: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            text_reports,
        }
    }

    pub fn from_core(general: &GeneralConfig, output: &OutputConfig) -> Self {
        Self::new(&general.output_dir, output.text_reports)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory.
    pub async fn prepare(&self) -> Result<(), RepowatchError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    /// Write the report of one repository.
    ///
    /// Fails only when the JSON file cannot be written. A failed `.txt` twin
    /// is returned in [`WrittenReport::text_error`].
    pub async fn write_result(&self, result: &ScanResult) -> Result<WrittenReport, RepowatchError> {
        let json = serde_json::to_vec_pretty(result)?;
        let stem = format!("{}_{}", result.repo_name, timestamp(result.scan_time));
        let path = self.create_unique(&stem, &json).await?;
        debug!(path = %path.display(), "report written");

        let text_error = if self.text_reports {
            write_text_twin(&path, render_result_text(result)).await.err()
        } else {
            None
        };
        Ok(WrittenReport {
            json: path,
            text_error,
        })
    }

    /// Write the run summary. Same contract as [`write_result`](Self::write_result).
    pub async fn write_summary(
        &self,
        summary: &SummaryReport,
    ) -> Result<WrittenReport, RepowatchError> {
        let json = serde_json::to_vec_pretty(summary)?;
        let stem = format!("{SUMMARY_PREFIX}_{}", timestamp(summary.scan_date));
        let path = self.create_unique(&stem, &json).await?;
        debug!(path = %path.display(), "summary written");

        let text_error = if self.text_reports {
            write_text_twin(&path, render_summary_text(summary)).await.err()
        } else {
            None
        };
        Ok(WrittenReport {
            json: path,
            text_error,
        })
    }

    /// Create `{stem}.json` (or the first free `{stem}_N.json`) and write `bytes`.
    async fn create_unique(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf, RepowatchError> {
        for n in 1..=MAX_SUFFIX {
            let name = match n {
                1 => format!("{stem}.json"),
                n => format!("{stem}_{n}.json"),
            };
            let path = self.output_dir.join(name);
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match file {
                Ok(file) => {
                    fill_or_remove(file, &path, bytes).await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(RepowatchError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free report file name for {stem}"),
        )))
    }
}

/// Files produced for one report.
#[derive(Debug)]
pub struct WrittenReport {
    /// The JSON report.
    pub json: PathBuf,
    /// Why the `.txt` twin is missing, when text reports are enabled.
    pub text_error: Option<RepowatchError>,
}

/// Write the `.txt` twin next to `json_path`.
async fn write_text_twin(json_path: &Path, text: String) -> Result<PathBuf, RepowatchError> {
    let path = json_path.with_extension("txt");
    let file = tokio::fs::File::create(&path).await?;
    fill_or_remove(file, &path, text.as_bytes()).await?;
    Ok(path)
}

/// Write `bytes` to a freshly created file, removing it again if the write
/// does not complete.
async fn fill_or_remove<W>(mut file: W, path: &Path, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written: std::io::Result<()> = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(remove) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %remove, "failed to remove partial report");
        }
        return Err(e);
    }
    Ok(())
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

fn write_findings(out: &mut String, title: &str, findings: &[VulnerabilityFinding], empty: &str) {
    if findings.is_empty() {
        let _ = writeln!(out, "{empty}\n");
        return;
    }
    let _ = writeln!(out, "{title} ({} found)\n", findings.len());
    for finding in findings {
        let _ = writeln!(out, "  * {finding}");
    }
    out.push('\n');
}

/// Human-readable form of one repository report.
pub fn render_result_text(result: &ScanResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{DOUBLE_RULE}");
    let _ = writeln!(out, "SECURITY SCAN REPORT: {}", result.repo_name);
    let _ = writeln!(out, "{DOUBLE_RULE}\n");
    let _ = writeln!(out, "Repository URL: {}", result.repo_url);
    let _ = writeln!(out, "Scan ID: {}", result.scan_id);
    let _ = writeln!(out, "Scan Time: {}", result.scan_time.to_rfc3339());
    let _ = writeln!(out, "Status: {}", result.status.to_string().to_uppercase());
    if let Some(error) = &result.error {
        let _ = writeln!(out, "Error: {error}");
    }
    if let Some(path) = &result.local_path {
        let _ = writeln!(out, "Local Path: {path}");
    }
    let _ = writeln!(out, "\n{RULE}\n");

    if !result.step_errors.is_empty() {
        let _ = writeln!(out, "STEP ERRORS\n");
        for step in &result.step_errors {
            let _ = writeln!(out, "  * [{}] {}", step.step, step.message);
        }
        let _ = writeln!(out, "\n{RULE}\n");
    }

    if let Some(scan) = &result.vulnerability_scan {
        let _ = writeln!(out, "VULNERABILITY SCAN RESULTS");
        let _ = writeln!(out, "{RULE}\n");
        for (tool, status) in &scan.tools {
            let _ = writeln!(out, "  {tool}: {status}");
        }
        out.push('\n');
        write_findings(
            &mut out,
            "DEPENDENCY VULNERABILITIES",
            &scan.dependency_vulnerabilities,
            "No dependency vulnerabilities found",
        );
        write_findings(
            &mut out,
            "SECURITY CODE ISSUES",
            &scan.code_issues,
            "No security code issues found",
        );
        write_findings(
            &mut out,
            "COMMON ISSUES",
            &scan.common_issues,
            "No common issues found",
        );
        let _ = writeln!(out, "{RULE}\n");
    }

    if let Some(drupal) = result.drupal_check.as_ref().filter(|d| d.is_drupal) {
        let _ = writeln!(out, "DRUPAL PROJECT ANALYSIS");
        let _ = writeln!(out, "{RULE}\n");
        let _ = writeln!(
            out,
            "Drupal Version: {}",
            drupal.drupal_version.as_deref().unwrap_or("Unknown")
        );
        let _ = writeln!(out, "Total Contrib Modules: {}\n", drupal.module_count());

        for module in drupal.modules.iter().flatten() {
            let _ = writeln!(out, "  {}", module.module);
            let _ = writeln!(out, "     Current Version: {}", module.current_version);
            let _ = writeln!(out, "     Latest Version: {}", module.latest_version);
            let _ = writeln!(out, "     Update: {}", module.severity);
            if let Some(url) = &module.repository_url {
                let _ = writeln!(out, "     Repository: {url}");
            }
            out.push('\n');
        }

        let outdated = drupal.outdated();
        if outdated.is_empty() {
            let _ = writeln!(out, "All modules are up to date\n");
        } else {
            let _ = writeln!(out, "OUTDATED MODULES ({} need updates):", outdated.len());
            for module in outdated {
                let _ = writeln!(
                    out,
                    "  {} {} -> {} [{}]",
                    module.module,
                    module.current_version,
                    module.latest_version,
                    module.severity.to_string().to_uppercase()
                );
            }
            out.push('\n');
        }
        let _ = writeln!(out, "{RULE}\n");
    }

    if let Some(analysis) = &result.ai_analysis {
        let _ = writeln!(out, "AI-POWERED SECURITY ANALYSIS");
        let _ = writeln!(out, "{RULE}\n");
        let _ = writeln!(out, "{}\n", analysis.trim_end());
        let _ = writeln!(out, "{RULE}\n");
    }

    let _ = writeln!(out, "End of Report");
    let _ = writeln!(out, "{DOUBLE_RULE}");
    out
}

/// Human-readable form of the run summary.
pub fn render_summary_text(summary: &SummaryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{DOUBLE_RULE}");
    let _ = writeln!(out, "SECURITY SCAN SUMMARY REPORT");
    let _ = writeln!(out, "{DOUBLE_RULE}\n");
    let _ = writeln!(out, "Scan Date: {}", summary.scan_date.to_rfc3339());
    let _ = writeln!(out, "Total Repositories: {}", summary.total_repositories);
    let _ = writeln!(out, "Completed Scans: {}", summary.completed);
    let _ = writeln!(out, "  with step errors: {}", summary.partial);
    let _ = writeln!(out, "Failed Scans: {}", summary.failed);
    let _ = writeln!(out, "\n{RULE}");

    for row in &summary.repositories {
        let _ = writeln!(out, "\nREPOSITORY: {}", row.repo_name);
        let _ = writeln!(out, "   URL: {}", row.repo_url);
        let _ = writeln!(out, "   Status: {}", row.status.to_string().to_uppercase());
        if let Some(file) = &row.report_file {
            let _ = writeln!(out, "   Report: {file}");
        }
        if let Some(error) = &row.error {
            let _ = writeln!(out, "   Error: {error}");
            continue;
        }
        if row.step_errors > 0 {
            let _ = writeln!(out, "   Step Errors: {}", row.step_errors);
        }
        let _ = writeln!(out, "   Dependency Vulnerabilities: {}", row.dependency_vulnerabilities);
        let _ = writeln!(out, "   Security Code Issues: {}", row.code_issues);
        let _ = writeln!(out, "   Common Issues: {}", row.common_issues);
        if let Some(modules) = row.drupal_modules {
            let _ = writeln!(
                out,
                "   Drupal Version: {}",
                row.drupal_version.as_deref().unwrap_or("Unknown")
            );
            let _ = writeln!(out, "   Drupal Modules: {modules}");
            let _ = writeln!(out, "   Outdated Modules: {}", row.outdated_modules);
        }
    }

    if !summary.notable_issues.is_empty() {
        let _ = writeln!(out, "\n{RULE}\n");
        let _ = writeln!(out, "NOTABLE ISSUES\n");
        for issue in &summary.notable_issues {
            let _ = writeln!(out, "  * {issue}");
        }
    }

    let _ = writeln!(out, "\n{DOUBLE_RULE}");
    let _ = writeln!(out, "End of Summary Report");
    let _ = writeln!(out, "{DOUBLE_RULE}");
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use repowatch_core::types::{
        DrupalCheck, DrupalModuleStatus, ScanPhase, ScanTarget, ToolStatus, UpdateSeverity,
        VulnerabilityScan,
    };

    use super::*;

    fn fixed_result(url: &str) -> ScanResult {
        let mut result = ScanResult::start(&ScanTarget::from_url(url));
        result.scan_time = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        result
    }

    #[tokio::test]
    async fn result_file_name_and_collision_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), false);

        let result = fixed_result("https://example.com/acme/site.git");
        let first = writer.write_result(&result).await.unwrap().json;
        let second = writer.write_result(&result).await.unwrap().json;

        assert_eq!(first.file_name().unwrap(), "site_20240309_140507.json");
        assert_eq!(second.file_name().unwrap(), "site_20240309_140507_2.json");

        let parsed: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&first).unwrap()).unwrap();
        assert_eq!(parsed["repo_name"], "site");
        assert_eq!(parsed["status"], "completed");
        assert_eq!(parsed["scan_time"], "2024-03-09T14:05:07Z");
        assert!(!first.with_extension("txt").exists());
    }

    #[tokio::test]
    async fn text_twin_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), true);

        let mut result = fixed_result("https://example.com/acme/broken.git");
        result.fail("repository not found: https://example.com/acme/broken.git");
        let written = writer.write_result(&result).await.unwrap();
        assert!(written.text_error.is_none());
        let path = written.json;

        let text = std::fs::read_to_string(path.with_extension("txt")).unwrap();
        assert!(text.contains("SECURITY SCAN REPORT: broken"));
        assert!(text.contains("Status: FAILED"));
        assert!(text.contains("Error: repository not found"));
    }

    #[tokio::test]
    async fn summary_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), true);
        let summary = SummaryReport::new(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap());

        let path = writer.write_summary(&summary).await.unwrap().json;
        assert_eq!(path.file_name().unwrap(), "summary_report_20240309_140507.json");
        assert!(path.with_extension("txt").is_file());
    }

    #[tokio::test]
    async fn text_twin_failure_keeps_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), true);
        // a directory where the twin should go makes the text write fail
        std::fs::create_dir(dir.path().join("site_20240309_140507.txt")).unwrap();

        let result = fixed_result("https://example.com/acme/site.git");
        let written = writer.write_result(&result).await.unwrap();

        assert_eq!(written.json.file_name().unwrap(), "site_20240309_140507.json");
        assert!(written.json.is_file());
        assert!(matches!(written.text_error, Some(RepowatchError::Io(_))));
    }

    struct BrokenSink;

    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::Error::other("disk full")))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn interrupted_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site_20240309_140507.json");
        std::fs::write(&path, b"{\"scan_id\"").unwrap();

        let err = fill_or_remove(BrokenSink, &path, b"{}").await.unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_output_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("absent"), false);
        let err = writer
            .write_summary(&SummaryReport::new(Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepowatchError::Io(_)));
    }

    #[test]
    fn result_text_sections() {
        let mut result = fixed_result("https://example.com/acme/site.git");
        let mut scan = VulnerabilityScan::default();
        scan.set_tool_status("bandit", ToolStatus::Skipped {
            reason: "bandit unavailable: not installed".to_owned(),
        });
        result.vulnerability_scan = Some(scan);
        result.drupal_check = Some(DrupalCheck::drupal(
            Some("^10.2".to_owned()),
            vec![DrupalModuleStatus {
                module: "drupal/token".to_owned(),
                current_version: "1.0.0".to_owned(),
                latest_version: "1.2.0".to_owned(),
                severity: UpdateSeverity::Minor,
                repository_url: Some("https://www.drupal.org/project/token".to_owned()),
            }],
        ));
        result.record_step_error(ScanPhase::AiAnalyzing, "quota exceeded");

        let text = render_result_text(&result);
        assert!(text.contains("bandit: skipped (bandit unavailable: not installed)"));
        assert!(text.contains("No dependency vulnerabilities found"));
        assert!(text.contains("Drupal Version: ^10.2"));
        assert!(text.contains("drupal/token 1.0.0 -> 1.2.0 [MINOR]"));
        assert!(text.contains("[ai-analyzing] quota exceeded"));
        assert!(!text.contains("AI-POWERED"));
        assert!(text.trim_end().ends_with(DOUBLE_RULE));
    }

    #[test]
    fn summary_text_lists_failures() {
        let mut summary = SummaryReport::new(Utc::now());
        let ok = fixed_result("https://example.com/acme/ok.git");
        let mut failed = fixed_result("https://example.com/acme/gone.git");
        failed.fail("clone timed out");
        summary.push(&ok, Some("ok_20240309_140507.json".to_owned()));
        summary.push(&failed, Some("gone_20240309_140507.json".to_owned()));

        let text = render_summary_text(&summary);
        assert!(text.contains("Total Repositories: 2"));
        assert!(text.contains("Failed Scans: 1"));
        assert!(text.contains("REPOSITORY: gone"));
        assert!(text.contains("Error: clone timed out"));
        assert!(text.contains("NOTABLE ISSUES"));
    }
}
