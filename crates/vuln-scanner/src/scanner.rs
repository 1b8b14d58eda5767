//! 취약점 스캐너: 저장소 하나에 대한 전체 스캔 흐름
//!
//! ```text
//! inventory (walk) --+--> safety (requirements*.txt 마다) --> dependency findings
//!                    +--> bandit (Python 소스가 있을 때) --> code findings
//!                    +--> 자격증명 파일 ---------------------> common issues
//! ```
//!
//! 도구가 없으면 `skipped`, 대상이 없으면 `not_applicable`,
//! 실행/파싱에 실패하면 `failed`로 기록하고 나머지 도구는 계속 실행합니다.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use repowatch_core::config::ScannerConfig;
use repowatch_core::error::{RepowatchError, ScanToolError};
use repowatch_core::pipeline::{BoxFuture, FindingScanner};
use repowatch_core::types::{ToolStatus, VulnerabilityFinding, VulnerabilityScan};

use crate::bandit::{BANDIT_TOOL, parse_bandit_output};
use crate::discovery::{RepoInventory, inventory};
use crate::misconfig::CONFIG_AUDIT_TOOL;
use crate::runner::{json_payload, run_tool};
use crate::safety::{SAFETY_TOOL, parse_safety_output};

/// 취약점 스캐너
#[derive(Debug, Clone)]
pub struct VulnerabilityScanner {
    safety_bin: String,
    bandit_bin: String,
    tool_timeout: Duration,
    max_depth: usize,
}

impl Default for VulnerabilityScanner {
    fn default() -> Self {
        Self::from_core(&ScannerConfig::default())
    }
}

impl VulnerabilityScanner {
    /// core 설정에서 생성합니다.
    pub fn from_core(config: &ScannerConfig) -> Self {
        Self {
            safety_bin: config.safety_bin.clone(),
            bandit_bin: config.bandit_bin.clone(),
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
            max_depth: config.max_depth,
        }
    }

    /// 저장소를 스캔합니다.
    ///
    /// 도구 단위 실패는 결과의 `tools` 상태로 표현되고, 에러는 트리 탐색
    /// 자체가 불가능할 때만 반환됩니다.
    pub async fn scan_repository(&self, repo: &Path) -> Result<VulnerabilityScan, RepowatchError> {
        if !tokio::fs::try_exists(repo).await.unwrap_or(false) {
            return Err(RepowatchError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("repository path does not exist: {}", repo.display()),
            )));
        }

        let inv = {
            let root = repo.to_path_buf();
            let max_depth = self.max_depth;
            tokio::task::spawn_blocking(move || inventory(&root, max_depth))
                .await
                .map_err(|e| RepowatchError::Io(std::io::Error::other(e.to_string())))?
        };

        debug!(
            manifests = inv.requirement_files.len(),
            has_python = inv.has_python,
            credential_files = inv.credential_files.len(),
            "repository inventory complete"
        );

        let mut scan = VulnerabilityScan::default();

        let (status, findings) = self.run_safety(repo, &inv).await;
        scan.set_tool_status(SAFETY_TOOL, status);
        findings.into_iter().for_each(|f| scan.push(f));

        let (status, findings) = self.run_bandit(repo, &inv).await;
        scan.set_tool_status(BANDIT_TOOL, status);
        findings.into_iter().for_each(|f| scan.push(f));

        for found in &inv.credential_files {
            scan.push(found.to_finding());
        }
        scan.set_tool_status(CONFIG_AUDIT_TOOL, ToolStatus::Ran);

        info!(
            dependency = scan.dependency_vulnerabilities.len(),
            code = scan.code_issues.len(),
            common = scan.common_issues.len(),
            "vulnerability scan complete"
        );
        Ok(scan)
    }

    async fn run_safety(
        &self,
        repo: &Path,
        inv: &RepoInventory,
    ) -> (ToolStatus, Vec<VulnerabilityFinding>) {
        if inv.requirement_files.is_empty() {
            return (ToolStatus::NotApplicable, Vec::new());
        }

        let mut findings = Vec::new();
        let mut seen = HashSet::new();
        let mut failure: Option<ScanToolError> = None;

        for manifest in &inv.requirement_files {
            match self.safety_check(repo, manifest).await {
                Ok(batch) => {
                    for f in batch {
                        if seen.insert((f.identifier.clone(), f.location.clone())) {
                            findings.push(f);
                        }
                    }
                }
                Err(e @ ScanToolError::Unavailable { .. }) => {
                    warn!(error = %e, "safety unavailable, skipping dependency check");
                    return (ToolStatus::Skipped { reason: e.to_string() }, Vec::new());
                }
                Err(e) => {
                    warn!(manifest = %manifest.display(), error = %e, "safety check failed");
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => (ToolStatus::Failed { reason: e.to_string() }, findings),
            None => (ToolStatus::Ran, findings),
        }
    }

    async fn safety_check(
        &self,
        repo: &Path,
        manifest: &Path,
    ) -> Result<Vec<VulnerabilityFinding>, ScanToolError> {
        let args: [&OsStr; 4] = [
            OsStr::new("check"),
            OsStr::new("--json"),
            OsStr::new("-r"),
            manifest.as_os_str(),
        ];
        let output = run_tool(SAFETY_TOOL, &self.safety_bin, &args, repo, self.tool_timeout).await?;

        // 취약점이 있으면 0이 아닌 코드로 끝나므로, 파싱 가능한 출력이 있으면 성공으로 봅니다.
        match json_payload(&output.stdout) {
            Some(payload) => parse_safety_output(payload),
            None if output.success() => Ok(Vec::new()),
            None => Err(ScanToolError::ExecutionFailed {
                tool: SAFETY_TOOL.to_owned(),
                reason: failure_reason(output.code, &output.stderr),
            }),
        }
    }

    async fn run_bandit(
        &self,
        repo: &Path,
        inv: &RepoInventory,
    ) -> (ToolStatus, Vec<VulnerabilityFinding>) {
        if !inv.has_python {
            return (ToolStatus::NotApplicable, Vec::new());
        }

        // cwd가 저장소 루트이므로 `.`을 넘겨 상대 경로 출력을 받습니다.
        let args: [&OsStr; 5] = [
            OsStr::new("-r"),
            OsStr::new("."),
            OsStr::new("-f"),
            OsStr::new("json"),
            OsStr::new("-q"),
        ];
        let result = match run_tool(BANDIT_TOOL, &self.bandit_bin, &args, repo, self.tool_timeout)
            .await
        {
            Ok(output) => match json_payload(&output.stdout) {
                Some(payload) => parse_bandit_output(payload, repo),
                None => Err(ScanToolError::ExecutionFailed {
                    tool: BANDIT_TOOL.to_owned(),
                    reason: failure_reason(output.code, &output.stderr),
                }),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(findings) => (ToolStatus::Ran, findings),
            Err(e @ ScanToolError::Unavailable { .. }) => {
                warn!(error = %e, "bandit unavailable, skipping static analysis");
                (ToolStatus::Skipped { reason: e.to_string() }, Vec::new())
            }
            Err(e) => {
                warn!(error = %e, "bandit failed");
                (ToolStatus::Failed { reason: e.to_string() }, Vec::new())
            }
        }
    }
}

impl FindingScanner for VulnerabilityScanner {
    fn scan<'a>(&'a self, repo: &'a Path) -> BoxFuture<'a, Result<VulnerabilityScan, RepowatchError>> {
        Box::pin(self.scan_repository(repo))
    }
}

fn failure_reason(code: Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    let last_line = stderr.lines().last().unwrap_or_default();
    match code {
        Some(code) if last_line.is_empty() => format!("exited with code {code}"),
        Some(code) => format!("exited with code {code}: {last_line}"),
        None => "terminated by signal".to_owned(),
    }
}
