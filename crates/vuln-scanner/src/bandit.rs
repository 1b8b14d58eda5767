//! bandit 출력 파싱: Python 정적 분석
//!
//! `bandit -r <repo> -f json -q` 출력의 `results` 배열을 사용합니다.

use std::path::Path;

use serde::Deserialize;

use repowatch_core::error::ScanToolError;
use repowatch_core::types::{FindingKind, Severity, VulnerabilityFinding};

/// 도구 이름
pub const BANDIT_TOOL: &str = "bandit";

#[derive(Debug, Deserialize)]
struct BanditReport {
    #[serde(default)]
    results: Vec<BanditIssue>,
}

#[derive(Debug, Deserialize)]
struct BanditIssue {
    filename: String,
    #[serde(default)]
    line_number: Option<u64>,
    #[serde(default)]
    issue_severity: String,
    #[serde(default)]
    issue_text: String,
    #[serde(default)]
    test_id: String,
    #[serde(default)]
    test_name: String,
}

/// bandit JSON 출력을 발견 항목 목록으로 변환합니다.
///
/// 파일 경로는 `repo_root` 기준 상대 경로로 바꿉니다.
pub fn parse_bandit_output(
    payload: &str,
    repo_root: &Path,
) -> Result<Vec<VulnerabilityFinding>, ScanToolError> {
    let report: BanditReport =
        serde_json::from_str(payload).map_err(|e| ScanToolError::OutputParse {
            tool: BANDIT_TOOL.to_owned(),
            reason: e.to_string(),
        })?;

    Ok(report
        .results
        .into_iter()
        .map(|issue| {
            let file = relative_path(&issue.filename, repo_root);
            let location = match issue.line_number {
                Some(line) => format!("{file}:{line}"),
                None => file,
            };
            let description = if issue.test_name.is_empty() {
                issue.issue_text
            } else {
                format!("{} ({})", issue.issue_text, issue.test_name)
            };

            VulnerabilityFinding {
                kind: FindingKind::Code,
                severity: Severity::from_str_loose(&issue.issue_severity).unwrap_or(Severity::Low),
                tool: BANDIT_TOOL.to_owned(),
                identifier: issue.test_id,
                description,
                location,
            }
        })
        .collect())
}

fn relative_path(filename: &str, repo_root: &Path) -> String {
    let path = Path::new(filename);
    let rel = path.strip_prefix(repo_root).unwrap_or(path);
    let rel = rel.strip_prefix(".").unwrap_or(rel);
    rel.display().to_string()
}
