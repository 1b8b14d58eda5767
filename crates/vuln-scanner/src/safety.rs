//! safety 출력 파싱: Python 의존성 취약점
//!
//! `safety check --json -r <manifest>`의 두 가지 출력 형식을 지원합니다.
//!
//! ```text
//! legacy : [[package, affected_spec, installed_version, advisory, id, ...], ...]
//! object : {"vulnerabilities": [{"package_name": .., "analyzed_version": .., ...}], ...}
//! ```

use serde::Deserialize;
use serde::de::IgnoredAny;

use repowatch_core::error::ScanToolError;
use repowatch_core::types::{FindingKind, Severity, VulnerabilityFinding};

/// 도구 이름
pub const SAFETY_TOOL: &str = "safety";

/// safety 데이터에 심각도가 없을 때 쓰는 값
const DEFAULT_SEVERITY: Severity = Severity::Medium;

/// safety 출력 (파싱용). 버전에 따라 최상위 형태가 다릅니다.
#[derive(Deserialize)]
#[serde(untagged)]
enum SafetyOutput {
    Legacy(Vec<Vec<LegacyField>>),
    Report(SafetyReport),
}

/// legacy 행의 칸. 문자열이 아닌 값(null, 점수 객체)은 빈 칸으로 봅니다.
#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyField {
    Text(String),
    Other(IgnoredAny),
}

impl LegacyField {
    fn as_str(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Other(_) => "",
        }
    }
}

#[derive(Deserialize)]
struct SafetyReport {
    /// 취약점이 없으면 키 자체가 없는 버전이 있음
    #[serde(default)]
    vulnerabilities: Option<Vec<SafetyVulnerability>>,
}

#[derive(Deserialize)]
struct SafetyVulnerability {
    #[serde(default)]
    package_name: Option<String>,
    #[serde(default)]
    analyzed_version: Option<String>,
    #[serde(default)]
    vulnerability_id: Option<String>,
    #[serde(default, rename = "CVE")]
    cve: Option<String>,
    #[serde(default)]
    advisory: Option<String>,
    #[serde(default)]
    vulnerable_spec: Option<VulnerableSpec>,
    #[serde(default)]
    severity: Option<SafetySeverity>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VulnerableSpec {
    One(String),
    Many(Vec<String>),
}

impl VulnerableSpec {
    fn joined(&self) -> String {
        match self {
            Self::One(spec) => spec.clone(),
            Self::Many(specs) => specs.join(","),
        }
    }
}

/// `"high"` 같은 문자열이거나 `{"cvssv3": {"base_severity": "HIGH"}}` 형태
#[derive(Deserialize)]
#[serde(untagged)]
enum SafetySeverity {
    Label(String),
    Scored {
        #[serde(default)]
        cvssv3: Option<CvssScore>,
        #[serde(default)]
        cvssv2: Option<CvssScore>,
    },
    Other(IgnoredAny),
}

#[derive(Deserialize)]
struct CvssScore {
    #[serde(default)]
    base_severity: Option<String>,
}

impl SafetySeverity {
    fn level(&self) -> Option<Severity> {
        match self {
            Self::Label(label) => Severity::from_str_loose(label),
            Self::Scored { cvssv3, cvssv2 } => [cvssv3, cvssv2]
                .into_iter()
                .flatten()
                .find_map(|score| score.base_severity.as_deref().and_then(Severity::from_str_loose)),
            Self::Other(_) => None,
        }
    }
}

/// safety JSON 출력을 발견 항목 목록으로 변환합니다.
pub fn parse_safety_output(payload: &str) -> Result<Vec<VulnerabilityFinding>, ScanToolError> {
    let output: SafetyOutput = serde_json::from_str(payload).map_err(|e| {
        parse_error(format!("expected a safety JSON array or report object: {e}"))
    })?;

    match output {
        SafetyOutput::Legacy(rows) => rows.iter().map(|row| legacy_finding(row)).collect(),
        SafetyOutput::Report(report) => report
            .vulnerabilities
            .unwrap_or_default()
            .iter()
            .map(report_finding)
            .collect(),
    }
}

/// `[package, affected_spec, installed_version, advisory, id, ...]`
fn legacy_finding(row: &[LegacyField]) -> Result<VulnerabilityFinding, ScanToolError> {
    let field = |i: usize| row.get(i).map(LegacyField::as_str).unwrap_or_default();

    let package = field(0);
    if package.is_empty() {
        return Err(parse_error("legacy row without package name".to_owned()));
    }

    Ok(finding(
        package,
        field(2),
        field(4),
        field(3),
        field(1),
        DEFAULT_SEVERITY,
    ))
}

fn report_finding(entry: &SafetyVulnerability) -> Result<VulnerabilityFinding, ScanToolError> {
    let package = entry.package_name.as_deref().unwrap_or_default();
    if package.is_empty() {
        return Err(parse_error("vulnerability without package_name".to_owned()));
    }

    let id = [&entry.vulnerability_id, &entry.cve]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|id| !id.is_empty())
        .unwrap_or_default();
    let spec = entry
        .vulnerable_spec
        .as_ref()
        .map(VulnerableSpec::joined)
        .unwrap_or_default();

    Ok(finding(
        package,
        entry.analyzed_version.as_deref().unwrap_or_default(),
        id,
        entry.advisory.as_deref().unwrap_or_default(),
        &spec,
        entry
            .severity
            .as_ref()
            .and_then(SafetySeverity::level)
            .unwrap_or(DEFAULT_SEVERITY),
    ))
}

fn finding(
    package: &str,
    version: &str,
    id: &str,
    advisory: &str,
    spec: &str,
    severity: Severity,
) -> VulnerabilityFinding {
    let mut description = advisory.trim().to_owned();
    if !spec.is_empty() {
        if !description.is_empty() {
            description.push(' ');
        }
        description.push_str(&format!("(affected: {spec})"));
    }

    VulnerabilityFinding {
        kind: FindingKind::Dependency,
        severity,
        tool: SAFETY_TOOL.to_owned(),
        identifier: if id.is_empty() { "unknown".to_owned() } else { id.to_owned() },
        description,
        location: format!("{package}=={version}"),
    }
}

fn parse_error(reason: String) -> ScanToolError {
    ScanToolError::OutputParse {
        tool: SAFETY_TOOL.to_owned(),
        reason,
    }
}
