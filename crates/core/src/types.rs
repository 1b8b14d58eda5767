//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.
//! 보고서 JSON 스키마는 이 타입들의 serde 표현이 그대로 결정합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// 저장소 이름을 결정할 수 없을 때 사용하는 이름
const FALLBACK_REPO_NAME: &str = "repository";

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 정보성
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적, 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" | "undefined" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// High 이상 여부
    pub fn is_notable(self) -> bool {
        self >= Self::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 스캔 대상 저장소
///
/// 저장소 목록의 한 줄에서 만들어지고, 해당 저장소 스캔이 끝나면 버려집니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// 저장소 URL (원문 그대로)
    pub url: String,
    /// 파일 이름에 쓸 수 있도록 정리된 저장소 이름
    pub name: String,
}

impl ScanTarget {
    /// URL에서 스캔 대상을 만듭니다.
    ///
    /// 마지막 경로 구성요소에서 `.git`을 제거한 값을 이름으로 사용합니다.
    /// `https://host/o/repo.git`과 `git@host:o/repo.git` 모두 `repo`가 됩니다.
    pub fn from_url(url: &str) -> Self {
        let url = url.trim();
        Self {
            url: url.to_owned(),
            name: derive_repo_name(url),
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

fn derive_repo_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    let last = last.strip_suffix(".git").unwrap_or(last);

    let sanitized: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.trim_matches('.');
    if sanitized.is_empty() {
        FALLBACK_REPO_NAME.to_owned()
    } else {
        sanitized.to_owned()
    }
}

/// 클론된 저장소 작업 디렉토리
///
/// scoped 상태에서는 drop 시 디렉토리가 삭제됩니다. 조기 반환이나
/// 패닉 되감기 경로도 마찬가지입니다. retained 상태는 디렉토리를 남겨둡니다.
#[derive(Debug)]
pub struct Checkout {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Checkout {
    /// 임시 디렉토리 소유권을 가지는 checkout을 만듭니다.
    ///
    /// `subdir`은 임시 디렉토리 안의 실제 저장소 위치입니다.
    pub fn scoped(dir: TempDir, subdir: &str) -> Self {
        let path = dir.path().join(subdir);
        Self {
            path,
            dir: Some(dir),
        }
    }

    /// 삭제되지 않는 checkout을 만듭니다.
    pub fn retained(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dir: None,
        }
    }

    /// 저장소 로컬 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 디렉토리가 디스크에 남는지 여부
    pub fn is_retained(&self) -> bool {
        self.dir.is_none()
    }

    /// 디렉토리를 삭제합니다. 삭제 실패를 반환한다는 점이 drop과 다릅니다.
    pub fn release(self) -> std::io::Result<()> {
        match self.dir {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }

    /// 디렉토리 소유권을 포기하고 경로를 반환합니다. 이후 삭제되지 않습니다.
    pub fn keep(self) -> PathBuf {
        if let Some(dir) = self.dir {
            let _ = dir.keep();
        }
        self.path
    }
}

/// 저장소 스캔 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// 스캔 완료 (단계 에러가 있을 수 있음)
    Completed,
    /// 클론 실패 등으로 스캔 불가
    Failed,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 저장소 하나의 처리 단계
///
/// `Pending -> Cloning -> Scanning -> DrupalChecking -> AiAnalyzing -> Reporting -> Done`
/// 순서로 진행하며, 어느 단계에서든 `Failed`로 끝날 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPhase {
    Pending,
    Cloning,
    Scanning,
    DrupalChecking,
    AiAnalyzing,
    Reporting,
    Done,
    Failed,
}

impl ScanPhase {
    /// 종료 상태 여부
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Cloning => "cloning",
            Self::Scanning => "scanning",
            Self::DrupalChecking => "drupal-checking",
            Self::AiAnalyzing => "ai-analyzing",
            Self::Reporting => "reporting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 발견 항목 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    /// 의존성 취약점 (safety)
    Dependency,
    /// 코드 정적 분석 (bandit)
    Code,
    /// 설정/자격증명 노출
    Config,
}

/// 정규화된 스캔 발견 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    /// 종류
    pub kind: FindingKind,
    /// 심각도
    pub severity: Severity,
    /// 발견한 도구 이름
    pub tool: String,
    /// advisory id / test id / 규칙 이름
    pub identifier: String,
    /// 설명
    pub description: String,
    /// `file[:line]` 또는 `package==version`
    pub location: String,
}

impl fmt::Display for VulnerabilityFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.severity, self.identifier, self.location, self.description,
        )
    }
}

/// 도구별 실행 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolStatus {
    /// 실행 완료
    Ran,
    /// 도구를 사용할 수 없어 건너뜀
    Skipped { reason: String },
    /// 분석할 대상이 없음
    NotApplicable,
    /// 실행했지만 실패함 (단계 에러로도 기록됨)
    Failed { reason: String },
}

impl ToolStatus {
    /// 도구 실패로 보고해야 하는 상태인지 여부
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ran => write!(f, "ran"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::NotApplicable => write!(f, "not applicable"),
            Self::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/// 심각도별 개수
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl SeverityCounts {
    /// 심각도 하나를 셉니다.
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

/// 저장소 하나에 대한 취약점 스캔 결과
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityScan {
    /// 의존성 취약점
    pub dependency_vulnerabilities: Vec<VulnerabilityFinding>,
    /// 코드 이슈
    pub code_issues: Vec<VulnerabilityFinding>,
    /// 일반 설정 이슈
    pub common_issues: Vec<VulnerabilityFinding>,
    /// 도구 이름 → 실행 상태
    pub tools: BTreeMap<String, ToolStatus>,
    /// 전체 발견 항목의 심각도별 개수
    pub severity_counts: SeverityCounts,
}

impl VulnerabilityScan {
    /// 발견 항목을 종류에 맞는 목록에 추가합니다.
    pub fn push(&mut self, finding: VulnerabilityFinding) {
        self.severity_counts.add(finding.severity);
        match finding.kind {
            FindingKind::Dependency => self.dependency_vulnerabilities.push(finding),
            FindingKind::Code => self.code_issues.push(finding),
            FindingKind::Config => self.common_issues.push(finding),
        }
    }

    /// 도구 실행 상태를 기록합니다.
    pub fn set_tool_status(&mut self, tool: impl Into<String>, status: ToolStatus) {
        self.tools.insert(tool.into(), status);
    }

    /// 모든 발견 항목을 순회합니다.
    pub fn findings(&self) -> impl Iterator<Item = &VulnerabilityFinding> {
        self.dependency_vulnerabilities
            .iter()
            .chain(self.code_issues.iter())
            .chain(self.common_issues.iter())
    }

    pub fn total_findings(&self) -> usize {
        self.dependency_vulnerabilities.len() + self.code_issues.len() + self.common_issues.len()
    }

    /// 가장 높은 심각도 (발견 항목이 없으면 `None`)
    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings().map(|f| f.severity).max()
    }
}

/// Drupal 모듈 업데이트 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSeverity {
    /// 호환되지 않는 변경
    Major,
    /// 하위 호환 기능 추가
    Minor,
    /// 버그 수정만
    Patch,
    /// 최신
    None,
    /// 비교 불가 (조회 실패, 비교할 수 없는 제약 조건)
    Unknown,
}

impl UpdateSeverity {
    /// 업데이트가 필요한지 여부
    pub fn is_outdated(self) -> bool {
        matches!(self, Self::Major | Self::Minor | Self::Patch)
    }
}

impl fmt::Display for UpdateSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::None => "none",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// 최신 버전을 알 수 없을 때 쓰는 값
pub const UNKNOWN_VERSION: &str = "unknown";

/// contrib 모듈 하나의 버전 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrupalModuleStatus {
    /// 패키지 이름 (`drupal/token`)
    pub module: String,
    /// composer.json의 버전 제약 조건
    pub current_version: String,
    /// 레지스트리 최신 안정 버전 (또는 `unknown`)
    pub latest_version: String,
    /// 업데이트 심각도
    pub severity: UpdateSeverity,
    /// 프로젝트 저장소 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
}

/// Drupal 검사 결과
///
/// Drupal 프로젝트가 아니면 `is_drupal: false`만 직렬화됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrupalCheck {
    pub is_drupal: bool,
    /// core 버전 제약 조건
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drupal_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_modules: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<DrupalModuleStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdated_modules: Option<Vec<DrupalModuleStatus>>,
}

impl DrupalCheck {
    /// Drupal 프로젝트가 아님
    pub fn not_drupal() -> Self {
        Self::default()
    }

    /// Drupal 프로젝트 결과를 만듭니다. outdated 목록은 모듈 상태에서 계산됩니다.
    pub fn drupal(drupal_version: Option<String>, modules: Vec<DrupalModuleStatus>) -> Self {
        let outdated: Vec<_> = modules
            .iter()
            .filter(|m| m.severity.is_outdated())
            .cloned()
            .collect();
        Self {
            is_drupal: true,
            drupal_version,
            total_modules: Some(modules.len()),
            modules: Some(modules),
            outdated_modules: Some(outdated),
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.as_ref().map_or(0, Vec::len)
    }

    pub fn outdated(&self) -> &[DrupalModuleStatus] {
        self.outdated_modules.as_deref().unwrap_or_default()
    }
}

/// 단계 에러 기록 (비치명적)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    /// 실패한 단계
    pub step: ScanPhase,
    /// 에러 메시지
    pub message: String,
}

/// 저장소 하나의 스캔 결과
///
/// 보고서 파일로 한 번 기록되며 이후 수정되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// 스캔 ID (UUID v4)
    pub scan_id: String,
    pub repo_url: String,
    pub repo_name: String,
    /// 스캔 시작 시각 (RFC 3339)
    pub scan_time: DateTime<Utc>,
    pub status: ScanStatus,
    /// 실패 원인 (`failed`일 때)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub step_errors: Vec<StepError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability_scan: Option<VulnerabilityScan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drupal_check: Option<DrupalCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
    /// 클론 디렉토리를 남긴 경우 그 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

impl ScanResult {
    /// 스캔을 시작한 결과를 만듭니다 (`completed` 상태).
    pub fn start(target: &ScanTarget) -> Self {
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            repo_url: target.url.clone(),
            repo_name: target.name.clone(),
            scan_time: Utc::now(),
            status: ScanStatus::Completed,
            error: None,
            step_errors: Vec::new(),
            vulnerability_scan: None,
            drupal_check: None,
            ai_analysis: None,
            local_path: None,
        }
    }

    /// 실패로 표시합니다.
    pub fn fail(&mut self, cause: impl Into<String>) {
        self.status = ScanStatus::Failed;
        self.error = Some(cause.into());
    }

    /// 단계 에러를 기록합니다.
    pub fn record_step_error(&mut self, step: ScanPhase, message: impl Into<String>) {
        self.step_errors.push(StepError {
            step,
            message: message.into(),
        });
    }

    pub fn is_completed(&self) -> bool {
        self.status == ScanStatus::Completed
    }

    /// 완료되었지만 단계 에러가 있는 결과
    pub fn is_partial(&self) -> bool {
        self.is_completed() && !self.step_errors.is_empty()
    }
}

/// 요약 보고서의 발견 항목 합계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingTotals {
    pub dependency_vulnerabilities: usize,
    pub code_issues: usize,
    pub common_issues: usize,
    pub drupal_modules: usize,
    pub outdated_modules: usize,
    pub severity_counts: SeverityCounts,
}

/// 요약 보고서의 저장소 한 줄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub repo_name: String,
    pub repo_url: String,
    pub status: ScanStatus,
    /// 개별 보고서 파일 이름 (기록 실패 시 없음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub step_errors: usize,
    pub dependency_vulnerabilities: usize,
    pub code_issues: usize,
    pub common_issues: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drupal_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drupal_modules: Option<usize>,
    pub outdated_modules: usize,
}

/// 실행 한 번의 요약 보고서
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub scan_date: DateTime<Utc>,
    pub total_repositories: usize,
    pub completed: usize,
    pub failed: usize,
    /// 완료되었지만 단계 에러가 있는 저장소 수
    pub partial: usize,
    pub totals: FindingTotals,
    pub repositories: Vec<SummaryRow>,
    pub notable_issues: Vec<String>,
}

impl SummaryReport {
    pub fn new(scan_date: DateTime<Utc>) -> Self {
        Self {
            scan_date,
            total_repositories: 0,
            completed: 0,
            failed: 0,
            partial: 0,
            totals: FindingTotals::default(),
            repositories: Vec::new(),
            notable_issues: Vec::new(),
        }
    }

    /// 결과 하나를 집계합니다.
    pub fn push(&mut self, result: &ScanResult, report_file: Option<String>) {
        self.total_repositories += 1;
        match result.status {
            ScanStatus::Completed => self.completed += 1,
            ScanStatus::Failed => self.failed += 1,
        }
        if result.is_partial() {
            self.partial += 1;
        }

        let mut row = SummaryRow {
            repo_name: result.repo_name.clone(),
            repo_url: result.repo_url.clone(),
            status: result.status,
            report_file,
            error: result.error.clone(),
            step_errors: result.step_errors.len(),
            dependency_vulnerabilities: 0,
            code_issues: 0,
            common_issues: 0,
            drupal_version: None,
            drupal_modules: None,
            outdated_modules: 0,
        };

        if let Some(cause) = &result.error {
            self.notable_issues
                .push(format!("{}: scan failed: {cause}", result.repo_name));
        }

        if let Some(scan) = &result.vulnerability_scan {
            row.dependency_vulnerabilities = scan.dependency_vulnerabilities.len();
            row.code_issues = scan.code_issues.len();
            row.common_issues = scan.common_issues.len();

            self.totals.dependency_vulnerabilities += row.dependency_vulnerabilities;
            self.totals.code_issues += row.code_issues;
            self.totals.common_issues += row.common_issues;
            for finding in scan.findings() {
                self.totals.severity_counts.add(finding.severity);
                if finding.severity.is_notable() {
                    self.notable_issues.push(format!(
                        "{}: [{}] {} at {}",
                        result.repo_name, finding.severity, finding.identifier, finding.location,
                    ));
                }
            }
        }

        if let Some(drupal) = result.drupal_check.as_ref().filter(|d| d.is_drupal) {
            row.drupal_version = drupal.drupal_version.clone();
            row.drupal_modules = Some(drupal.module_count());
            row.outdated_modules = drupal.outdated().len();

            self.totals.drupal_modules += drupal.module_count();
            self.totals.outdated_modules += row.outdated_modules;
            for module in drupal
                .outdated()
                .iter()
                .filter(|m| m.severity == UpdateSeverity::Major)
            {
                self.notable_issues.push(format!(
                    "{}: {} {} -> {} (major update)",
                    result.repo_name, module.module, module.current_version, module.latest_version,
                ));
            }
        }

        self.repositories.push(row);
    }
}
