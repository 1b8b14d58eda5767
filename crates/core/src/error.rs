//! 에러 타입: 단계별 에러 정의
//!
//! 치명적인 에러는 [`ConfigError`] 하나뿐입니다. 나머지는 저장소 단위 또는
//! 단계 단위로 기록되고 배치 실행을 중단하지 않습니다.

/// repowatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum RepowatchError {
    /// 설정 관련 에러 (치명적)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 저장소 클론 에러
    #[error("clone error: {0}")]
    Clone(#[from] CloneError),

    /// 외부 스캔 도구 에러
    #[error("scan tool error: {0}")]
    ScanTool(#[from] ScanToolError),

    /// 매니페스트(composer.json 등) 에러
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// 패키지 레지스트리 조회 에러
    #[error("registry lookup error: {0}")]
    Registry(#[from] RegistryLookupError),

    /// AI 제공자 에러
    #[error("ai provider error: {0}")]
    AiProvider(#[from] AiProviderError),

    /// HTTP 클라이언트 생성 실패
    #[error("http client error: {0}")]
    HttpClient(String),

    /// 보고서 직렬화 에러
    #[error("report error: {0}")]
    Report(#[from] serde_json::Error),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 저장소 목록 파일을 찾을 수 없음
    #[error("repository list not found: {path}")]
    TargetListNotFound { path: String },

    /// 저장소 목록이 비어 있음
    #[error("repository list is empty: {path}")]
    EmptyTargetList { path: String },
}

/// 저장소 클론 에러
#[derive(Debug, thiserror::Error)]
pub enum CloneError {
    /// 지원하지 않는 URL 형식
    #[error("invalid repository url: {0}")]
    InvalidUrl(String),

    /// git 실행 파일을 찾을 수 없음
    #[error("git executable not found")]
    GitNotFound,

    /// 원격 저장소가 존재하지 않음
    #[error("repository not found: {0}")]
    NotFound(String),

    /// 인증 필요 또는 인증 실패
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// 네트워크 에러
    #[error("network failure cloning {url}: {message}")]
    Network { url: String, message: String },

    /// 클론 제한 시간 초과
    #[error("clone timed out after {timeout_secs}s: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    /// 임시 디렉토리 생성 실패
    #[error("failed to create temp dir: {0}")]
    TempDir(String),

    /// 기타 git 실패
    #[error("git clone failed for {url}: {message}")]
    Failed { url: String, message: String },
}

/// 외부 스캔 도구 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanToolError {
    /// 도구가 설치되어 있지 않거나 실행할 수 없음 (비치명적, skipped로 기록)
    #[error("{tool} unavailable: {reason}")]
    Unavailable { tool: String, reason: String },

    /// 도구 실행 실패
    #[error("{tool} failed: {reason}")]
    ExecutionFailed { tool: String, reason: String },

    /// 도구 출력 파싱 실패
    #[error("{tool} produced unreadable output: {reason}")]
    OutputParse { tool: String, reason: String },
}

impl ScanToolError {
    /// 도구 이름을 반환합니다.
    pub fn tool(&self) -> &str {
        match self {
            Self::Unavailable { tool, .. }
            | Self::ExecutionFailed { tool, .. }
            | Self::OutputParse { tool, .. } => tool,
        }
    }
}

/// 매니페스트 에러
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// 읽기 실패
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// JSON 파싱 실패
    #[error("invalid manifest {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// 레지스트리 조회 에러 (모듈 단위, 비치명적)
#[derive(Debug, thiserror::Error)]
pub enum RegistryLookupError {
    /// 네트워크 에러
    #[error("network error looking up {module}: {reason}")]
    Network { module: String, reason: String },

    /// 비정상 HTTP 상태
    #[error("registry returned HTTP {status} for {module}")]
    Http { module: String, status: u16 },

    /// 레지스트리에 모듈 정보 없음
    #[error("module not found in registry: {module}")]
    NotFound { module: String },

    /// 응답 형식 오류
    #[error("malformed registry response for {module}: {reason}")]
    MalformedResponse { module: String, reason: String },
}

/// AI 제공자 에러 (분석 단위, 비치명적)
#[derive(Debug, thiserror::Error)]
pub enum AiProviderError {
    /// API 키 미설정
    #[error("api key not configured for provider {provider}")]
    MissingApiKey { provider: String },

    /// 인증 실패 (401/403)
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// 요청 한도 초과 (429)
    #[error("quota or rate limit exceeded: {0}")]
    Quota(String),

    /// 네트워크 에러
    #[error("network error: {0}")]
    Network(String),

    /// 기타 비정상 HTTP 상태
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// 응답 형식 오류
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: RepowatchError = ConfigError::EmptyTargetList {
            path: "repos.txt".to_owned(),
        }
        .into();
        assert!(matches!(err, RepowatchError::Config(_)));
        assert!(err.to_string().contains("repos.txt"));
    }

    #[test]
    fn clone_error_display_includes_url() {
        let err = CloneError::Network {
            url: "https://example.com/a.git".to_owned(),
            message: "could not resolve host".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("example.com/a.git"));
        assert!(msg.contains("could not resolve host"));
    }

    #[test]
    fn scan_tool_error_reports_tool_name() {
        let err = ScanToolError::Unavailable {
            tool: "bandit".to_owned(),
            reason: "not installed".to_owned(),
        };
        assert_eq!(err.tool(), "bandit");
        assert_eq!(err.to_string(), "bandit unavailable: not installed");
    }

    #[test]
    fn registry_error_display() {
        let err = RegistryLookupError::Http {
            module: "drupal/token".to_owned(),
            status: 503,
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("drupal/token"));
    }

    #[test]
    fn ai_error_converts_to_top_level() {
        let err: RepowatchError = AiProviderError::Quota("slow down".to_owned()).into();
        assert!(matches!(err, RepowatchError::AiProvider(_)));
    }
}
