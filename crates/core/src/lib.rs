//! # repowatch-core
//!
//! repowatch 워크스페이스의 공통 기반 크레이트입니다.
//!
//! - [`config`]: `repowatch.toml` + 환경변수 기반 설정
//! - [`error`]: 단계별 에러 타입
//! - [`types`]: 스캔 대상, 발견 항목, 보고서 데이터 모델
//! - [`pipeline`]: 처리 단계 trait
//!
//! 다른 크레이트는 이 크레이트에만 의존하고, 서로에게는 의존하지 않습니다.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    AiProviderError, CloneError, ConfigError, ManifestError, RegistryLookupError, RepowatchError,
    ScanToolError,
};

// 설정
pub use config::RepowatchConfig;

// 파이프라인 trait
pub use pipeline::{
    BoxFuture, DisabledAuditor, DisabledSummary, FindingScanner, ModuleAuditor,
    RepositoryFetcher, SummaryProvider,
};

// 도메인 타입
pub use types::{
    Checkout, DrupalCheck, DrupalModuleStatus, FindingKind, ScanPhase, ScanResult, ScanStatus,
    ScanTarget, Severity, SummaryReport, ToolStatus, UpdateSeverity, VulnerabilityFinding,
    VulnerabilityScan,
};
