//! 파이프라인 trait: 저장소 처리 단계별 확장 포인트 정의
//!
//! 오케스트레이터는 각 단계를 trait 객체(`Box<dyn ...>`)로 보관합니다.
//! 선택 단계(Drupal 검사, AI 분석)는 설정에 따라 생성 시점에
//! 실제 구현 또는 비활성 구현 중 하나가 선택됩니다.
//!
//! # 처리 순서
//! ```text
//! RepositoryFetcher -> FindingScanner -> ModuleAuditor -> SummaryProvider
//! ```

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::{AiProviderError, CloneError, RepowatchError};
use crate::types::{Checkout, DrupalCheck, ScanResult, ScanTarget, VulnerabilityScan};

/// dyn-compatible async 메서드의 반환 타입
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 저장소를 로컬로 가져오는 trait
pub trait RepositoryFetcher: Send + Sync {
    /// 대상 저장소를 새 임시 디렉토리에 클론합니다.
    fn fetch<'a>(&'a self, target: &'a ScanTarget) -> BoxFuture<'a, Result<Checkout, CloneError>>;
}

/// 로컬 저장소에서 취약점을 찾는 trait
///
/// 개별 도구를 쓸 수 없는 경우는 에러가 아니라 결과 안의
/// [`ToolStatus::Skipped`](crate::types::ToolStatus::Skipped)로 표현해야 합니다.
pub trait FindingScanner: Send + Sync {
    fn scan<'a>(&'a self, repo: &'a Path) -> BoxFuture<'a, Result<VulnerabilityScan, RepowatchError>>;
}

/// 모듈 버전 검사 trait
///
/// `Ok(None)`은 검사가 비활성화되었음을 뜻하며 보고서에 섹션이 생기지 않습니다.
pub trait ModuleAuditor: Send + Sync {
    fn audit<'a>(&'a self, repo: &'a Path)
    -> BoxFuture<'a, Result<Option<DrupalCheck>, RepowatchError>>;
}

/// 스캔 결과 요약 trait
///
/// `Ok(None)`은 분석이 비활성화되었음을 뜻합니다. 비활성 구현은 네트워크 호출을 하지 않습니다.
pub trait SummaryProvider: Send + Sync {
    fn analyze<'a>(
        &'a self,
        result: &'a ScanResult,
    ) -> BoxFuture<'a, Result<Option<String>, AiProviderError>>;
}

/// 비활성화된 모듈 검사
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAuditor;

impl ModuleAuditor for DisabledAuditor {
    fn audit<'a>(
        &'a self,
        _repo: &'a Path,
    ) -> BoxFuture<'a, Result<Option<DrupalCheck>, RepowatchError>> {
        Box::pin(async { Ok(None) })
    }
}

/// 비활성화된 요약
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSummary;

impl SummaryProvider for DisabledSummary {
    fn analyze<'a>(
        &'a self,
        _result: &'a ScanResult,
    ) -> BoxFuture<'a, Result<Option<String>, AiProviderError>> {
        Box::pin(async { Ok(None) })
    }
}
