//! # repowatch-vuln-scanner
//!
//! 클론된 저장소에서 외부 스캐너를 실행하고 결과를 정규화합니다.
//!
//! - [`discovery`]: 저장소 트리 탐색 (매니페스트, Python 소스, 자격증명 파일)
//! - [`safety`]: safety JSON 출력 파싱
//! - [`bandit`]: bandit JSON 출력 파싱
//! - [`misconfig`]: 커밋된 자격증명 파일 탐지 규칙
//! - [`runner`]: 외부 도구 실행 (제한 시간, 미설치 감지)
//! - [`scanner`]: 전체 흐름 (`VulnerabilityScanner`, `FindingScanner` 구현)

pub mod bandit;
pub mod discovery;
pub mod misconfig;
pub mod runner;
pub mod safety;
pub mod scanner;

pub use discovery::{RepoInventory, inventory};
pub use misconfig::{CredentialMatch, CredentialRule};
pub use scanner::VulnerabilityScanner;
