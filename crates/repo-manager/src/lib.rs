//! # repowatch-repo-manager
//!
//! 저장소 목록을 읽고, 각 저장소를 scoped 임시 디렉토리로 클론합니다.
//!
//! - [`targets`]: 목록 파일 파싱 (`read_targets`)
//! - [`clone`]: git clone 실행, URL 검증, stderr 분류 (`RepositoryManager`)

pub mod clone;
pub mod targets;

pub use clone::{RepositoryManager, classify_failure, validate_url};
pub use targets::{parse_targets, read_targets};
