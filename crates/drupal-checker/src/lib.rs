//! # repowatch-drupal-checker
//!
//! Drupal 프로젝트를 판별하고 contrib 모듈이 최신인지 검사합니다.
//!
//! - [`manifest`]: composer.json 파싱
//! - [`version`]: 제약 조건 정리와 major/minor/patch 분류
//! - [`registry`]: packages.drupal.org p2 메타데이터 조회
//! - [`checker`]: 전체 흐름 (`DrupalChecker`, `ModuleAuditor` 구현)

pub mod checker;
pub mod manifest;
pub mod registry;
pub mod version;

pub use checker::{DrupalChecker, module_auditor};
pub use manifest::{COMPOSER_FILE, ComposerManifest, read_manifest};
pub use registry::{ModuleRelease, RegistryClient};
pub use version::{classify, clean_version, latest_stable};
