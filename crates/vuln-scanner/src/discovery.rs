//! 저장소 트리 탐색
//!
//! 한 번의 walk로 스캔에 필요한 정보를 모읍니다:
//! 의존성 매니페스트, Python 소스 존재 여부, 자격증명으로 보이는 파일.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::misconfig::{self, CredentialMatch};

/// 탐색하지 않는 디렉토리 이름
const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "venv",
    ".venv",
    "virtualenv",
    ".tox",
    "__pycache__",
    "site-packages",
];

/// 탐색 결과
#[derive(Debug, Default)]
pub struct RepoInventory {
    /// `requirements*.txt` 파일 (저장소 기준 상대 경로, 정렬됨)
    pub requirement_files: Vec<PathBuf>,
    /// `.py` 파일 존재 여부
    pub has_python: bool,
    /// 자격증명으로 보이는 파일
    pub credential_files: Vec<CredentialMatch>,
}

/// 저장소 트리를 탐색합니다 (blocking I/O).
pub fn inventory(root: &Path, max_depth: usize) -> RepoInventory {
    let mut inv = RepoInventory::default();

    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();

        if is_requirements_file(name) {
            inv.requirement_files.push(rel.clone());
        }

        if name.ends_with(".py") {
            inv.has_python = true;
        }

        if let Some(found) = misconfig::match_credential_file(entry.path(), &rel) {
            inv.credential_files.push(found);
        }
    }

    inv
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIP_DIRS.contains(&name))
}

/// `requirements.txt`, `requirements-dev.txt`, `requirements_prod.txt` 등
pub fn is_requirements_file(name: &str) -> bool {
    name.starts_with("requirements") && name.ends_with(".txt")
}
