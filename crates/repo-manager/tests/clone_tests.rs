//! 로컬 git 저장소를 대상으로 한 클론 통합 테스트
//!
//! `git`이 설치되지 않은 환경에서는 테스트를 건너뜁니다.

use std::path::Path;
use std::process::Command;

use repowatch_core::error::CloneError;
use repowatch_core::pipeline::RepositoryFetcher;
use repowatch_core::types::ScanTarget;
use repowatch_repo_manager::RepositoryManager;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .expect("git should run");
    assert!(status.success(), "git {args:?} failed");
}

/// 파일 하나가 커밋된 원본 저장소를 만듭니다.
fn make_origin(root: &Path) -> std::path::PathBuf {
    let origin = root.join("origin-site");
    std::fs::create_dir_all(&origin).unwrap();
    git(&origin, &["init", "--quiet"]);
    std::fs::write(origin.join("app.py"), "print('hello')\n").unwrap();
    git(&origin, &["add", "."]);
    git(&origin, &["commit", "--quiet", "-m", "init"]);
    origin
}

#[tokio::test]
async fn clone_local_repository_and_release() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let workspace = tempfile::tempdir().unwrap();
    let origin = make_origin(workspace.path());
    let clones = workspace.path().join("clones");

    let manager = RepositoryManager::new(&clones);
    let target = ScanTarget::from_url(&format!("file://{}", origin.display()));
    let checkout = manager.fetch(&target).await.expect("clone should succeed");

    assert!(checkout.path().join("app.py").is_file());
    assert!(checkout.path().ends_with("origin-site"));

    checkout.release().unwrap();
    assert_eq!(std::fs::read_dir(&clones).unwrap().count(), 0);
}

#[tokio::test]
async fn kept_checkout_survives() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let workspace = tempfile::tempdir().unwrap();
    let origin = make_origin(workspace.path());

    let manager = RepositoryManager::new(workspace.path().join("clones"));
    let target = ScanTarget::from_url(&format!("file://{}", origin.display()));
    let path = manager.clone_target(&target).await.unwrap().keep();

    assert!(path.join("app.py").is_file());
}

#[tokio::test]
async fn same_name_targets_get_separate_directories() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let workspace = tempfile::tempdir().unwrap();
    let origin = make_origin(workspace.path());

    let manager = RepositoryManager::new(workspace.path().join("clones"));
    let target = ScanTarget::from_url(&format!("file://{}", origin.display()));
    let first = manager.clone_target(&target).await.unwrap();
    let second = manager.clone_target(&target).await.unwrap();

    assert_ne!(first.path(), second.path());
}

#[tokio::test]
async fn missing_local_repository_fails_and_cleans_up() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let workspace = tempfile::tempdir().unwrap();
    let clones = workspace.path().join("clones");

    let manager = RepositoryManager::new(&clones);
    let target = ScanTarget::from_url(&format!(
        "file://{}",
        workspace.path().join("missing.git").display()
    ));
    let err = manager.clone_target(&target).await.unwrap_err();

    assert!(
        matches!(err, CloneError::NotFound(_) | CloneError::Failed { .. }),
        "unexpected error: {err}"
    );
    assert_eq!(std::fs::read_dir(&clones).unwrap().count(), 0);
}
