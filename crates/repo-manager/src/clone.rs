//! scoped git clone
//!
//! 저장소마다 `temp_root` 아래에 새 임시 디렉토리를 만들어 클론합니다.
//! 반환된 [`Checkout`]이 drop되면 디렉토리가 삭제됩니다.
//!
//! 클론 시 적용하는 제한:
//! - shallow clone (`--depth N --single-branch --no-tags`)
//! - git hook 비활성화 (`core.hooksPath=/dev/null`, 빈 `GIT_TEMPLATE_DIR`)
//! - 터미널 인증 프롬프트 비활성화 (`GIT_TERMINAL_PROMPT=0`)
//! - 제한 시간 초과 시 프로세스 종료

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use repowatch_core::config::{GeneralConfig, RepositoryConfig};
use repowatch_core::error::CloneError;
use repowatch_core::pipeline::{BoxFuture, RepositoryFetcher};
use repowatch_core::types::{Checkout, ScanTarget};

/// 허용하는 URL scheme
const ALLOWED_SCHEMES: &[&str] = &["https://", "http://", "ssh://", "git://", "file://"];

/// git 저장소 클론 관리자
#[derive(Debug, Clone)]
pub struct RepositoryManager {
    temp_root: PathBuf,
    depth: u32,
    timeout: Duration,
    git_bin: String,
}

impl RepositoryManager {
    /// 기본 설정(depth 1, 300초 제한)으로 생성합니다.
    pub fn new(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
            depth: 1,
            timeout: Duration::from_secs(300),
            git_bin: "git".to_owned(),
        }
    }

    /// core 설정에서 생성합니다.
    pub fn from_core(general: &GeneralConfig, repository: &RepositoryConfig) -> Self {
        Self::new(&general.temp_dir)
            .with_depth(repository.clone_depth)
            .with_timeout(Duration::from_secs(repository.clone_timeout_secs))
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// git 실행 파일 경로를 바꿉니다.
    pub fn with_git_bin(mut self, git_bin: impl Into<String>) -> Self {
        self.git_bin = git_bin.into();
        self
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// 저장소를 새 임시 디렉토리에 클론합니다.
    pub async fn clone_target(&self, target: &ScanTarget) -> Result<Checkout, CloneError> {
        validate_url(&target.url)?;

        tokio::fs::create_dir_all(&self.temp_root)
            .await
            .map_err(|e| {
                CloneError::TempDir(format!("{}: {e}", self.temp_root.display()))
            })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", target.name))
            .tempdir_in(&self.temp_root)
            .map_err(|e| CloneError::TempDir(format!("{}: {e}", self.temp_root.display())))?;

        // 임시 디렉토리는 이 시점부터 Checkout이 소유하므로, 아래에서 실패하면 drop으로 삭제됩니다.
        let checkout = Checkout::scoped(dir, &target.name);
        let dest = checkout.path().to_path_buf();

        info!(url = %target.url, dest = %dest.display(), "cloning repository");

        let depth = self.depth.to_string();
        let mut cmd = Command::new(&self.git_bin);
        cmd.env("GIT_TEMPLATE_DIR", "")
            .env("GIT_TERMINAL_PROMPT", "0")
            .args(["-c", "core.hooksPath=/dev/null", "-c", "advice.detachedHead=false"])
            .args(["clone", "--depth", &depth, "--single-branch", "--no-tags", "--quiet", "--"])
            .arg(&target.url)
            .arg(&dest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CloneError::GitNotFound);
            }
            Ok(Err(e)) => {
                return Err(CloneError::Failed {
                    url: target.url.clone(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                warn!(url = %target.url, timeout_secs = self.timeout.as_secs(), "clone timed out");
                return Err(CloneError::Timeout {
                    url: target.url.clone(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(url = %target.url, stderr = %stderr.trim(), "git clone failed");
            return Err(classify_failure(&target.url, &stderr));
        }

        info!(url = %target.url, "clone completed");
        Ok(checkout)
    }
}

impl RepositoryFetcher for RepositoryManager {
    fn fetch<'a>(&'a self, target: &'a ScanTarget) -> BoxFuture<'a, Result<Checkout, CloneError>> {
        Box::pin(self.clone_target(target))
    }
}

/// 클론 가능한 URL인지 확인합니다.
///
/// scheme URL(`https://`, `http://`, `ssh://`, `git://`, `file://`)과
/// scp 형식(`git@host:owner/repo.git`)을 허용합니다.
pub fn validate_url(url: &str) -> Result<(), CloneError> {
    if url.is_empty() || url.starts_with('-') || url.chars().any(char::is_whitespace) {
        return Err(CloneError::InvalidUrl(url.to_owned()));
    }

    if let Some(scheme) = ALLOWED_SCHEMES.iter().find(|s| url.starts_with(**s)) {
        if url.len() > scheme.len() {
            return Ok(());
        }
        return Err(CloneError::InvalidUrl(url.to_owned()));
    }

    if !url.contains("://") && is_scp_like(url) {
        return Ok(());
    }

    Err(CloneError::InvalidUrl(url.to_owned()))
}

/// `user@host:path` 형식 여부
fn is_scp_like(url: &str) -> bool {
    let Some((user_host, path)) = url.split_once(':') else {
        return false;
    };
    let Some((user, host)) = user_host.split_once('@') else {
        return false;
    };
    !user.is_empty() && !host.is_empty() && !host.contains('/') && !path.is_empty()
}

/// git stderr를 에러 종류로 분류합니다.
pub fn classify_failure(url: &str, stderr: &str) -> CloneError {
    let lower = stderr.to_lowercase();

    if lower.contains("repository not found")
        || lower.contains("does not appear to be a git repository")
        || lower.contains("does not exist")
        || lower.contains("404")
    {
        return CloneError::NotFound(url.to_owned());
    }

    if lower.contains("authentication failed")
        || lower.contains("could not read username")
        || lower.contains("could not read password")
        || lower.contains("permission denied")
        || lower.contains("terminal prompts disabled")
        || lower.contains("403")
    {
        return CloneError::AuthRequired(url.to_owned());
    }

    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
    {
        return CloneError::Network {
            url: url.to_owned(),
            message: stderr.trim().to_owned(),
        };
    }

    CloneError::Failed {
        url: url.to_owned(),
        message: stderr.trim().to_owned(),
    }
}
