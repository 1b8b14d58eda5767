//! 저장소 목록 파일 파싱
//!
//! 한 줄에 URL 하나. 빈 줄과 `#`으로 시작하는 줄은 건너뜁니다.

use std::path::Path;

use tracing::info;

use repowatch_core::error::{ConfigError, RepowatchError};
use repowatch_core::types::ScanTarget;

/// 저장소 목록 파일을 읽어 스캔 대상 목록을 만듭니다.
///
/// 파일이 없거나 대상이 하나도 없으면 설정 에러(치명적)를 반환합니다.
pub async fn read_targets(path: impl AsRef<Path>) -> Result<Vec<ScanTarget>, RepowatchError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RepowatchError::Config(ConfigError::TargetListNotFound {
                path: path.display().to_string(),
            })
        } else {
            RepowatchError::Io(e)
        }
    })?;

    let targets = parse_targets(&content);
    if targets.is_empty() {
        return Err(ConfigError::EmptyTargetList {
            path: path.display().to_string(),
        }
        .into());
    }

    info!(
        path = %path.display(),
        count = targets.len(),
        "found repositories to scan"
    );
    Ok(targets)
}

/// 목록 텍스트를 파싱합니다.
pub fn parse_targets(content: &str) -> Vec<ScanTarget> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ScanTarget::from_url)
        .collect()
}
