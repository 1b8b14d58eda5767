//! 외부 도구 실행

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use repowatch_core::error::ScanToolError;

/// 도구 실행 결과
#[derive(Debug)]
pub struct ToolOutput {
    /// 종료 코드 (시그널로 종료되면 `None`)
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// 도구를 실행하고 출력을 모읍니다.
///
/// 종료 코드가 0이 아니어도 에러로 취급하지 않습니다. 판단은 호출자가 합니다.
/// 실행 파일이 없으면 [`ScanToolError::Unavailable`]을 반환합니다.
pub async fn run_tool(
    tool: &str,
    bin: &str,
    args: &[&std::ffi::OsStr],
    cwd: &Path,
    timeout: Duration,
) -> Result<ToolOutput, ScanToolError> {
    debug!(tool, bin, ?args, "running scan tool");

    let mut cmd = Command::new(bin);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanToolError::Unavailable {
                tool: tool.to_owned(),
                reason: format!("'{bin}' not found in PATH"),
            });
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ScanToolError::Unavailable {
                tool: tool.to_owned(),
                reason: format!("'{bin}' is not executable"),
            });
        }
        Ok(Err(e)) => {
            return Err(ScanToolError::ExecutionFailed {
                tool: tool.to_owned(),
                reason: e.to_string(),
            });
        }
        Err(_) => {
            return Err(ScanToolError::ExecutionFailed {
                tool: tool.to_owned(),
                reason: format!("timed out after {}s", timeout.as_secs()),
            });
        }
    };

    Ok(ToolOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// 앞쪽 배너 등을 건너뛰고 JSON이 시작하는 위치부터 잘라냅니다.
pub fn json_payload(stdout: &str) -> Option<&str> {
    let trimmed = stdout.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }
    let mut offset = 0;
    for line in stdout.split_inclusive('\n') {
        let start = line.trim_start();
        if start.starts_with('{') || start.starts_with('[') {
            return Some(stdout[offset..].trim());
        }
        offset += line.len();
    }
    None
}
