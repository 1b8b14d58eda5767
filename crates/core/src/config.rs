//! 설정 관리: repowatch.toml 파싱 및 런타임 설정
//!
//! [`RepowatchConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 만들어진 뒤 각 구성 요소에 참조로 전달됩니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, CLI 크레이트에서 적용)
//! 2. 환경변수 (`SCAN_TEMP_DIR`, `OPENAI_API_KEY`, `REPOWATCH_AI_ENABLED=false` 형식)
//! 3. 설정 파일 (`repowatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), repowatch_core::error::RepowatchError> {
//! use repowatch_core::config::RepowatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = RepowatchConfig::load("repowatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = RepowatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, RepowatchError};

/// 로그로 노출해도 되는 형태로 가린 비밀 값
const REDACTED: &str = "********";

/// repowatch 통합 설정
///
/// `repowatch.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepowatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 저장소 클론 설정
    #[serde(default)]
    pub repository: RepositoryConfig,
    /// 취약점 스캐너 설정
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// Drupal 검사 설정
    #[serde(default)]
    pub drupal: DrupalConfig,
    /// AI 분석 설정
    #[serde(default)]
    pub ai: AiConfig,
    /// 보고서 출력 설정
    #[serde(default)]
    pub output: OutputConfig,
}

impl RepowatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RepowatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 있으면 로드하고, 없으면 기본값에 환경변수 오버라이드만 적용한 뒤 검증합니다.
    ///
    /// 사용자가 경로를 명시하지 않은 경우(기본 경로)에 사용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, RepowatchError> {
        let mut config = Self::from_file_or_default(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 있으면 파싱하고, 없으면 기본값을 반환합니다.
    ///
    /// 환경변수 오버라이드와 검증은 하지 않습니다. CLI처럼 다른 계층(플래그)을
    /// 더 얹은 뒤 한 번만 검증하려는 호출자가 사용합니다.
    pub async fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self, RepowatchError> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Self::from_file(path).await;
        }
        Ok(Self::default())
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RepowatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RepowatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                RepowatchError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, RepowatchError> {
        toml::from_str(toml_str).map_err(|e| {
            RepowatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 오래된 배포 환경과 호환되는 짧은 이름(`SCAN_TEMP_DIR`, `OUTPUT_DIR`,
    /// `LOG_LEVEL`, `OPENAI_*`, `ANTHROPIC_API_KEY`)을 먼저 적용하고,
    /// 그 다음 `REPOWATCH_{SECTION}_{FIELD}` 형식을 적용합니다.
    ///
    /// `OPENAI_BASE_URL`, `OPENAI_MODEL`은 OpenAI 전용 필드에만 들어갑니다.
    /// 값을 무시한 경우 `warn!`을 남기므로, 구독자가 설치된 뒤 호출해야 보입니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.temp_dir, "SCAN_TEMP_DIR");
        override_string(&mut self.general.output_dir, "OUTPUT_DIR");
        override_string(&mut self.general.repos_file, "REPOS_FILE");
        override_string(&mut self.general.log_level, "LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOG_FORMAT");
        override_string(&mut self.general.temp_dir, "REPOWATCH_GENERAL_TEMP_DIR");
        override_string(&mut self.general.output_dir, "REPOWATCH_GENERAL_OUTPUT_DIR");
        override_string(&mut self.general.repos_file, "REPOWATCH_GENERAL_REPOS_FILE");
        override_string(&mut self.general.log_level, "REPOWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "REPOWATCH_GENERAL_LOG_FORMAT");

        // Repository
        override_bool(&mut self.repository.cleanup, "REPOWATCH_REPOSITORY_CLEANUP");
        override_u32(
            &mut self.repository.clone_depth,
            "REPOWATCH_REPOSITORY_CLONE_DEPTH",
        );
        override_u64(
            &mut self.repository.clone_timeout_secs,
            "REPOWATCH_REPOSITORY_CLONE_TIMEOUT_SECS",
        );

        // Scanner
        override_string(&mut self.scanner.safety_bin, "REPOWATCH_SCANNER_SAFETY_BIN");
        override_string(&mut self.scanner.bandit_bin, "REPOWATCH_SCANNER_BANDIT_BIN");
        override_u64(
            &mut self.scanner.tool_timeout_secs,
            "REPOWATCH_SCANNER_TOOL_TIMEOUT_SECS",
        );
        override_usize(&mut self.scanner.max_depth, "REPOWATCH_SCANNER_MAX_DEPTH");

        // Drupal
        override_bool(&mut self.drupal.enabled, "REPOWATCH_DRUPAL_ENABLED");
        override_string(&mut self.drupal.registry_url, "REPOWATCH_DRUPAL_REGISTRY_URL");
        override_u64(
            &mut self.drupal.request_timeout_secs,
            "REPOWATCH_DRUPAL_REQUEST_TIMEOUT_SECS",
        );

        // AI
        override_string(&mut self.ai.openai_api_key, "OPENAI_API_KEY");
        override_string(&mut self.ai.openai_base_url, "OPENAI_BASE_URL");
        override_string(&mut self.ai.openai_model, "OPENAI_MODEL");
        override_string(&mut self.ai.anthropic_api_key, "ANTHROPIC_API_KEY");
        override_bool(&mut self.ai.enabled, "REPOWATCH_AI_ENABLED");
        override_string(&mut self.ai.provider, "REPOWATCH_AI_PROVIDER");
        override_string(&mut self.ai.model, "REPOWATCH_AI_MODEL");
        override_string(&mut self.ai.base_url, "REPOWATCH_AI_BASE_URL");
        override_u32(&mut self.ai.max_tokens, "REPOWATCH_AI_MAX_TOKENS");
        override_f32(&mut self.ai.temperature, "REPOWATCH_AI_TEMPERATURE");
        override_u64(
            &mut self.ai.request_timeout_secs,
            "REPOWATCH_AI_REQUEST_TIMEOUT_SECS",
        );

        // Output
        override_bool(&mut self.output.text_reports, "REPOWATCH_OUTPUT_TEXT_REPORTS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RepowatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.to_lowercase().as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        for (field, value) in [
            ("general.temp_dir", &self.general.temp_dir),
            ("general.output_dir", &self.general.output_dir),
            ("general.repos_file", &self.general.repos_file),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty".to_owned()));
            }
        }

        if self.repository.clone_depth == 0 {
            return Err(invalid(
                "repository.clone_depth",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.repository.clone_timeout_secs == 0 {
            return Err(invalid(
                "repository.clone_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.scanner.tool_timeout_secs == 0 {
            return Err(invalid(
                "scanner.tool_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.scanner.max_depth == 0 {
            return Err(invalid(
                "scanner.max_depth",
                "must be greater than 0".to_owned(),
            ));
        }

        // drupal 검증
        if self.drupal.enabled {
            if !is_http_url(&self.drupal.registry_url) {
                return Err(invalid(
                    "drupal.registry_url",
                    "must start with http:// or https://".to_owned(),
                ));
            }
            if self.drupal.request_timeout_secs == 0 {
                return Err(invalid(
                    "drupal.request_timeout_secs",
                    "must be greater than 0".to_owned(),
                ));
            }
        }

        // ai 검증
        if self.ai.enabled {
            let valid_providers = ["openai", "anthropic"];
            if !valid_providers.contains(&self.ai.provider.to_lowercase().as_str()) {
                return Err(invalid(
                    "ai.provider",
                    format!("must be one of: {}", valid_providers.join(", ")),
                ));
            }

            for (field, url) in [
                ("ai.base_url", &self.ai.base_url),
                ("ai.openai_base_url", &self.ai.openai_base_url),
            ] {
                if !url.is_empty() && !is_http_url(url) {
                    return Err(invalid(
                        field,
                        "must start with http:// or https://".to_owned(),
                    ));
                }
            }

            if self.ai.max_tokens == 0 {
                return Err(invalid(
                    "ai.max_tokens",
                    "must be greater than 0".to_owned(),
                ));
            }

            if !(0.0..=2.0).contains(&self.ai.temperature) {
                return Err(invalid("ai.temperature", "must be within 0.0-2.0".to_owned()));
            }

            if self.ai.request_timeout_secs == 0 {
                return Err(invalid(
                    "ai.request_timeout_secs",
                    "must be greater than 0".to_owned(),
                ));
            }
        }

        Ok(())
    }

    /// API 키를 가린 복사본을 반환합니다 (`config show` 출력용).
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for key in [
            &mut config.ai.openai_api_key,
            &mut config.ai.anthropic_api_key,
        ] {
            if !key.is_empty() {
                *key = REDACTED.to_owned();
            }
        }
        config
    }
}

fn invalid(field: &str, reason: String) -> RepowatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 클론 임시 루트 디렉토리
    pub temp_dir: String,
    /// 보고서 출력 디렉토리
    pub output_dir: String,
    /// 저장소 URL 목록 파일 (한 줄에 하나)
    pub repos_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            temp_dir: "./temp_repos".to_owned(),
            output_dir: "./scan_results".to_owned(),
            repos_file: "repos.txt".to_owned(),
        }
    }
}

/// 저장소 클론 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// 스캔 후 클론 디렉토리 삭제 여부
    pub cleanup: bool,
    /// shallow clone 깊이
    pub clone_depth: u32,
    /// 클론 제한 시간 (초)
    pub clone_timeout_secs: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            cleanup: true,
            clone_depth: 1,
            clone_timeout_secs: 300,
        }
    }
}

/// 취약점 스캐너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// safety 실행 파일
    pub safety_bin: String,
    /// bandit 실행 파일
    pub bandit_bin: String,
    /// 도구 1회 실행 제한 시간 (초)
    pub tool_timeout_secs: u64,
    /// 파일 트리 탐색 최대 깊이
    pub max_depth: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            safety_bin: "safety".to_owned(),
            bandit_bin: "bandit".to_owned(),
            tool_timeout_secs: 600,
            max_depth: 8,
        }
    }
}

/// Drupal 검사 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrupalConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// composer p2 메타데이터 기본 URL
    pub registry_url: String,
    /// 모듈별 요청 제한 시간 (초)
    pub request_timeout_secs: u64,
}

impl Default for DrupalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            registry_url: "https://packages.drupal.org/files/packages/8/p2".to_owned(),
            request_timeout_secs: 10,
        }
    }
}

/// AI 분석 설정
///
/// `enabled`의 기본값은 `true`입니다. `--no-ai`로 끌 수 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 제공자 (openai, anthropic)
    pub provider: String,
    /// 모델명 (비어 있으면 제공자 기본값)
    pub model: String,
    /// API 기본 URL (비어 있으면 제공자 기본값)
    pub base_url: String,
    /// OpenAI 전용 모델명 (`OPENAI_MODEL`). `model`이 비어 있고 제공자가 openai일 때만 사용
    pub openai_model: String,
    /// OpenAI 전용 기본 URL (`OPENAI_BASE_URL`). `base_url`이 비어 있고 제공자가 openai일 때만 사용
    pub openai_base_url: String,
    /// OpenAI 호환 API 키
    pub openai_api_key: String,
    /// Anthropic API 키
    pub anthropic_api_key: String,
    /// 응답 최대 토큰 수
    pub max_tokens: u32,
    /// 샘플링 온도
    pub temperature: f32,
    /// 요청 제한 시간 (초)
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openai".to_owned(),
            model: String::new(),
            base_url: String::new(),
            openai_model: String::new(),
            openai_base_url: String::new(),
            openai_api_key: String::new(),
            anthropic_api_key: String::new(),
            max_tokens: 1000,
            temperature: 0.7,
            request_timeout_secs: 120,
        }
    }
}

impl AiConfig {
    /// 선택된 제공자에 적용할 기본 URL. 비어 있으면 제공자 기본값을 쓰라는 뜻입니다.
    pub fn resolved_base_url(&self) -> &str {
        self.resolve(&self.base_url, &self.openai_base_url)
    }

    /// 선택된 제공자에 적용할 모델명. 비어 있으면 제공자 기본값을 쓰라는 뜻입니다.
    pub fn resolved_model(&self) -> &str {
        self.resolve(&self.model, &self.openai_model)
    }

    fn resolve<'a>(&'a self, shared: &'a str, openai_only: &'a str) -> &'a str {
        let shared = shared.trim();
        if !shared.is_empty() || !self.provider.trim().eq_ignore_ascii_case("openai") {
            return shared;
        }
        openai_only.trim()
    }
}

/// 보고서 출력 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON 보고서 옆에 텍스트 보고서도 작성할지 여부
    pub text_reports: bool,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_f32(target: &mut f32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f32 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = RepowatchConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.temp_dir, "./temp_repos");
        assert_eq!(config.general.output_dir, "./scan_results");
        assert!(config.repository.cleanup);
        assert!(config.drupal.enabled);
        assert!(config.ai.enabled);
        assert_eq!(config.ai.provider, "openai");
        assert!(!config.output.text_reports);
    }

    #[test]
    fn default_config_passes_validation() {
        RepowatchConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = RepowatchConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.scanner.bandit_bin, "bandit");
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
output_dir = "/srv/reports"

[ai]
provider = "anthropic"
max_tokens = 2000
"#;
        let config = RepowatchConfig::parse(toml).unwrap();
        assert_eq!(config.general.output_dir, "/srv/reports");
        assert_eq!(config.general.temp_dir, "./temp_repos");
        assert_eq!(config.ai.provider, "anthropic");
        assert_eq!(config.ai.max_tokens, 2000);
        assert!((config.ai.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = RepowatchConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            RepowatchError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = RepowatchConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_unknown_provider_when_enabled() {
        let mut config = RepowatchConfig::default();
        config.ai.provider = "mistral".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ai.provider"));
    }

    #[test]
    fn validate_accepts_unknown_provider_when_disabled() {
        let mut config = RepowatchConfig::default();
        config.ai.enabled = false;
        config.ai.provider = "mistral".to_owned();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let mut config = RepowatchConfig::default();
        config.ai.temperature = 3.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn validate_rejects_non_http_registry_url() {
        let mut config = RepowatchConfig::default();
        config.drupal.registry_url = "ftp://packages.drupal.org".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("registry_url"));
    }

    #[test]
    fn validate_rejects_empty_output_dir() {
        let mut config = RepowatchConfig::default();
        config.general.output_dir = "  ".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output_dir"));
    }

    #[test]
    fn redacted_masks_only_present_keys() {
        let mut config = RepowatchConfig::default();
        config.ai.openai_api_key = "sk-secret".to_owned();
        let shown = config.redacted();
        assert_eq!(shown.ai.openai_api_key, REDACTED);
        assert!(shown.ai.anthropic_api_key.is_empty());
        // 원본은 그대로
        assert_eq!(config.ai.openai_api_key, "sk-secret");
    }

    #[test]
    #[serial]
    fn env_override_legacy_names() {
        // SAFETY: serial 테스트이므로 다른 테스트와 동시에 환경변수를 조작하지 않습니다.
        unsafe {
            std::env::set_var("SCAN_TEMP_DIR", "/tmp/rw-clones");
            std::env::set_var("OPENAI_MODEL", "gpt-oss-20b");
        }
        let mut config = RepowatchConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.general.temp_dir, "/tmp/rw-clones");
        assert_eq!(config.ai.openai_model, "gpt-oss-20b");
        assert!(config.ai.model.is_empty());
        assert_eq!(config.ai.resolved_model(), "gpt-oss-20b");
        unsafe {
            std::env::remove_var("SCAN_TEMP_DIR");
            std::env::remove_var("OPENAI_MODEL");
        }
    }

    #[test]
    #[serial]
    fn openai_env_names_do_not_reach_anthropic() {
        // SAFETY: serial 테스트이므로 다른 테스트와 동시에 환경변수를 조작하지 않습니다.
        unsafe {
            std::env::set_var("OPENAI_MODEL", "gpt-oss-20b");
            std::env::set_var("OPENAI_BASE_URL", "http://localhost:8000/v1");
            std::env::set_var("REPOWATCH_AI_PROVIDER", "anthropic");
        }
        let mut config = RepowatchConfig::default();
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("OPENAI_MODEL");
            std::env::remove_var("OPENAI_BASE_URL");
            std::env::remove_var("REPOWATCH_AI_PROVIDER");
        }

        assert_eq!(config.ai.provider, "anthropic");
        assert_eq!(config.ai.resolved_model(), "");
        assert_eq!(config.ai.resolved_base_url(), "");
    }

    #[test]
    fn shared_ai_fields_win_over_openai_only_fields() {
        let mut config = RepowatchConfig::default();
        config.ai.openai_model = "gpt-oss-20b".to_owned();
        config.ai.openai_base_url = "http://localhost:8000/v1".to_owned();
        assert_eq!(config.ai.resolved_base_url(), "http://localhost:8000/v1");

        config.ai.model = "gpt-4o".to_owned();
        assert_eq!(config.ai.resolved_model(), "gpt-4o");
    }

    #[test]
    fn validate_rejects_non_http_openai_base_url() {
        let mut config = RepowatchConfig::default();
        config.ai.openai_base_url = "localhost:8000".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ai.openai_base_url"));
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        // SAFETY: serial 테스트이므로 다른 테스트와 동시에 환경변수를 조작하지 않습니다.
        unsafe { std::env::set_var("REPOWATCH_AI_ENABLED", "nope") };
        let mut config = RepowatchConfig::default();
        config.apply_env_overrides();
        assert!(config.ai.enabled);
        unsafe { std::env::remove_var("REPOWATCH_AI_ENABLED") };
    }

    #[test]
    #[serial]
    fn env_override_f32() {
        let mut val = 0.7_f32;
        // SAFETY: serial 테스트이므로 다른 테스트와 동시에 환경변수를 조작하지 않습니다.
        unsafe { std::env::set_var("TEST_REPOWATCH_F32", "0.2") };
        override_f32(&mut val, "TEST_REPOWATCH_F32");
        assert!((val - 0.2).abs() < f32::EPSILON);
        unsafe { std::env::remove_var("TEST_REPOWATCH_F32") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_REPOWATCH_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = RepowatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = RepowatchConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.output_dir, parsed.general.output_dir);
        assert_eq!(config.drupal.registry_url, parsed.drupal.registry_url);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = RepowatchConfig::from_file("/nonexistent/path/repowatch.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepowatchError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    #[serial]
    async fn from_file_or_default_skips_env_and_validation() {
        // SAFETY: serial 테스트이므로 다른 테스트와 동시에 환경변수를 조작하지 않습니다.
        unsafe { std::env::set_var("LOG_LEVEL", "WARNING") };

        let strict = RepowatchConfig::load_or_default("/nonexistent/path/repowatch.toml").await;
        let mut layered = RepowatchConfig::from_file_or_default("/nonexistent/path/repowatch.toml")
            .await
            .unwrap();
        layered.apply_env_overrides();

        unsafe { std::env::remove_var("LOG_LEVEL") };

        assert!(strict.unwrap_err().to_string().contains("general.log_level"));
        assert_eq!(layered.general.log_level, "WARNING");
        layered.general.log_level = "warn".to_owned();
        layered.validate().unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn load_or_default_without_file_uses_defaults() {
        let config = RepowatchConfig::load_or_default("/nonexistent/path/repowatch.toml")
            .await
            .unwrap();
        assert_eq!(config.scanner.safety_bin, "safety");
    }
}
