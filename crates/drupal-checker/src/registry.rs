//! Drupal 패키지 레지스트리 클라이언트
//!
//! composer p2 메타데이터(`{base}/drupal/{module}.json`)를 모듈당 한 번 조회해
//! 최신 안정 버전과 저장소 URL을 함께 얻습니다.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde::de::IgnoredAny;
use tracing::debug;

use repowatch_core::config::DrupalConfig;
use repowatch_core::error::{RegistryLookupError, RepowatchError};

use crate::version::latest_stable;

/// 저장소 URL을 찾기 위해 살펴보는 최대 릴리스 수
const SOURCE_LOOKUP_LIMIT: usize = 5;

/// 모듈 하나의 레지스트리 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRelease {
    /// 최신 안정 버전 (안정 릴리스가 없으면 `None`)
    pub latest_version: Option<String>,
    /// 프로젝트 저장소 URL
    pub repository_url: String,
}

/// p2 메타데이터 문서 (파싱용)
#[derive(Debug, Deserialize)]
struct P2Document {
    #[serde(default)]
    packages: HashMap<String, Vec<P2Release>>,
}

/// 릴리스 하나 (파싱용)
#[derive(Debug, Deserialize)]
struct P2Release {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    source: Option<P2SourceField>,
}

/// minified p2 문서에서는 `source`가 `"__unset"` 문자열일 수 있음
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum P2SourceField {
    Source(P2Source),
    Unset(IgnoredAny),
}

#[derive(Debug, Deserialize)]
struct P2Source {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl P2Release {
    /// git 소스 URL (비어 있지 않을 때만)
    fn git_url(&self) -> Option<&str> {
        let Some(P2SourceField::Source(source)) = &self.source else {
            return None;
        };
        if source.kind.as_deref() != Some("git") {
            return None;
        }
        source.url.as_deref().filter(|u| !u.is_empty())
    }
}

/// 레지스트리 HTTP 클라이언트
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// 기본 URL과 요청 제한 시간으로 생성합니다.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RepowatchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("repowatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepowatchError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// core 설정에서 생성합니다.
    pub fn from_core(config: &DrupalConfig) -> Result<Self, RepowatchError> {
        Self::new(
            &config.registry_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// 모듈 정보를 조회합니다.
    pub async fn lookup(&self, module: &str) -> Result<ModuleRelease, RegistryLookupError> {
        let short = short_name(module);
        let url = format!("{}/drupal/{short}.json", self.base_url);
        debug!(module, url = %url, "querying package registry");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RegistryLookupError::Network {
                module: module.to_owned(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryLookupError::NotFound {
                module: module.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(RegistryLookupError::Http {
                module: module.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RegistryLookupError::Network {
                module: module.to_owned(),
                reason: e.to_string(),
            })?;

        parse_release(module, &body)
    }
}

/// p2 문서에서 모듈 정보를 추출합니다.
pub fn parse_release(module: &str, body: &str) -> Result<ModuleRelease, RegistryLookupError> {
    let doc: P2Document =
        serde_json::from_str(body).map_err(|e| RegistryLookupError::MalformedResponse {
            module: module.to_owned(),
            reason: e.to_string(),
        })?;

    let Some(releases) = doc.packages.get(module) else {
        return Err(RegistryLookupError::NotFound {
            module: module.to_owned(),
        });
    };

    let latest_version = latest_stable(releases.iter().filter_map(|r| r.version.as_deref()));

    let repository_url = releases
        .iter()
        .take(SOURCE_LOOKUP_LIMIT)
        .find_map(P2Release::git_url)
        .map(|url| normalize_repository_url(module, url))
        .unwrap_or_else(|| project_page(module));

    Ok(ModuleRelease {
        latest_version,
        repository_url,
    })
}

/// git URL을 브라우저로 열 수 있는 URL로 바꿉니다.
///
/// - GitHub: `git@github.com:o/r.git` -> `https://github.com/o/r`
/// - drupalcode.org: drupal.org 프로젝트 페이지
/// - 그 외: `.git`만 제거
pub fn normalize_repository_url(module: &str, url: &str) -> String {
    if url.contains("git.drupalcode.org") {
        return project_page(module);
    }

    let url = url.strip_suffix(".git").unwrap_or(url);
    if let Some(path) = url.strip_prefix("git@github.com:") {
        return format!("https://github.com/{path}");
    }
    url.to_owned()
}

/// drupal.org 프로젝트 페이지 URL
pub fn project_page(module: &str) -> String {
    format!("https://www.drupal.org/project/{}", short_name(module))
}

fn short_name(module: &str) -> &str {
    module.strip_prefix("drupal/").unwrap_or(module)
}
