//! composer.json 파싱 -- Drupal 프로젝트 판별과 contrib 모듈 추출

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use repowatch_core::error::ManifestError;

/// composer 매니페스트 파일 이름
pub const COMPOSER_FILE: &str = "composer.json";

/// 이 중 하나라도 `require`에 있으면 Drupal 프로젝트
const DRUPAL_INDICATORS: &[&str] = &[
    "drupal/core",
    "drupal/core-recommended",
    "drupal/core-composer-scaffold",
];

/// core 버전을 읽을 패키지 (우선순위 순)
const CORE_VERSION_PACKAGES: &[&str] = &["drupal/core", "drupal/core-recommended"];

/// contrib 모듈에서 제외하는 core 패키지
const CORE_PACKAGES: &[&str] = &[
    "drupal/core",
    "drupal/core-recommended",
    "drupal/core-composer-scaffold",
    "drupal/core-dev",
    "drupal/core-project-message",
    "drupal/core-vendor-hardening",
];

/// composer.json 중 필요한 부분
#[derive(Debug, Default, Deserialize)]
pub struct ComposerManifest {
    #[serde(default, deserialize_with = "package_map")]
    require: BTreeMap<String, Value>,
}

/// PHP는 빈 연관 배열을 `[]`로 직렬화합니다.
#[derive(Deserialize)]
#[serde(untagged)]
enum PackageMapField {
    Map(BTreeMap<String, Value>),
    List(Vec<IgnoredAny>),
}

fn package_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match PackageMapField::deserialize(deserializer)? {
        PackageMapField::Map(map) => Ok(map),
        PackageMapField::List(items) if items.is_empty() => Ok(BTreeMap::new()),
        PackageMapField::List(_) => Err(serde::de::Error::custom(
            "expected a package map or an empty array",
        )),
    }
}

impl ComposerManifest {
    /// JSON 문자열에서 파싱합니다.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        serde_json::from_str(content).map_err(|e| ManifestError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn is_drupal(&self) -> bool {
        DRUPAL_INDICATORS
            .iter()
            .any(|pkg| self.require.contains_key(*pkg))
    }

    /// core 버전 제약 조건
    pub fn core_version(&self) -> Option<String> {
        CORE_VERSION_PACKAGES
            .iter()
            .find_map(|pkg| self.require.get(*pkg)?.as_str().map(str::to_owned))
    }

    /// contrib 모듈 목록 `(패키지 이름, 버전 제약 조건)`
    pub fn contrib_modules(&self) -> Vec<(String, String)> {
        self.require
            .iter()
            .filter(|(name, _)| name.starts_with("drupal/") && !CORE_PACKAGES.contains(&name.as_str()))
            .map(|(name, constraint)| {
                let constraint = constraint.as_str().unwrap_or("*").to_owned();
                (name.clone(), constraint)
            })
            .collect()
    }
}

/// 저장소 루트의 composer.json을 읽습니다. 파일이 없으면 `None`.
pub async fn read_manifest(repo: &Path) -> Result<Option<ComposerManifest>, ManifestError> {
    let path = repo.join(COMPOSER_FILE);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ManifestError::Read {
                path: path.display().to_string(),
                source: e,
            });
        }
    };
    ComposerManifest::parse(&content, &path).map(Some)
}
