//! Drupal 검사기 -- composer.json 판별부터 모듈별 버전 분류까지
//!
//! 모듈 하나의 레지스트리 조회 실패는 해당 모듈을 `unknown`으로 기록할 뿐
//! 전체 검사를 중단하지 않습니다.

use std::path::Path;

use tracing::{debug, info, warn};

use repowatch_core::config::DrupalConfig;
use repowatch_core::error::RepowatchError;
use repowatch_core::pipeline::{BoxFuture, DisabledAuditor, ModuleAuditor};
use repowatch_core::types::{DrupalCheck, DrupalModuleStatus, UNKNOWN_VERSION, UpdateSeverity};

use crate::manifest::read_manifest;
use crate::registry::{RegistryClient, project_page};
use crate::version::classify;

/// Drupal contrib 모듈 검사기
#[derive(Debug, Clone)]
pub struct DrupalChecker {
    registry: RegistryClient,
}

impl DrupalChecker {
    pub fn new(registry: RegistryClient) -> Self {
        Self { registry }
    }

    /// core 설정에서 생성합니다.
    pub fn from_core(config: &DrupalConfig) -> Result<Self, RepowatchError> {
        Ok(Self::new(RegistryClient::from_core(config)?))
    }

    /// 저장소를 검사합니다.
    ///
    /// composer.json이 없거나 Drupal 패키지를 요구하지 않으면
    /// [`DrupalCheck::not_drupal`]을 반환합니다.
    pub async fn check_repository(&self, repo: &Path) -> Result<DrupalCheck, RepowatchError> {
        let Some(manifest) = read_manifest(repo).await? else {
            debug!(repo = %repo.display(), "no composer.json");
            return Ok(DrupalCheck::not_drupal());
        };
        if !manifest.is_drupal() {
            debug!(repo = %repo.display(), "composer project without drupal core");
            return Ok(DrupalCheck::not_drupal());
        }

        let core_version = manifest.core_version();
        let contrib = manifest.contrib_modules();
        info!(
            core = core_version.as_deref().unwrap_or("-"),
            modules = contrib.len(),
            "drupal project detected"
        );

        let mut modules = Vec::with_capacity(contrib.len());
        for (name, constraint) in contrib {
            modules.push(self.module_status(name, constraint).await);
        }

        let check = DrupalCheck::drupal(core_version, modules);
        info!(outdated = check.outdated().len(), "drupal module check complete");
        Ok(check)
    }

    async fn module_status(&self, module: String, current_version: String) -> DrupalModuleStatus {
        match self.registry.lookup(&module).await {
            Ok(release) => {
                let (latest_version, severity) = match release.latest_version {
                    Some(latest) => {
                        let severity = classify(&current_version, &latest);
                        (latest, severity)
                    }
                    None => (UNKNOWN_VERSION.to_owned(), UpdateSeverity::Unknown),
                };
                debug!(module = %module, current = %current_version, latest = %latest_version, %severity, "module classified");
                DrupalModuleStatus {
                    module,
                    current_version,
                    latest_version,
                    severity,
                    repository_url: Some(release.repository_url),
                }
            }
            Err(e) => {
                warn!(module = %module, error = %e, "registry lookup failed");
                let repository_url = Some(project_page(&module));
                DrupalModuleStatus {
                    module,
                    current_version,
                    latest_version: UNKNOWN_VERSION.to_owned(),
                    severity: UpdateSeverity::Unknown,
                    repository_url,
                }
            }
        }
    }
}

impl ModuleAuditor for DrupalChecker {
    fn audit<'a>(
        &'a self,
        repo: &'a Path,
    ) -> BoxFuture<'a, Result<Option<DrupalCheck>, RepowatchError>> {
        Box::pin(async move { self.check_repository(repo).await.map(Some) })
    }
}

/// 설정에 따라 활성/비활성 구현을 고릅니다.
pub fn module_auditor(config: &DrupalConfig) -> Result<Box<dyn ModuleAuditor>, RepowatchError> {
    if !config.enabled {
        info!("drupal module check disabled");
        return Ok(Box::new(DisabledAuditor));
    }
    Ok(Box::new(DrupalChecker::from_core(config)?))
}
