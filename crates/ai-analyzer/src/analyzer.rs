//! AI 분석기 -- `SummaryProvider` 구현과 설정 기반 선택

use tracing::{info, warn};

use repowatch_core::config::AiConfig;
use repowatch_core::error::{AiProviderError, RepowatchError};
use repowatch_core::pipeline::{BoxFuture, DisabledSummary, SummaryProvider};
use repowatch_core::types::ScanResult;

use crate::prompt::{SYSTEM_PROMPT, build_prompt};
use crate::provider::CompletionClient;

/// 완성 API로 스캔 결과를 요약하는 분석기
#[derive(Debug, Clone)]
pub struct AiAnalyzer {
    client: CompletionClient,
}

impl AiAnalyzer {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    pub fn from_core(config: &AiConfig) -> Result<Self, RepowatchError> {
        Ok(Self::new(CompletionClient::from_core(config)?))
    }

    /// 스캔 결과 하나를 분석합니다.
    pub async fn analyze_result(&self, result: &ScanResult) -> Result<String, AiProviderError> {
        let prompt = build_prompt(result);
        info!(
            repo = %result.repo_name,
            provider = %self.client.provider(),
            model = self.client.model(),
            "requesting ai analysis"
        );
        let analysis = self.client.complete(SYSTEM_PROMPT, &prompt).await;
        if let Err(e) = &analysis {
            warn!(repo = %result.repo_name, error = %e, "ai analysis failed");
        }
        analysis
    }
}

impl SummaryProvider for AiAnalyzer {
    fn analyze<'a>(
        &'a self,
        result: &'a ScanResult,
    ) -> BoxFuture<'a, Result<Option<String>, AiProviderError>> {
        Box::pin(async move { self.analyze_result(result).await.map(Some) })
    }
}

/// 설정에 따라 활성/비활성 구현을 고릅니다.
pub fn summary_provider(config: &AiConfig) -> Result<Box<dyn SummaryProvider>, RepowatchError> {
    if !config.enabled {
        info!("ai analysis disabled");
        return Ok(Box::new(DisabledSummary));
    }
    Ok(Box::new(AiAnalyzer::from_core(config)?))
}

#[cfg(test)]
mod tests {
    use repowatch_core::types::ScanTarget;

    use super::*;

    #[tokio::test]
    async fn disabled_config_selects_noop_provider() {
        let config = AiConfig {
            enabled: false,
            // 비활성일 때는 잘못된 제공자도 검사하지 않음
            provider: "mistral".to_owned(),
            ..AiConfig::default()
        };
        let provider = summary_provider(&config).unwrap();
        let result = ScanResult::start(&ScanTarget::from_url("https://example.com/a/b.git"));
        assert!(provider.analyze(&result).await.unwrap().is_none());
    }

    #[test]
    fn enabled_config_with_unknown_provider_fails() {
        let config = AiConfig {
            provider: "mistral".to_owned(),
            ..AiConfig::default()
        };
        assert!(matches!(
            summary_provider(&config),
            Err(RepowatchError::Config(_))
        ));
    }
}
