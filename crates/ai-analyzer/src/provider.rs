//! 완성(completion) API 클라이언트
//!
//! OpenAI 호환 `POST {base}/chat/completions`와 Anthropic 호환
//! `POST {base}/messages` 두 가지 형식을 지원합니다. 요청 하나에 응답 텍스트 하나.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use repowatch_core::config::AiConfig;
use repowatch_core::error::{AiProviderError, ConfigError, RepowatchError};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-4";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_MODEL: &str = "claude-3-sonnet-20240229";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// 에러 메시지에 담을 응답 본문 최대 길이
const MAX_ERROR_BODY: usize = 300;

/// 완성 API 제공자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_BASE_URL,
            Self::Anthropic => ANTHROPIC_BASE_URL,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_MODEL,
            Self::Anthropic => ANTHROPIC_MODEL,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Anthropic => f.write_str("anthropic"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(ConfigError::InvalidValue {
                field: "ai.provider".to_owned(),
                reason: format!("unknown provider '{other}'"),
            }),
        }
    }
}

// --- 요청/응답 형식 ---

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// 완성 API 클라이언트
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    provider: Provider,
    base_url: String,
    custom_endpoint: bool,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionClient {
    /// core 설정에서 생성합니다. 빈 값은 제공자 기본값으로 채웁니다.
    pub fn from_core(config: &AiConfig) -> Result<Self, RepowatchError> {
        let provider: Provider = config.provider.parse()?;
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .build()
            .map_err(|e| RepowatchError::HttpClient(e.to_string()))?;

        let custom_endpoint = !config.resolved_base_url().is_empty();
        let base_url = if custom_endpoint {
            config.resolved_base_url().trim_end_matches('/').to_owned()
        } else {
            provider.default_base_url().to_owned()
        };
        let model = match config.resolved_model() {
            "" => provider.default_model().to_owned(),
            m => m.to_owned(),
        };
        let api_key = match provider {
            Provider::OpenAi => &config.openai_api_key,
            Provider::Anthropic => &config.anthropic_api_key,
        };
        let api_key = Some(api_key.trim().to_owned()).filter(|k| !k.is_empty());

        if custom_endpoint {
            info!(%provider, endpoint = %base_url, %model, "completion client uses custom endpoint");
        }

        Ok(Self {
            http,
            provider,
            base_url,
            custom_endpoint,
            model,
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 프롬프트 하나를 보내고 응답 텍스트를 받습니다.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, AiProviderError> {
        debug!(provider = %self.provider, model = %self.model, prompt_len = prompt.len(), "sending completion request");
        match self.provider {
            Provider::OpenAi => self.complete_openai(system, prompt).await,
            Provider::Anthropic => self.complete_anthropic(system, prompt).await,
        }
    }

    async fn complete_openai(&self, system: &str, prompt: &str) -> Result<String, AiProviderError> {
        // 로컬 호환 서버는 키 없이도 동작하므로 사용자 지정 엔드포인트에서만 생략 허용
        if self.api_key.is_none() && !self.custom_endpoint {
            return Err(self.missing_key());
        }

        let body = OpenAiRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let text = send(request).await?;
        let response: OpenAiResponse = serde_json::from_str(&text)
            .map_err(|e| AiProviderError::MalformedResponse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AiProviderError::MalformedResponse("no message content in choices".to_owned()))
    }

    async fn complete_anthropic(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, AiProviderError> {
        let Some(key) = &self.api_key else {
            return Err(self.missing_key());
        };

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };

        let request = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let text = send(request).await?;
        let response: AnthropicResponse = serde_json::from_str(&text)
            .map_err(|e| AiProviderError::MalformedResponse(e.to_string()))?;

        let joined: Vec<String> = response
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        if joined.is_empty() {
            return Err(AiProviderError::MalformedResponse(
                "no text block in content".to_owned(),
            ));
        }
        Ok(joined.join("\n"))
    }

    fn missing_key(&self) -> AiProviderError {
        AiProviderError::MissingApiKey {
            provider: self.provider.to_string(),
        }
    }
}

/// 요청을 보내고 성공 응답 본문을 반환합니다. 상태 코드를 에러 종류로 바꿉니다.
async fn send(request: reqwest::RequestBuilder) -> Result<String, AiProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| AiProviderError::Network(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AiProviderError::Network(e.to_string()))?;

    if status.is_success() {
        return Ok(text);
    }

    let message = error_message(&text);
    Err(match status.as_u16() {
        401 | 403 => AiProviderError::Auth(message),
        429 => AiProviderError::Quota(message),
        code => AiProviderError::Http {
            status: code,
            message,
        },
    })
}

/// OpenAI, Anthropic 공통 에러 본문 `{"error": {"message": ...}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// `{"error": {"message": ...}}` 형식이면 메시지만, 아니면 본문 앞부분
fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_owned(),
    }
}
