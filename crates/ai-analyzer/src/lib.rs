//! # repowatch-ai-analyzer
//!
//! 스캔 결과를 요약한 프롬프트를 완성 API에 보내 보안 분석 텍스트를 받습니다.
//!
//! - [`prompt`]: 프롬프트 생성
//! - [`provider`]: OpenAI / Anthropic 호환 HTTP 클라이언트
//! - [`analyzer`]: `SummaryProvider` 구현과 활성/비활성 선택

pub mod analyzer;
pub mod prompt;
pub mod provider;

pub use analyzer::{AiAnalyzer, summary_provider};
pub use prompt::{SYSTEM_PROMPT, build_prompt};
pub use provider::{CompletionClient, Provider};
