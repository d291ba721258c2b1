//! 基础设施层
//!
//! 持有网络客户端，只暴露能力 trait，流程层通过 trait 对象使用

pub mod http_fetcher;
pub mod llm_client;
pub mod speech_client;

pub use http_fetcher::{HttpFetcher, TextFetcher};
pub use llm_client::{GenerationRequest, OpenAiGenerator, TextGenerator};
pub use speech_client::{AudioClip, GeminiSpeech, SpeechSynthesizer};
