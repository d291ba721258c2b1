//! 语音合成客户端 - 基础设施层
//!
//! 直接调用 Gemini `generateContent` REST 端点：
//! - 响应模态为 AUDIO
//! - 双说话人音色：`Speaker 1` → Zephyr，`Speaker 2` → Puck
//! - 返回 base64 内联数据，解码后交给上层落盘

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{is_transient_status, ApiError, AppError, AppResult};

/// 合成出的音频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// 语音合成能力
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, script: &str) -> AppResult<AudioClip>;
}

const SPEAKER_VOICES: [(&str, &str); 2] = [("Speaker 1", "Zephyr"), ("Speaker 2", "Puck")];

/// Gemini TTS 实现
pub struct GeminiSpeech {
    client: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiSpeech {
    pub fn new(api_key: &str, api_base_url: &str, model: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::invalid_config("tts_client", e.to_string(), "可用的 HTTP 客户端配置"))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base_url, self.model)
    }
}

// ========== 请求 / 响应结构 ==========

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_modalities: Vec<&'static str>,
    speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    multi_speaker_voice_config: MultiSpeakerVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiSpeakerVoiceConfig {
    speaker_voice_configs: Vec<SpeakerVoiceConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeakerVoiceConfig {
    speaker: &'static str,
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: &'static str,
}

#[derive(Debug, Deserialize)]
struct SpeechResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

fn build_request(script: &str) -> SpeechRequest<'_> {
    SpeechRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![TextPart { text: script }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.8,
            response_modalities: vec!["AUDIO"],
            speech_config: SpeechConfig {
                multi_speaker_voice_config: MultiSpeakerVoiceConfig {
                    speaker_voice_configs: SPEAKER_VOICES
                        .iter()
                        .map(|&(speaker, voice)| SpeakerVoiceConfig {
                            speaker,
                            voice_config: VoiceConfig {
                                prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: voice },
                            },
                        })
                        .collect(),
                },
            },
        },
    }
}

/// 取出所有内联音频块并拼接
fn decode_response(model: &str, response: SpeechResponse) -> Result<AudioClip, ApiError> {
    let mut mime_type = None;
    let mut data = Vec::new();

    let parts = response
        .candidates
        .into_iter()
        .take(1)
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.inline_data);

    for inline in parts {
        let bytes = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| ApiError::ServerError {
                model: model.to_string(),
                status: None,
                message: format!("音频数据不是合法的 base64: {}", e),
            })?;
        data.extend_from_slice(&bytes);
        mime_type.get_or_insert(inline.mime_type);
    }

    match mime_type {
        Some(mime_type) if !data.is_empty() => Ok(AudioClip { mime_type, data }),
        _ => Err(ApiError::EmptyContent {
            model: model.to_string(),
        }),
    }
}

fn map_status(model: &str, status: u16, body: String) -> ApiError {
    let model = model.to_string();
    match status {
        429 => ApiError::RateLimited {
            model,
            retry_after: None,
        },
        401 | 403 => ApiError::Unauthorized {
            model,
            message: body,
        },
        s if is_transient_status(s) => ApiError::ServerError {
            model,
            status: Some(s),
            message: body,
        },
        _ => ApiError::InvalidRequest {
            model,
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeech {
    async fn synthesize(&self, script: &str) -> AppResult<AudioClip> {
        let model = self.model.as_str();
        debug!("调用语音合成，模型: {}，台本长度: {} 字符", model, script.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(script))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout {
                        model: model.to_string(),
                        after: self.timeout,
                    }
                } else {
                    ApiError::ServerError {
                        model: model.to_string(),
                        status: None,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(model, status.as_u16(), body).into());
        }

        let parsed: SpeechResponse = response.json().await.map_err(|e| ApiError::ServerError {
            model: model.to_string(),
            status: None,
            message: format!("响应无法解析: {}", e),
        })?;

        let clip = decode_response(model, parsed)?;
        debug!("语音合成完成: {} ({} 字节)", clip.mime_type, clip.data.len());
        Ok(clip)
    }
}
