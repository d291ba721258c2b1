//! 生成服务客户端 - 基础设施层
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（默认是 Gemini 的 OpenAI 兼容端点）
//! - 失败统一映射为 `ApiError` 的各个子类

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ApiError, AppResult};

/// 一次生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_input: String,
    pub model: String,
    pub temperature: f32,
}

/// 文本生成能力
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> AppResult<String>;
}

/// 基于 async-openai 的生成实现
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, api_base_url: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base_url);

        Self {
            client: Client::with_config(openai_config),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        let model = request.model.as_str();
        debug!(
            "调用生成服务，模型: {}，输入长度: {} 字符",
            model,
            request.user_input.len()
        );

        let invalid = |e: OpenAIError| ApiError::InvalidRequest {
            model: model.to_string(),
            message: e.to_string(),
        };

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system_prompt.as_str())
            .build()
            .map_err(invalid)?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user_input.as_str())
            .build()
            .map_err(invalid)?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(request.temperature)
            .build()
            .map_err(invalid)?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("生成服务调用失败: {}", e);
            map_openai_error(model, e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ApiError::EmptyContent {
                model: model.to_string(),
            })?;

        debug!("生成服务调用成功，输出长度: {} 字符", content.len());
        Ok(content)
    }
}

/// 把 async-openai 的错误归入 `ApiError` 子类
fn map_openai_error(model: &str, err: OpenAIError) -> ApiError {
    let model = model.to_string();
    match err {
        OpenAIError::ApiError(api) => {
            let signal = format!("{:?} {:?} {}", api.r#type, api.code, api.message).to_lowercase();
            classify_api_message(model, &signal, api.message)
        }
        OpenAIError::Reqwest(e) => {
            let status = e.status().map(|s| s.as_u16());
            if status == Some(429) {
                ApiError::RateLimited {
                    model,
                    retry_after: None,
                }
            } else if matches!(status, Some(401) | Some(403)) {
                ApiError::Unauthorized {
                    model,
                    message: e.to_string(),
                }
            } else if matches!(status, Some(s) if (400..500).contains(&s)) {
                ApiError::InvalidRequest {
                    model,
                    message: e.to_string(),
                }
            } else {
                ApiError::ServerError {
                    model,
                    status,
                    message: e.to_string(),
                }
            }
        }
        OpenAIError::JSONDeserialize(e, _) => ApiError::ServerError {
            model,
            status: None,
            message: format!("响应无法解析: {}", e),
        },
        other => ApiError::InvalidRequest {
            model,
            message: other.to_string(),
        },
    }
}

/// 按错误码和消息关键词分类
fn classify_api_message(model: String, signal: &str, message: String) -> ApiError {
    const RATE_LIMIT: [&str; 4] = ["rate_limit", "rate limit", "quota", "resource_exhausted"];
    const AUTH: [&str; 5] = [
        "invalid_api_key",
        "api key",
        "unauthenticated",
        "permission_denied",
        "unauthorized",
    ];
    const SERVER: [&str; 5] = ["server_error", "internal", "unavailable", "overloaded", "deadline"];

    if RATE_LIMIT.iter().any(|k| signal.contains(k)) {
        ApiError::RateLimited {
            model,
            retry_after: None,
        }
    } else if AUTH.iter().any(|k| signal.contains(k)) {
        ApiError::Unauthorized { model, message }
    } else if SERVER.iter().any(|k| signal.contains(k)) {
        ApiError::ServerError {
            model,
            status: None,
            message,
        }
    } else {
        ApiError::InvalidRequest { model, message }
    }
}
