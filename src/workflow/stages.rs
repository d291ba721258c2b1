//! 流水线阶段 - 流程层
//!
//! 每个阶段只包装一次外部调用（抓取或生成），通过 `StageRunner`
//! 获得统一的超时与重试语义，自身不做任何文件读写

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{ApiError, AppError, AppResult, NetworkError};
use crate::infrastructure::{
    AudioClip, GenerationRequest, SpeechSynthesizer, TextFetcher, TextGenerator,
};
use crate::models::{PaperRef, RunContext, StageResult};
use crate::services::html_text::{extract_key_sections, listing_to_text, parse_listing_entries};
use crate::services::script_format::validate_script;
use crate::services::{extract_selection, Selection};
use crate::workflow::stage_runner::StageRunner;

/// 一次生成调用的参数
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f32,
}

impl GenerationSettings {
    fn request(&self, user_input: String) -> GenerationRequest {
        GenerationRequest {
            system_prompt: self.system_prompt.clone(),
            user_input,
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }
}

fn network_timeout(url: &str) -> impl Fn(Duration) -> AppError + '_ {
    move |after| {
        NetworkError::Timeout {
            url: url.to_string(),
            after,
        }
        .into()
    }
}

fn api_timeout(model: &str) -> impl Fn(Duration) -> AppError + '_ {
    move |after| {
        ApiError::Timeout {
            model: model.to_string(),
            after,
        }
        .into()
    }
}

fn non_empty(model: &str, text: String) -> AppResult<String> {
    if text.trim().is_empty() {
        return Err(ApiError::EmptyContent {
            model: model.to_string(),
        }
        .into());
    }
    Ok(text)
}

// ========== 1. 列表页获取 ==========

/// 新着列表
#[derive(Debug, Clone)]
pub struct Listing {
    /// 列表页上的所有论文，按页面顺序
    pub entries: Vec<PaperRef>,
    /// 交给摘要阶段的纯文本
    pub text: String,
}

pub struct ListingFetch {
    fetcher: Arc<dyn TextFetcher>,
    runner: StageRunner,
}

impl ListingFetch {
    pub fn new(fetcher: Arc<dyn TextFetcher>, runner: StageRunner) -> Self {
        Self { fetcher, runner }
    }

    pub async fn run(&self, ctx: &RunContext, listing_url: &str) -> StageResult<Listing> {
        info!("📥 正在获取新着列表 ({}): {}", ctx.run_date(), listing_url);

        self.runner
            .run("列表页获取", network_timeout(listing_url), || {
                self.fetcher.fetch_text(listing_url)
            })
            .await
            .map(|html| Listing {
                entries: parse_listing_entries(&html),
                text: listing_to_text(&html),
            })
    }
}

// ========== 2. 摘要与选题 ==========

/// 摘要阶段的产出
#[derive(Debug, Clone)]
pub struct SummaryOutput {
    /// 原样保存为 abstract.md
    pub summary: String,
    pub selection: Selection,
}

pub struct SummarizeSelect {
    generator: Arc<dyn TextGenerator>,
    runner: StageRunner,
    settings: GenerationSettings,
}

impl SummarizeSelect {
    pub fn new(generator: Arc<dyn TextGenerator>, runner: StageRunner, settings: GenerationSettings) -> Self {
        Self {
            generator,
            runner,
            settings,
        }
    }

    pub async fn run(&self, ctx: &RunContext, listing: &Listing) -> StageResult<SummaryOutput> {
        info!(
            "🧠 正在生成 {} 的论文摘要 (模型: {})",
            ctx.run_date(),
            self.settings.model
        );

        let model = self.settings.model.as_str();
        let request = &self
            .settings
            .request(format!("# 输入论文列表\n{}", listing.text));

        self.runner
            .run("摘要与选题", api_timeout(model), || async move {
                let summary = self.generator.generate(request).await?;
                non_empty(model, summary)
            })
            .await
            .map(|summary| {
                // 提取只在生成成功之后进行
                let selection = extract_selection(&summary);
                SummaryOutput { summary, selection }
            })
    }
}

// ========== 3. 论文全文获取 ==========

pub struct PaperFetch {
    fetcher: Arc<dyn TextFetcher>,
    runner: StageRunner,
}

impl PaperFetch {
    pub fn new(fetcher: Arc<dyn TextFetcher>, runner: StageRunner) -> Self {
        Self { fetcher, runner }
    }

    /// 抓取全文页并提取关键章节
    pub async fn run(&self, ctx: &RunContext, paper: &PaperRef) -> StageResult<String> {
        debug!("{} 获取全文: {}", ctx.date_folder_name(), paper.full_text_url);
        let url = paper.full_text_url.as_str();

        self.runner
            .run("全文获取", network_timeout(url), || async move {
                let html = self.fetcher.fetch_text(url).await?;
                extract_key_sections(&html)
            })
            .await
    }
}

// ========== 4. 台本生成 ==========

pub struct ScriptGenerate {
    generator: Arc<dyn TextGenerator>,
    runner: StageRunner,
    settings: GenerationSettings,
}

impl ScriptGenerate {
    pub fn new(generator: Arc<dyn TextGenerator>, runner: StageRunner, settings: GenerationSettings) -> Self {
        Self {
            generator,
            runner,
            settings,
        }
    }

    /// 生成并校验台本
    pub async fn run(&self, ctx: &RunContext, paper: &PaperRef, content: &str) -> StageResult<String> {
        debug!("{} 生成台本: {}", ctx.date_folder_name(), paper.identifier);

        let model = self.settings.model.as_str();
        let identifier = paper.identifier.as_str();
        let request = &self.settings.request(format!(
            "论文编号: {}\n摘要页: {}\n\n论文内容：\n{}",
            paper.identifier, paper.abstract_url, content
        ));

        self.runner
            .run("台本生成", api_timeout(model), || async move {
                let script = non_empty(model, self.generator.generate(request).await?)?;
                validate_script(identifier, &script)?;
                Ok(script)
            })
            .await
    }
}

// ========== 5. 语音合成（可选） ==========

pub struct AudioSynthesis {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    runner: StageRunner,
    model: String,
}

impl AudioSynthesis {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, runner: StageRunner, model: impl Into<String>) -> Self {
        Self {
            synthesizer,
            runner,
            model: model.into(),
        }
    }

    pub async fn run(&self, ctx: &RunContext, script: &str) -> StageResult<AudioClip> {
        debug!("{} 合成音频，台本长度: {} 字符", ctx.date_folder_name(), script.len());

        self.runner
            .run("语音合成", api_timeout(&self.model), || {
                self.synthesizer.synthesize(script)
            })
            .await
    }
}
