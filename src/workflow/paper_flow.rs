//! 论文处理流程 - 流程层
//!
//! 核心职责：定义"一篇论文"的完整处理流程
//!
//! 流程顺序：
//! 1. 获取全文 → 提取关键章节
//! 2. 生成台本 → 校验格式
//! 3. 写入 `<identifier>.md`
//! 4. （可选）语音合成 → 写入 `audio/podcast_<identifier>.<ext>`
//!
//! 任一步失败都只记录在这篇论文名下，已写入的文件不回滚

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::{FailureRecord, RunContext, StageFailure, StageName, StageResult};
use crate::services::wav::encode_for_storage;
use crate::services::{OutputStore, AUDIO_DIR_NAME};
use crate::workflow::paper_ctx::PaperCtx;
use crate::workflow::stages::{AudioSynthesis, PaperFetch, ScriptGenerate};

/// 单篇论文的处理结果
#[derive(Debug, Clone)]
pub struct PaperOutcome {
    pub rank: usize,
    pub identifier: String,
    pub script_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub failures: Vec<FailureRecord>,
}

impl PaperOutcome {
    fn new(ctx: &PaperCtx) -> Self {
        Self {
            rank: ctx.rank,
            identifier: ctx.identifier().to_string(),
            script_path: None,
            audio_path: None,
            failures: Vec::new(),
        }
    }

    fn record(&mut self, stage: StageName, failure: StageFailure) {
        self.failures.push(FailureRecord {
            stage,
            identifier: Some(self.identifier.clone()),
            failure,
        });
    }

    /// 本地写入只尝试一次
    fn record_error(&mut self, stage: StageName, err: &AppError) {
        self.record(stage, StageFailure::from_error(err, 1, false));
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 论文处理流程
///
/// - 编排单篇论文的处理顺序
/// - 不持有网络客户端，只依赖各阶段
/// - 不出现 Vec<PaperRef>
pub struct PaperFlow {
    paper_fetch: PaperFetch,
    script_generate: ScriptGenerate,
    audio: Option<AudioSynthesis>,
    store: OutputStore,
}

impl PaperFlow {
    pub fn new(
        paper_fetch: PaperFetch,
        script_generate: ScriptGenerate,
        audio: Option<AudioSynthesis>,
        store: OutputStore,
    ) -> Self {
        Self {
            paper_fetch,
            script_generate,
            audio,
            store,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub async fn run(&self, ctx: &RunContext, pctx: &PaperCtx) -> PaperOutcome {
        let mut outcome = PaperOutcome::new(pctx);
        let paper = &pctx.paper;

        info!("{} 📄 开始处理 ({}/{})", pctx, pctx.rank, pctx.total);

        // ========== 1. 获取全文 ==========
        let content = match self.paper_fetch.run(ctx, paper).await {
            StageResult::Success(content) => content,
            StageResult::Failure(failure) => {
                error!("{} ❌ 全文获取失败: {}", pctx, failure);
                outcome.record(StageName::PaperFetch, failure);
                return outcome;
            }
        };
        info!("{} ✓ 全文获取完成 ({} 字符)", pctx, content.chars().count());

        // ========== 2. 生成台本 ==========
        let script = match self.script_generate.run(ctx, paper, &content).await {
            StageResult::Success(script) => script,
            StageResult::Failure(failure) => {
                error!("{} ❌ 台本生成失败: {}", pctx, failure);
                outcome.record(StageName::ScriptGenerate, failure);
                return outcome;
            }
        };

        // ========== 3. 写入台本 ==========
        match self
            .store
            .write_artifact(ctx, &paper.script_file_name(), &script)
            .await
        {
            Ok(path) => {
                info!("{} ✅ 台本已保存: {}", pctx, path.display());
                outcome.script_path = Some(path);
            }
            Err(e) => {
                error!("{} ❌ 台本写入失败: {}", pctx, e);
                outcome.record_error(StageName::ScriptWrite, &e);
                return outcome;
            }
        }

        // ========== 4. 语音合成（可选） ==========
        if ctx.synthesize_audio() {
            self.synthesize(ctx, pctx, &script, &mut outcome).await;
        }

        outcome
    }

    async fn synthesize(&self, ctx: &RunContext, pctx: &PaperCtx, script: &str, outcome: &mut PaperOutcome) {
        let Some(audio) = &self.audio else {
            warn!("{} ⚠️ 未配置语音合成，跳过音频", pctx);
            return;
        };

        info!("{} 🔊 正在合成音频...", pctx);
        let clip = match audio.run(ctx, script).await {
            StageResult::Success(clip) => clip,
            StageResult::Failure(failure) => {
                error!("{} ❌ 语音合成失败: {}", pctx, failure);
                outcome.record(StageName::AudioSynthesis, failure);
                return;
            }
        };

        let (ext, data) = match encode_for_storage(&clip.mime_type, clip.data) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("{} ❌ 音频封装失败: {}", pctx, e);
                outcome.record_error(StageName::AudioSynthesis, &e);
                return;
            }
        };
        let file_name = format!("podcast_{}.{}", pctx.paper.file_stem(), ext);

        match self
            .store
            .write_binary_artifact(ctx, &[AUDIO_DIR_NAME, &file_name], &data)
            .await
        {
            Ok(path) => {
                info!("{} ✅ 音频已保存: {}", pctx, path.display());
                outcome.audio_path = Some(path);
            }
            Err(e) => {
                error!("{} ❌ 音频写入失败: {}", pctx, e);
                outcome.record_error(StageName::AudioSynthesis, &e);
            }
        }
    }
}
