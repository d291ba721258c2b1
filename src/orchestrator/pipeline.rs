//! 流水线状态机 - 编排层
//!
//! `NotStarted → ListingFetched → PapersSelected → PerPaperProcessing → Completed`，
//! 任意时刻都可进入吸收态 `Aborted`。
//!
//! - 列表获取、摘要生成、摘要写入失败：致命，立即结束
//! - 单篇论文的任何失败：记录后继续下一篇
//! - 论文并发处理，结果由唯一的累加器按名次顺序收集

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::models::{
    FailureRecord, PaperRef, RunContext, RunResult, RunState, StageFailure, StageName,
    StageResult,
};
use crate::services::{OutputStore, SUMMARY_FILE_NAME};
use crate::utils::logging::truncate_text;
use crate::workflow::{ListingFetch, PaperCtx, PaperFlow, PaperOutcome, SummarizeSelect};

/// 运行结果累加器
///
/// 运行期间唯一可变的共享结构，只由编排层持有
struct RunAccumulator {
    result: RunResult,
}

impl RunAccumulator {
    fn new(ctx: &RunContext) -> Self {
        Self {
            result: RunResult {
                run_date: ctx.run_date(),
                state: RunState::NotStarted,
                selected_papers: Vec::new(),
                summary_path: None,
                scripts_written: BTreeMap::new(),
                audio_written: BTreeMap::new(),
                failures: Vec::new(),
                warnings: Vec::new(),
            },
        }
    }

    fn advance(&mut self, next: RunState) {
        let current = self.result.state;
        if current.can_transition_to(next) {
            self.result.state = next;
        } else {
            warn!("忽略非法的状态迁移: {:?} → {:?}", current, next);
        }
    }

    fn warn(&mut self, message: String) {
        warn!("⚠️ {}", message);
        self.result.warnings.push(message);
    }

    /// 记录致命失败并结束运行
    fn abort(mut self, stage: StageName, failure: StageFailure) -> RunResult {
        error!("❌ [{}] 致命错误，运行中止: {}", stage, failure);
        self.result.failures.push(FailureRecord {
            stage,
            identifier: None,
            failure,
        });
        self.advance(RunState::Aborted);
        self.result
    }

    fn absorb(&mut self, outcome: PaperOutcome) {
        if let Some(path) = outcome.script_path {
            self.result
                .scripts_written
                .insert(outcome.identifier.clone(), path);
        }
        if let Some(path) = outcome.audio_path {
            self.result
                .audio_written
                .insert(outcome.identifier.clone(), path);
        }
        self.result.failures.extend(outcome.failures);
    }

    fn finish(mut self) -> RunResult {
        self.advance(RunState::Completed);
        self.result
    }
}

/// 流水线
pub struct Pipeline {
    listing_fetch: ListingFetch,
    summarize_select: SummarizeSelect,
    paper_flow: PaperFlow,
    store: OutputStore,
    listing_url: String,
    max_concurrent: usize,
}

impl Pipeline {
    pub fn new(
        listing_fetch: ListingFetch,
        summarize_select: SummarizeSelect,
        paper_flow: PaperFlow,
        store: OutputStore,
        listing_url: impl Into<String>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            listing_fetch,
            summarize_select,
            paper_flow,
            store,
            listing_url: listing_url.into(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 执行一次完整运行
    ///
    /// 永不返回错误：所有失败都记录在 `RunResult` 中
    pub async fn run(&self, ctx: &RunContext) -> RunResult {
        let mut acc = RunAccumulator::new(ctx);

        // ========== NotStarted → ListingFetched ==========
        let listing = match self.listing_fetch.run(ctx, &self.listing_url).await {
            StageResult::Success(listing) => listing,
            StageResult::Failure(failure) => return acc.abort(StageName::ListingFetch, failure),
        };
        info!("✓ 列表页获取完成，共 {} 篇论文", listing.entries.len());
        if listing.entries.is_empty() {
            acc.warn("列表页上没有找到任何论文链接".to_string());
        }
        acc.advance(RunState::ListingFetched);

        // ========== ListingFetched → PapersSelected ==========
        let output = match self.summarize_select.run(ctx, &listing).await {
            StageResult::Success(output) => output,
            StageResult::Failure(failure) => {
                return acc.abort(StageName::SummarizeSelect, failure)
            }
        };

        debug!("摘要预览: {}", truncate_text(&output.summary, 200));

        // 不论选出几篇，摘要都要落盘
        match self
            .store
            .write_artifact(ctx, SUMMARY_FILE_NAME, &output.summary)
            .await
        {
            Ok(path) => {
                info!("✅ 摘要已保存: {}", path.display());
                acc.result.summary_path = Some(path);
            }
            Err(e) => {
                return acc.abort(StageName::SummaryWrite, StageFailure::from_error(&e, 1, false))
            }
        }

        for dropped in &output.selection.dropped {
            acc.warn(format!("丢弃无法识别的论文链接: {}", dropped));
        }

        let papers = self.apply_cap(ctx, output.selection.papers, &mut acc);
        info!("✓ 入选论文 {} 篇", papers.len());
        acc.result.selected_papers = papers.clone();
        acc.advance(RunState::PapersSelected);

        // ========== PapersSelected → PerPaperProcessing ==========
        acc.advance(RunState::PerPaperProcessing);
        if papers.is_empty() {
            info!("💡 没有入选论文，跳过逐篇处理");
        } else {
            if ctx.synthesize_audio() && !self.paper_flow.has_audio() {
                acc.warn("已请求音频，但未配置语音合成能力".to_string());
            }
            self.process_papers(ctx, papers, &mut acc).await;
        }

        // ========== PerPaperProcessing → Completed ==========
        acc.finish()
    }

    /// 去重排序之后再截断，名次靠后的被舍弃
    fn apply_cap(&self, ctx: &RunContext, mut papers: Vec<PaperRef>, acc: &mut RunAccumulator) -> Vec<PaperRef> {
        if let Some(max) = ctx.max_papers() {
            if papers.len() > max {
                acc.warn(format!(
                    "入选 {} 篇，超过上限 {}，只处理前 {} 篇",
                    papers.len(),
                    max,
                    max
                ));
                papers.truncate(max);
            }
        }
        papers
    }

    async fn process_papers(&self, ctx: &RunContext, papers: Vec<PaperRef>, acc: &mut RunAccumulator) {
        let total = papers.len();
        let flow = &self.paper_flow;
        info!("📋 开始逐篇处理，最大并发数: {}", self.max_concurrent);

        stream::iter(papers.into_iter().enumerate())
            .map(|(idx, paper)| {
                let pctx = PaperCtx::new(idx + 1, total, paper);
                async move { flow.run(ctx, &pctx).await }
            })
            .buffered(self.max_concurrent)
            .for_each(|outcome| {
                acc.absorb(outcome);
                futures::future::ready(())
            })
            .await;
    }
}
