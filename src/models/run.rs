//! 运行级数据模型
//!
//! - `RunContext`：一次运行的只读上下文
//! - `StageResult`：单个阶段的带标签结果
//! - `RunResult`：整次运行的汇总结果

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{AppError, ErrorKind};
use crate::models::paper::PaperRef;

/// 运行上下文
///
/// 运行开始时创建一次，此后只读，按引用传给每个阶段
#[derive(Debug, Clone)]
pub struct RunContext {
    run_date: NaiveDate,
    output_root: PathBuf,
    max_papers: Option<usize>,
    synthesize_audio: bool,
}

impl RunContext {
    /// 创建运行上下文
    ///
    /// 相对路径会基于当前工作目录转为绝对路径
    pub fn new(run_date: NaiveDate, output_root: impl Into<PathBuf>) -> Self {
        let output_root = output_root.into();
        let output_root = if output_root.is_absolute() {
            output_root
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(output_root),
                Err(_) => output_root,
            }
        };

        Self {
            run_date,
            output_root,
            max_papers: None,
            synthesize_audio: false,
        }
    }

    pub fn with_max_papers(mut self, max_papers: Option<usize>) -> Self {
        self.max_papers = max_papers;
        self
    }

    pub fn with_audio(mut self, synthesize_audio: bool) -> Self {
        self.synthesize_audio = synthesize_audio;
        self
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn max_papers(&self) -> Option<usize> {
        self.max_papers
    }

    pub fn synthesize_audio(&self) -> bool {
        self.synthesize_audio
    }

    /// 日期目录名 `yyyymmdd`
    pub fn date_folder_name(&self) -> String {
        self.run_date.format("%Y%m%d").to_string()
    }

    /// `<output_root>/<yyyymmdd>`
    pub fn run_dir(&self) -> PathBuf {
        self.output_root.join(self.date_folder_name())
    }
}

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageName {
    ListingFetch,
    SummarizeSelect,
    SummaryWrite,
    PaperFetch,
    ScriptGenerate,
    ScriptWrite,
    AudioSynthesis,
}

/// 阶段失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 中止整次运行
    Fatal,
    /// 记录到该论文名下，继续处理下一篇
    PerPaper,
}

impl StageName {
    /// 失败策略规则表
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            StageName::ListingFetch | StageName::SummarizeSelect | StageName::SummaryWrite => {
                FailurePolicy::Fatal
            }
            StageName::PaperFetch
            | StageName::ScriptGenerate
            | StageName::ScriptWrite
            | StageName::AudioSynthesis => FailurePolicy::PerPaper,
        }
    }
}

impl Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageName::ListingFetch => "listing_fetch",
            StageName::SummarizeSelect => "summarize_select",
            StageName::SummaryWrite => "summary_write",
            StageName::PaperFetch => "paper_fetch",
            StageName::ScriptGenerate => "script_generate",
            StageName::ScriptWrite => "script_write",
            StageName::AudioSynthesis => "audio_synthesis",
        };
        f.write_str(name)
    }
}

/// 阶段失败信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// 是否因重试次数耗尽而失败
    pub retries_exhausted: bool,
    /// 实际尝试次数
    pub attempts: u32,
}

impl StageFailure {
    pub fn from_error(err: &AppError, attempts: u32, retries_exhausted: bool) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            retries_exhausted,
            attempts,
        }
    }
}

impl Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if self.retries_exhausted {
            write!(f, " (已重试 {} 次)", self.attempts)?;
        }
        Ok(())
    }
}

/// 单个阶段的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult<T> {
    Success(T),
    Failure(StageFailure),
}

impl<T> StageResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, StageResult::Success(_))
    }

    pub fn into_result(self) -> Result<T, StageFailure> {
        match self {
            StageResult::Success(value) => Ok(value),
            StageResult::Failure(failure) => Err(failure),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageResult<U> {
        match self {
            StageResult::Success(value) => StageResult::Success(f(value)),
            StageResult::Failure(failure) => StageResult::Failure(failure),
        }
    }
}

/// 运行状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    ListingFetched,
    PapersSelected,
    PerPaperProcessing,
    Completed,
    Aborted,
}

impl RunState {
    /// 状态迁移是否合法
    ///
    /// 只能单步前进；任意非终止状态都可进入 `Aborted`
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Completed, _) | (Aborted, _) => false,
            (_, Aborted) => true,
            (NotStarted, ListingFetched)
            | (ListingFetched, PapersSelected)
            | (PapersSelected, PerPaperProcessing)
            | (PerPaperProcessing, Completed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}

/// 失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub stage: StageName,
    /// 论文级失败时为该论文编号
    pub identifier: Option<String>,
    pub failure: StageFailure,
}

impl FailureRecord {
    pub fn is_fatal(&self) -> bool {
        self.stage.failure_policy() == FailurePolicy::Fatal
    }
}

impl Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "[{}] {} - {}", self.stage, id, self.failure),
            None => write!(f, "[{}] {}", self.stage, self.failure),
        }
    }
}

/// 运行整体结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    PartialSuccess,
    Fatal,
}

/// 运行结果
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_date: NaiveDate,
    pub state: RunState,
    /// 按重要度排序的入选论文
    pub selected_papers: Vec<PaperRef>,
    pub summary_path: Option<PathBuf>,
    /// 论文编号 -> 台本路径
    pub scripts_written: BTreeMap<String, PathBuf>,
    /// 论文编号 -> 音频路径
    pub audio_written: BTreeMap<String, PathBuf>,
    pub failures: Vec<FailureRecord>,
    /// 非致命警告（如被丢弃的匹配）
    pub warnings: Vec<String>,
}

impl RunResult {
    pub fn outcome(&self) -> RunOutcome {
        if self.state == RunState::Aborted {
            RunOutcome::Fatal
        } else if self.failures.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::PartialSuccess
        }
    }

    /// 致命失败（最多一条）
    pub fn fatal_failure(&self) -> Option<&FailureRecord> {
        self.failures.iter().find(|f| f.is_fatal())
    }

    /// 指定论文的失败记录
    pub fn failures_for<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a FailureRecord> {
        self.failures
            .iter()
            .filter(move |f| f.identifier.as_deref() == Some(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 6).unwrap()
    }

    #[test]
    fn test_date_folder_is_zero_padded() {
        let ctx = RunContext::new(date(), "/tmp/out");
        assert_eq!(ctx.date_folder_name(), "20240906");
        assert_eq!(ctx.run_dir(), PathBuf::from("/tmp/out/20240906"));
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let ctx = RunContext::new(date(), "data");
        assert!(ctx.output_root().is_absolute());
        assert!(ctx.output_root().ends_with("data"));
    }

    #[test]
    fn test_state_transitions() {
        use RunState::*;
        assert!(NotStarted.can_transition_to(ListingFetched));
        assert!(ListingFetched.can_transition_to(PapersSelected));
        assert!(PerPaperProcessing.can_transition_to(Completed));
        assert!(PapersSelected.can_transition_to(Aborted));
        assert!(!NotStarted.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Aborted));
        assert!(!Aborted.can_transition_to(ListingFetched));
    }

    #[test]
    fn test_failure_policy_table() {
        assert_eq!(StageName::ListingFetch.failure_policy(), FailurePolicy::Fatal);
        assert_eq!(StageName::SummarizeSelect.failure_policy(), FailurePolicy::Fatal);
        assert_eq!(StageName::PaperFetch.failure_policy(), FailurePolicy::PerPaper);
        assert_eq!(StageName::ScriptGenerate.failure_policy(), FailurePolicy::PerPaper);
        assert_eq!(StageName::AudioSynthesis.failure_policy(), FailurePolicy::PerPaper);
    }

    #[test]
    fn test_outcome() {
        let mut result = RunResult {
            run_date: date(),
            state: RunState::Completed,
            selected_papers: Vec::new(),
            summary_path: None,
            scripts_written: BTreeMap::new(),
            audio_written: BTreeMap::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        };
        assert_eq!(result.outcome(), RunOutcome::Success);

        result.failures.push(FailureRecord {
            stage: StageName::ScriptGenerate,
            identifier: Some("2409.00002".into()),
            failure: StageFailure {
                kind: ErrorKind::Api,
                message: "timeout".into(),
                retries_exhausted: true,
                attempts: 3,
            },
        });
        assert_eq!(result.outcome(), RunOutcome::PartialSuccess);
        assert_eq!(result.failures_for("2409.00002").count(), 1);
        assert!(result.fatal_failure().is_none());

        result.state = RunState::Aborted;
        assert_eq!(result.outcome(), RunOutcome::Fatal);
    }
}
