//! # arXiv Podcast
//!
//! 把 arXiv cs.IR 每日新论文整理成中文摘要和双人播客台本
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有网络客户端，只暴露能力
//! - `TextFetcher` - 获取网页文本
//! - `TextGenerator` - 调用 LLM 生成文本
//! - `SpeechSynthesizer` - 台本转语音
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 纯函数和单一职责的能力
//! - `arxiv_url` - 摘要页 URL → 全文 URL
//! - `selection` - 从摘要中提取选中的论文
//! - `html_text` - 网页 → 文本
//! - `OutputStore` - 日期目录下的文件读写
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇论文"的完整处理流程
//! - `StageRunner` - 超时与退避重试
//! - `PaperFlow` - 全文获取 → 台本生成 → 写入 → 语音（可选）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 流水线状态机，决定失败是否致命
//! - `orchestrator/batch_processor` - 应用入口，管理资源和统计
//!
//! ## 模块结构

pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{PaperRef, RunContext, RunOutcome, RunResult};
pub use orchestrator::{App, Capabilities, Pipeline};
pub use workflow::{PaperCtx, PaperFlow, RetryPolicy, StageRunner};
