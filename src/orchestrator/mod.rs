//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责阶段调度和失败策略，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理应用生命周期（初始化、运行、统计）
//! - 持有网络客户端（抓取、生成、语音合成）
//! - 运行前按 `keep_days` 清理旧目录
//!
//! ### `pipeline` - 流水线状态机
//! - 依次执行列表获取 → 摘要与选题 → 逐篇处理
//! - 唯一拥有跨阶段知识的组件
//! - 决定失败是致命还是只影响单篇论文
//! - 以有界并发处理论文，由单一累加器收集结果
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (App)
//!     ↓
//! pipeline (RunResult)
//!     ↓
//! workflow::PaperFlow (处理单篇 PaperRef)
//!     ↓
//! services (能力层：URL 变换 / 选题提取 / 文本提取 / 存储)
//!     ↓
//! infrastructure (基础设施：HTTP / LLM / TTS 客户端)
//! ```

pub mod batch_processor;
pub mod pipeline;

// 重新导出主要类型
pub use batch_processor::{App, Capabilities};
pub use pipeline::Pipeline;
