//! 论文处理上下文
//!
//! 封装"我正在处理第几篇、哪一篇论文"这一信息

use std::fmt::Display;

use crate::models::PaperRef;

/// 论文处理上下文
#[derive(Debug, Clone)]
pub struct PaperCtx {
    /// 在入选列表中的名次（从1开始）
    pub rank: usize,

    /// 本次处理的论文总数（仅用于日志显示）
    pub total: usize,

    pub paper: PaperRef,
}

impl PaperCtx {
    pub fn new(rank: usize, total: usize, paper: PaperRef) -> Self {
        Self { rank, total, paper }
    }

    pub fn identifier(&self) -> &str {
        &self.paper.identifier
    }
}

impl Display for PaperCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[论文 {}]", self.paper.identifier)
    }
}
