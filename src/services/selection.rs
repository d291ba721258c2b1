//! 入选论文提取 - 业务能力层
//!
//! 把生成服务返回的自由文本视为不可信输入，唯一的解析边界就是
//! 摘要页 URL 的模式匹配：不假设存在任何结构化字段。

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::models::PaperRef;
use crate::services::arxiv_url::paper_ref_from_abstract_url;

/// 摘要页链接
///
/// 先按编号语法匹配，匹配结束于编号（可带版本和结尾斜杠），
/// 紧跟的标点不会吞掉下一个链接；不符合编号语法的退回到宽松分支，
/// 只吃到第一个非路径字符为止，供丢弃记录使用
static ABSTRACT_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<url>https?://(?:www\.|export\.)?arxiv\.org/abs/",
        r"(?:(?:\d{4}\.\d{4,5}|[a-z][a-z\-]*(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?/?",
        r"|[A-Za-z0-9._\-/]*))",
        r"(?:[^A-Za-z0-9_\-]|$)",
    ))
    .expect("valid regex")
});

/// 提取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// 按首次出现顺序排列、按编号去重的论文
    pub papers: Vec<PaperRef>,
    /// 无法推导编号而被丢弃的匹配
    pub dropped: Vec<ParseError>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

/// 从摘要文本中提取入选论文
///
/// - 按首次出现的顺序扫描摘要页 URL（顺序即重要度）
/// - 编号相同的 URL 只保留第一次出现的位置
/// - 编号无法推导的匹配被丢弃并记为警告
/// - 没有任何匹配时返回空结果，而不是错误
pub fn extract_selection(text: &str) -> Selection {
    let mut selection = Selection::default();
    let mut seen = HashSet::new();

    for caps in ABSTRACT_LINK_RE.captures_iter(text) {
        let Some(m) = caps.name("url") else { continue };
        let raw = trim_trailing_punctuation(m.as_str());

        match paper_ref_from_abstract_url(raw) {
            Ok(paper) => {
                if seen.insert(paper.identifier.clone()) {
                    debug!("提取到论文 #{}: {}", selection.papers.len() + 1, paper.identifier);
                    selection.papers.push(paper);
                } else {
                    debug!("重复的论文链接，忽略: {}", raw);
                }
            }
            Err(e) => {
                warn!("⚠️ 丢弃无法识别的论文链接: {}", e);
                selection.dropped.push(e);
            }
        }
    }

    selection
}

/// 去掉 Markdown / 句末标点
fn trim_trailing_punctuation(url: &str) -> &str {
    url.trim_end_matches(|c: char| {
        matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '*' | '_' | '`' | '\\')
    })
}
