//! HTML 文本提取 - 业务能力层
//!
//! 只用正则做轻量提取，不构建 DOM：
//! - 新着列表页 → 论文条目、带绝对链接的纯文本
//! - 论文全文页 → 标题、摘要、引言和编号章节

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::PaperRef;
use crate::services::arxiv_url::{paper_ref_from_abstract_url, ARXIV_ORIGIN};

/// 编号章节的最短长度（字符）
const MIN_SECTION_CHARS: usize = 100;
/// 编号章节的截断长度（字符）
const MAX_SECTION_CHARS: usize = 500;
/// 没有识别到任何章节时，整页文本的截断长度（字符）
const FALLBACK_MAX_CHARS: usize = 8000;

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->")
        .expect("valid regex")
});

static BLOCK_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:p|div|br|li|ul|ol|dl|dt|dd|h[1-6]|tr|table|section|article|header|footer|blockquote)\b[^>]*>",
    )
    .expect("valid regex")
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid regex")
});

static ABS_HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"'#?\s]*/abs/[^"'#?\s]+)["']"#).expect("valid regex")
});

static ABS_ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href\s*=\s*["']([^"'#?\s]*/abs/[^"'#?\s]+)["'][^>]*>(.*?)</a\s*>"#)
        .expect("valid regex")
});

static H1_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").expect("valid regex"));

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").expect("valid regex"));

static ABSTRACT_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<(div|section)\b[^>]*\bclass\s*=\s*["'][^"']*abstract[^"']*["'][^>]*>"#)
        .expect("valid regex")
});

static NUMBERED_SECTION_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<(div|section)\b[^>]*\bid\s*=\s*["']S[0-9]+["'][^>]*>"#)
        .expect("valid regex")
});

static NESTING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)(div|section)\b[^>]*>").expect("valid regex"));

// ========== 通用 ==========

/// 去掉标签，保留块级换行，解码常见实体
pub fn strip_tags(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(html, " ");
    let with_breaks = BLOCK_TAG_RE.replace_all(&without_scripts, "\n");
    let without_tags = TAG_RE.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&without_tags);

    decoded
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 单行文本：所有空白折叠为一个空格
pub fn inline_text(html: &str) -> String {
    collapse_whitespace(&strip_tags(html))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// 相对链接补全为绝对链接
fn absolutize(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("{}{}", ARXIV_ORIGIN, href)
    } else {
        format!("{}/{}", ARXIV_ORIGIN, href)
    }
}

/// 从开始标签之后截取到与之配对的结束标签
fn element_body<'a>(html: &'a str, body_start: usize, tag: &str) -> &'a str {
    let rest = &html[body_start..];
    let mut depth = 1usize;

    for caps in NESTING_RE.captures_iter(rest) {
        if !caps[2].eq_ignore_ascii_case(tag) {
            continue;
        }
        if caps[1].is_empty() {
            depth += 1;
            continue;
        }
        depth -= 1;
        if depth == 0 {
            if let Some(m) = caps.get(0) {
                return &rest[..m.start()];
            }
        }
    }

    rest
}

// ========== 列表页 ==========

/// 提取列表页上所有摘要页链接，按页面顺序去重
pub fn parse_listing_entries(html: &str) -> Vec<PaperRef> {
    let html = SCRIPT_STYLE_RE.replace_all(html, " ");
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for caps in ABS_HREF_RE.captures_iter(&html) {
        let url = absolutize(&caps[1]);
        match paper_ref_from_abstract_url(&url) {
            Ok(paper) => {
                if seen.insert(paper.identifier.clone()) {
                    entries.push(paper);
                }
            }
            Err(e) => debug!("跳过列表页链接: {}", e),
        }
    }

    entries
}

/// 列表页转纯文本，摘要页链接以绝对 URL 形式内联保留
pub fn listing_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(html, " ");
    let inlined = ABS_ANCHOR_RE.replace_all(&without_scripts, |caps: &Captures| {
        let label = inline_text(&caps[2]);
        let url = absolutize(&caps[1]);
        if label.is_empty() {
            format!(" {} ", url)
        } else {
            format!(" {} {} ", label, url)
        }
    });
    strip_tags(&inlined)
}

// ========== 论文页 ==========

/// 提取论文的关键章节
///
/// 标题、摘要、引言、长度超过 100 字的编号章节（截断到 500 字）；
/// 一个都没识别到时退回整页文本
pub fn extract_key_sections(html: &str) -> AppResult<String> {
    let html = SCRIPT_STYLE_RE.replace_all(html, " ");
    let mut sections = Vec::new();

    if let Some(caps) = H1_RE.captures(&html) {
        let title = inline_text(&caps[1]);
        if !title.is_empty() {
            sections.push(format!("Title: {}", title));
        }
    }

    if let Some(caps) = ABSTRACT_OPEN_RE.captures(&html) {
        if let Some(open) = caps.get(0) {
            let body = element_body(&html, open.end(), &caps[1]);
            let text = inline_text(body);
            if !text.is_empty() {
                sections.push(format!("Abstract: {}", text));
            }
        }
    }

    if let Some(intro) = find_introduction(&html) {
        sections.push(format!("Introduction: {}", intro));
    }

    for caps in NUMBERED_SECTION_OPEN_RE.captures_iter(&html) {
        let Some(open) = caps.get(0) else { continue };
        let body = element_body(&html, open.end(), &caps[1]);
        let text = inline_text(body);
        if text.chars().count() > MIN_SECTION_CHARS {
            sections.push(truncate_chars(&text, MAX_SECTION_CHARS));
        }
    }

    let content = if sections.is_empty() {
        debug!("未识别到章节结构，使用整页文本");
        truncate_chars(&strip_tags(&html), FALLBACK_MAX_CHARS)
    } else {
        sections.join("\n\n")
    };

    if content.trim().is_empty() {
        return Err(AppError::empty_artifact("paper content"));
    }
    Ok(content)
}

/// 引言：标题含 introduction 的标题块，直到下一个标题
fn find_introduction(html: &str) -> Option<String> {
    let headings: Vec<_> = HEADING_RE.captures_iter(html).collect();

    for (i, caps) in headings.iter().enumerate() {
        let heading = inline_text(&caps[2]);
        if !heading.to_lowercase().contains("introduction") {
            continue;
        }
        let start = caps.get(0)?.end();
        let end = headings
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let body = inline_text(&html[start..end]);
        return Some(if body.is_empty() {
            heading
        } else {
            format!("{} {}", heading, body)
        });
    }

    None
}
