//! 论文编号与 URL 变换 - 业务能力层
//!
//! 纯字符串变换，不访问网络：
//! - 摘要页 / 全文页 URL → 规范化论文编号（去掉版本后缀）
//! - 摘要页 URL → 全文页 URL（`/abs/` → `/html/`）

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;
use crate::models::PaperRef;

/// 规范站点
pub const ARXIV_ORIGIN: &str = "https://arxiv.org";

/// 新式编号 `2409.12345`，旧式编号 `cs/0112017`、`math.GT/0309136`
static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"/(?:abs|html|pdf)/(\d{4}\.\d{4,5}|[a-z][a-z\-]*(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?(?:[^\w]|$)",
    )
    .expect("valid regex")
});

static ABSTRACT_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://[^/\s]+)/abs/(\S+?)/?$").expect("valid regex"));

/// 从摘要页 URL 中提取论文编号
///
/// 版本后缀（`v2`）会被去掉；全文页和 PDF 的 URL 同样可以识别
pub fn identifier_from_abstract_url(url: &str) -> Result<String, ParseError> {
    let url = url.trim();
    if !url.contains("://") {
        return Err(ParseError::MalformedUrl { url: url.to_string() });
    }

    IDENTIFIER_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ParseError::NoIdentifier { url: url.to_string() })
}

/// 摘要页 URL 改写为全文页 URL
///
/// 保留域名和编号（含版本），只替换 `/abs/` 路径段
pub fn abstract_url_to_full_text_url(url: &str) -> Result<String, ParseError> {
    let url = url.trim();
    let caps = ABSTRACT_URL_RE
        .captures(url)
        .ok_or_else(|| ParseError::MalformedUrl { url: url.to_string() })?;

    // 先确认编号可识别，再做改写
    identifier_from_abstract_url(url)?;

    Ok(format!("{}/html/{}", &caps[1], &caps[2]))
}

/// 批量改写，保持顺序，单个失败不影响其他元素
pub fn batch_transform<S: AsRef<str>>(urls: &[S]) -> Vec<Result<String, ParseError>> {
    urls.iter()
        .map(|url| abstract_url_to_full_text_url(url.as_ref()))
        .collect()
}

/// 规范化摘要页 URL
pub fn canonical_abstract_url(identifier: &str) -> String {
    format!("{}/abs/{}", ARXIV_ORIGIN, identifier)
}

/// 由任意形式的摘要页 URL 构造 `PaperRef`
pub fn paper_ref_from_abstract_url(url: &str) -> Result<PaperRef, ParseError> {
    let identifier = identifier_from_abstract_url(url)?;
    let abstract_url = canonical_abstract_url(&identifier);
    let full_text_url = abstract_url_to_full_text_url(&abstract_url)?;
    Ok(PaperRef::new(identifier, abstract_url, full_text_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_strips_version() {
        assert_eq!(
            identifier_from_abstract_url("https://arxiv.org/abs/2409.12345v3").unwrap(),
            "2409.12345"
        );
        assert_eq!(
            identifier_from_abstract_url("https://arxiv.org/abs/2509.03236").unwrap(),
            "2509.03236"
        );
    }

    #[test]
    fn test_identifier_ignores_trailing_noise() {
        assert_eq!(
            identifier_from_abstract_url("https://arxiv.org/abs/2409.12345/").unwrap(),
            "2409.12345"
        );
        assert_eq!(
            identifier_from_abstract_url("https://arxiv.org/abs/2409.1234.").unwrap(),
            "2409.1234"
        );
    }

    #[test]
    fn test_identifier_old_style() {
        assert_eq!(
            identifier_from_abstract_url("https://arxiv.org/abs/cs/0112017v1").unwrap(),
            "cs/0112017"
        );
        assert_eq!(
            identifier_from_abstract_url("http://arxiv.org/abs/math.GT/0309136").unwrap(),
            "math.GT/0309136"
        );
    }

    #[test]
    fn test_identifier_rejects_garbage() {
        assert!(matches!(
            identifier_from_abstract_url("https://arxiv.org/abs/not-a-paper"),
            Err(ParseError::NoIdentifier { .. })
        ));
        assert!(matches!(
            identifier_from_abstract_url("https://arxiv.org/abs/2409.123456"),
            Err(ParseError::NoIdentifier { .. })
        ));
        assert!(matches!(
            identifier_from_abstract_url("2409.12345"),
            Err(ParseError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn test_full_text_url() {
        assert_eq!(
            abstract_url_to_full_text_url("https://arxiv.org/abs/2509.03236").unwrap(),
            "https://arxiv.org/html/2509.03236"
        );
        assert_eq!(
            abstract_url_to_full_text_url("https://arxiv.org/abs/2509.03236v2/").unwrap(),
            "https://arxiv.org/html/2509.03236v2"
        );
        assert!(abstract_url_to_full_text_url("https://arxiv.org/pdf/2509.03236").is_err());
        assert!(abstract_url_to_full_text_url("not a url").is_err());
    }

    #[test]
    fn test_round_trip_keeps_identifier() {
        let urls = [
            "https://arxiv.org/abs/2409.12345",
            "https://arxiv.org/abs/2409.12345v7",
            "http://export.arxiv.org/abs/2501.0001",
            "https://arxiv.org/abs/hep-th/9901001",
        ];
        for url in urls {
            let full = abstract_url_to_full_text_url(url).unwrap();
            assert_eq!(
                identifier_from_abstract_url(&full).unwrap(),
                identifier_from_abstract_url(url).unwrap(),
                "{}",
                url
            );
        }
    }

    #[test]
    fn test_batch_transform_does_not_short_circuit() {
        let results = batch_transform(&[
            "https://arxiv.org/abs/2409.00001",
            "https://example.com/nothing",
            "https://arxiv.org/abs/2409.00003",
        ]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_deref().unwrap(), "https://arxiv.org/html/2409.00001");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_deref().unwrap(), "https://arxiv.org/html/2409.00003");
    }

    #[test]
    fn test_paper_ref_is_canonical() {
        let paper = paper_ref_from_abstract_url("http://www.arxiv.org/abs/2409.12345v2").unwrap();
        assert_eq!(paper.identifier, "2409.12345");
        assert_eq!(paper.abstract_url, "https://arxiv.org/abs/2409.12345");
        assert_eq!(paper.full_text_url, "https://arxiv.org/html/2409.12345");
    }
}
