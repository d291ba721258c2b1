use serde::Serialize;

/// 候选论文引用
///
/// `identifier` 由 `abstract_url` 唯一推导；编号相同即视为同一篇论文，
/// 与 URL 的表面差异（结尾斜杠、版本后缀）无关。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PaperRef {
    /// 规范化的论文编号，如 `2409.12345`
    pub identifier: String,
    /// 摘要页 URL
    pub abstract_url: String,
    /// 全文（HTML 版）URL
    pub full_text_url: String,
}

impl PaperRef {
    pub fn new(
        identifier: impl Into<String>,
        abstract_url: impl Into<String>,
        full_text_url: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            abstract_url: abstract_url.into(),
            full_text_url: full_text_url.into(),
        }
    }

    /// 文件名主干
    ///
    /// 旧式编号（如 `cs/0112017`）中的 `/` 替换为 `_`，保证单一路径段
    pub fn file_stem(&self) -> String {
        self.identifier.replace('/', "_")
    }

    /// 台本文件名 `<file_stem>.md`
    ///
    /// 新式编号与编号完全一致（`2409.12345.md`）；旧式编号 `cs/0112017`
    /// 写作 `cs_0112017.md`，编号本身不变，只在文件名里换掉分隔符
    pub fn script_file_name(&self) -> String {
        format!("{}.md", self.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_file_name() {
        let paper = PaperRef::new(
            "2409.12345",
            "https://arxiv.org/abs/2409.12345",
            "https://arxiv.org/html/2409.12345",
        );
        assert_eq!(paper.script_file_name(), "2409.12345.md");
    }

    #[test]
    fn test_old_style_identifier_stem() {
        let paper = PaperRef::new(
            "cs/0112017",
            "https://arxiv.org/abs/cs/0112017",
            "https://arxiv.org/html/cs/0112017",
        );
        assert_eq!(paper.file_stem(), "cs_0112017");
        assert_eq!(paper.script_file_name(), "cs_0112017.md");
        assert_eq!(paper.identifier, "cs/0112017");
    }
}
