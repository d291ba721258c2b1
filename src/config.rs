//! 程序配置
//!
//! 启动时只构建一次：默认值 → TOML 配置文件 → 环境变量，
//! 之后按引用传给各个能力的构造函数

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, ConfigError, FileSystemError};

const DEFAULT_SUMMARY_PROMPT: &str = include_str!("../prompt/summary.md");
const DEFAULT_PODCAST_PROMPT: &str = include_str!("../prompt/podcast.md");

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 新着列表页
    pub listing_url: String,
    /// 输出根目录
    pub output_root: PathBuf,
    /// 同时处理的论文数量
    pub max_concurrent_papers: usize,
    /// 保留最近几天的输出，未设置时不清理
    pub keep_days: Option<u32>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 生成服务配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub summary_model: String,
    pub script_model: String,
    pub summary_temperature: f32,
    pub script_temperature: f32,
    pub prompt_dir: PathBuf,
    // --- 语音合成配置 ---
    pub tts_api_base_url: String,
    pub tts_model: String,
    // --- 超时与重试 ---
    pub http_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_url: "https://arxiv.org/list/cs.IR/new".to_string(),
            output_root: PathBuf::from("data"),
            max_concurrent_papers: 3,
            keep_days: None,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai/".to_string(),
            summary_model: "gemini-2.0-flash-exp".to_string(),
            script_model: "gemini-2.0-flash-exp".to_string(),
            summary_temperature: 0.7,
            script_temperature: 0.8,
            prompt_dir: PathBuf::from("prompt"),
            tts_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            http_timeout_secs: 30,
            llm_timeout_secs: 180,
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

/// 两段系统提示词
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompts {
    pub summary: String,
    pub podcast: String,
}

impl Config {
    /// 解析 TOML 文本，缺省字段取默认值
    pub fn from_toml_str(content: &str, path: &Path) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            ConfigError::FileParseFailed {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// 加载配置：可选的配置文件，然后叠加环境变量
    pub async fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = match path {
            Some(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|source| {
                    FileSystemError::ReadFailed {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                debug!("已读取配置文件: {}", path.display());
                Self::from_toml_str(&content, path)?
            }
            None => Self::default(),
        };

        config.apply_env(|name| std::env::var(name).ok())
    }

    /// 用环境变量覆盖配置
    ///
    /// `lookup` 便于测试时注入
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("LLM_API_KEY")) {
            self.llm_api_key = key;
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = lookup("GEMINI_MODEL_SUMMARY") {
            self.summary_model = v;
        }
        if let Some(v) = lookup("GEMINI_MODEL_PODCAST") {
            self.script_model = v;
        }
        if let Some(v) = lookup("GEMINI_MODEL_TTS") {
            self.tts_model = v;
        }
        if let Some(v) = lookup("TTS_API_BASE_URL") {
            self.tts_api_base_url = v;
        }
        if let Some(v) = lookup("LISTING_URL") {
            self.listing_url = v;
        }
        if let Some(v) = lookup("OUTPUT_ROOT") {
            self.output_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("PROMPT_DIR") {
            self.prompt_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MAX_CONCURRENT_PAPERS") {
            self.max_concurrent_papers = parse_env("MAX_CONCURRENT_PAPERS", &v)?;
        }
        if let Some(v) = lookup("KEEP_DAYS") {
            self.keep_days = Some(parse_env("KEEP_DAYS", &v)?);
        }
        if let Some(v) = lookup("VERBOSE_LOGGING") {
            self.verbose_logging = parse_env("VERBOSE_LOGGING", &v)?;
        }
        Ok(self)
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "GEMINI_API_KEY".to_string(),
            }
            .into());
        }

        let positive = [
            ("max_concurrent_papers", self.max_concurrent_papers as u64),
            ("max_attempts", u64::from(self.max_attempts)),
            ("http_timeout_secs", self.http_timeout_secs),
            ("llm_timeout_secs", self.llm_timeout_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(AppError::invalid_config(name, "0", "必须大于 0"));
            }
        }

        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(AppError::invalid_config(
                "initial_backoff_ms",
                self.initial_backoff_ms.to_string(),
                format!("不能大于 max_backoff_ms ({})", self.max_backoff_ms),
            ));
        }

        for (name, value) in [
            ("summary_temperature", self.summary_temperature),
            ("script_temperature", self.script_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(AppError::invalid_config(name, value.to_string(), "取值范围 0.0 ~ 2.0"));
            }
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// 读取提示词文件，缺失时使用内置版本
    pub async fn load_prompts(&self) -> Prompts {
        Prompts {
            summary: read_prompt(&self.prompt_dir.join("summary.md"), DEFAULT_SUMMARY_PROMPT).await,
            podcast: read_prompt(&self.prompt_dir.join("podcast.md"), DEFAULT_PODCAST_PROMPT).await,
        }
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            summary: DEFAULT_SUMMARY_PROMPT.to_string(),
            podcast: DEFAULT_PODCAST_PROMPT.to_string(),
        }
    }
}

async fn read_prompt(path: &Path, fallback: &str) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => content,
        Ok(_) => {
            warn!("⚠️ 提示词文件为空，使用内置版本: {}", path.display());
            fallback.to_string()
        }
        Err(e) => {
            warn!("⚠️ 无法读取提示词文件 {} ({})，使用内置版本", path.display(), e);
            fallback.to_string()
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::invalid_config(name, value, "无法解析的环境变量值"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listing_url, "https://arxiv.org/list/cs.IR/new");
        assert_eq!(config.output_root, PathBuf::from("data"));
        assert_eq!(config.max_concurrent_papers, 3);
        assert_eq!(config.max_attempts, 3);
        assert!(config.keep_days.is_none());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = Config::from_toml_str(
            "output_root = \"/srv/podcast\"\nmax_concurrent_papers = 5\nkeep_days = 14\n",
            Path::new("config.toml"),
        )
        .unwrap();
        assert_eq!(config.output_root, PathBuf::from("/srv/podcast"));
        assert_eq!(config.max_concurrent_papers, 5);
        assert_eq!(config.keep_days, Some(14));
        assert_eq!(config.script_temperature, 0.8);
    }

    #[test]
    fn test_toml_parse_error() {
        let err = Config::from_toml_str("max_concurrent_papers = \"many\"", Path::new("bad.toml"))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::FileParseFailed { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .apply_env(env(&[
                ("LLM_API_KEY", "fallback-key"),
                ("GEMINI_API_KEY", "gemini-key"),
                ("GEMINI_MODEL_PODCAST", "podcast-model"),
                ("MAX_CONCURRENT_PAPERS", "8"),
            ]))
            .unwrap();
        assert_eq!(config.llm_api_key, "gemini-key");
        assert_eq!(config.script_model, "podcast-model");
        assert_eq!(config.max_concurrent_papers, 8);

        let err = Config::default()
            .apply_env(env(&[("MAX_CONCURRENT_PAPERS", "lots")]))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(AppError::Config(ConfigError::Missing { .. }))
        ));

        config.llm_api_key = "key".into();
        assert!(config.validate().is_ok());

        config.max_concurrent_papers = 0;
        assert!(config.validate().is_err());
        config.max_concurrent_papers = 1;

        config.llm_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_prompts_fall_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("summary.md"), "自定义摘要提示词").unwrap();

        let config = Config {
            prompt_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        let prompts = config.load_prompts().await;
        assert_eq!(prompts.summary, "自定义摘要提示词");
        assert_eq!(prompts.podcast, Prompts::default().podcast);
    }
}
