use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 网络传输错误
    #[error("网络错误: {0}")]
    Network(#[from] NetworkError),
    /// 生成服务调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 结构化提取错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 路径安全或产物形态校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 本地存储错误
    #[error("文件错误: {0}")]
    FileSystem(#[from] FileSystemError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 错误大类，用于汇总报告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Api,
    Parse,
    Validation,
    FileSystem,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::Api => "ApiError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::FileSystem => "FileSystemError",
            ErrorKind::Config => "ConfigError",
        };
        f.write_str(name)
    }
}

/// 网络传输错误
#[derive(Debug, Error)]
pub enum NetworkError {
    /// 请求发送失败（连接、DNS、TLS 等）
    #[error("请求失败 ({url}): {message}")]
    RequestFailed { url: String, message: String },
    /// 请求超时
    #[error("请求超时 ({url}), 超时时间: {after:?}")]
    Timeout { url: String, after: Duration },
    /// HTTP 状态码异常
    #[error("HTTP {status} ({url})")]
    HttpStatus { url: String, status: u16 },
}

/// 生成服务错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 调用超时
    #[error("调用超时 (模型: {model}), 超时时间: {after:?}")]
    Timeout { model: String, after: Duration },
    /// 请求频率限制
    #[error("请求频率限制 (模型: {model}), 建议等待: {retry_after:?}")]
    RateLimited {
        model: String,
        retry_after: Option<Duration>,
    },
    /// 服务端错误
    #[error("服务端错误 (模型: {model}, 状态: {status:?}): {message}")]
    ServerError {
        model: String,
        status: Option<u16>,
        message: String,
    },
    /// 认证失败
    #[error("认证失败 (模型: {model}): {message}")]
    Unauthorized { model: String, message: String },
    /// 请求无效
    #[error("请求无效 (模型: {model}): {message}")]
    InvalidRequest { model: String, message: String },
    /// 返回内容为空
    #[error("返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 结构化提取错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// URL 中没有可识别的论文编号
    #[error("无法从 URL 中提取论文编号: {url}")]
    NoIdentifier { url: String },
    /// URL 格式不正确
    #[error("URL 格式不正确: {url}")]
    MalformedUrl { url: String },
}

/// 校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 文件名会逃逸出运行目录
    #[error("不安全的文件名 '{file_name}': {reason}")]
    UnsafePath { file_name: String, reason: String },
    /// 产物内容为空
    #[error("产物内容为空: {name}")]
    EmptyArtifact { name: String },
    /// 台本格式不正确
    #[error("台本格式不正确 ({identifier}): {reason}")]
    ScriptFormat { identifier: String, reason: String },
    /// 音频参数无法写成 WAV
    #[error("音频格式不支持 ({mime_type}): {reason}")]
    AudioFormat { mime_type: String, reason: String },
}

/// 本地存储错误
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// 文件不存在
    #[error("文件不存在: {}", path.display())]
    NotFound { path: PathBuf },
    /// 创建目录失败
    #[error("创建目录失败 ({}): {source}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// 删除失败
    #[error("删除失败 ({}): {source}", path.display())]
    RemoveFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必需的配置项缺失
    #[error("缺少配置项 {name}")]
    Missing { name: String },
    /// 配置值不合法
    #[error("配置项 {name} 的值 '{value}' 不合法: {expected}")]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({}): {source}", path.display())]
    FileParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl AppError {
    /// 错误大类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Network(_) => ErrorKind::Network,
            AppError::Api(_) => ErrorKind::Api,
            AppError::Parse(_) => ErrorKind::Parse,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::FileSystem(_) => ErrorKind::FileSystem,
            AppError::Config(_) => ErrorKind::Config,
        }
    }

    /// 是否属于可重试的瞬时错误
    ///
    /// - 网络：连接失败、超时、HTTP 408/429/5xx
    /// - API：超时、限流、服务端错误
    /// - 其他类别一律不重试
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(e) => match e {
                NetworkError::RequestFailed { .. } | NetworkError::Timeout { .. } => true,
                NetworkError::HttpStatus { status, .. } => is_transient_status(*status),
            },
            AppError::Api(e) => matches!(
                e,
                ApiError::Timeout { .. } | ApiError::RateLimited { .. } | ApiError::ServerError { .. }
            ),
            _ => false,
        }
    }

    /// 服务端建议的等待时间
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::Api(ApiError::RateLimited { retry_after, .. }) => *retry_after,
            _ => None,
        }
    }

    // ========== 便捷构造函数 ==========

    /// 创建不安全路径错误
    pub fn unsafe_path(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation(ValidationError::UnsafePath {
            file_name: file_name.into(),
            reason: reason.into(),
        })
    }

    /// 创建空产物错误
    pub fn empty_artifact(name: impl Into<String>) -> Self {
        AppError::Validation(ValidationError::EmptyArtifact { name: name.into() })
    }

    /// 创建配置值不合法错误
    pub fn invalid_config(
        name: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            name: name.into(),
            value: value.into(),
            expected: expected.into(),
        })
    }
}

/// 408 / 429 / 5xx 视为瞬时错误
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
