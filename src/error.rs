use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 配置错误（调用方输入不合法）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 文档模型错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: BoxedSource,
    },
    /// 请求频率限制
    #[error("LLM请求频率限制 (模型: {model}): {message}")]
    RateLimited { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 请求构建失败
    #[error("LLM请求构建失败: {source}")]
    RequestBuildFailed {
        #[source]
        source: BoxedSource,
    },
    /// 调用超时
    #[error("LLM调用超时 ({timeout_secs}秒)")]
    Timeout { timeout_secs: u64 },
}

impl LlmError {
    /// 错误文本中是否带有限流标记
    pub fn looks_rate_limited(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit")
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
    /// 提示词配置缺失
    #[error("缺少提示词配置: {what}")]
    MissingPrompt { what: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// 文件格式不支持
    #[error("不支持的文件格式: {path}")]
    UnsupportedFormat { path: String },
}

/// 文档模型错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 解析失败
    #[error("文档解析失败 ({format}): {source}")]
    ParseFailed {
        format: &'static str,
        #[source]
        source: BoxedSource,
    },
    /// 序列化失败
    #[error("文档序列化失败: {source}")]
    SerializeFailed {
        #[source]
        source: BoxedSource,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Document(DocumentError::ParseFailed {
            format: "json",
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Document(DocumentError::ParseFailed {
            format: "toml",
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建LLM API调用错误，带限流标记的错误归类为 `RateLimited`
    pub fn llm_api_failed(model: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        let model = model.into();
        let message = source.to_string();
        if LlmError::looks_rate_limited(&message) {
            return AppError::Llm(LlmError::RateLimited { model, message });
        }
        AppError::Llm(LlmError::ApiCallFailed {
            model,
            source: Box::new(source),
        })
    }

    /// 创建配置错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// 是否为限流错误
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::Llm(LlmError::RateLimited { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
