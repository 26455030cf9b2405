/// 程序配置
///
/// 所有字段都可以通过环境变量覆盖，见 [`Config::from_env`]。
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时进行的改写请求数量（跨所有批次共享）
    pub max_concurrent_requests: usize,
    /// 每批合并的元素数量
    pub batch_size: usize,
    /// 单次改写请求的超时时间（秒）
    pub request_timeout_secs: u64,
    /// 直接调用改写服务时两次请求之间的最小间隔（毫秒）
    pub request_delay_ms: u64,
    /// 提示词配置文件
    pub prompt_config_path: String,
    /// 输出目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    // --- 限流退避 ---
    pub rate_limit: RateLimitBackoff,
    // --- 结构/格式启发式常量 ---
    pub extraction: ExtractionOptions,
    pub reconstruction: ReconstructionOptions,
}

/// 遇到限流时的退避参数
#[derive(Clone, Debug)]
pub struct RateLimitBackoff {
    pub initial_wait_secs: u64,
    pub max_wait_secs: u64,
    pub multiplier: u64,
    pub max_retries: usize,
}

impl Default for RateLimitBackoff {
    fn default() -> Self {
        Self {
            initial_wait_secs: 10,
            max_wait_secs: 120,
            multiplier: 2,
            max_retries: 3,
        }
    }
}

impl RateLimitBackoff {
    /// 计算下一次等待时间（指数退避，封顶 `max_wait_secs`）
    pub fn next_wait(&self, last_wait_secs: u64) -> u64 {
        last_wait_secs
            .saturating_mul(self.multiplier)
            .min(self.max_wait_secs)
    }
}

/// 结构提取的经验常量
#[derive(Clone, Debug)]
pub struct ExtractionOptions {
    /// 每一级列表缩进对应的磅值
    pub indent_points_per_level: f32,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            indent_points_per_level: 36.0,
        }
    }
}

/// 格式重建的经验常量
#[derive(Clone, Debug)]
pub struct ReconstructionOptions {
    /// 改写后长度低于原文该比例时放弃逐词格式映射
    pub min_length_ratio: f64,
    /// 改写后长度高于原文该比例时放弃逐词格式映射
    pub max_length_ratio: f64,
    /// 参与格式映射的单词最小长度（不含）
    pub min_word_len: usize,
}

impl Default for ReconstructionOptions {
    fn default() -> Self {
        Self {
            min_length_ratio: 0.5,
            max_length_ratio: 1.5,
            min_word_len: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            batch_size: 10,
            request_timeout_secs: 120,
            request_delay_ms: 500,
            prompt_config_path: "prompt-config.json".to_string(),
            output_dir: "test_runs".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 4096,
            rate_limit: RateLimitBackoff::default(),
            extraction: ExtractionOptions::default(),
            reconstruction: ReconstructionOptions::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_requests: std::env::var("MAX_CONCURRENT_REQUESTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_requests),
            batch_size: std::env::var("BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_size),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            request_delay_ms: std::env::var("REQUEST_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_delay_ms),
            prompt_config_path: std::env::var("PROMPT_CONFIG_PATH").unwrap_or(default.prompt_config_path),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_temperature),
            llm_max_tokens: std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_max_tokens),
            rate_limit: default.rate_limit,
            extraction: default.extraction,
            reconstruction: default.reconstruction,
        }
    }

    /// 校验并发与批次参数
    pub fn validate(&self) -> crate::error::AppResult<()> {
        use crate::error::{AppError, ConfigError};

        if self.max_concurrent_requests == 0 {
            return Err(AppError::Config(ConfigError::InvalidValue {
                field: "max_concurrent_requests".to_string(),
                reason: "必须大于 0".to_string(),
            }));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config(ConfigError::InvalidValue {
                field: "batch_size".to_string(),
                reason: "必须大于 0".to_string(),
            }));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "必须大于 0".to_string(),
            }));
        }
        Ok(())
    }
}
