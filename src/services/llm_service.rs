//! LLM 改写服务 - 业务能力层
//!
//! 只负责"系统指令 + 用户指令 → 改写文本"这一能力，不关心批次和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use std::future::Future;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{Config, RateLimitBackoff};
use crate::error::{AppError, AppResult, LlmError};

/// 改写能力
///
/// 给定系统指令和用户指令，返回改写后的文本，或失败。
/// 流水线核心只依赖这个 trait，测试中可以替换为脚本化实现。
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn complete(&self, system_instruction: &str, user_instruction: &str) -> AppResult<String>;
}

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 完成一次改写
/// - 遇到限流时按指数退避重试（服务自身的重试，与流水线的按批回退无关）
/// - 不出现 Element / 批次
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
    backoff: RateLimitBackoff,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            backoff: config.rate_limit.clone(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 发送一次聊天请求（不重试）
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（已去除首尾空白）
    pub async fn send_to_llm(&self, user_message: &str, system_message: Option<&str>) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(build_failed)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_failed)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(build_failed)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyContent {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Rewriter for LlmService {
    async fn complete(&self, system_instruction: &str, user_instruction: &str) -> AppResult<String> {
        if user_instruction.trim().is_empty() {
            warn!("收到空的用户指令，跳过调用");
            return Ok(String::new());
        }

        with_rate_limit_retry(&self.backoff, || {
            self.send_to_llm(user_instruction, Some(system_instruction))
        })
        .await
    }
}

/// 限流时按指数退避重试，其他结果（成功或非限流错误）直接返回
pub async fn with_rate_limit_retry<F, Fut>(backoff: &RateLimitBackoff, mut call: F) -> AppResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<String>>,
{
    let mut wait_secs = backoff.initial_wait_secs;
    let mut retries = 0;

    loop {
        match call().await {
            Err(e) if e.is_rate_limited() && retries < backoff.max_retries => {
                retries += 1;
                warn!(
                    "⏳ LLM 请求被限流 (重试 {}/{}), 等待 {} 秒...",
                    retries, backoff.max_retries, wait_secs
                );
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                wait_secs = backoff.next_wait(wait_secs);
            }
            other => return other,
        }
    }
}

fn build_failed(e: async_openai::error::OpenAIError) -> AppError {
    AppError::Llm(LlmError::RequestBuildFailed {
        source: Box::new(e),
    })
}
