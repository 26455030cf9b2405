//! 简化流水线 - 编排层
//!
//! 一次调用的完整流程：
//!
//! ```text
//! 提取结构 → 构建系统指令 → 分批改写 → 重建格式 → 可读性评分
//! ```
//!
//! 这里是调用边界：下层的改写失败都已在批次内回退，
//! 只有调用方输入不合法（配置缺失、参数为 0）才会以错误返回。

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, LlmError};
use crate::models::document::Document;
use crate::models::element::HighlightSet;
use crate::models::prompt_config::PromptConfig;
use crate::orchestrator::batch_processor::{BatchProcessor, DispatchStats};
use crate::services::{prompt_builder, readability, RequestThrottle, Rewriter};
use crate::utils::{logging, truncate_text};
use crate::workflow::{extractor, reconstructor};

/// 文档简化结果
#[derive(Debug, Clone)]
pub struct SimplifiedDocument {
    /// 已原地改写的文档
    pub document: Document,
    /// 改写后全文的可读性评分
    pub readability_score: f64,
    /// 改写后全文（每个文本元素一行）
    pub full_text: String,
    /// 文档中的高亮短语加上配置中的关键词
    pub highlighted_words: HighlightSet,
    pub stats: DispatchStats,
}

/// 文档简化器
pub struct Simplifier {
    config: Config,
    rewriter: Arc<dyn Rewriter>,
    throttle: RequestThrottle,
    prompt_config: Option<PromptConfig>,
}

impl Simplifier {
    pub fn new(config: Config, rewriter: Arc<dyn Rewriter>) -> Self {
        let throttle = RequestThrottle::new(Duration::from_millis(config.request_delay_ms));
        Self {
            config,
            rewriter,
            throttle,
            prompt_config: None,
        }
    }

    /// 设置启动时加载的默认提示词配置
    pub fn with_prompt_config(mut self, prompt_config: PromptConfig) -> Self {
        self.prompt_config = Some(prompt_config);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 简化整篇文档
    ///
    /// # 参数
    /// - `system_instruction`: 显式给出的系统指令；为 `None` 时由提示词配置构建
    /// - `prompt_config`: 本次使用的提示词配置；为 `None` 时使用默认配置
    pub async fn simplify_document(
        &self,
        mut document: Document,
        system_instruction: Option<String>,
        prompt_config: Option<PromptConfig>,
    ) -> AppResult<SimplifiedDocument> {
        logging::log_startup(self.config.max_concurrent_requests, self.config.batch_size);

        let extraction = extractor::extract(&document, &self.config.extraction);
        let (system_instruction, highlighted_words) = self.resolve_system_instruction(
            system_instruction,
            prompt_config.as_ref(),
            extraction.highlighted_words,
        )?;

        let processor = BatchProcessor::new(self.rewriter.clone(), &system_instruction, &self.config)?;
        let (result, stats) = processor.process_all(&extraction.elements).await;

        let full_text = reconstructor::rebuild(
            &mut document,
            &extraction.elements,
            &result,
            &self.config.reconstruction,
        );
        let readability_score = readability::score(&full_text);

        logging::print_final_stats(stats.rewritten, stats.fallback, stats.passthrough, readability_score);

        Ok(SimplifiedDocument {
            document,
            readability_score,
            full_text,
            highlighted_words,
            stats,
        })
    }

    /// 简化一段纯文本
    ///
    /// 空文本直接返回 `("", 0.0)`，不调用改写服务。
    /// 请求之间至少间隔 `request_delay_ms`；改写失败会返回给调用方。
    pub async fn simplify_text(&self, text: &str, system_instruction: Option<&str>) -> AppResult<(String, f64)> {
        if text.trim().is_empty() {
            warn!("收到空文本，跳过简化");
            return Ok((String::new(), 0.0));
        }

        let (system_instruction, _) =
            self.resolve_system_instruction(system_instruction.map(str::to_string), None, HighlightSet::new())?;

        info!("✍️ 正在简化文本: {}", truncate_text(text, 60));
        self.throttle.acquire().await;

        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let user_instruction = prompt_builder::text_instruction(text);
        let simplified = tokio::time::timeout(
            timeout,
            self.rewriter.complete(&system_instruction, &user_instruction),
        )
        .await
        .map_err(|_| {
            AppError::Llm(LlmError::Timeout {
                timeout_secs: timeout.as_secs(),
            })
        })??;

        let score = readability::score(&simplified);
        info!("📈 文本简化完成，可读性评分: {:.2}", score);

        Ok((simplified, score))
    }

    /// 显式指令优先，否则由（本次或默认的）提示词配置构建
    fn resolve_system_instruction(
        &self,
        explicit: Option<String>,
        prompt_config: Option<&PromptConfig>,
        highlighted: HighlightSet,
    ) -> AppResult<(String, HighlightSet)> {
        if let Some(instruction) = explicit {
            return Ok((instruction, highlighted));
        }

        let prompt_config = prompt_config.or(self.prompt_config.as_ref()).ok_or_else(|| {
            AppError::Config(ConfigError::MissingPrompt {
                what: "system_instruction / prompt_config".to_string(),
            })
        })?;
        prompt_config.validate()?;

        Ok(prompt_builder::system_instruction(prompt_config, highlighted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{Paragraph, Run};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 记录调用次数，回复固定文本
    struct CountingRewriter {
        calls: AtomicUsize,
        reply: String,
    }

    #[async_trait]
    impl Rewriter for CountingRewriter {
        async fn complete(&self, _system: &str, _user: &str) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn simplifier(reply: &str) -> (Simplifier, Arc<CountingRewriter>) {
        let rewriter = Arc::new(CountingRewriter {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        });
        let config = Config {
            request_delay_ms: 0,
            ..Config::default()
        };
        (Simplifier::new(config, rewriter.clone()), rewriter)
    }

    #[tokio::test]
    async fn test_empty_text_skips_call() {
        let (simplifier, rewriter) = simplifier("unused");
        let (text, score) = simplifier.simplify_text("   ", Some("system")).await.unwrap();
        assert_eq!(text, "");
        assert_eq!(score, 0.0);
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_simplify_text_scores_reply() {
        let (simplifier, rewriter) = simplifier("The cat sat.");
        let (text, score) = simplifier
            .simplify_text("The feline positioned itself upon the mat.", Some("system"))
            .await
            .unwrap();
        assert_eq!(text, "The cat sat.");
        assert_eq!(score, 0.0);
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_prompt_is_config_error() {
        let (simplifier, _) = simplifier("unused");
        let err = simplifier.simplify_text("Some text.", None).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MissingPrompt { .. })));

        let doc = Document::from_plain_text("Some text.");
        let err = simplifier.simplify_document(doc, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_prompt_keywords_join_highlighted_words() {
        let (simplifier, _) = simplifier("no markers here");
        let mut prompt = PromptConfig::new("Rewrite simply.");
        prompt.keywords_to_keep.push("GDPR".to_string());
        let simplifier = simplifier.with_prompt_config(prompt);

        let doc = Document {
            paragraphs: vec![Paragraph::default()
                .push(Run::new("Read the "))
                .push(Run::new("privacy notice").highlighted(crate::models::HighlightColor::Yellow))
                .push(Run::new(" today."))],
            relationships: vec![],
        };

        let simplified = simplifier.simplify_document(doc, None, None).await.unwrap();
        assert!(simplified.highlighted_words.contains("GDPR"));
        assert!(simplified.highlighted_words.contains("privacy notice"));
        // 回复没有标记，回退原文
        assert_eq!(simplified.full_text, "Read the privacy notice today.");
        assert_eq!(simplified.stats.fallback, 1);
    }
}
