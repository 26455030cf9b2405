//! 批量改写调度器 - 编排层
//!
//! ## 职责
//!
//! 把元素序列分发给改写服务，返回 元素 ID → 改写文本 的映射。
//!
//! ## 核心功能
//!
//! 1. **按类型分组**：标题/目录/题注原样保留，媒体不参与
//! 2. **分批**：同类元素按 `batch_size` 连续切分
//! 3. **并发控制**：一个 Semaphore 限制整个调度器同时在途的改写调用数
//! 4. **批次协议**：委托 `workflow::batch_protocol` 合并指令、拆分回复
//! 5. **回退**：调用失败、超时或拆分失败时，相应元素回退为原文
//!
//! ## 设计特点
//!
//! - 所有批次一次性 `tokio::spawn`，由 Semaphore 排队
//! - 每个任务只写自己批次的元素，结果从 JoinHandle 收集，不需要共享锁
//! - 批次失败只记录日志，从不向上抛出

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::element::{Element, ElementId, ElementKind, RewriteResult};
use crate::services::prompt_builder;
use crate::services::Rewriter;
use crate::utils::logging;
use crate::workflow::batch_protocol;

/// 调度统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// 参与调度的文本元素数
    pub total: usize,
    /// 拿到改写结果的元素数
    pub rewritten: usize,
    /// 按策略原样保留的元素数
    pub passthrough: usize,
    /// 回退为原文的元素数
    pub fallback: usize,
    /// 整批失败（调用出错或超时）的批次数
    pub failed_batches: usize,
}

/// 单个批次的产出
#[derive(Debug, Default)]
struct BatchOutcome {
    rewritten: Vec<(ElementId, String)>,
    failed: bool,
}

/// 批次任务的上下文（move 进 spawn 的任务）
struct BatchJob {
    batch_num: usize,
    total_batches: usize,
    kind: ElementKind,
    elements: Vec<Element>,
}

/// 批量改写调度器
pub struct BatchProcessor {
    rewriter: Arc<dyn Rewriter>,
    system_instruction: Arc<str>,
    batch_size: usize,
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
    request_timeout: Duration,
}

impl BatchProcessor {
    /// 创建调度器
    ///
    /// `system_instruction` 是基础系统指令，批次调用时会追加保留标记的要求。
    pub fn new(rewriter: Arc<dyn Rewriter>, system_instruction: &str, config: &Config) -> AppResult<Self> {
        config.validate()?;

        Ok(Self {
            rewriter,
            system_instruction: batch_protocol::batch_system_instruction(system_instruction).into(),
            batch_size: config.batch_size,
            max_concurrent: config.max_concurrent_requests,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// 处理所有元素
    ///
    /// 返回的映射覆盖每个非媒体元素：改写成功的为改写文本，其余为原文。
    pub async fn process_all(&self, elements: &[Element]) -> (RewriteResult, DispatchStats) {
        let mut result = RewriteResult::new();
        let mut stats = DispatchStats::default();

        // 按类型分组，保持文档顺序
        let mut groups: BTreeMap<String, (ElementKind, Vec<Element>)> = BTreeMap::new();
        for element in elements {
            if element.kind.is_media() {
                continue;
            }
            stats.total += 1;

            if element.kind.is_passthrough() {
                result.insert(element.id, element.text.clone());
                stats.passthrough += 1;
                continue;
            }

            groups
                .entry(element.kind.to_string())
                .or_insert_with(|| (element.kind, Vec::new()))
                .1
                .push(element.clone());
        }

        if stats.passthrough > 0 {
            info!("⏭️ {} 个标题/目录/题注元素原样保留", stats.passthrough);
        }

        let mut handles = Vec::new();
        let mut dispatched: Vec<Element> = Vec::new();

        for (name, (kind, group)) in groups {
            let total_batches = group.len().div_ceil(self.batch_size);
            logging::log_kind_plan(&name, group.len(), total_batches, self.batch_size, self.max_concurrent);

            for (i, chunk) in group.chunks(self.batch_size).enumerate() {
                let job = BatchJob {
                    batch_num: i + 1,
                    total_batches,
                    kind,
                    elements: chunk.to_vec(),
                };

                let rewriter = self.rewriter.clone();
                let semaphore = self.semaphore.clone();
                let system_instruction = self.system_instruction.clone();
                let timeout = self.request_timeout;

                handles.push(tokio::spawn(async move {
                    run_batch(job, rewriter, semaphore, &system_instruction, timeout).await
                }));
            }

            dispatched.extend(group);
        }

        for joined in join_all(handles).await {
            match joined {
                Ok(outcome) => {
                    if outcome.failed {
                        stats.failed_batches += 1;
                    }
                    result.extend(outcome.rewritten);
                }
                Err(e) => {
                    error!("❌ 批次任务执行失败: {}", e);
                    stats.failed_batches += 1;
                }
            }
        }

        // 未填充的元素回退为原文
        for element in dispatched {
            if result.contains_key(&element.id) {
                stats.rewritten += 1;
            } else {
                result.insert(element.id, element.text);
                stats.fallback += 1;
            }
        }

        info!(
            "✓ 调度完成: 改写 {}，回退 {}，保留 {}，失败批次 {}",
            stats.rewritten, stats.fallback, stats.passthrough, stats.failed_batches
        );

        (result, stats)
    }
}

/// 处理单个批次
///
/// 只返回拆分成功的元素，其余由调用方统一回退。
async fn run_batch(
    job: BatchJob,
    rewriter: Arc<dyn Rewriter>,
    semaphore: Arc<Semaphore>,
    system_instruction: &str,
    timeout: Duration,
) -> BatchOutcome {
    let kind = job.kind.to_string();
    let count = job.elements.len();

    let pending: Vec<&Element> = job.elements.iter().filter(|e| !e.text.trim().is_empty()).collect();
    if pending.is_empty() {
        debug!("[批次 {}/{}] {} 没有需要改写的文本，跳过", job.batch_num, job.total_batches, kind);
        return BatchOutcome::default();
    }

    let instructions: Vec<String> = pending
        .iter()
        .map(|element| prompt_builder::element_instruction(element, &element.text))
        .collect();
    let user_instruction = batch_protocol::combined_user_instruction(&instructions);

    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            error!("[批次 {}/{}] ❌ 无法获取并发许可: {}", job.batch_num, job.total_batches, e);
            return BatchOutcome {
                failed: true,
                ..Default::default()
            };
        }
    };

    logging::log_batch_start(job.batch_num, job.total_batches, &kind, count);

    let reply = match call_with_timeout(rewriter.as_ref(), system_instruction, &user_instruction, timeout).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(
                "[批次 {}/{}] ⚠️ {} 的 {} 个元素改写失败，回退原文: {}",
                job.batch_num, job.total_batches, kind, count, e
            );
            return BatchOutcome {
                failed: true,
                ..Default::default()
            };
        }
    };

    let segments = batch_protocol::demultiplex(&reply, pending.len());
    let rewritten: Vec<(ElementId, String)> = pending
        .iter()
        .zip(segments)
        .filter_map(|(element, segment)| segment.map(|text| (element.id, text)))
        .collect();

    if rewritten.len() < pending.len() {
        warn!(
            "[批次 {}/{}] ⚠️ {} 有 {} 个元素拆分失败，回退原文",
            job.batch_num,
            job.total_batches,
            kind,
            pending.len() - rewritten.len()
        );
    }
    logging::log_batch_complete(job.batch_num, job.total_batches, &kind, rewritten.len(), count);

    BatchOutcome {
        rewritten,
        failed: false,
    }
}

async fn call_with_timeout(
    rewriter: &dyn Rewriter,
    system_instruction: &str,
    user_instruction: &str,
    timeout: Duration,
) -> AppResult<String> {
    match tokio::time::timeout(timeout, rewriter.complete(system_instruction, user_instruction)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Llm(LlmError::Timeout {
            timeout_secs: timeout.as_secs(),
        })),
    }
}
