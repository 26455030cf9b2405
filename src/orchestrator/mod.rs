//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次简化调用的流程调度和并发控制，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `pipeline` - 简化流水线
//! - 对外入口：`simplify_document` / `simplify_text`
//! - 解析系统指令（显式指令或提示词配置）
//! - 串联 提取 → 调度 → 重建 → 评分
//! - 输出全局统计信息
//!
//! ### `batch_processor` - 批量改写调度器
//! - 按元素类型分组、分批
//! - 控制并发数量（Semaphore）
//! - 批次失败时回退原文
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (处理一篇 Document)
//!     ↓
//! batch_processor (处理 Vec<Element>)
//!     ↓
//! workflow (extractor / batch_protocol / reconstructor)
//!     ↓
//! services (能力层：llm / prompt / readability / throttle)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：pipeline 管流程，batch_processor 管并发
//! 2. **向下依赖**：编排层 → workflow → services
//! 3. **无业务逻辑**：只做调度和统计，不做具体文本判断

pub mod batch_processor;
pub mod pipeline;

// 重新导出主要类型
pub use batch_processor::{BatchProcessor, DispatchStats};
pub use pipeline::{SimplifiedDocument, Simplifier};
