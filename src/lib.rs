//! # Doc Simplifier
//!
//! 一个用 LLM 把文档改写为浅显语言、同时尽量保留原格式的 Rust 库
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 模型层（Models）
//! - `models/` - 文档模型（段落 / run / 关系）、元素模型、提示词配置
//! - `loaders` - 从 JSON / TOML 加载文档，保存结果
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心批次和流程
//! - `LlmService` - 实现 `Rewriter`，调用 OpenAI 兼容接口
//! - `prompt_builder` - 系统指令与单元素指令
//! - `readability` - Flesch–Kincaid 可读性评分
//! - `RequestThrottle` - 请求最小间隔
//!
//! ### ③ 流程层（Workflow）
//! - `extractor` - 文档 → 元素序列 + 高亮短语
//! - `batch_protocol` - 多元素合并请求的标记协议
//! - `reconstructor` - 改写文本写回段落并恢复格式
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分批并发调度，失败回退
//! - `orchestrator/pipeline` - 对外入口 `Simplifier`
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Document, Element, ElementKind, PromptConfig, RewriteResult};
pub use orchestrator::{BatchProcessor, DispatchStats, SimplifiedDocument, Simplifier};
pub use services::{LlmService, Rewriter};
