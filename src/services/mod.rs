pub mod llm_service;
pub mod prompt_builder;
pub mod readability;
pub mod throttle;

pub use llm_service::{LlmService, Rewriter};
pub use throttle::{Clock, RequestThrottle, TokioClock};
