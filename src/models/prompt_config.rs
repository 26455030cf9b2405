//! 提示词配置
//!
//! 对应 `prompt-config.json`：基础指令、需保留的关键词、替换词对、示例。

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ConfigError};

/// 替换词对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub original: String,
    pub replacement: String,
}

/// 改写示例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub original: String,
    pub simplified: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub base_prompt: String,
    #[serde(default)]
    pub keywords_to_keep: Vec<String>,
    #[serde(default)]
    pub keywords_to_replace: Vec<Replacement>,
    #[serde(default)]
    pub examples: Vec<Sample>,
}

impl PromptConfig {
    pub fn new(base_prompt: impl Into<String>) -> Self {
        Self {
            base_prompt: base_prompt.into(),
            ..Default::default()
        }
    }

    /// 校验调用方提供的配置
    pub fn validate(&self) -> AppResult<()> {
        if self.base_prompt.trim().is_empty() {
            return Err(AppError::Config(ConfigError::MissingPrompt {
                what: "base_prompt".to_string(),
            }));
        }
        if let Some(idx) = self.keywords_to_keep.iter().position(|k| k.trim().is_empty()) {
            return Err(AppError::invalid_config(
                format!("keywords_to_keep[{}]", idx),
                "关键词不能为空",
            ));
        }
        if let Some(idx) = self
            .keywords_to_replace
            .iter()
            .position(|r| r.original.trim().is_empty())
        {
            return Err(AppError::invalid_config(
                format!("keywords_to_replace[{}].original", idx),
                "被替换词不能为空",
            ));
        }
        Ok(())
    }
}
