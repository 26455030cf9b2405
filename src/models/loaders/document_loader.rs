use crate::error::{AppError, DocumentError, FileError};
use crate::models::document::Document;
use crate::models::prompt_config::PromptConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 文档文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// 根据扩展名判断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// 从 JSON 或 TOML 文件加载文档
pub async fn load_document(path: &Path) -> Result<Document> {
    let display = path.display().to_string();

    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        AppError::File(FileError::UnsupportedFormat {
            path: display.clone(),
        })
    })?;

    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(AppError::File(FileError::NotFound { path: display }).into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&display, e))?;

    parse_document(&content, format).with_context(|| format!("无法解析文档文件: {}", display))
}

/// 解析文档内容
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<Document> {
    let document = match format {
        DocumentFormat::Json => serde_json::from_str(content).map_err(AppError::from)?,
        DocumentFormat::Toml => toml::from_str(content).map_err(AppError::from)?,
    };
    Ok(document)
}

/// 保存文档为 JSON
pub async fn save_document(document: &Document, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }
    }

    let content = serde_json::to_string_pretty(document).map_err(|e| {
        AppError::Document(DocumentError::SerializeFailed {
            source: Box::new(e),
        })
    })?;
    fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

    Ok(())
}

/// 加载提示词配置（JSON）
pub async fn load_prompt_config(path: &Path) -> Result<PromptConfig> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取提示词配置: {}", path.display()))?;

    let config: PromptConfig = serde_json::from_str(&content)
        .with_context(|| format!("无法解析提示词配置: {}", path.display()))?;

    Ok(config)
}

/// 生成带时间戳的输出路径：`<output_dir>/<文件名>_<YYYYmmdd_HHMMSS>.json`
pub fn output_path_for(input: &Path, output_dir: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

    PathBuf::from(output_dir).join(format!("{}_{}.json", stem, timestamp))
}
