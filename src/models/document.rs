//! 文档模型
//!
//! 对二进制文档容器的抽象：按顺序排列的段落，每个段落带样式、对齐/缩进等元数据，
//! 以及一组行内 run（文本 + 粗体/斜体/下划线/高亮/字体属性）。
//! 段落支持清空后重新写入 run。

use serde::{Deserialize, Serialize};

/// 段落对齐方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

/// 高亮颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightColor {
    Yellow,
    Green,
    Cyan,
    Pink,
    Other,
}

/// 行内 run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    /// RGB 十六进制颜色，如 `FF0000`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = Some(true);
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = Some(true);
        self
    }

    pub fn highlighted(mut self, color: HighlightColor) -> Self {
        self.highlight = Some(color);
        self
    }
}

/// 段落
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_indent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_indent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_line_indent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_together: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_with_next: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_break_before: Option<bool>,
    /// 段落内是否包含公式
    #[serde(default)]
    pub has_math: bool,
    /// 段落内嵌入的图形（名称或描述）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drawings: Vec<String>,
    #[serde(default)]
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// 使用给定样式创建段落
    pub fn with_style(style: impl Into<String>) -> Self {
        Self {
            style: Some(style.into()),
            ..Default::default()
        }
    }

    /// 追加一个 run（构造用）
    pub fn push(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    /// 段落纯文本（所有 run 文本拼接）
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// 清空所有 run，保留段落属性和图形
    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// 追加一个只含文本的 run，返回其可变引用以便设置格式
    pub fn add_run(&mut self, text: impl Into<String>) -> &mut Run {
        self.runs.push(Run::new(text));
        let last = self.runs.len() - 1;
        &mut self.runs[last]
    }
}

/// 文档级关系（嵌入部件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub target: String,
}

/// 文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
}

impl Document {
    /// 由纯文本构造文档：每行一个段落（空行保留为空段落）
    pub fn from_plain_text(text: &str) -> Self {
        let paragraphs = text
            .lines()
            .map(|line| Paragraph::default().push(Run::new(line)))
            .collect();
        Self {
            paragraphs,
            relationships: Vec::new(),
        }
    }

    /// 全文（段落文本以换行连接）
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
