//! 元素模型
//!
//! 元素是简化的基本单位：结构提取时创建一次，之后只读。

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::document::Alignment;

/// 高亮短语集合（有序，保证提示词中枚举顺序稳定）
pub type HighlightSet = BTreeSet<String>;

/// 改写结果：元素 ID → 改写后文本
pub type RewriteResult = HashMap<ElementId, String>;

/// 元素 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// 标题，级别 1..=9
    Heading(u8),
    ListItem,
    TocEntry,
    Caption,
    Paragraph,
    Media,
}

impl ElementKind {
    /// 按策略不送去改写的类型（标题、目录、题注）
    pub fn is_passthrough(self) -> bool {
        matches!(
            self,
            ElementKind::Heading(_) | ElementKind::TocEntry | ElementKind::Caption
        )
    }

    pub fn is_media(self) -> bool {
        matches!(self, ElementKind::Media)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Heading(level) => write!(f, "heading_{}", level),
            ElementKind::ListItem => write!(f, "list_item"),
            ElementKind::TocEntry => write!(f, "toc_entry"),
            ElementKind::Caption => write!(f, "caption"),
            ElementKind::Paragraph => write!(f, "paragraph"),
            ElementKind::Media => write!(f, "media"),
        }
    }
}

/// 段落格式信息（缺失的属性一律取默认值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub alignment: Option<Alignment>,
    pub left_indent: f32,
    pub right_indent: f32,
    pub first_line_indent: f32,
    pub line_spacing: Option<f32>,
    pub keep_together: Option<bool>,
    pub keep_with_next: Option<bool>,
    pub page_break_before: Option<bool>,
    pub has_math: bool,
}

/// 原始 run 的格式快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFormat {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub highlight: bool,
    pub font_size: Option<f32>,
    pub font_name: Option<String>,
    pub color: Option<String>,
}

/// 列表标记类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMarker {
    Bullet,
    Number,
}

/// 列表信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListInfo {
    pub marker: ListMarker,
    /// 嵌套级别，由左缩进估算
    pub level: u32,
}

/// 媒体描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaDescriptor {
    /// 段落内嵌图形
    InlineShape { drawing: String },
    /// 文档级嵌入部件
    EmbeddedMedia { rel_id: String, target: String },
}

/// 元素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    /// 对应源段落的位置；文档级媒体没有位置
    pub sequence_index: Option<usize>,
    pub kind: ElementKind,
    pub text: String,
    pub style: String,
    pub format: FormatInfo,
    pub runs: Vec<RunFormat>,
    pub highlighted_phrases: HighlightSet,
    pub list_info: Option<ListInfo>,
    /// 文本中出现的 URL
    pub urls: Vec<String>,
    pub media: Option<MediaDescriptor>,
}

impl Element {
    /// 创建文本元素
    pub fn text_element(sequence_index: usize, kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            id: ElementId::new(),
            sequence_index: Some(sequence_index),
            kind,
            text: text.into(),
            style: String::new(),
            format: FormatInfo::default(),
            runs: Vec::new(),
            highlighted_phrases: HighlightSet::new(),
            list_info: None,
            urls: Vec::new(),
            media: None,
        }
    }

    /// 创建媒体元素
    pub fn media_element(sequence_index: Option<usize>, descriptor: MediaDescriptor) -> Self {
        Self {
            id: ElementId::new(),
            sequence_index,
            kind: ElementKind::Media,
            text: String::new(),
            style: String::new(),
            format: FormatInfo::default(),
            runs: Vec::new(),
            highlighted_phrases: HighlightSet::new(),
            list_info: None,
            urls: Vec::new(),
            media: Some(descriptor),
        }
    }

    /// 所有 run 的粗体/斜体/下划线是否一致
    pub fn has_uniform_formatting(&self) -> bool {
        match self.runs.first() {
            None => true,
            Some(first) => self.runs.iter().all(|r| {
                r.bold == first.bold && r.italic == first.italic && r.underline == first.underline
            }),
        }
    }

    /// 是否所有 run 都满足条件（无 run 时为 false）
    pub fn all_runs(&self, pred: impl Fn(&RunFormat) -> bool) -> bool {
        !self.runs.is_empty() && self.runs.iter().all(pred)
    }

    /// 是否有任一 run 满足条件
    pub fn any_run(&self, pred: impl Fn(&RunFormat) -> bool) -> bool {
        self.runs.iter().any(pred)
    }
}
