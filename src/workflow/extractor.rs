//! 结构提取 - 流程层
//!
//! 文档 → 有序元素序列（带格式元数据）+ 高亮短语集合。
//!
//! 提取永远不会因为格式字段缺失或异常而失败：缺失的属性一律取默认值。

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::config::ExtractionOptions;
use crate::models::document::{Document, Paragraph, Run};
use crate::models::element::{
    Element, ElementKind, FormatInfo, HighlightSet, ListInfo, ListMarker, MediaDescriptor,
    RunFormat,
};

static NUMBERED_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+|[a-zA-Z])\.").unwrap());

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).unwrap());

const BULLET_GLYPHS: [char; 3] = ['•', '-', '*'];

/// 关系目标名中表示媒体部件的关键字
const MEDIA_TARGET_HINTS: [&str; 5] = ["image", "media", "chart", "diagram", "drawing"];

/// 提取结果
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// 文本元素在前（文档顺序），媒体元素在后（发现顺序）
    pub elements: Vec<Element>,
    /// 所有段落中合并出的高亮短语
    pub highlighted_words: HighlightSet,
}

/// 提取文档结构
pub fn extract(document: &Document, options: &ExtractionOptions) -> Extraction {
    info!("📑 正在提取文档结构...");

    let mut elements = Vec::new();
    let mut highlighted_words = HighlightSet::new();

    for (index, paragraph) in document.paragraphs.iter().enumerate() {
        let text = paragraph.text();
        if text.trim().is_empty() {
            continue;
        }

        let style = paragraph.style.as_deref().unwrap_or_default().to_lowercase();
        let kind = determine_kind(&style, &text);
        let highlighted_phrases = coalesce_highlights(&paragraph.runs);
        highlighted_words.extend(highlighted_phrases.iter().cloned());

        let mut element = Element::text_element(index, kind, text);
        element.style = style;
        element.format = extract_format(paragraph);
        element.runs = paragraph.runs.iter().map(run_format).collect();
        element.highlighted_phrases = highlighted_phrases;
        element.urls = find_urls(&element.text);
        if kind == ElementKind::ListItem {
            element.list_info = list_info(&element.text, &element.format, options);
        }

        debug!("元素 #{} 类型: {} 样式: '{}'", index, kind, element.style);
        elements.push(element);
    }

    let text_count = elements.len();
    elements.extend(discover_media(document));

    info!(
        "📋 共提取 {} 个元素 (其中媒体元素 {} 个)",
        elements.len(),
        elements.len() - text_count
    );

    Extraction {
        elements,
        highlighted_words,
    }
}

/// 判断元素类型
///
/// 顺序：标题样式 → 列表标记 → 目录样式 → 题注样式 → 普通段落
pub fn determine_kind(style: &str, text: &str) -> ElementKind {
    let style = style.to_lowercase();

    if style.contains("heading") || style.contains("title") || style.contains("header") {
        let level = if style.contains("heading") {
            heading_level(&style)
        } else {
            1
        };
        return ElementKind::Heading(level);
    }

    if detect_list_marker(text).is_some() {
        return ElementKind::ListItem;
    }

    if style.contains("toc") || style.contains("contents") {
        return ElementKind::TocEntry;
    }

    if style.contains("caption") {
        return ElementKind::Caption;
    }

    ElementKind::Paragraph
}

/// 样式名中第一个 1-9 的数字，没有则为 1
fn heading_level(style: &str) -> u8 {
    style
        .chars()
        .find_map(|c| c.to_digit(10).filter(|d| (1..=9).contains(d)))
        .map(|d| d as u8)
        .unwrap_or(1)
}

/// 检测文本开头的列表标记
pub fn detect_list_marker(text: &str) -> Option<ListMarker> {
    let text = text.trim();
    if text.starts_with(BULLET_GLYPHS) {
        Some(ListMarker::Bullet)
    } else if NUMBERED_PREFIX.is_match(text) {
        Some(ListMarker::Number)
    } else {
        None
    }
}

fn list_info(text: &str, format: &FormatInfo, options: &ExtractionOptions) -> Option<ListInfo> {
    let marker = detect_list_marker(text)?;
    let level = if format.left_indent > 0.0 && options.indent_points_per_level > 0.0 {
        (format.left_indent / options.indent_points_per_level).floor() as u32
    } else {
        0
    };
    Some(ListInfo { marker, level })
}

/// 合并连续高亮的 run 为短语
///
/// 空 run 以单个空格参与合并；纯空白短语不记录。
pub fn coalesce_highlights(runs: &[Run]) -> HighlightSet {
    let mut phrases = HighlightSet::new();
    let mut current = String::new();

    let mut close = |phrase: &mut String| {
        if !phrase.trim().is_empty() {
            phrases.insert(std::mem::take(phrase));
        } else {
            phrase.clear();
        }
    };

    for (j, run) in runs.iter().enumerate() {
        let piece = if run.text.is_empty() { " " } else { run.text.as_str() };

        if run.highlight.is_some() {
            let continues = j > 0 && runs[j - 1].highlight.is_some();
            if !continues {
                close(&mut current);
            }
            current.push_str(piece);
        } else if !current.is_empty() {
            close(&mut current);
        }
    }
    close(&mut current);

    phrases
}

fn extract_format(paragraph: &Paragraph) -> FormatInfo {
    FormatInfo {
        alignment: paragraph.alignment,
        left_indent: paragraph.left_indent.unwrap_or(0.0),
        right_indent: paragraph.right_indent.unwrap_or(0.0),
        first_line_indent: paragraph.first_line_indent.unwrap_or(0.0),
        line_spacing: paragraph.line_spacing,
        keep_together: paragraph.keep_together,
        keep_with_next: paragraph.keep_with_next,
        page_break_before: paragraph.page_break_before,
        has_math: paragraph.has_math,
    }
}

fn run_format(run: &Run) -> RunFormat {
    RunFormat {
        text: run.text.clone(),
        bold: run.bold.unwrap_or(false),
        italic: run.italic.unwrap_or(false),
        underline: run.underline.unwrap_or(false),
        highlight: run.highlight.is_some(),
        font_size: run.font_size,
        font_name: run.font_name.clone(),
        color: run.color.clone(),
    }
}

/// 提取文本中的 URL（去掉结尾标点）
pub fn find_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in URL.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// 第二遍：发现媒体元素
///
/// 含图形的段落各产生一个内嵌图形元素；目标名像媒体的文档级关系各产生一个嵌入媒体元素。
fn discover_media(document: &Document) -> Vec<Element> {
    let mut media = Vec::new();

    for (index, paragraph) in document.paragraphs.iter().enumerate() {
        if paragraph.drawings.is_empty() {
            continue;
        }
        media.push(Element::media_element(
            Some(index),
            MediaDescriptor::InlineShape {
                drawing: paragraph.drawings.join("; "),
            },
        ));
    }

    for rel in &document.relationships {
        let target = rel.target.to_lowercase();
        if MEDIA_TARGET_HINTS.iter().any(|hint| target.contains(hint)) {
            media.push(Element::media_element(
                None,
                MediaDescriptor::EmbeddedMedia {
                    rel_id: rel.id.clone(),
                    target: rel.target.clone(),
                },
            ));
        }
    }

    media
}
