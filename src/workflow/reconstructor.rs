//! 格式重建 - 流程层
//!
//! 把改写后的文本写回原段落，并尽量恢复粗体/斜体/下划线/高亮。
//!
//! 每个元素的格式策略由纯函数 [`select_strategy`] 根据元素形态选出，
//! 各策略可以单独测试。逐词格式映射是启发式的：改写后措辞变化时格式可能丢失，
//! 这是可接受的代价。

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::ReconstructionOptions;
use crate::models::document::{Document, HighlightColor, Paragraph};
use crate::models::element::{Element, ElementKind, HighlightSet, RewriteResult};

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*[-•*]|\s*\d+\.|\s*[a-zA-Z]\.)\s+").unwrap());

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());

static SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b|\W+").unwrap());

/// 正文部分的格式策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStrategy {
    /// 格式一致且没有高亮短语
    SimpleUniform,
    /// 格式一致但有高亮短语
    HighlightedUniform,
    /// 原 run 的粗体/斜体/下划线不一致
    ComplexHeuristic,
}

/// 元素的格式策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormattingStrategy {
    /// 标题 / 目录 / 题注
    Heading,
    /// 列表项：先写标记，再按 `body` 处理剩余文本
    ListItem { body: BodyStrategy },
    SimpleUniform,
    HighlightedUniform,
    ComplexHeuristic,
}

impl From<BodyStrategy> for FormattingStrategy {
    fn from(body: BodyStrategy) -> Self {
        match body {
            BodyStrategy::SimpleUniform => FormattingStrategy::SimpleUniform,
            BodyStrategy::HighlightedUniform => FormattingStrategy::HighlightedUniform,
            BodyStrategy::ComplexHeuristic => FormattingStrategy::ComplexHeuristic,
        }
    }
}

/// 根据元素形态选择格式策略
pub fn select_strategy(element: &Element) -> FormattingStrategy {
    if element.kind.is_passthrough() {
        return FormattingStrategy::Heading;
    }

    let body = select_body_strategy(element);
    if element.kind == ElementKind::ListItem {
        FormattingStrategy::ListItem { body }
    } else {
        body.into()
    }
}

fn select_body_strategy(element: &Element) -> BodyStrategy {
    if element.runs.len() > 1 && !element.has_uniform_formatting() {
        BodyStrategy::ComplexHeuristic
    } else if element.highlighted_phrases.is_empty() {
        BodyStrategy::SimpleUniform
    } else {
        BodyStrategy::HighlightedUniform
    }
}

/// 重建文档
///
/// 原地修改段落，返回完整改写文本（每个文本元素一行）。
/// 含媒体的段落不清空也不改写，其文本按原文计入输出。
pub fn rebuild(
    document: &mut Document,
    elements: &[Element],
    result: &RewriteResult,
    options: &ReconstructionOptions,
) -> String {
    info!("🔄 正在用简化后的文本重建文档...");

    let (media, text_elements): (Vec<&Element>, Vec<&Element>) =
        elements.iter().partition(|e| e.kind.is_media());

    let media_positions: HashSet<usize> = media.iter().filter_map(|e| e.sequence_index).collect();
    debug!(
        "文本元素 {} 个，媒体元素 {} 个，含媒体段落 {} 个",
        text_elements.len(),
        media.len(),
        media_positions.len()
    );

    for (index, paragraph) in document.paragraphs.iter_mut().enumerate() {
        if !media_positions.contains(&index) {
            paragraph.clear();
        }
    }

    let mut lines = Vec::with_capacity(text_elements.len());

    for element in text_elements {
        let Some(index) = element.sequence_index else {
            warn!("⚠️ 元素 {} 没有段落位置，跳过", element.id);
            continue;
        };

        if media_positions.contains(&index) {
            lines.push(single_line(&element.text));
            continue;
        }

        let text = result
            .get(&element.id)
            .filter(|t| !t.trim().is_empty())
            .map(String::as_str)
            .unwrap_or(&element.text);
        lines.push(single_line(text));

        match document.paragraphs.get_mut(index) {
            Some(paragraph) => apply_strategy(paragraph, element, text, options),
            None => warn!("⚠️ 找不到位置 {} 的段落，跳过格式恢复", index),
        }
    }

    info!(
        "✅ 文档重建完成: {} 行文本，保留 {} 个媒体元素",
        lines.len(),
        media.len()
    );

    lines.join("\n")
}

/// 按策略把文本写入（已清空的）段落
pub fn apply_strategy(paragraph: &mut Paragraph, element: &Element, text: &str, options: &ReconstructionOptions) {
    if text.is_empty() {
        return;
    }

    if let Some(alignment) = element.format.alignment {
        paragraph.alignment = Some(alignment);
    }

    match select_strategy(element) {
        FormattingStrategy::Heading => write_heading(paragraph, element, text),
        FormattingStrategy::ListItem { body } => {
            let remainder = match LIST_MARKER.captures(text) {
                Some(caps) => {
                    let marker = caps.get(1).map_or("", |m| m.as_str());
                    paragraph.add_run(format!("{} ", marker));
                    &text[caps.get(0).map_or(0, |m| m.end())..]
                }
                None => text,
            };
            write_body(paragraph, element, remainder, body, options);
        }
        FormattingStrategy::SimpleUniform => {
            write_body(paragraph, element, text, BodyStrategy::SimpleUniform, options)
        }
        FormattingStrategy::HighlightedUniform => {
            write_body(paragraph, element, text, BodyStrategy::HighlightedUniform, options)
        }
        FormattingStrategy::ComplexHeuristic => {
            write_body(paragraph, element, text, BodyStrategy::ComplexHeuristic, options)
        }
    }
}

fn write_body(
    paragraph: &mut Paragraph,
    element: &Element,
    text: &str,
    body: BodyStrategy,
    options: &ReconstructionOptions,
) {
    match body {
        BodyStrategy::SimpleUniform => write_simple(paragraph, element, text),
        BodyStrategy::HighlightedUniform => write_highlighted(paragraph, element, text),
        BodyStrategy::ComplexHeuristic => write_complex(paragraph, element, text, options),
    }
}

/// 整段一个 run；任一原 run 为粗体则加粗
fn write_heading(paragraph: &mut Paragraph, element: &Element, text: &str) {
    let run = paragraph.add_run(text);
    if element.any_run(|r| r.bold) {
        run.bold = Some(true);
    }
}

/// 整段一个 run；只有全部原 run 都有的属性才保留
fn write_simple(paragraph: &mut Paragraph, element: &Element, text: &str) {
    let run = paragraph.add_run(text);
    if element.all_runs(|r| r.bold) {
        run.bold = Some(true);
    }
    if element.all_runs(|r| r.italic) {
        run.italic = Some(true);
    }
    if element.all_runs(|r| r.underline) {
        run.underline = Some(true);
    }
}

/// 高亮短语单独成 run；所有 run 带统一的粗体/斜体（不带下划线）
fn write_highlighted(paragraph: &mut Paragraph, element: &Element, text: &str) {
    let bold = element.all_runs(|r| r.bold);
    let italic = element.all_runs(|r| r.italic);

    for (segment, highlighted) in split_highlights(text, &element.highlighted_phrases) {
        let run = paragraph.add_run(segment);
        if highlighted {
            run.highlight = Some(HighlightColor::Yellow);
        }
        if bold {
            run.bold = Some(true);
        }
        if italic {
            run.italic = Some(true);
        }
    }
}

/// 按已知高亮短语切分文本，返回 (片段, 是否高亮)
///
/// 字面子串匹配：同一位置优先匹配更长的短语，匹配不重叠。
pub fn split_highlights(text: &str, phrases: &HighlightSet) -> Vec<(String, bool)> {
    let phrases: Vec<&str> = phrases
        .iter()
        .map(String::as_str)
        .filter(|p| !p.trim().is_empty())
        .collect();

    let mut segments = Vec::new();
    let mut rest = text;

    loop {
        let best = phrases
            .iter()
            .filter_map(|p| rest.find(*p).map(|pos| (pos, *p)))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())));

        match best {
            Some((pos, phrase)) => {
                if pos > 0 {
                    segments.push((rest[..pos].to_string(), false));
                }
                segments.push((phrase.to_string(), true));
                rest = &rest[pos + phrase.len()..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push((rest.to_string(), false));
                }
                break;
            }
        }
    }

    segments
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WordFormat {
    bold: bool,
    italic: bool,
    underline: bool,
    highlight: bool,
}

/// 逐词格式映射
///
/// 改写前后长度差异过大时放弃映射，写入一个无格式 run。
fn write_complex(paragraph: &mut Paragraph, element: &Element, text: &str, options: &ReconstructionOptions) {
    let original_len = element.text.chars().count() as f64;
    let new_len = text.chars().count() as f64;

    if new_len < options.min_length_ratio * original_len || new_len > options.max_length_ratio * original_len {
        debug!(
            "元素 {} 改写后长度 {} 与原文 {} 差异过大，放弃逐词格式",
            element.id, new_len, original_len
        );
        paragraph.add_run(text);
        return;
    }

    let mut formatted_words: HashMap<String, WordFormat> = HashMap::new();
    for run in &element.runs {
        let clean = run.text.trim().to_lowercase();
        for word in WORD.find_iter(&clean) {
            if word.as_str().chars().count() > options.min_word_len {
                formatted_words.insert(
                    word.as_str().to_string(),
                    WordFormat {
                        bold: run.bold,
                        italic: run.italic,
                        underline: run.underline,
                        highlight: run.highlight,
                    },
                );
            }
        }
    }

    // 相邻且格式相同的片段合并为一个 run
    let mut pending: Option<(String, WordFormat)> = None;
    for segment in SEGMENT.find_iter(text) {
        let segment = segment.as_str();
        let clean = segment.trim().to_lowercase();
        let format = if clean.chars().count() > options.min_word_len {
            formatted_words.get(&clean).copied().unwrap_or_default()
        } else {
            WordFormat::default()
        };

        match pending.as_mut() {
            Some((buffer, current)) if *current == format => buffer.push_str(segment),
            _ => {
                if let Some((buffer, current)) = pending.take() {
                    push_formatted(paragraph, buffer, current);
                }
                pending = Some((segment.to_string(), format));
            }
        }
    }
    if let Some((buffer, current)) = pending {
        push_formatted(paragraph, buffer, current);
    }
}

fn push_formatted(paragraph: &mut Paragraph, text: String, format: WordFormat) {
    let run = paragraph.add_run(text);
    if format.bold {
        run.bold = Some(true);
    }
    if format.italic {
        run.italic = Some(true);
    }
    if format.underline {
        run.underline = Some(true);
    }
    if format.highlight {
        run.highlight = Some(HighlightColor::Yellow);
    }
}

fn single_line(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" ")
}
