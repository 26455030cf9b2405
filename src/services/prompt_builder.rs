//! 提示词构建 - 业务能力层
//!
//! 纯函数：根据配置渲染系统指令，根据元素上下文渲染单元素指令。
//! 高亮词集合通过参数传入、返回值传出，不做原地修改。

use crate::models::element::{Element, ElementKind, HighlightSet, ListMarker};
use crate::models::prompt_config::PromptConfig;

/// 枚举的高亮短语上限
const MAX_LISTED_PHRASES: usize = 5;
/// 枚举的 URL 上限
const MAX_LISTED_URLS: usize = 3;

const AI_ONLY: &str = "INSTRUCTIONS FOR AI (DO NOT INCLUDE IN RESPONSE):";

/// 构建系统指令
///
/// 顺序固定：基础指令、KEYWORDS TO KEEP、REPLACEMENTS、EXAMPLES。
/// 所有保留关键词和被替换词都会加入返回的高亮词集合。
///
/// # 返回
/// 返回 (系统指令, 更新后的高亮词集合)
pub fn system_instruction(config: &PromptConfig, mut highlighted: HighlightSet) -> (String, HighlightSet) {
    let mut keywords_text = String::new();
    if !config.keywords_to_keep.is_empty() {
        keywords_text.push_str("KEYWORDS TO KEEP:\n");
        for keyword in &config.keywords_to_keep {
            keywords_text.push_str(&format!("- {}\n", keyword));
            highlighted.insert(keyword.clone());
        }
    }

    let mut replacements_text = String::new();
    if !config.keywords_to_replace.is_empty() {
        replacements_text.push_str("REPLACEMENTS:\n");
        for pair in &config.keywords_to_replace {
            replacements_text.push_str(&format!(
                "- Replace '{}' with '{}'\n",
                pair.original, pair.replacement
            ));
            highlighted.insert(pair.original.clone());
        }
    }

    let mut examples_text = String::new();
    if !config.examples.is_empty() {
        examples_text.push_str("EXAMPLES:\n");
        for (i, sample) in config.examples.iter().enumerate() {
            examples_text.push_str(&format!(
                "Example {}:\nOriginal: {}\nSimplified: {}\n\n",
                i + 1,
                sample.original,
                sample.simplified
            ));
        }
    }

    let instruction = format!(
        "{}\n\n{}\n{}\n{}",
        config.base_prompt, keywords_text, replacements_text, examples_text
    );

    (instruction, highlighted)
}

/// 构建单个元素的改写指令
///
/// 具体的保留指令（高亮短语、URL）放在最后，减少被截断或稀释的可能。
pub fn element_instruction(element: &Element, text: &str) -> String {
    let text = if text.is_empty() { element.text.as_str() } else { text };

    let mut prompt = format!(
        "Simplify the following text to grade 6 reading level:\n\n{}\n\n",
        text
    );

    if element.kind == ElementKind::ListItem {
        prompt.push_str("This is a list item. Maintain the bullet point or numbering format. ");
        match element.list_info.map(|info| info.marker) {
            Some(ListMarker::Bullet) => prompt.push_str("Preserve the bullet symbol at the beginning. "),
            Some(ListMarker::Number) => prompt.push_str("Preserve the numbering at the beginning. "),
            None => {}
        }
    }

    prompt.push_str(AI_ONLY);
    prompt.push_str(
        " Keep the same general structure. Do not add or remove information. Simplify language only.",
    );

    if !element.highlighted_phrases.is_empty() {
        let phrases: Vec<&String> = element.highlighted_phrases.iter().collect();
        prompt.push_str(&format!(
            "\n\n{} CRITICAL: You MUST preserve these exact phrases in your output - do not modify, replace, or remove them: {}",
            AI_ONLY,
            quoted_list(&phrases, MAX_LISTED_PHRASES)
        ));
    }

    if !element.urls.is_empty() {
        let urls: Vec<&String> = element.urls.iter().collect();
        prompt.push_str(&format!(
            "\n\n{} CRITICAL: Preserve these exact URLs in your output - do not modify or remove them: {}",
            AI_ONLY,
            quoted_list(&urls, MAX_LISTED_URLS)
        ));
    }

    prompt
}

/// 纯文本入口的改写指令
pub fn text_instruction(text: &str) -> String {
    format!("Please simplify the following text:\n\n{}", text)
}

/// `'a', 'b', and N more`
fn quoted_list(items: &[&String], limit: usize) -> String {
    let mut listed = items
        .iter()
        .take(limit)
        .map(|item| format!("'{}'", item))
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > limit {
        listed.push_str(&format!(", and {} more", items.len() - limit));
    }
    listed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::element::ListInfo;
    use crate::models::prompt_config::{Replacement, Sample};

    fn config() -> PromptConfig {
        PromptConfig {
            base_prompt: "Rewrite for clarity.".to_string(),
            keywords_to_keep: vec!["GDPR".to_string()],
            keywords_to_replace: vec![Replacement {
                original: "utilize".to_string(),
                replacement: "use".to_string(),
            }],
            examples: vec![Sample {
                original: "Commence the procedure.".to_string(),
                simplified: "Start.".to_string(),
            }],
        }
    }

    #[test]
    fn test_system_instruction_block_order() {
        let (instruction, highlighted) = system_instruction(&config(), HighlightSet::new());

        let base = instruction.find("Rewrite for clarity.").unwrap();
        let keep = instruction.find("KEYWORDS TO KEEP:\n- GDPR\n").unwrap();
        let replace = instruction.find("REPLACEMENTS:\n- Replace 'utilize' with 'use'\n").unwrap();
        let examples = instruction
            .find("EXAMPLES:\nExample 1:\nOriginal: Commence the procedure.\nSimplified: Start.\n")
            .unwrap();
        assert!(base < keep && keep < replace && replace < examples);

        assert!(highlighted.contains("GDPR"));
        assert!(highlighted.contains("utilize"));
        assert!(!highlighted.contains("use"));
    }

    #[test]
    fn test_system_instruction_keeps_incoming_words() {
        let mut incoming = HighlightSet::new();
        incoming.insert("from extraction".to_string());
        let (instruction, highlighted) =
            system_instruction(&PromptConfig::new("Base."), incoming);

        assert_eq!(instruction, "Base.\n\n\n\n");
        assert_eq!(highlighted.len(), 1);
    }

    #[test]
    fn test_list_item_instruction() {
        let mut el = Element::text_element(0, ElementKind::ListItem, "• Item one");
        el.list_info = Some(ListInfo {
            marker: ListMarker::Bullet,
            level: 0,
        });
        let prompt = element_instruction(&el, &el.text);

        assert!(prompt.starts_with("Simplify the following text to grade 6 reading level:\n\n• Item one\n\n"));
        assert!(prompt.contains("This is a list item."));
        assert!(prompt.contains("Preserve the bullet symbol at the beginning."));
        assert!(!prompt.contains("CRITICAL"));
    }

    #[test]
    fn test_preservation_directives_come_last_and_overflow() {
        let mut el = Element::text_element(0, ElementKind::Paragraph, "text");
        for phrase in ["a1", "a2", "a3", "a4", "a5", "a6", "a7"] {
            el.highlighted_phrases.insert(phrase.to_string());
        }
        el.urls = vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
            "https://c.example".to_string(),
            "https://d.example".to_string(),
        ];
        let prompt = element_instruction(&el, "text");

        let structure = prompt.find("Keep the same general structure").unwrap();
        let phrases = prompt.find("preserve these exact phrases").unwrap();
        let urls = prompt.find("Preserve these exact URLs").unwrap();
        assert!(structure < phrases && phrases < urls);

        assert!(prompt.contains("'a1', 'a2', 'a3', 'a4', 'a5', and 2 more"));
        assert!(!prompt.contains("'a6'"));
        assert!(prompt.contains("'https://c.example', and 1 more"));
    }
}
