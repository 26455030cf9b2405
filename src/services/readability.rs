//! 可读性评分 - 业务能力层
//!
//! Flesch–Kincaid 年级水平：
//! `4.71 × (字符数 / 词数) + 0.5 × (词数 / 句数) − 21.43`，结果不小于 0。

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// 句末标点（可跟随引号/括号），其后为空白或文本结尾
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?…]+["'”’)\]]*(?:\s+|$)"#).unwrap());

/// 折叠连续空白为单个空格并去除首尾空白
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// 句点后不断句的常见缩写（小写，不含末尾句点）
const ABBREVIATIONS: [&str; 9] = ["dr", "mr", "mrs", "ms", "st", "e.g", "i.e", "etc", "vs"];

/// 统计句子数量
///
/// 按句末标点切分，只计非空片段；没有句末标点的尾部文本也算一句。
/// 缩写（`Dr.`、`e.g.`）和单字母缩写（`U.S.`）后的句点不算句末。
pub fn count_sentences(text: &str) -> usize {
    let mut count = 0;
    let mut start = 0;

    for boundary in SENTENCE_END.find_iter(text) {
        let piece = &text[start..boundary.start()];
        if boundary.as_str().trim_end() == "." {
            let last_token = piece.rsplit(char::is_whitespace).next().unwrap_or_default();
            if is_abbreviation(last_token) {
                continue;
            }
        }

        if has_words(piece) {
            count += 1;
        }
        start = boundary.end();
    }

    if has_words(&text[start..]) {
        count += 1;
    }
    count
}

fn has_words(piece: &str) -> bool {
    piece.chars().any(|c| c.is_alphanumeric())
}

fn is_abbreviation(token: &str) -> bool {
    let token = token
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if token.is_empty() {
        return false;
    }
    if ABBREVIATIONS.contains(&token.as_str()) {
        return true;
    }
    token
        .split('.')
        .all(|part| part.chars().count() == 1 && part.chars().all(char::is_alphabetic))
}

/// 计算文本的可读性评分（越高越难读）
pub fn score(text: &str) -> f64 {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return 0.0;
    }

    let num_chars = text.chars().count() as f64;
    let num_words = text.split_whitespace().count() as f64;
    let num_sentences = count_sentences(&text).max(1) as f64;

    let grade = 4.71 * (num_chars / num_words) + 0.5 * (num_words / num_sentences) - 21.43;

    grade.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(score(""), 0.0);
        assert_eq!(score("   \n\t "), 0.0);
    }

    #[test]
    fn test_short_sentence_clamps_to_zero() {
        // 原始值为负数
        let raw = 4.71 * (12.0 / 3.0) + 0.5 * 3.0 - 21.43;
        assert!(raw < 0.0);
        assert_eq!(score("The cat sat."), 0.0);
    }

    #[test]
    fn test_known_grade() {
        let text = "Photosynthesis transforms electromagnetic radiation into chemical energy. \
                    Chlorophyll molecules facilitate this extraordinary biochemical conversion.";
        let normalized = normalize_whitespace(text);
        let chars = normalized.chars().count() as f64;
        let words = normalized.split_whitespace().count() as f64;
        let expected = 4.71 * (chars / words) + 0.5 * (words / 2.0) - 21.43;

        assert_eq!(count_sentences(&normalized), 2);
        assert!((score(text) - expected).abs() < 1e-9);
        assert!(score(text) > 10.0);
    }

    #[test]
    fn test_scoring_is_idempotent_under_normalization() {
        let text = "  First   sentence here.\n\nSecond one,   with\tmore words!  ";
        let once = normalize_whitespace(text);
        let twice = normalize_whitespace(&once);
        assert_eq!(score(&once), score(&twice));
        assert_eq!(score(text), score(&once));
    }

    #[test]
    fn test_sentence_count() {
        assert_eq!(count_sentences("One. Two! Three?"), 3);
        assert_eq!(count_sentences("No terminal punctuation"), 1);
        assert_eq!(count_sentences("He said \"stop.\" Then left."), 2);
        assert_eq!(count_sentences("..."), 0);
    }

    #[test]
    fn test_abbreviations_do_not_end_sentences() {
        assert_eq!(count_sentences("Dr. Smith arrived."), 1);
        assert_eq!(count_sentences("The U.S. Senate met today."), 1);
        assert_eq!(count_sentences("Use tools, e.g. hammers."), 1);
        assert_eq!(count_sentences("Mrs. Lee met Mr. Park at St. James. They left."), 2);
        assert_eq!(count_sentences("Cats vs. dogs, etc. are common pets."), 1);
        assert_eq!(count_sentences("Read chapter 2. Then stop."), 2);
    }
}
