//! 多元素批次协议 - 流程层
//!
//! 一批元素的指令各自用 `[ELEMENT_START]` / `[ELEMENT_END]` 包裹后合并成一次请求，
//! 回复按同样的标记顺序拆回每个元素。
//!
//! 拆分严格按元素顺序从左到右扫描；任何一个元素找不到完整的标记对，
//! 该元素（以及其后的元素）都回退为原文。

use tracing::warn;

pub const ELEMENT_START: &str = "[ELEMENT_START]";
pub const ELEMENT_END: &str = "[ELEMENT_END]";

/// 包裹单个元素的指令
pub fn wrap(instruction: &str) -> String {
    format!("{}{}{}", ELEMENT_START, instruction, ELEMENT_END)
}

/// 合并一批已包裹的指令为一条用户指令
pub fn combined_user_instruction(instructions: &[String]) -> String {
    let combined = instructions
        .iter()
        .map(|instruction| wrap(instruction))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Simplify each text segment between the markers:\n\n{}", combined)
}

/// 批次调用使用的系统指令：基础指令 + 保留标记的要求
pub fn batch_system_instruction(base: &str) -> String {
    format!(
        "{}\nImportant: Maintain the element markers {} and {} in your response.",
        base, ELEMENT_START, ELEMENT_END
    )
}

/// 将合并回复拆分为 `expected` 个片段
///
/// 返回值长度恒为 `expected`；`None` 表示该元素应回退为原文。
///
/// 额外校验：
/// - 回复中的起始标记多于元素数量时，无法确定归属，整批回退
/// - 片段内部又出现起始标记（缺少结束标记）时，该片段作废
pub fn demultiplex(reply: &str, expected: usize) -> Vec<Option<String>> {
    let mut segments = vec![None; expected];

    let start_count = reply.matches(ELEMENT_START).count();
    if start_count > expected {
        warn!(
            "⚠️ 回复中有 {} 个起始标记，多于 {} 个元素，整批回退原文",
            start_count, expected
        );
        return segments;
    }

    let mut rest = reply;
    for (slot, segment) in segments.iter_mut().enumerate() {
        let Some(start) = rest.find(ELEMENT_START) else {
            warn!("⚠️ 第 {} 个元素缺少起始标记，回退原文", slot + 1);
            break;
        };
        let content_start = start + ELEMENT_START.len();
        let Some(end) = rest[content_start..].find(ELEMENT_END) else {
            warn!("⚠️ 第 {} 个元素缺少结束标记，回退原文", slot + 1);
            break;
        };

        let content = &rest[content_start..content_start + end];
        rest = &rest[content_start + end + ELEMENT_END.len()..];

        if content.contains(ELEMENT_START) {
            warn!("⚠️ 第 {} 个元素的片段内含起始标记，回退原文", slot + 1);
            continue;
        }

        let content = content.trim();
        if !content.is_empty() {
            *segment = Some(content.to_string());
        }
    }

    segments
}
