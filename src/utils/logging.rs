/// 日志工具模块
///
/// 提供日志初始化以及流水线各阶段的格式化输出
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`，否则 `verbose` 时为 debug，默认 info。
/// 重复调用是安全的（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `max_concurrent`: 最大并发请求数
/// - `batch_size`: 每批元素数量
pub fn log_startup(max_concurrent: usize, batch_size: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 文档简化模式");
    info!("📊 最大并发请求数: {}", max_concurrent);
    info!("📦 每批元素数量: {}", batch_size);
    info!("{}", "=".repeat(60));
}

/// 记录某类元素的分批计划
pub fn log_kind_plan(kind: &str, total: usize, total_batches: usize, batch_size: usize, max_concurrent: usize) {
    info!(
        "🔄 {} 共 {} 个元素，分 {} 批处理 (每批: {}, 并发: {})",
        kind, total, total_batches, batch_size, max_concurrent
    );
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号（从 1 开始）
/// - `total_batches`: 该类元素的批次总数
/// - `kind`: 元素类型
/// - `count`: 本批元素数量
pub fn log_batch_start(batch_num: usize, total_batches: usize, kind: &str, count: usize) {
    info!(
        "▶️ [批次 {}/{}] 开始处理 {}，共 {} 个元素",
        batch_num, total_batches, kind, count
    );
}

/// 记录批次完成信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `kind`: 元素类型
/// - `demuxed`: 成功拆分出改写结果的元素数量
/// - `total`: 本批元素数量
pub fn log_batch_complete(batch_num: usize, total_batches: usize, kind: &str, demuxed: usize, total: usize) {
    info!(
        "✅ [批次 {}/{}] {} 完成: 成功拆分 {}/{}",
        batch_num, total_batches, kind, demuxed, total
    );
}

/// 打印最终统计信息
///
/// # 参数
/// - `rewritten`: 改写成功的元素数
/// - `fallback`: 回退为原文的元素数
/// - `passthrough`: 按策略直接保留的元素数
/// - `score`: 可读性评分
pub fn print_final_stats(rewritten: usize, fallback: usize, passthrough: usize, score: f64) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 改写: {}", rewritten);
    info!("↩️ 回退原文: {}", fallback);
    info!("⏭️ 直接保留: {}", passthrough);
    info!("📈 可读性评分: {:.2}", score);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
