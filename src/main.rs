use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use doc_simplifier::models::loaders;
use doc_simplifier::utils::logging;
use doc_simplifier::{Config, LlmService, Simplifier};

#[derive(Parser)]
#[command(name = "doc_simplifier", version, about = "把文档改写为浅显语言并保留格式")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 简化文档文件（JSON 或 TOML）
    Document {
        /// 输入文档路径
        input: PathBuf,
    },
    /// 简化一段纯文本
    Text {
        /// 待简化的文本
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let simplifier = build_simplifier(config).await?;

    match cli.command {
        Command::Document { input } => run_document(&simplifier, &input).await,
        Command::Text { text } => run_text(&simplifier, &text).await,
    }
}

async fn build_simplifier(config: Config) -> Result<Simplifier> {
    let rewriter = Arc::new(LlmService::new(&config));
    let prompt_path = PathBuf::from(&config.prompt_config_path);

    let simplifier = Simplifier::new(config, rewriter);
    if !prompt_path.exists() {
        warn!("⚠️ 找不到提示词配置 {}，需要显式提供系统指令", prompt_path.display());
        return Ok(simplifier);
    }

    let prompt_config = loaders::load_prompt_config(&prompt_path).await?;
    info!("✓ 已加载提示词配置: {}", prompt_path.display());
    Ok(simplifier.with_prompt_config(prompt_config))
}

async fn run_document(simplifier: &Simplifier, input: &Path) -> Result<()> {
    info!("\n📁 正在加载文档: {}", input.display());
    let document = loaders::load_document(input).await?;

    let simplified = simplifier
        .simplify_document(document, None, None)
        .await
        .context("文档简化失败")?;

    let output = loaders::output_path_for(input, &simplifier.config().output_dir);
    loaders::save_document(&simplified.document, &output).await?;

    info!("💾 结果已保存至: {}", output.display());
    println!("{}", output.display());
    println!("Readability score: {:.2}", simplified.readability_score);

    Ok(())
}

async fn run_text(simplifier: &Simplifier, text: &str) -> Result<()> {
    let (simplified, score) = simplifier
        .simplify_text(text, None)
        .await
        .context("文本简化失败")?;

    println!("{}", simplified);
    println!("Readability score: {:.2}", score);

    Ok(())
}
