//! Hydro Planner 命令行
//!
//! 用法：`hydro-planner [--mock] [--config <file>] <layout|environment|optimize> <input.json>`
//! 读取输入 JSON，调用对应的生成操作，把归一化后的结果以 JSON 打印到 stdout。Ctrl+C 取消进行中的请求。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hydro_planner::config::{load_config, AppConfig};
use hydro_planner::domain::{LayoutAnalysis, LayoutRequest, VirtualEnvironment};
use hydro_planner::llm::{ClientFactory, MockClientFactory, OpenAiClientFactory};
use hydro_planner::{observability, GenerationService};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "hydro-planner", version, about = "Hydroponic layout and environment planner")]
struct Cli {
    /// 使用脚本化 Mock 客户端，无需 API Key
    #[arg(long, global = true)]
    mock: bool,
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// 由布局请求生成布局
    Layout { input: PathBuf },
    /// 由布局生成虚拟环境
    Environment { input: PathBuf },
    /// 重新优化虚拟环境的作息表
    Optimize { input: PathBuf },
}

fn build_service(mut config: AppConfig, mock: bool) -> anyhow::Result<GenerationService> {
    let factory: Arc<dyn ClientFactory> = if mock {
        // Mock 不校验 Key，但凭证池要求非空
        if config.resolved_api_keys().is_empty() {
            config.credentials.api_keys = vec!["mock-key".to_string()];
        }
        Arc::new(MockClientFactory::new())
    } else {
        Arc::new(OpenAiClientFactory::new(Some(config.llm.base_url.clone())))
    };

    GenerationService::from_config(&config, factory)
        .context("Failed to build generation service (set HYDRO_API_KEYS or GEMINI_API_KEY)")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid input JSON in {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.clone()).context("Failed to load config")?;
    let service = build_service(config, cli.mock)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, cancelling generation");
            on_ctrl_c.cancel();
        }
    });

    let output = match &cli.command {
        Command::Layout { input } => {
            let request: LayoutRequest = read_json(input)?;
            let layout = service
                .generate_layout_with_cancel(&request, &cancel)
                .await
                .context("Layout generation failed")?;
            serde_json::to_string_pretty(&layout)?
        }
        Command::Environment { input } => {
            let layout: LayoutAnalysis = read_json(input)?;
            let environment = service
                .generate_virtual_environment_with_cancel(&layout, &cancel)
                .await
                .context("Virtual environment generation failed")?;
            serde_json::to_string_pretty(&environment)?
        }
        Command::Optimize { input } => {
            let environment: VirtualEnvironment = read_json(input)?;
            let optimized = service
                .optimize_schedule_with_cancel(&environment, &cancel)
                .await
                .context("Schedule optimization failed")?;
            serde_json::to_string_pretty(&optimized)?
        }
    };

    for status in service.credential_status() {
        tracing::debug!(
            "Key {}: failed={}, requests_in_window={}",
            status.key,
            status.failed,
            status.requests_in_window
        );
    }

    let usage = service.token_usage();
    tracing::info!(
        "Token usage: {} prompt + {} completion = {}",
        usage.prompt_tokens,
        usage.completion_tokens,
        usage.total()
    );

    println!("{}", output);
    Ok(())
}
