//! Dipole 主入口

use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use clap::Parser;
use dipole::{AnalysisSession, AppConfig, VlmEngine};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 命令行参数
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Antenna condition analyzer powered by a vision-language model"
)]
struct Args {
    /// 待分析的天线照片路径
    image: PathBuf,

    /// 覆盖配置中的 API 端点
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// 覆盖配置中的模型名称
    #[arg(long, value_name = "NAME")]
    model: Option<String>,

    /// 开启调试日志
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // 初始化日志
    let directive = if args.debug { "dipole=debug" } else { "dipole=info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(directive.parse().unwrap()))
        .init();

    info!("Starting Dipole v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // 加载配置并解析凭证，凭证缺失在任何交互前直接终止
    let mut config = AppConfig::load()?;
    if let Some(endpoint) = args.endpoint {
        config.vlm.endpoint = endpoint;
    }
    if let Some(model) = args.model {
        config.vlm.model = model;
    }
    let api_key = config.resolve_api_key()?;
    config.vlm.api_key = Some(api_key);

    let engine = VlmEngine::new(config.vlm.clone());
    info!("VLM backend: {}", engine.backend_name());

    let mut session = AnalysisSession::new();
    session.select_image(&args.image)?;

    if let Some(image) = session.image() {
        println!(
            "Image: {} ({}, {}x{}, {} bytes)",
            args.image.display(),
            image.mime_type(),
            image.width(),
            image.height(),
            image.size_bytes()
        );
    }

    let text = session.analyze(&engine).await?;

    println!();
    println!("ผลการวิเคราะห์");
    match session.icon() {
        Some(icon) => println!("{} {}", icon.glyph(), text),
        None => println!("{}", text),
    }

    Ok(())
}
