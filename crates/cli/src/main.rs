#![deny(warnings)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use roll_analyzer_core::analyze::{AnalyzeOptions, Analyzer, DEFAULT_CONCURRENCY};
use roll_analyzer_core::broll::BrollService;
use roll_analyzer_core::classify::AzureVisionClient;
use roll_analyzer_core::config::{
    resolve_azure_config, resolve_recreate_config, AppConfig, AzureOverrides, Env, StdEnv,
};
use roll_analyzer_core::disappearance::ScanOptions;
use roll_analyzer_core::frames::{FrameInput, GridSpec, ImageFetcher};
use roll_analyzer_core::grouping::ExplanationPolicy;
use roll_analyzer_core::remote::RecreateClient;
use roll_analyzer_core::talking_head::DEFAULT_MIN_CONSECUTIVE;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roll-analyzer")]
#[command(about = "Classify video frames into A/B/C-roll and find speaker-free B-roll tails")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(flatten)]
    azure: AzureArgs,

    #[arg(long, global = true)]
    recreate_api_base: Option<String>,

    #[arg(long, global = true)]
    recreate_video_host: Option<String>,
}

#[derive(Args, Debug, Default)]
struct AzureArgs {
    #[arg(long, global = true)]
    azure_api_key: Option<String>,

    #[arg(long, global = true)]
    azure_endpoint: Option<String>,

    #[arg(long, global = true)]
    azure_api_version: Option<String>,

    /// Chat-completions deployment, e.g. gpt-4o.
    #[arg(long, global = true)]
    deployment: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a set of frames and print the role report.
    Analyze(AnalyzeArgs),
    /// Find the speaker-free tail of a reel.
    BrollMeta {
        shortcode: String,
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
    /// Find the speaker-free tail of a reel and cut it out.
    BrollVideo {
        shortcode: String,
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long, conflicts_with = "image_url")]
    frames_dir: Option<PathBuf>,

    /// Repeat for several frames; a single URL with --grid-cols is a spritesheet.
    #[arg(long = "image-url")]
    image_url: Vec<String>,

    #[arg(long)]
    grid_cols: Option<u32>,

    #[arg(long, requires = "grid_cols")]
    grid_rows: Option<u32>,

    #[arg(long, requires = "grid_cols")]
    tile_limit: Option<usize>,

    /// Frame rate of the input, used for segment timecodes (default 30).
    #[arg(long)]
    fps: Option<u32>,

    #[arg(long)]
    no_frame_details: bool,

    /// Copy each segment's first-frame explanation into the report.
    #[arg(long)]
    explanations: bool,

    #[arg(long, requires = "explanations")]
    max_explanations: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_MIN_CONSECUTIVE)]
    min_consecutive: usize,

    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

impl AnalyzeArgs {
    fn grid(&self) -> Option<GridSpec> {
        self.grid_cols.map(|cols| GridSpec {
            cols,
            rows: self.grid_rows,
            tile_limit: self.tile_limit,
        })
    }

    fn options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            fps: self.fps,
            include_frame_details: !self.no_frame_details,
            explanations: ExplanationPolicy {
                include: self.explanations,
                max: self.max_explanations,
            },
            min_consecutive: self.min_consecutive,
            concurrency: self.concurrency,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&cli, &env)?;

    tracing::info!(
        deployment = %cfg.azure.deployment.as_str(),
        api_version = %cfg.azure.api_version,
        recreate_api_base = %cfg.recreate.api_base,
        "config loaded"
    );

    match cli.command {
        Command::Analyze(args) => run_analyze(cfg, args).await,
        Command::BrollMeta {
            shortcode,
            concurrency,
        } => {
            let service = broll_service(cfg, concurrency);
            let window = service
                .meta(&shortcode)
                .await
                .with_context(|| format!("failed to locate b-roll window for {shortcode}"))?;
            print_json(&window)
        }
        Command::BrollVideo {
            shortcode,
            concurrency,
        } => {
            let service = broll_service(cfg, concurrency);
            let video = service
                .video(&shortcode)
                .await
                .with_context(|| format!("failed to cut b-roll video for {shortcode}"))?;
            print_json(&video)
        }
    }
}

async fn run_analyze(cfg: AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let input = FrameInput::from_request(args.frames_dir.clone(), args.image_url.clone(), args.grid())?;
    let fetcher = ImageFetcher::new()?;
    let analyzer = Analyzer::new(AzureVisionClient::new(cfg.azure), args.options());

    let report = analyzer
        .analyze_input(input, &fetcher)
        .await
        .context("failed to load frames")?;
    print_json(&report)
}

fn broll_service(cfg: AppConfig, concurrency: usize) -> BrollService<AzureVisionClient> {
    BrollService::new(
        RecreateClient::new(cfg.recreate),
        AzureVisionClient::new(cfg.azure),
        ScanOptions { concurrency },
    )
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    // stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(cli: &Cli, env: &impl Env) -> anyhow::Result<AppConfig> {
    let overrides = AzureOverrides {
        api_key: cli.azure.azure_api_key.clone(),
        endpoint: cli.azure.azure_endpoint.clone(),
        api_version: cli.azure.azure_api_version.clone(),
        deployment: cli.azure.deployment.clone(),
    };
    let azure = resolve_azure_config(overrides, env)?;
    let recreate = resolve_recreate_config(
        cli.recreate_api_base.clone(),
        cli.recreate_video_host.clone(),
        env,
    );
    Ok(AppConfig { azure, recreate })
}
