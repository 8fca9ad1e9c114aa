use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use subtrans::config::{AppConfig, ConfigManager};
use subtrans::core::{CheckOutcome, SubtitleTranslator};
use subtrans::detection::{Detector, DetectorConfig};
use subtrans::messaging::{BackgroundService, ChannelBackend};
use subtrans::parsers::html::{html_to_dom, serialize_document};
use subtrans::settings::{MemoryStore, SettingsStore, SHOW_ORIGINAL, TARGET_LANGUAGE};
use subtrans::translation::{ClientOptions, GoogleTranslateBackend, TranslationClient};

const DOCUMENT_ENCODING: &str = "utf-8";

#[derive(Parser, Debug)]
#[command(name = "subtrans", version, about = "Detect, translate and overlay video subtitles", long_about = None)]
struct Cli {
    /// Path to a configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a single string
    Translate {
        text: String,

        /// Target language code
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Print the subtitle detected in an HTML page
    Detect { input: PathBuf },

    /// Run detection, translation and overlay rendering over successive page states
    Render {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (single input only)
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Directory to write rendered pages into, keeping file names
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Target language code
        #[arg(short, long)]
        target: Option<String>,

        /// Show the original text under the translation
        #[arg(long)]
        show_original: bool,
    },

    /// Serve the background message channel over HTTP
    #[cfg(feature = "web")]
    Serve {
        #[arg(short, long)]
        bind: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_page(path: &Path) -> Result<markup5ever_rcdom::RcDom, Box<dyn Error>> {
    let data = fs::read(path).map_err(|e| format!("无法读取 {}: {}", path.display(), e))?;
    Ok(html_to_dom(&data, DOCUMENT_ENCODING)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigManager::load(cli.config.as_deref()) {
        Ok(manager) => manager.into_config(),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Command::Translate { text, target } => translate(&config, &text, target).await,
        Command::Detect { input } => detect(&config, &input),
        Command::Render {
            inputs,
            output,
            output_dir,
            target,
            show_original,
        } => render(&config, &inputs, output, output_dir, target, show_original).await,
        #[cfg(feature = "web")]
        Command::Serve { bind, port } => serve(config, bind, port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn translate(config: &AppConfig, text: &str, target: Option<String>) -> Result<(), Box<dyn Error>> {
    let target = target.unwrap_or_else(|| config.default_language.clone());
    let backend = Arc::new(GoogleTranslateBackend::from_config(config)?);
    let client = TranslationClient::new(backend, ClientOptions::from_config(config))?;

    let result = client.translate(text, &target).await;
    tracing::debug!("翻译状态: {:?}", result.status);
    println!("{}", result.text);
    Ok(())
}

fn detect(config: &AppConfig, input: &Path) -> Result<(), Box<dyn Error>> {
    let dom = read_page(input)?;
    let detector = Detector::new(&DetectorConfig::from_config(config))?;

    match detector.detect(&dom.document) {
        Some(detection) => {
            println!("{}\t{}", detection.source, detection.text);
            Ok(())
        }
        None => Err("未检测到字幕".into()),
    }
}

async fn render(
    config: &AppConfig,
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    target: Option<String>,
    show_original: bool,
) -> Result<(), Box<dyn Error>> {
    if output.is_some() && inputs.len() != 1 {
        return Err("--output 只能用于单个输入文件".into());
    }
    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir)?;
    }

    // 页面一侧通过消息通道访问后台服务
    let google = Arc::new(GoogleTranslateBackend::from_config(config)?);
    let channel = BackgroundService::new(google).spawn();
    let client = TranslationClient::new(
        Arc::new(ChannelBackend::new(channel)),
        ClientOptions::from_config(config),
    )?;

    let store = Arc::new(MemoryStore::with_defaults());
    let mut overrides = Map::new();
    overrides.insert(
        TARGET_LANGUAGE.to_string(),
        Value::from(target.unwrap_or_else(|| config.default_language.clone())),
    );
    overrides.insert(SHOW_ORIGINAL.to_string(), Value::from(show_original));
    store.set(overrides).await?;

    let detector = Detector::new(&DetectorConfig::from_config(config))?;
    let translator = SubtitleTranslator::from_store(store, detector, client).await?;

    for (index, input) in inputs.iter().enumerate() {
        if index > 0 {
            // 每个输入视为一次新的 DOM 变化，间隔至少一个节流窗口
            tokio::time::sleep(config.throttle()).await;
        }

        let dom = read_page(input)?;
        let outcome = translator.check_subtitles(&dom.document).await;
        match &outcome {
            CheckOutcome::Rendered { source, overlays } => {
                tracing::info!("{}: {} 显示了 {} 个覆盖层", input.display(), source, overlays)
            }
            CheckOutcome::Failed(e) => tracing::warn!("{}: 保持原字幕 ({})", input.display(), e),
            other => tracing::info!("{}: {:?}", input.display(), other),
        }

        let html = serialize_document(&dom, DOCUMENT_ENCODING)?;
        match (&output, &output_dir) {
            (Some(path), _) => fs::write(path, &html)?,
            (None, Some(dir)) => {
                let name = input
                    .file_name()
                    .ok_or_else(|| format!("无效的输入文件名: {}", input.display()))?;
                fs::write(dir.join(name), &html)?;
            }
            (None, None) => io::stdout().write_all(&html)?,
        }
    }

    Ok(())
}

#[cfg(feature = "web")]
async fn serve(mut config: AppConfig, bind: Option<String>, port: Option<u16>) -> Result<(), Box<dyn Error>> {
    use subtrans::web::{WebConfig, WebServer};

    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let backend = Arc::new(GoogleTranslateBackend::from_config(&config)?);
    let server = WebServer::new(WebConfig::from_config(&config), BackgroundService::new(backend));
    server.start().await?;
    Ok(())
}
