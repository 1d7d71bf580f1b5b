//! # HEIC Converter - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione e override da CLI
//! - Costruzione esplicita di log, decoder e converter
//! - Traduzione dell'esito in exit code (0 successo, 1 errore fatale)
//!
//! ## Esempi di utilizzo:
//! ```bash
//! heic-convert convert IMG_0001.HEIC IMG_0001.jpg
//! heic-convert convert --dir ~/Pictures/iphone ~/Pictures/jpg --delete-source
//! heic-convert serve --port 5001
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use heic_converter::json_output::JsonMessage;
use heic_converter::progress::ProgressManager;
use heic_converter::server::{self, AppState};
use heic_converter::tool_resolver::ToolPathResolver;
use heic_converter::{BatchSummary, Config, ConversionLog, DirectoryConverter, ExternalToolDecoder};

#[derive(Parser)]
#[command(name = "heic-convert")]
#[command(about = "Convert HEIC photos to JPEG")]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Conversion log file (overrides the configuration)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output progress and results as JSON lines on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one file, or every HEIC file of a directory with --dir
    Convert {
        /// Treat INPUT and OUTPUT as directories
        #[arg(long)]
        dir: bool,

        /// Source file (or directory with --dir)
        input: PathBuf,

        /// Destination file (or directory with --dir)
        output: PathBuf,

        /// JPEG quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Delete each source file after it has been converted
        #[arg(long)]
        delete_source: bool,
    },

    /// Run the HTTP conversion server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Where converted uploads are kept
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Show which HEIC decoders are installed
    Tools,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let json = args.json;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("💥 Critical failure: {:#}", e);
            if json {
                JsonMessage::error(e.to_string(), Some(format!("{:#}", e))).emit();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args).await?;

    match args.command {
        Command::Convert {
            dir,
            input,
            output,
            quality,
            delete_source,
        } => {
            if let Some(quality) = quality {
                config.jpeg_quality = quality;
            }
            config.delete_source |= delete_source;
            config.validate()?;

            if dir {
                convert_directory(config, &input, &output).await
            } else {
                convert_file(config, &input, &output).await
            }
        }
        Command::Serve { host, port, output_dir } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(output_dir) = output_dir {
                config.server.output_dir = output_dir;
            }
            config.json_output = false;
            config.validate()?;
            serve(config).await
        }
        Command::Tools => {
            println!("{}", ToolPathResolver::new().get_tools_report());
            Ok(())
        }
    }
}

async fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
            }
            Config::from_file(path)
                .await
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => match Config::default_path() {
            Some(path) => Config::from_file(&path)
                .await
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::default(),
        },
    };

    if let Some(ref log_file) = args.log_file {
        config.log_file = log_file.clone();
    }
    config.json_output = args.json;
    Ok(config)
}

fn build_converter(config: Config) -> DirectoryConverter {
    let log = Arc::new(ConversionLog::open(&config.log_file));
    let decoder = ExternalToolDecoder::new(
        ToolPathResolver::new(),
        Duration::from_secs(config.decode_timeout_secs),
    );
    DirectoryConverter::new(config, Arc::new(decoder), log)
}

async fn convert_file(config: Config, input: &Path, output: &Path) -> Result<()> {
    let json_output = config.json_output;
    let converter = build_converter(config);

    let result = converter.convert_one(input, output).await;
    if json_output {
        JsonMessage::file_complete(&result).emit();
    }

    if result.success {
        info!("✨ Conversion completed: {}", output.display());
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{}",
            result
                .error_detail
                .unwrap_or_else(|| format!("Conversion failed: {}", input.display()))
        ))
    }
}

async fn convert_directory(config: Config, input: &Path, output: &Path) -> Result<()> {
    let json_output = config.json_output;
    let progress = (!json_output).then(|| ProgressManager::new(0));

    let mut converter = build_converter(config);
    if let Some(ref progress) = progress {
        converter = converter.with_progress(progress.clone());
    }

    let start_time = Instant::now();
    let results = match converter.convert_directory(input, output).await {
        Ok(results) => results,
        Err(e) => {
            if let Some(ref progress) = progress {
                progress.finish("aborted");
            }
            return Err(e.into());
        }
    };
    let summary = BatchSummary::from_results(&results);

    if let Some(ref progress) = progress {
        progress.finish(&summary.format_summary());
    }

    if json_output {
        JsonMessage::complete(&summary, start_time.elapsed().as_secs_f64()).emit();
    } else {
        for failed in results.iter().filter(|r| !r.success) {
            warn!(
                "Skipped {}: {}",
                failed.task.source_path().display(),
                failed.error_detail.as_deref().unwrap_or("unknown error")
            );
        }
        info!("=== Conversion Complete ===");
        info!("{}", summary.format_summary());
        info!("Duration: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    tokio::fs::create_dir_all(&config.server.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.server.output_dir.display()))?;

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(build_converter(config)));
    server::serve(state, addr).await
}
