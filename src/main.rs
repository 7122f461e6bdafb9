use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tfcanvas::core::engine::CanvasEngine;
use tfcanvas::shared::logging;
use tfcanvas::{config, project};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "tfcanvas",
    about = "✨ Assemble cloud infrastructure as a node graph and round-trip it to Terraform configuration.",
    version = APP_VERSION,
    disable_version_flag(true)
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        long,
        short = 'c',
        value_name = "PATH",
        help = "Path to the configuration file"
    )]
    pub config: Option<String>,

    #[arg(long, short = 'V', help = "Print version")]
    pub version: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(name = "analyze", about = "Parse Terraform documents and print a summary")]
    Analyze {
        #[arg(long, short = 'd', value_name = "PATH", help = "Directory of .tf files")]
        dir: PathBuf,
    },

    #[command(name = "import", about = "Parse Terraform documents into a project bundle")]
    Import {
        #[arg(long, short = 'd', value_name = "PATH", help = "Directory of .tf files")]
        dir: PathBuf,

        #[arg(long, short = 'p', value_name = "PATH", help = "Project bundle directory")]
        project: Option<PathBuf>,
    },

    #[command(name = "generate", about = "Generate Terraform from a project bundle")]
    Generate {
        #[arg(long, short = 'p', value_name = "PATH", help = "Project bundle directory")]
        project: Option<PathBuf>,

        #[arg(long, short = 'o', value_name = "PATH", help = "Output directory")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    init_logging();

    let cli = Cli::parse();

    if cli.version {
        println!("{}", APP_VERSION);
        std::process::exit(0);
    }

    match &cli.command {
        Some(cmd) => match cmd {
            Commands::Analyze { dir } => {
                logging::info("Starting Terraform document analysis");
                let engine = match init_engine(&cli) {
                    Ok(engine) => engine,
                    Err(e) => exit_with(&format!("Failed to initialize tfcanvas: {}", e)),
                };
                match project::loader::scan_directory(dir).await {
                    Ok(documents) => {
                        let summary = engine.analyze_documents(&documents);
                        match serde_json::to_string_pretty(&summary) {
                            Ok(text) => println!("{}", text),
                            Err(e) => exit_with(&format!("Failed to render summary: {}", e)),
                        }
                    }
                    Err(e) => exit_with(&format!("Failed to read documents: {}", e)),
                }
            }
            Commands::Import { dir, project } => {
                logging::info("Importing Terraform documents into a project bundle");
                let mut engine = match init_engine(&cli) {
                    Ok(engine) => engine,
                    Err(e) => exit_with(&format!("Failed to initialize tfcanvas: {}", e)),
                };
                let project_dir = match resolve_project_dir(project.as_ref(), &engine) {
                    Ok(dir) => dir,
                    Err(e) => exit_with(&format!("{}", e)),
                };
                if let Err(e) = engine.ingest_directory(dir).await {
                    exit_with(&format!("Import failed: {}", e));
                }
                if let Err(e) = engine.save_project(&project_dir).await {
                    exit_with(&format!("Failed to save project: {}", e));
                }
            }
            Commands::Generate { project, out } => {
                logging::info("Generating Terraform from project bundle");
                let mut engine = match init_engine(&cli) {
                    Ok(engine) => engine,
                    Err(e) => exit_with(&format!("Failed to initialize tfcanvas: {}", e)),
                };
                let project_dir = match resolve_project_dir(project.as_ref(), &engine) {
                    Ok(dir) => dir,
                    Err(e) => exit_with(&format!("{}", e)),
                };
                if let Err(e) = engine.load_project(&project_dir).await {
                    exit_with(&format!("Failed to load project: {}", e));
                }
                if let Err(e) = engine.generate_to(out).await {
                    exit_with(&format!("Generation failed: {}", e));
                }
            }
        },
        None => {
            println!("No command specified. Use --help for usage information.");
        }
    };
}

fn init_engine(cli: &Cli) -> anyhow::Result<CanvasEngine> {
    let config = match &cli.config {
        Some(path) => {
            logging::info(&format!("Loading configuration from {}", path));
            config::init_from_path(path)?
        }
        None => config::init_default()?,
    };
    Ok(CanvasEngine::new(config))
}

/// Project directory priority: CLI argument, then TFCANVAS_DIR, then the
/// configuration file.
fn resolve_project_dir(arg: Option<&PathBuf>, engine: &CanvasEngine) -> anyhow::Result<PathBuf> {
    if let Some(dir) = arg {
        return Ok(dir.clone());
    }
    if let Ok(dir) = std::env::var("TFCANVAS_DIR") {
        logging::info(&format!(
            "Using project directory from TFCANVAS_DIR env var: {}",
            dir
        ));
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = &engine.config().project.directory {
        logging::info(&format!("Using project directory from config: {}", dir));
        return Ok(PathBuf::from(dir));
    }
    Err(anyhow::anyhow!(
        "no project directory given; pass --project, set TFCANVAS_DIR, or set project.directory in the config file"
    ))
}

fn exit_with(message: &str) -> ! {
    logging::error(message);
    std::process::exit(1);
}

fn init_logging() {
    let log_level = std::env::var("TFCANVAS_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let filter = match log_level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tfcanvas={}", filter).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
