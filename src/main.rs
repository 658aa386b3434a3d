use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use shotpath::{config::Config, engine::PipelineEngine, template::Variables};

#[derive(Parser)]
#[command(
    name = "shotpath",
    version,
    about = "Path/version resolution and frame-sequence tools for VFX pipelines",
    long_about = "Resolve templated pipeline paths, manage version directories with \
race-free numbering, fold rendered frames into compact sequence ranges, and inspect \
image-container headers without decoding pixels."
)]
struct Cli {
    /// Configuration file (optional; falls back to SHOTPATH_CONFIG / SHOTPATH_MODE)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory and print its frame sequences in compact notation
    Scan {
        /// Directory to scan
        dir: PathBuf,
    },

    /// Resolve a template against pipeline variables
    Resolve {
        /// Template id from the registry
        template: String,

        /// Variables as key=value pairs (use version=latest for the newest)
        #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// Print the highest existing version under a directory
    Latest {
        /// Directory containing version subdirectories
        dir: PathBuf,
    },

    /// Claim and create the next version directory
    Next {
        /// Directory to version under
        dir: PathBuf,
    },

    /// Print the structural metadata of an image container
    Header {
        /// Container file to inspect
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting shotpath v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => Config::from_env()?,
    };

    let engine = PipelineEngine::new(config)?;

    match cli.command {
        Command::Scan { dir } => {
            let descriptors = engine.scan_sequences(&dir)?;
            if descriptors.is_empty() {
                println!("No sequences found in {}", dir.display());
            }
            for d in descriptors {
                println!(
                    "{}  ({} frame(s), {} missing)",
                    d,
                    d.frame_count(),
                    d.missing
                );
            }
        }
        Command::Resolve { template, vars } => {
            let vars = parse_vars(&vars)?;
            let path = engine.resolve_path(&template, &vars)?;
            println!("{}", path.display());
        }
        Command::Latest { dir } => {
            let version = engine.latest_version(&dir)?;
            println!("{}", version);
        }
        Command::Next { dir } => {
            let (version, path) = engine.next_version(&dir)?;
            println!("{} -> {}", version, path.display());
        }
        Command::Header { file } => {
            let header = engine.read_container_header(&file)?;
            println!("resolution:  {}x{}", header.width, header.height);
            println!("compression: {:?}", header.compression);
            if let Some(color_space) = &header.color_space {
                println!("colorspace:  {}", color_space);
            }
            println!("channels:");
            for channel in &header.channels {
                println!("  {:<12} {:?}", channel.name, channel.data_type);
            }
        }
    }

    Ok(())
}

/// Parse repeated `key=value` arguments into a variable mapping.
fn parse_vars(pairs: &[String]) -> Result<Variables> {
    let mut vars = Variables::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected KEY=VALUE, got '{}'", pair))?;
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
