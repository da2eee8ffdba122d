//! Dyngraph CLI - drive an entity dispatcher from the command line
//!
//! Serves the NDJSON protocol on stdin/stdout and offers a few inspection
//! subcommands over the stock entity classes.

use clap::{Parser, Subcommand};
use dyngraph::graph::ClassCatalog;
use dyngraph::service::Service;
use dyngraph::stock::register_stock;
use dyngraph::{Dispatcher, DispatcherConfig};
use std::io::{self, BufReader};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dyngraph")]
#[command(about = "Reflective dispatch core for named entity graphs", long_about = None)]
struct Cli {
    /// Dispatcher configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the NDJSON protocol on stdin/stdout
    Serve,

    /// List the entity classes that can be created
    Classes,

    /// Print the description of a fresh instance of a class
    Describe {
        /// Class name
        class: String,

        /// Instance name to use
        #[arg(long, default_value = "example")]
        name: String,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing on stderr; stdout carries protocol responses
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DispatcherConfig::load(path)?,
        None => DispatcherConfig::default(),
    };

    let catalog = ClassCatalog::global();
    register_stock(catalog);
    let dispatcher = Dispatcher::with_config(catalog.snapshot(), config);

    match cli.command {
        Commands::Serve => {
            tracing::info!(version = dyngraph::VERSION, "serving on stdio");
            let service = Service::new(dispatcher);
            let stdin = io::stdin();
            service.handle(BufReader::new(stdin.lock()), io::stdout().lock())?;
        }

        Commands::Classes => {
            println!("Classes:");
            for class in dispatcher.list_classes() {
                println!("  {}", class);
            }
        }

        Commands::Describe { class, name } => {
            let entity = dispatcher.create(&class, &name)?;
            print!("{}", dispatcher.display(entity)?);
        }

        Commands::InitConfig { path } => {
            DispatcherConfig::default().save(&path)?;
            println!("Wrote default configuration to {:?}", path);
        }
    }

    Ok(())
}
