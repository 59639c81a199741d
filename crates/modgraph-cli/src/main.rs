//! modgraph CLI - compile orders for module dependency graphs.

mod order;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use modgraph_core::UnitKind;

#[derive(Parser)]
#[command(name = "modgraph")]
#[command(about = "Compute module compile orders from a project manifest")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compile order of one or more directories
    Order {
        /// Path to the project manifest (.json)
        manifest: PathBuf,

        /// Directories to order (default: all); more than one orders them together
        #[arg(long = "dir")]
        dirs: Vec<PathBuf>,

        /// Unit kind whose dependencies are followed
        #[arg(long, value_enum, default_value = "impl")]
        unit: Unit,

        /// Restrict the request to these modules (default: every module)
        #[arg(long = "module")]
        modules: Vec<String>,
    },

    /// Print the compile order of an implementation of a virtual library
    VlibOrder {
        /// Path to the project manifest (.json)
        manifest: PathBuf,

        /// Directory of the virtual library
        #[arg(long)]
        vlib: PathBuf,

        /// Directory of the implementation
        #[arg(long = "impl")]
        implementation: PathBuf,

        /// Unit kind whose dependencies are followed
        #[arg(long, value_enum, default_value = "impl")]
        unit: Unit,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Unit {
    Intf,
    Impl,
}

impl From<Unit> for UnitKind {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Intf => UnitKind::Interface,
            Unit::Impl => UnitKind::Implementation,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let lines = match cli.command {
        Commands::Order {
            manifest,
            dirs,
            unit,
            modules,
        } => order::directories(&manifest, &dirs, unit.into(), &modules).await?,

        Commands::VlibOrder {
            manifest,
            vlib,
            implementation,
            unit,
        } => order::virtual_implementation(&manifest, &vlib, &implementation, unit.into()).await?,
    };

    for line in lines {
        println!("{}", line);
    }

    Ok(())
}
