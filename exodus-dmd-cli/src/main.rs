//! exodus-dmd command-line interface.
//!
//! ```sh
//! exodus-dmd run flow.e out/flow --rank 10
//! exodus-dmd modes flow.e modes.csv --modes 0,1,2
//! exodus-dmd inspect out/flow_rank_10.dmd
//! ```

mod config;
mod logging;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "exodus-dmd")]
#[command(about = "Dynamic Mode Decomposition of Exodus velocity fields")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose a simulation and write the result archive.
    Run {
        /// Exodus (.e, .exo, .nc) or JSON input file.
        input: PathBuf,
        /// Output path; `_rank_<r>.dmd` is appended.
        output: PathBuf,
        /// Truncation rank (overrides the config file).
        #[arg(short, long)]
        rank: Option<usize>,
        /// Optional TOML pipeline configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Export real parts of selected modes as a CSV of nodal fields.
    Modes {
        /// Exodus (.e, .exo, .nc) or JSON input file.
        input: PathBuf,
        /// CSV file to write.
        output: PathBuf,
        /// Truncation rank (overrides the config file).
        #[arg(short, long)]
        rank: Option<usize>,
        /// Mode indices to export.
        #[arg(short, long, value_delimiter = ',', default_value = "0,1,2")]
        modes: Vec<usize>,
        /// Optional TOML pipeline configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the contents of a result archive.
    Inspect {
        /// Archive written by `run`.
        archive: PathBuf,
        /// Sampling interval used to convert eigenvalue phases to frequencies.
        #[arg(long, default_value_t = 1.0)]
        dt: f64,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            output,
            rank,
            config,
        } => {
            let job = config::resolve(config.as_deref(), rank)?;
            let path = runner::run(&input, &output, &job)?;
            println!("Saved {}", path.display());
            Ok(())
        }
        Commands::Modes {
            input,
            output,
            rank,
            modes,
            config,
        } => {
            let job = config::resolve(config.as_deref(), rank)?;
            runner::export_modes(&input, &output, &job, &modes)?;
            println!("Saved {}", output.display());
            Ok(())
        }
        Commands::Inspect { archive, dt } => runner::inspect(&archive, dt),
    }
}
