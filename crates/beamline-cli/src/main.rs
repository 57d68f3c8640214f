//! Beamline command-line interface.
//!
//! Trace optical lines and resonator modes from TOML job files:
//! ```sh
//! beamline run job.toml
//! beamline validate job.toml
//! beamline elements
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use beamline_core::cavity::{is_stable, Resonator};
use beamline_core::matrix::Axis;

#[derive(Parser)]
#[command(name = "beamline")]
#[command(about = "Beamline: Gaussian beam propagation with ABCD matrices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace every line and cavity in a TOML job file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a job file and build its systems without tracing.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the supported component types.
    Elements,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Beamline Gaussian Beam Tracer");
            println!("=============================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_job(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_traces {
                runner::write_traces(&result, &job, &out_dir)?;
            }
            if job.output.save_summary {
                runner::write_summary_json(&result, &out_dir.join("summary.json"))?;
            }

            println!("Run complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            for line in &job.line {
                let systems = line.optical_line().systems()?;
                println!(
                    "  Line '{}': {} component(s), {} element(s) per axis",
                    line.name,
                    line.component.len(),
                    systems.horizontal.element_count()
                );
            }
            for cavity in &job.ring_cavity {
                report_cavity(&cavity.name, &cavity.geometry())?;
            }
            for cavity in &job.linear_cavity {
                report_cavity(&cavity.name, &cavity.geometry())?;
            }
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Elements => {
            println!("Available component types ([[line.component]] type = ...):");
            println!();
            println!("  free_space       length                   — propagation over a distance");
            println!("  thin_lens        focal_length             — ideal thin lens");
            println!("  curved_mirror    radius, incidence_angle_deg");
            println!("                                            — spherical mirror, astigmatic off-axis");
            println!("  flat_refraction  n1, n2                   — flat interface between media");
            println!("  flat_mirror                               — plane fold mirror");
            println!();
            println!("  Every component accepts: horizontal, vertical (bool), label (string)");
            Ok(())
        }
    }
}

/// Build a cavity and print its stability per axis.
fn report_cavity<R: Resonator>(name: &str, resonator: &R) -> anyhow::Result<()> {
    let systems = resonator.build()?;
    for axis in Axis::ALL {
        let round_trip = systems.get(axis).composite();
        println!(
            "  Cavity '{}' [{}]: (A + D)/2 = {:.6} ({})",
            name,
            axis.short_name(),
            round_trip.half_trace(),
            if is_stable(&round_trip) { "stable" } else { "unstable" }
        );
    }
    Ok(())
}
