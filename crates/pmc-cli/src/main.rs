//! pmc Command Line Interface
//!
//! This crate contains the `pmc` binary that reads probabilistic models in
//! the explicit transition format, PRISM programs and PCTL properties, and
//! reports what was parsed.

use clap::Parser;
use cli::{Cli, initialize_logger};
use human_panic::setup_panic;
use log::{debug, info};
use pmc_model::SparseModel;

mod cli;
mod pmc_config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_panic!();

    // parse the cli arguments
    let cli = Cli::parse();
    initialize_logger(cli.log_config)?;

    match cli.command {
        cli::Commands::Explicit {
            input,
            config_file,
            allow_empty,
            fix_deadlocks,
            tolerance,
            #[cfg(feature = "dot")]
            dot,
        } => {
            let mut config = cli::read_config(config_file)?;

            // Check whether builder options were overridden via CLI
            if let Some(tolerance) = tolerance {
                config.set_tolerance(tolerance);
            }
            if allow_empty {
                config.set_allow_empty();
            }
            if fix_deadlocks {
                config.set_fix_deadlocks();
            }
            debug!("Using builder options {:?}", config.builder_options());

            let model = cli::parse_explicit_input(input, &config)?;
            info!(
                "Built {} with {} states and {} transitions",
                model.model_type(),
                model.nr_states(),
                model.nr_transitions()
            );
            print!("{}", cli::model_summary(&model));

            #[cfg(feature = "dot")]
            if let Some(output_file) = dot {
                cli::write_dot(&model, output_file)?;
            }
            Ok(())
        }
        cli::Commands::Prism {
            input_file,
            constants,
        } => {
            let program = cli::parse_prism_input(input_file, constants)?;
            info!(
                "Parsed {} program with {} modules",
                program.model_type(),
                program.nr_modules()
            );
            print!("{}", cli::program_summary(&program));
            Ok(())
        }
        cli::Commands::Properties { input } => {
            let properties = cli::parse_property_input(input)?;
            info!("Parsed {} properties", properties.len());
            for property in properties {
                println!("{property}");
            }
            Ok(())
        }
    }
}
