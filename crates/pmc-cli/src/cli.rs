//! Command Line Interface for pmc
//!
//! pmc uses the `clap` crate to parse command line arguments and create the
//! CLI interface. This module defines all available commands and options (and
//! their documentation) as well as the functions executing them.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};

use clap::{Args, Parser, Subcommand};

use log::{LevelFilter, debug, info};
use log4rs::{
    Config,
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};
use pmc_display_utils::{join_iterator, join_quoted};
use pmc_logic::Property;
use pmc_model::{Model, SparseModel, program::Program};
use pmc_parser::{
    ParseExplicitModel, ParseProgram, ParseProperties, explicit::ExplicitParser,
    pctl::PctlParser, prism::PrismParser, prism::parse_constant_definitions,
};

use crate::pmc_config::PMCConfig;

/// pmc - Command Line Interface
///
/// Reads probabilistic models in the explicit transition format, PRISM
/// programs and PCTL properties and reports what was parsed. You can use the
/// --help / -h flag to get all available commands and options.
#[derive(Parser, Debug)]
#[command(version, name = "pmc", about, long_about)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) log_config: LoggerConfig,
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read an explicit model from a transition and a label file
    Explicit {
        #[command(flatten)]
        input: ExplicitModelInput,

        /// Configuration file for the model builder
        #[arg(short, long, value_name = "CONFIG_FILE")]
        config_file: Option<PathBuf>,

        /// Accept models without any state
        #[arg(long, default_value_t = false)]
        allow_empty: bool,

        /// Add self loops to states without outgoing transitions instead of
        /// rejecting the model
        #[arg(long, default_value_t = false)]
        fix_deadlocks: bool,

        /// Maximal deviation of the probability mass of a choice from 1
        #[arg(short, long, value_name = "EPSILON")]
        tolerance: Option<f64>,

        /// Write the model as a graphviz DOT graph to the given file
        #[cfg(feature = "dot")]
        #[arg(long, value_name = "OUTPUT_FILE")]
        dot: Option<PathBuf>,
    },
    /// Read a PRISM program and print a summary of it
    Prism {
        /// Location of the PRISM program
        input_file: PathBuf,

        /// Define undefined constants, e.g. `N=16,p=0.5`
        #[arg(long, value_name = "DEFINITIONS")]
        constants: Option<String>,
    },
    /// Parse PCTL properties and print them
    Properties {
        #[command(flatten)]
        input: PropertyInput,
    },
}

#[derive(Args, Debug)]
pub(crate) struct ExplicitModelInput {
    /// Location of the transition file (`.tra`)
    transition_file: PathBuf,

    /// Location of the label file (`.lab`)
    label_file: PathBuf,

    /// Location of a state reward file (`.srew`)
    #[arg(long, value_name = "SREW_FILE")]
    state_rewards: Option<PathBuf>,

    /// Location of a transition reward file (`.trew`)
    #[arg(long, value_name = "TREW_FILE")]
    transition_rewards: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct PropertyInput {
    /// Properties given directly on the command line
    properties: Option<String>,

    /// Read the properties from a file
    #[arg(short, long, value_name = "PROPERTY_FILE")]
    file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(crate) struct LoggerConfig {
    /// Read the logger configuration from file.
    /// Logger configuration can be provided in the log4rs specification format.
    #[arg(long)]
    logger_config_file: Option<String>,

    /// Enable debug output.
    /// **Note**: This flag must be passed first, before any command.
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

/// Initialize the logger as specified in `cfg`
///
/// By default the logger is configured to log to stdout. If a log4rs
/// configuration file is given in `cfg`, the configuration from that file will
/// be used instead
pub(crate) fn initialize_logger(cfg: LoggerConfig) -> Result<(), anyhow::Error> {
    if let Some(f) = cfg.logger_config_file {
        log4rs::init_file(f, Default::default())
            .with_context(|| "Failed to read logger config file")?;
        return Ok(());
    }

    let p_encoder = match cfg.debug {
        true => PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} - {h({l})} - [{f}:{L} - {M}] - {m}{n}"),
        false => PatternEncoder::new("{d(%H:%M:%S)} - {h({l})} - {m}{n}"),
    };

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(p_encoder))
        .build();

    let mut level = LevelFilter::Info;
    if cfg.debug {
        level = LevelFilter::Debug;
    }

    let log_config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .with_context(|| "Failed to initialize logger")?;

    log4rs::init_config(log_config).with_context(|| "Failed to initialize console logger")?;
    Ok(())
}

/// Read the configuration file (if any) layered with environment variables
/// prefixed with `PMC`
pub(crate) fn read_config(config_file: Option<PathBuf>) -> Result<PMCConfig, anyhow::Error> {
    let mut settings = ::config::Config::builder();
    if let Some(config_file) = config_file {
        if !config_file.exists() {
            return Err(anyhow!(
                "Specified configuration file '{}' does not exist.",
                config_file.display()
            ));
        }

        settings = settings.add_source(::config::File::from(config_file));
    }

    settings = settings.add_source(
        ::config::Environment::with_prefix("PMC")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );
    let config = settings
        .build()
        .with_context(|| "Failed to read configuration")?
        .try_deserialize::<PMCConfig>()
        .with_context(|| "Invalid configuration")?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<String, anyhow::Error> {
    fs::read_to_string(path).with_context(|| format!("Unable to read file {}", path.display()))
}

/// Read the explicit model described by `input` using the builder options of
/// `config`
pub(crate) fn parse_explicit_input(
    input: ExplicitModelInput,
    config: &PMCConfig,
) -> Result<Model, anyhow::Error> {
    let transitions = read_file(&input.transition_file)?;
    let labels = read_file(&input.label_file)?;
    let state_rewards = input.state_rewards.as_deref().map(read_file).transpose()?;
    let transition_rewards = input
        .transition_rewards
        .as_deref()
        .map(read_file)
        .transpose()?;

    let parser = ExplicitParser::with_options(config.builder_options());
    let model = match (&state_rewards, &transition_rewards) {
        (None, None) => parser.parse_model(&transitions, &labels),
        _ => parser.parse_model_with_rewards(
            &transitions,
            &labels,
            state_rewards.as_deref(),
            transition_rewards.as_deref(),
        ),
    }
    .with_context(|| format!("Failed to read model {}", input.transition_file.display()))?;

    Ok(model)
}

/// Summary of a model as printed by the `explicit` command
pub(crate) fn model_summary(model: &Model) -> String {
    let mut summary = format!(
        "Model type: {}\nStates: {}\nTransitions: {}\nChoices: {}\n",
        model.model_type(),
        model.nr_states(),
        model.nr_transitions(),
        model.nr_choices()
    );
    summary += &format!(
        "Initial states: {}\n",
        join_iterator(model.initial_states().into_iter(), ", ")
    );
    summary += &format!("Labels: {}\n", join_quoted(model.labels().into_iter(), ", "));
    if model.has_parameters() {
        summary += &format!(
            "Parameters: {}\n",
            join_iterator(model.probability_parameters().into_iter(), ", ")
        );
    }
    if let Some(rewards) = model.reward_model() {
        summary += &format!(
            "Rewards: state rewards {}, transition rewards {}\n",
            rewards.state_rewards().is_some(),
            rewards.transition_rewards().is_some()
        );
    }
    summary
}

/// Write the DOT graph of `model` to `output_file`
#[cfg(feature = "dot")]
pub(crate) fn write_dot(model: &Model, output_file: PathBuf) -> Result<(), anyhow::Error> {
    use pmc_model::dot::ToDOT;

    fs::write(&output_file, model.get_dot_graph())
        .with_context(|| format!("Failed to write output file {}", output_file.display()))?;
    info!("Wrote DOT graph to {}", output_file.display());
    Ok(())
}

/// Read the PRISM program at `input_file` and define the given constants
pub(crate) fn parse_prism_input(
    input_file: PathBuf,
    constants: Option<String>,
) -> Result<Program, anyhow::Error> {
    let input = read_file(&input_file)?;
    let mut program = PrismParser::new()
        .parse_program(&input)
        .with_context(|| format!("Failed to parse PRISM program {}", input_file.display()))?;

    if let Some(constants) = constants {
        let definitions = parse_constant_definitions(&constants)
            .with_context(|| "Invalid constant definitions: ")?;
        debug!("Defining {} constants", definitions.len());
        program = program.define_constants(&definitions)?;
    }

    Ok(program)
}

/// Summary of a program as printed by the `prism` command
pub(crate) fn program_summary(program: &Program) -> String {
    let mut summary = format!(
        "Model type: {}\nModules: {}\n",
        program.model_type(),
        join_iterator(program.modules().iter().map(|m| m.name()), ", ")
    );
    summary += &format!(
        "Constants: {}\n",
        join_iterator(program.constants().iter().map(|c| c.name()), ", ")
    );
    if program.has_undefined_constants() {
        summary += &format!(
            "Undefined constants: {}\n",
            join_iterator(program.undefined_constants().map(|c| c.name()), ", ")
        );
    }
    summary += &format!(
        "Labels: {}\n",
        join_quoted(program.labels().iter().map(|l| l.name()), ", ")
    );
    summary += &format!("Reward structures: {}\n", program.reward_structures().len());
    summary
}

/// Parse the properties given in `input`
pub(crate) fn parse_property_input(input: PropertyInput) -> Result<Vec<Property>, anyhow::Error> {
    let text = match (input.properties, input.file) {
        (Some(text), _) => text,
        (None, Some(file)) => read_file(&file)?,
        (None, None) => return Err(anyhow!("No properties given")),
    };

    PctlParser::new().parse_properties(&text)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::{
        cli::{
            ExplicitModelInput, PropertyInput, model_summary, parse_explicit_input,
            parse_prism_input, parse_property_input, program_summary,
        },
        pmc_config::PMCConfig,
    };

    const EXAMPLES: &str = "../../resources/examples";

    fn example(path: &str) -> PathBuf {
        PathBuf::from(EXAMPLES).join(path)
    }

    #[test]
    fn test_model_summary_die() {
        let input = ExplicitModelInput {
            transition_file: example("dtmc/die.tra"),
            label_file: example("dtmc/die.lab"),
            state_rewards: Some(example("dtmc/die.srew")),
            transition_rewards: None,
        };

        let model = parse_explicit_input(input, &PMCConfig::default()).unwrap();
        let summary = model_summary(&model);

        assert!(summary.contains("Model type: DTMC\n"), "{summary}");
        assert!(summary.contains("States: 13\n"), "{summary}");
        assert!(summary.contains("Transitions: 20\n"), "{summary}");
        assert!(summary.contains("Initial states: 0\n"), "{summary}");
        assert!(
            summary.contains("Rewards: state rewards true, transition rewards false"),
            "{summary}"
        );
        assert!(!summary.contains("Parameters"), "{summary}");
    }

    #[test]
    fn test_model_summary_parametric() {
        let input = ExplicitModelInput {
            transition_file: example("pdtmc/die.tra"),
            label_file: example("pdtmc/die.lab"),
            state_rewards: None,
            transition_rewards: None,
        };

        let model = parse_explicit_input(input, &PMCConfig::default()).unwrap();
        assert!(model_summary(&model).contains("Parameters: p\n"));
    }

    #[test]
    fn test_missing_model_file() {
        let input = ExplicitModelInput {
            transition_file: example("dtmc/missing.tra"),
            label_file: example("dtmc/die.lab"),
            state_rewards: None,
            transition_rewards: None,
        };

        assert!(parse_explicit_input(input, &PMCConfig::default()).is_err());
    }

    #[test]
    fn test_program_summary_brp() {
        let program = parse_prism_input(example("pdtmc/brp16_2.pm"), None).unwrap();
        let summary = program_summary(&program);

        assert!(
            summary.contains("Modules: sender, receiver, tester, channelK, channelL\n"),
            "{summary}"
        );
        assert!(summary.contains("Undefined constants: pL, pK\n"), "{summary}");

        let program =
            parse_prism_input(example("pdtmc/brp16_2.pm"), Some("pL=0.98,pK=0.99".into()))
                .unwrap();
        assert!(!program.has_undefined_constants());
        assert!(!program_summary(&program).contains("Undefined constants"));
    }

    #[test]
    fn test_program_unknown_constant() {
        let res = parse_prism_input(example("dtmc/die.pm"), Some("K=3".into()));
        assert!(res.is_err());
    }

    #[test]
    fn test_property_input() {
        let input = PropertyInput {
            properties: Some("P=? [F \"one\"]; P>=0.5 [G !\"done\"]".into()),
            file: None,
        };
        let properties = parse_property_input(input).unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].to_string(), "P=? [F \"one\"]");

        let input = PropertyInput {
            properties: None,
            file: Some(example("dtmc/die.pctl")),
        };
        assert_eq!(parse_property_input(input).unwrap().len(), 5);
    }
}
