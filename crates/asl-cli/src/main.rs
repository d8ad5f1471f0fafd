use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use asl_classifiers::registry::ModelRegistry;
use asl_cli::predict::input::PredictConfig;
use asl_cli::predict::run_prediction;
use asl_cli::train::input::TrainConfig;
use asl_cli::train::run_training;
use asl_cli::util::load_registry_config;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("ASL_LOG", "error,asl=info"))
        .init();

    let matches = Command::new("asl")
        .version(clap::crate_version!())
        .about("\u{270B} ASL letter classifiers - train, serve and inspect letter-range models")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train the general model, one letter range, or every configured range")
                .arg(
                    Arg::new("config")
                        .help("Path to training configuration file")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("dataset")
                        .short('d')
                        .long("dataset")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the labelled landmark dataset (.json, .csv or .tsv). \
                             Overrides the dataset specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output-dir")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Directory the trained model is written to. \
                             Overrides the directory specified in the configuration file.",
                        )
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("start_letter")
                        .long("start-letter")
                        .help("First letter of the range to train (inclusive)")
                        .value_parser(clap::value_parser!(char))
                        .requires("end_letter"),
                )
                .arg(
                    Arg::new("end_letter")
                        .long("end-letter")
                        .help("Last letter of the range to train (inclusive)")
                        .value_parser(clap::value_parser!(char))
                        .requires("start_letter"),
                )
                .arg(
                    Arg::new("all_ranges")
                        .long("all-ranges")
                        .help("Train one model per configured letter range.")
                        .action(ArgAction::SetTrue)
                        .conflicts_with_all(["start_letter", "end_letter"]),
                )
                .arg(
                    Arg::new("tune_hyperparams")
                        .long("tune-hyperparams")
                        .help("Run a cross-validated grid search before the final fit.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Classify one hand from a landmark file")
                .arg(
                    Arg::new("landmarks")
                        .help("JSON file with 21 [x, y, z] landmarks, or null for no hand")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("model")
                        .short('m')
                        .long("model")
                        .help("Specialised model key such as A_to_F. Falls back to the general model.")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(registry_arg()),
        )
        .subcommand(
            Command::new("models")
                .about("Load the model registry and report which models are available")
                .arg(registry_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("models", sub_m)) => handle_models(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn registry_arg() -> Arg {
    Arg::new("registry")
        .short('r')
        .long("registry")
        .help("Path to a registry layout JSON file. Defaults to models under ./data.")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: Option<&PathBuf> = matches.get_one("config");
    let any_train_argument = ["config", "dataset", "output_dir", "start_letter", "end_letter"]
        .iter()
        .any(|id| matches.contains_id(id))
        || matches.get_flag("all_ranges")
        || matches.get_flag("tune_hyperparams");
    if !any_train_argument {
        eprintln!("[ASL::Train] No config file provided; printing a template.");
        println!("{}", serde_json::to_string_pretty(&TrainConfig::default())?);
        return Ok(());
    }
    if let Some(path) = config_path {
        log::info!("[ASL::Train] Training from config: {:?}", path);
    }

    let params = TrainConfig::from_arguments(config_path, matches)?;

    match run_training(&params) {
        Ok(outcomes) => {
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let landmarks: &PathBuf = matches
        .get_one("landmarks")
        .expect("landmarks is a required argument");
    let params = PredictConfig::from_arguments(landmarks, matches)?;

    match run_prediction(&params) {
        Ok(Ok(result)) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Ok(Err(failure)) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            std::process::exit(1)
        }
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_models(matches: &ArgMatches) -> Result<()> {
    let config = load_registry_config(matches.get_one::<PathBuf>("registry"))?;
    let registry = ModelRegistry::bootstrap(&config);
    println!("{}", serde_json::to_string_pretty(&registry.health())?);
    Ok(())
}
