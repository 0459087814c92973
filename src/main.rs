use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use implant_stress::app_logic::{self, RunOptions};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = Command::new("implant-stress")
        .version("0.1.0")
        .about("Stress analysis of FEA results for medical implants")
        .arg(
            Arg::new("result_file")
                .value_name("RESULT_FILE")
                .help("FEA result file (.csv or .vtk)")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("material")
                .short('m')
                .long("material")
                .value_name("MATERIAL")
                .help(
                    "Material whose strength limits the stresses are compared with: \
                     bone, titanium, niti, screw, or a material defined in --config",
                )
                .default_value("bone"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Directory for the histogram and statistics table")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("YAML or TOML analysis configuration")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the statistics as JSON")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let options = RunOptions {
        result_file: matches
            .get_one::<PathBuf>("result_file")
            .cloned()
            .unwrap_or_default(),
        material: matches
            .get_one::<String>("material")
            .cloned()
            .unwrap_or_else(|| "bone".to_string()),
        output_dir: matches.get_one::<PathBuf>("output").cloned(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        json: matches.get_flag("json"),
    };

    match app_logic::run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
