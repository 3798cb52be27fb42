extern crate pvcompare;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pvcompare::core::energy_supply::utilization_factor::{BreakpointSelection, SearchDomain};
use pvcompare::output::FileOutput;
use pvcompare::{
    render_era5_request, run_cops, run_fit, run_heat_demand_adjustment, run_utilization_factor,
};
use std::ffi::OsStr;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct PvcompareArgs {
    #[command(subcommand)]
    command: Command,
    #[clap(long, default_value_t = false, help = "Whether to log out spans")]
    log_spans: bool,
    #[clap(long, default_value_t = false, help = "Log debug information")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a two-segment utilization factor model to samples in a CSV file with columns x and y
    Fit {
        samples_file: String,
        #[arg(long, help = "Split the samples at this driver value instead of searching")]
        forced_breakpoint: Option<f64>,
        #[command(flatten)]
        search_domain: SearchDomainArgs,
    },
    /// Evaluate a utilization factor model for a CSV file with columns airmass and temperature
    UtilizationFactor {
        drivers_file: String,
        #[arg(long, short, help = "Path to utilization factor model in .json format")]
        model_file: String,
    },
    /// Redistribute heat demand of warm days in a CSV file with columns temperature and demand
    AdjustHeatDemand {
        series_file: String,
        #[arg(
            long,
            help = "Daily mean temperature in degrees C at or above which there is no space heating"
        )]
        heating_limit_temperature: f64,
    },
    /// Calculate COPs for a CSV file with columns temp_high and temp_low
    Cop {
        series_file: String,
        #[arg(long, help = "Path to heat pump or chiller description in .json format")]
        heat_pump_file: String,
    },
    /// Print the CDS request body for an ERA5 download described in a .json file
    Era5Request { request_file: String },
}

#[derive(Args, Clone, Copy, Debug)]
struct SearchDomainArgs {
    #[arg(long, default_value_t = SearchDomain::AIRMASS.min, help = "Lowest candidate breakpoint")]
    search_min: f64,
    #[arg(long, default_value_t = SearchDomain::AIRMASS.max, help = "Highest candidate breakpoint")]
    search_max: f64,
    #[arg(long, default_value_t = SearchDomain::AIRMASS.step, help = "Step between candidate breakpoints")]
    search_step: f64,
}

fn main() -> anyhow::Result<()> {
    let args = PvcompareArgs::parse();

    // set up basic tracing
    let tracing_subscriber = {
        let level = if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };
        let mut builder = tracing_subscriber::fmt::fmt().with_max_level(level);

        if args.log_spans {
            builder = builder.with_span_events(FmtSpan::CLOSE);
        }

        builder.finish()
    };
    tracing::subscriber::set_global_default(tracing_subscriber)
        .expect("setting tracing subscriber failed");

    match args.command {
        Command::Fit {
            samples_file,
            forced_breakpoint,
            search_domain,
        } => {
            let breakpoint = match forced_breakpoint {
                Some(breakpoint) => BreakpointSelection::Forced(breakpoint),
                None => BreakpointSelection::Search(SearchDomain::new(
                    search_domain.search_min,
                    search_domain.search_max,
                    search_domain.search_step,
                )?),
            };
            let fit = run_fit(
                open(&samples_file)?,
                file_output_for(&samples_file)?,
                breakpoint,
            )?;
            println!("{}", serde_json::to_string_pretty(&fit)?);
        }
        Command::UtilizationFactor {
            drivers_file,
            model_file,
        } => {
            run_utilization_factor(
                open(&model_file)?,
                open(&drivers_file)?,
                file_output_for(&drivers_file)?,
            )?;
        }
        Command::AdjustHeatDemand {
            series_file,
            heating_limit_temperature,
        } => {
            run_heat_demand_adjustment(
                open(&series_file)?,
                heating_limit_temperature,
                file_output_for(&series_file)?,
            )?;
        }
        Command::Cop {
            series_file,
            heat_pump_file,
        } => {
            run_cops(
                open(&heat_pump_file)?,
                open(&series_file)?,
                file_output_for(&series_file)?,
            )?;
        }
        Command::Era5Request { request_file } => {
            let body = render_era5_request(open(&request_file)?)?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn open(path: &str) -> anyhow::Result<BufReader<File>> {
    Ok(BufReader::new(
        File::open(path).with_context(|| format!("could not open {path}"))?,
    ))
}

/// Outputs go to a `<input stem>__results` directory next to the input file.
fn file_output_for(input_file: &str) -> anyhow::Result<FileOutput> {
    let input_file_ext = Path::new(input_file).extension().and_then(OsStr::to_str);
    let input_file_stem = match input_file_ext {
        Some(ext) => &input_file[..(input_file.len() - ext.len() - 1)],
        None => input_file,
    };
    let input_file_stem = PathBuf::from(input_file_stem);
    let input_file_name = input_file_stem
        .file_name()
        .and_then(OsStr::to_str)
        .with_context(|| format!("could not derive an output name from {input_file}"))?
        .to_owned();

    let mut output_path = input_file_stem.into_os_string();
    output_path.push("__results");
    let output_path = PathBuf::from(output_path);
    fs::create_dir_all(&output_path)?;
    debug!("writing outputs to {}", output_path.display());

    Ok(FileOutput::new(
        output_path,
        format!("{input_file_name}__{{}}.{{}}"),
    ))
}
