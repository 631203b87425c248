#![allow(clippy::collapsible_if)]

#[cfg(not(target_env = "msvc"))]
#[cfg(feature = "jemalloc")]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = Jemalloc;

use std::path::{Path, PathBuf};

use wsn_lifetime::{
    config::Config,
    network::{self},
    portfolio::{worker, Deadline, Runner},
    reports::{Outcome, SearchReport},
    search::{self, NetworkOracle},
    types::err::ErrorKind,
};

mod misc;
mod parse;

fn main() {
    let matches = parse::cli::cli().get_matches();

    let mut logger = env_logger::Builder::from_default_env();
    if let Ok(Some(level)) = matches.try_get_one::<log::LevelFilter>("log") {
        logger.filter_level(*level);
    }
    logger.init();

    if matches.subcommand_matches(worker::WORKER_COMMAND).is_some() {
        let served = worker::serve(std::io::stdin().lock(), std::io::stdout().lock());
        match served {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1)
            }
        }
    }

    let config = parse::config::config_from_args(&matches);

    let path = match matches.try_get_one::<PathBuf>("input") {
        Ok(Some(path)) => path.clone(),
        _ => {
            println!("No network given");
            std::process::exit(1)
        }
    };

    let (report, schedule) = match run(&path, &config) {
        Ok(found) => found,
        Err(e) => {
            println!("{e}");
            std::process::exit(1)
        }
    };

    println!("{report}");
    if let Some(schedule) = schedule {
        println!("{schedule}");
    }

    match report.outcome {
        Outcome::Optimum(0) => std::process::exit(20),
        Outcome::Optimum(_) => std::process::exit(10),
        Outcome::Timeout => std::process::exit(30),
    }
}

/// Searches the network at `path`, returning a report and, if requested, a display of the optimal schedule.
///
/// The time limit covers loading the network and probing backends, as well as the search.
fn run(path: &Path, config: &Config) -> Result<(SearchReport, Option<String>), ErrorKind> {
    let deadline = match config.time_limit {
        Some(limit) => Deadline::after(limit),
        None => Deadline::never(),
    };

    config.validate()?;

    let network = network::load(path, config.model, config.limits())?;
    let runner = Runner::new(misc::entrants(config)?, config.grace.value)?;

    println!("Starting to search…");

    let mut oracle = NetworkOracle::new(network.as_ref(), &runner, deadline)
        .verify_schedules(config.verify)
        .keep_schedules(config.get_model)
        .dump_to(config.dump.clone());

    let report = search::search(config.search_strategy(), &mut oracle)?;

    let schedule = match (report.outcome, oracle.last_schedule()) {
        (Outcome::Optimum(optimum), Some((lifetime, schedule))) if optimum == *lifetime => {
            Some(network.display(schedule))
        }
        _ => None,
    };

    Ok((report, schedule))
}
