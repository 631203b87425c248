use std::time::Duration;

use clap::ArgMatches;

use wsn_lifetime::{
    backends::{BackendConfig, CardEncoding, SatEngine},
    config::Config,
    network::ModelKind,
    search::Strategy,
};

pub fn config_from_args(args: &ArgMatches) -> Config {
    let mut the_config = Config::default();

    if let Ok(Some(k)) = args.try_get_one::<usize>("coverage") {
        the_config.coverage.value = *k
    };

    // A cap of zero is no cap.
    if let Ok(Some(e)) = args.try_get_one::<usize>("continuous") {
        the_config.continuous = (*e > 0).then(|| Config::continuous_option(*e))
    };

    if let Ok(Some(m)) = args.try_get_one::<usize>("localized") {
        the_config.localized = (*m > 0).then(|| Config::localized_option(*m))
    };

    if let Ok(Some(strategy)) = args.try_get_one::<Strategy>("strategy") {
        the_config.strategy = *strategy
    };

    if let Ok(Some(model)) = args.try_get_one::<ModelKind>("model") {
        the_config.model = *model
    };

    if let Ok(Some(degree)) = args.try_get_one::<usize>("degree") {
        the_config.degree.value = *degree
    };

    if let Ok(Some(points)) = args.try_get_one::<usize>("min_points") {
        the_config.min_points.value = *points
    };

    let encoding = match args.try_get_one::<CardEncoding>("encoding") {
        Ok(Some(encoding)) => *encoding,
        _ => CardEncoding::SeqCounter,
    };

    let engines = match args.try_get_one::<Vec<SatEngine>>("sat") {
        Ok(Some(engines)) => engines.clone(),
        _ => vec![SatEngine::Splr, SatEngine::Varisat],
    };
    the_config.backends = Config::sat_backends(&engines, encoding);

    if let Ok(Some(command)) = args.try_get_one::<String>("smt") {
        match command.as_str() {
            "none" => {}
            "z3" => the_config.backends.push(BackendConfig::z3()),
            other => the_config.backends.push(BackendConfig::Smt {
                command: other.to_string(),
                args: Vec::default(),
            }),
        }
    };

    if let Ok(Some(command)) = args.try_get_one::<String>("mip") {
        if command != "none" {
            the_config.backends.push(BackendConfig::Mip {
                command: command.to_string(),
            })
        }
    };

    if let Ok(Some(secs)) = args.try_get_one::<u64>("time_limit") {
        the_config.time_limit = Some(Duration::from_secs(*secs))
    };

    if let Ok(Some(millis)) = args.try_get_one::<u64>("grace") {
        the_config.grace.value = Duration::from_millis(*millis)
    };

    if let Ok(Some(value)) = args.try_get_one::<bool>("in_process") {
        the_config.in_process = *value
    };

    if let Ok(Some(value)) = args.try_get_one::<bool>("get_model") {
        the_config.get_model = *value
    };

    if let Ok(Some(value)) = args.try_get_one::<bool>("verify") {
        the_config.verify = *value
    };

    if let Ok(Some(stem)) = args.try_get_one::<std::path::PathBuf>("dump") {
        the_config.dump = Some(stem.clone())
    };

    the_config
}
