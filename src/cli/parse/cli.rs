use std::path::PathBuf;

use clap::{value_parser, Arg, Command};

use wsn_lifetime::{
    backends::{CardEncoding, SatEngine},
    config::Config,
    network::ModelKind,
    portfolio::worker::WORKER_COMMAND,
    search::Strategy,
};

pub fn cli() -> Command {
    Command::new("wsn_lifetime")
        .about("Determines the maximum lifetime of a wireless sensor network")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_negates_reqs(true)
        .args_conflicts_with_subcommands(true)

        .subcommand(Command::new(WORKER_COMMAND)
            .hide(true)
            .about("Answer a single query read from stdin, writing the result to stdout."))

        .arg(Arg::new("input")
            .required(true)
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .help("The network to search, as a JSON file (optionally xz compressed)."))

        .arg(Arg::new("coverage")
            .short('k')
            .value_name("K")
            .value_parser(value_parser!(usize))
            .required(false)
            .num_args(1)
            .help("The number of active sensors required to cover each point.
Default: 1"))

        .arg(Arg::new("continuous")
            .short('e')
            .value_name("E")
            .value_parser(value_parser!(usize))
            .required(false)
            .num_args(1)
            .help("The continuous activity cap.")
            .long_help("The continuous activity cap.

No sensor may be active for more than E of any E + 1 consecutive slots.
A cap of 0 disables the cap, as does leaving it out."))

        .arg(Arg::new("localized")
            .short('m')
            .value_name("M")
            .value_parser(value_parser!(usize))
            .required(false)
            .num_args(1)
            .help("The localized activity cap.")
            .long_help("The localized activity cap.

As the continuous activity cap, though only for sensors which observe some critical point.
With both caps, M must be below E.
A cap of 0 disables the cap."))

        .arg(Arg::new("strategy")
            .short('a')
            .long("algorithm")
            .value_name("STRATEGY")
            .value_parser(value_parser!(Strategy))
            .required(false)
            .num_args(1)
            .help("The search strategy.
Default: binary")
            .long_help("The search strategy.
Default: binary

  - linear   : Ask about each lifetime from 1 upward.
  - binary   : Binary search, with an upper bound found by doubling when none is known.
  - reglinear: Extrapolate from the resource left by schedules to jump toward the optimum."))

        .arg(Arg::new("model")
            .long("model")
            .value_name("KIND")
            .value_parser(value_parser!(ModelKind))
            .required(false)
            .num_args(1)
            .help("The kind of network read, single or multi level.
Default: single"))

        .arg(Arg::new("sat")
            .long("sat")
            .value_name("ENGINES")
            .value_parser(clap::builder::ValueParser::new(engines_parser))
            .required(false)
            .num_args(1)
            .help("A comma separated list of SAT engines to race, or 'none'.
Default: splr,varisat"))

        .arg(Arg::new("encoding")
            .long("encoding")
            .value_name("ENCODING")
            .value_parser(value_parser!(CardEncoding))
            .required(false)
            .num_args(1)
            .help("The clause encoding of cardinality constraints, seqcounter or totalizer.
Default: seqcounter"))

        .arg(Arg::new("smt")
            .long("smt")
            .value_name("COMMAND")
            .value_parser(value_parser!(String))
            .required(false)
            .num_args(1)
            .help("An SMT solver to race, reading SMT-LIB 2 from stdin, or 'none'.")
            .long_help("An SMT solver to race, or 'none'.

The solver is given a QF_LIA script on stdin.
'z3' is run as 'z3 -in -smt2', any other command is run without arguments."))

        .arg(Arg::new("mip")
            .long("mip")
            .value_name("COMMAND")
            .value_parser(value_parser!(String))
            .required(false)
            .num_args(1)
            .help("An integer programming solver to race, such as 'cbc', or 'none'.")
            .long_help("An integer programming solver to race, or 'none'.

The solver is given an LP file, and run as 'COMMAND model.lp solve solu solution', as CBC is."))

        .arg(Arg::new("time_limit")
            .long("timeout")
            .short('t')
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .required(false)
            .num_args(1)
            .help("The time limit for the search, in seconds."))

        .arg(Arg::new("grace")
            .long("grace")
            .value_name("MILLISECONDS")
            .value_parser(value_parser!(u64))
            .required(false)
            .num_args(1)
            .help(format!("The time given to losing backends to stop, after each race.
Default: {}", Config::DEFAULT_GRACE.as_millis())))

        .arg(Arg::new("in_process")
            .long("in-process")
            .value_parser(value_parser!(bool))
            .required(false)
            .num_args(0)
            .help("Race backends in threads of this process, rather than in worker processes."))

        .arg(Arg::new("get_model")
            .long("get-model")
            .short('g')
            .value_parser(value_parser!(bool))
            .required(false)
            .num_args(0)
            .help("Display a schedule of the optimal lifetime."))

        .arg(Arg::new("verify")
            .long("verify")
            .value_parser(value_parser!(bool))
            .required(false)
            .num_args(0)
            .help("Check each schedule found against the network."))

        .arg(Arg::new("dump")
            .long("dump")
            .value_name("STEM")
            .value_parser(value_parser!(PathBuf))
            .required(false)
            .num_args(1)
            .help("Write the formula of each query, as given to each backend, to files STEM.LIFETIME.BACKEND."))

        .arg(Arg::new("degree")
            .long("degree")
            .value_parser(value_parser!(usize))
            .required(false)
            .num_args(1)
            .help(format!("The degree of the polynomial fitted by a regression search.
Default: {}", Strategy::DEFAULT_DEGREE)))

        .arg(Arg::new("min_points")
            .long("min-points")
            .value_parser(value_parser!(usize))
            .required(false)
            .num_args(1)
            .help(format!("The least number of samples before a regression search fits a polynomial.
Default: {}", Strategy::DEFAULT_MIN_POINTS)))

        .arg(Arg::new("log")
            .long("log")
            .value_name("LEVEL")
            .value_parser(value_parser!(log::LevelFilter))
            .required(false)
            .num_args(1)
            .global(true)
            .help("The level of logs written to stderr, overriding RUST_LOG."))
}

fn engines_parser(arg: &str) -> Result<Vec<SatEngine>, String> {
    match arg.trim() {
        "none" => Ok(Vec::default()),
        list => list.split(',').map(|engine| engine.trim().parse::<SatEngine>()).collect(),
    }
}
