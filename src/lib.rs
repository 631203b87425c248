//! A library for determining the maximum lifetime of a wireless sensor network.
//!
//! A network is a collection of sensors with limited energy, which together should observe a collection of points.
//! The lifetime of a network is the greatest number of time slots for which some schedule of active sensors keeps every point covered, without any sensor exceeding its budget.
//!
//! The lifetime is found by a [search] over feasibility queries: "is there a schedule of `L` slots?"
//! Each query is [encoded](crate::network::Network::encode) as a [formula](crate::structures::formula::Formula) of clauses and cardinality [constraints](crate::structures::constraint::Constraint), and answered by a race of [backends] in a [portfolio].
//!
//! # Orientation
//!
//! The library is layered, from the leaves up:
//! - [structures]: Literals, constraints with canonical at-most forms, formulas, and schedules.
//! - [backends]: Decision procedures behind a common [Backend](crate::backends::Backend) trait, either clause based with a cardinality encoding, or an external SMT or integer programming solver.
//! - [network]: Single and multi-level networks, read from JSON, and their encoding as constraints.
//! - [portfolio]: A race of backends on a query, each in a thread or worker process, with cancellation.
//! - [search]: Linear, binary, and regression guided strategies, over an [Oracle](crate::search::Oracle).
//!
//! A [Config](crate::config::Config) gathers the options of a run.
//!
//! # Examples
//!
//! ```rust
//! # use wsn_lifetime::backends::{BackendConfig, CardEncoding, SatEngine};
//! # use wsn_lifetime::network::{self, Limits, ModelKind};
//! # use wsn_lifetime::portfolio::{Deadline, Entrant, Runner};
//! # use wsn_lifetime::reports::Outcome;
//! # use wsn_lifetime::search::{self, NetworkOracle, Strategy};
//! # use std::{sync::Arc, time::Duration};
//! let json = r#"{
//!   "sensors": [ { "x": 0, "y": 0, "range": 10, "budget": 2 },
//!                { "x": 1, "y": 0, "range": 10, "budget": 3 } ],
//!   "points": [ { "x": 0, "y": 1, "critical": false } ]
//! }"#;
//! let network = network::parse(json, ModelKind::Single, Limits::default()).unwrap();
//!
//! let backend = BackendConfig::Sat { engine: SatEngine::Varisat, encoding: CardEncoding::SeqCounter };
//! let runner = Runner::new(vec![Entrant::Thread(Arc::new(backend))], Duration::from_millis(100)).unwrap();
//!
//! let mut oracle = NetworkOracle::new(network.as_ref(), &runner, Deadline::never());
//! let report = search::search(Strategy::Binary, &mut oracle).unwrap();
//! assert_eq!(report.outcome, Outcome::Optimum(5));
//! ```

pub mod backends;
pub mod config;
pub mod misc;
pub mod network;
pub mod portfolio;
pub mod reports;
pub mod search;
pub mod structures;
pub mod types;
