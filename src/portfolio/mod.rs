/*!
A race of backends, to answer a single query.

Each [Entrant] of a [Runner] is given its own copy of a formula and runs as an isolated unit:
- A [thread](Entrant::Thread) unit solves in-process, with any panic contained to the unit.
  Cancellation is cooperative, through a [StopToken].
- A [process](Entrant::Process) unit runs a [worker] process, and is cancelled by killing the process.

The first definitive (satisfiable or unsatisfiable) result wins.
Unknown results from individual units are set aside, and the race is unknown only if every unit is unknown or the [Deadline] passes first.

Before a race returns every unit is signalled to stop, and each unit is given a grace period to do so.
A thread unit which has not stopped within the grace period is detached with a warning.
As threads cannot be forcefully stopped, process units are the way to bound the resources used by an engine which does not check its stop token.
*/

use std::{
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::Arc,
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crossbeam::channel::{unbounded, RecvTimeoutError};

use crate::{
    backends::{self, BackendConfig, BackendFactory, StopToken},
    misc::log::targets::{self},
    reports::SolverResult,
    structures::{formula::Formula, literal::Lit},
    types::err::{self, ErrorKind},
};

pub mod worker;

/// The interval at which stopped units are checked during the grace period.
const POLL: Duration = Duration::from_millis(2);

/// A wall-clock deadline, fixed once for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Deadline(Instant::now().checked_add(duration))
    }

    pub fn never() -> Self {
        Deadline(None)
    }

    /// The time until the deadline, or None if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|instant| instant.saturating_duration_since(Instant::now()))
    }

    pub fn is_past(&self) -> bool {
        self.0.is_some_and(|instant| Instant::now() >= instant)
    }
}

/// A backend entered into a race.
#[derive(Clone)]
pub enum Entrant {
    /// A unit in a thread of this process.
    Thread(Arc<dyn BackendFactory>),

    /// A unit in a worker process, running `program`.
    Process {
        program: PathBuf,
        backend: BackendConfig,
    },
}

impl Entrant {
    pub fn name(&self) -> String {
        match self {
            Self::Thread(factory) => factory.name(),
            Self::Process { backend, .. } => backend.name(),
        }
    }

    /// The factory of the backend run by the entrant.
    pub fn factory(&self) -> &dyn BackendFactory {
        match self {
            Self::Thread(factory) => factory.as_ref(),
            Self::Process { backend, .. } => backend,
        }
    }

    pub fn probe(&self) -> Result<(), ErrorKind> {
        match self {
            Self::Thread(factory) => factory.probe(),
            Self::Process { program, backend } => {
                if !program.exists() {
                    return Err(ErrorKind::BackendUnavailable(format!(
                        "no worker program at {}",
                        program.display()
                    )));
                }
                backend.probe()
            }
        }
    }

    fn run(&self, formula: &Formula, requested: &[Lit], stop: &StopToken) -> SolverResult {
        let name = self.name();
        match self {
            Self::Thread(factory) => {
                let attempt = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    backends::solve_formula(factory.as_ref(), formula, requested, stop)
                }));
                match attempt {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        log::error!(target: targets::PORTFOLIO, "{name}: {e}");
                        SolverResult::unknown(name)
                    }
                    Err(_) => {
                        log::error!(target: targets::PORTFOLIO, "{name} panicked");
                        SolverResult::unknown(name)
                    }
                }
            }

            Self::Process { program, backend } => {
                let request = worker::WorkerRequest {
                    backend: backend.clone(),
                    formula: formula.clone(),
                    requested: requested.to_vec(),
                };
                match worker::supervise(program, &request, stop) {
                    Ok(result) => result,
                    Err(e) => {
                        log::error!(target: targets::PORTFOLIO, "{name}: {e}");
                        SolverResult::unknown(name)
                    }
                }
            }
        }
    }
}

/// A running unit of a race.
struct Unit {
    name: String,
    stop: StopToken,
    handle: JoinHandle<()>,
}

/// Races entrants on queries.
pub struct Runner {
    entrants: Vec<Entrant>,
    grace: Duration,
}

impl Runner {
    /// A runner for the given entrants, each of which is probed.
    pub fn new(entrants: Vec<Entrant>, grace: Duration) -> Result<Self, ErrorKind> {
        if entrants.is_empty() {
            return Err(err::ConfigurationError::NoBackends.into());
        }
        for entrant in &entrants {
            entrant.probe()?;
            log::info!(target: targets::PORTFOLIO, "Entrant: {}", entrant.name());
        }
        Ok(Runner { entrants, grace })
    }

    pub fn entrants(&self) -> &[Entrant] {
        &self.entrants
    }

    /// Races every entrant on `formula`, returning the first definitive result.
    pub fn race(&self, formula: &Formula, requested: &[Lit], deadline: &Deadline) -> SolverResult {
        if deadline.is_past() {
            return SolverResult::unknown("portfolio");
        }

        let formula = Arc::new(formula.clone());
        let requested: Arc<[Lit]> = Arc::from(requested);
        let (tx, rx) = unbounded::<SolverResult>();

        let mut units = Vec::with_capacity(self.entrants.len());
        for entrant in &self.entrants {
            let stop = StopToken::new();
            let name = entrant.name();

            let unit_entrant = entrant.clone();
            let unit_stop = stop.clone();
            let unit_formula = formula.clone();
            let unit_requested = requested.clone();
            let unit_tx = tx.clone();

            let spawned = std::thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    let result = unit_entrant.run(&unit_formula, &unit_requested, &unit_stop);
                    let _ = unit_tx.send(result);
                });

            match spawned {
                Ok(handle) => units.push(Unit { name, stop, handle }),
                Err(e) => log::error!(target: targets::PORTFOLIO, "{name} failed to start: {e}"),
            }
        }
        drop(tx);

        let mut outstanding = units.len();
        let result = loop {
            if outstanding == 0 {
                break SolverResult::unknown("portfolio");
            }

            let received = match deadline.remaining() {
                Some(remaining) => rx.recv_timeout(remaining),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(result) if result.verdict.is_definitive() => break result,

                Ok(result) => {
                    log::debug!(target: targets::PORTFOLIO, "{} is unknown", result.backend);
                    outstanding -= 1;
                }

                Err(RecvTimeoutError::Timeout) => {
                    log::info!(target: targets::PORTFOLIO, "Deadline passed during a race");
                    break SolverResult::unknown("portfolio");
                }

                Err(RecvTimeoutError::Disconnected) => break SolverResult::unknown("portfolio"),
            }
        };

        log::debug!(target: targets::PORTFOLIO, "{} won with {}", result.backend, result.verdict);

        self.cancel(units);
        result
    }

    /// Signals every unit to stop, and joins those which do within the grace period.
    fn cancel(&self, units: Vec<Unit>) {
        for unit in &units {
            unit.stop.stop();
        }

        let grace_end = Instant::now() + self.grace;
        let mut pending = units;
        loop {
            let (finished, running): (Vec<_>, Vec<_>) = pending.into_iter().partition(|u| u.handle.is_finished());
            for unit in finished {
                let _ = unit.handle.join();
            }
            pending = running;

            if pending.is_empty() {
                break;
            }
            if Instant::now() >= grace_end {
                for unit in pending {
                    log::warn!(target: targets::PORTFOLIO, "{} did not stop within the grace period, and is detached", unit.name);
                }
                break;
            }
            std::thread::sleep(POLL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline() {
        assert!(!Deadline::never().is_past());
        assert_eq!(Deadline::never().remaining(), None);
        assert!(Deadline::after(Duration::ZERO).is_past());
        assert!(Deadline::after(Duration::from_secs(60)).remaining().is_some_and(|d| d > Duration::from_secs(1)));
    }

    #[test]
    fn no_entrants() {
        assert!(matches!(
            Runner::new(Vec::default(), Duration::ZERO),
            Err(ErrorKind::Configuration(err::ConfigurationError::NoBackends))
        ));
    }

    #[test]
    fn missing_worker_program() {
        let entrant = Entrant::Process {
            program: PathBuf::from("/no/such/program"),
            backend: BackendConfig::Sat {
                engine: backends::SatEngine::Splr,
                encoding: backends::CardEncoding::SeqCounter,
            },
        };
        assert!(matches!(
            Runner::new(vec![entrant], Duration::ZERO),
            Err(ErrorKind::BackendUnavailable(_))
        ));
    }
}
