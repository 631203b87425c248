/*!
An oracle which answers queries about a network by racing backends.

Each query encodes the network for the lifetime asked about into a fresh [Formula], and races the entrants of a [Runner] on the formula.
Every query of a search shares one [Deadline].

A schedule is read back only when it is needed: to compute the resource left, to [verify](NetworkOracle::verify_schedules) the schedule, or to [keep](NetworkOracle::keep_schedules) it.
*/

use std::{io::BufWriter, path::PathBuf};

use crate::{
    misc::log::targets::{self},
    network::Network,
    portfolio::{Deadline, Runner},
    reports::Verdict,
    search::{Oracle, Probe},
    structures::{
        formula::Formula,
        literal::{valuation_from_model, Lit},
        schedule::Schedule,
    },
    types::err::ErrorKind,
};

/// Queries about a network, answered by a race.
pub struct NetworkOracle<'a> {
    network: &'a dyn Network,
    runner: &'a Runner,
    deadline: Deadline,

    verify: bool,
    keep: bool,
    dump: Option<PathBuf>,

    last: Option<(usize, Schedule)>,
}

impl<'a> NetworkOracle<'a> {
    pub fn new(network: &'a dyn Network, runner: &'a Runner, deadline: Deadline) -> Self {
        NetworkOracle {
            network,
            runner,
            deadline,
            verify: false,
            keep: false,
            dump: None,
            last: None,
        }
    }

    /// Check every schedule found against the network.
    pub fn verify_schedules(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Keep the schedule of the greatest feasible lifetime found.
    pub fn keep_schedules(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Write the formula of each query, for each entrant, to files named after `stem`.
    pub fn dump_to(mut self, stem: Option<PathBuf>) -> Self {
        self.dump = stem;
        self
    }

    /// The schedule of the greatest feasible lifetime found, if kept.
    pub fn last_schedule(&self) -> Option<&(usize, Schedule)> {
        self.last.as_ref()
    }

    fn wants_schedule(&self, want_resource: bool) -> bool {
        want_resource || self.verify || self.keep
    }

    /// Writes `formula` as given to each entrant, to `{stem}.{lifetime}.{entrant}`.
    ///
    /// Failure to write is logged, and otherwise ignored.
    fn dump(&self, formula: &Formula, lifetime: usize) {
        let Some(stem) = &self.dump else {
            return;
        };

        for entrant in self.runner.entrants() {
            let name = entrant
                .name()
                .chars()
                .map(|c| match c.is_ascii_alphanumeric() {
                    true => c,
                    false => '_',
                })
                .collect::<String>();

            let mut path = stem.clone().into_os_string();
            path.push(format!(".{lifetime}.{name}"));
            let path = PathBuf::from(path);

            let written = entrant.factory().build().and_then(|mut backend| {
                formula.load_into(backend.as_mut())?;
                Ok(backend)
            });

            let backend = match written {
                Ok(backend) => backend,
                Err(e) => {
                    log::warn!(target: targets::SEARCH, "No dump for {}: {e}", entrant.name());
                    continue;
                }
            };

            let file = std::fs::File::create(&path);
            match file.and_then(|file| backend.dump(&mut BufWriter::new(file))) {
                Ok(()) => log::info!(target: targets::SEARCH, "Dumped {}", path.display()),
                Err(e) => log::warn!(target: targets::SEARCH, "Failed to dump {}: {e}", path.display()),
            }
        }
    }
}

impl Oracle for NetworkOracle<'_> {
    fn upper_bound(&self) -> Option<usize> {
        self.network.upper_bound()
    }

    fn probe(&mut self, lifetime: usize, want_resource: bool) -> Result<Probe, ErrorKind> {
        let mut formula = Formula::default();
        let vars = self.network.encode(lifetime, &mut formula)?;

        log::info!(target: targets::SEARCH,
            "{lifetime}: {} variables, {} constraints", formula.var_count(), formula.constraint_count()
        );

        self.dump(&formula, lifetime);

        let wants_schedule = self.wants_schedule(want_resource);
        let requested: &[Lit] = match wants_schedule {
            true => vars.all(),
            false => &[],
        };

        let result = self.runner.race(&formula, requested, &self.deadline);
        log::info!(target: targets::SEARCH, "{lifetime}: {} from {}", result.verdict, result.backend);

        let model = match result.verdict {
            Verdict::Unknown => return Ok(Probe::Undetermined),
            Verdict::Unsatisfiable => return Ok(Probe::Infeasible),
            Verdict::Satisfiable(model) => model,
        };

        let schedule = match (wants_schedule, model) {
            (true, Some(model)) => vars.read(&valuation_from_model(&model)),
            (true, None) => {
                log::warn!(target: targets::SEARCH, "{} found no schedule for {lifetime}", result.backend);
                return Ok(Probe::Feasible { resource: None });
            }
            (false, _) => return Ok(Probe::Feasible { resource: None }),
        };

        if self.verify {
            match self.network.verify(&schedule, lifetime) {
                Ok(()) => log::info!(target: targets::VERIFY, "Schedule of {lifetime} verified"),
                Err(violation) => {
                    log::error!(target: targets::VERIFY, "Schedule of {lifetime} from {}: {violation}", result.backend)
                }
            }
        }

        let resource = want_resource.then(|| self.network.resource_used(&schedule));

        if self.keep && self.last.as_ref().map_or(true, |(kept, _)| *kept < lifetime) {
            self.last = Some((lifetime, schedule));
        }

        Ok(Probe::Feasible { resource })
    }
}
