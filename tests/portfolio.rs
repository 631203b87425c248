use std::{
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use wsn_lifetime::{
    backends::{Backend, BackendConfig, BackendFactory, CardEncoding, SatEngine, StopToken},
    portfolio::{Deadline, Entrant, Runner},
    reports::{Report, Verdict},
    structures::{
        constraint::{Constraint, Relation},
        formula::Formula,
        literal::Lit,
    },
    types::err::ErrorKind,
};

/// How a fake backend behaves when solving.
#[derive(Clone, PartialEq, Eq)]
enum Behaviour {
    /// Satisfiable at once, with every variable true.
    Instant,

    /// Never answers, though stops when asked.
    Hang,

    /// Unknown at once.
    GiveUp,

    Panic,

    /// Satisfiable once the file exists, or unknown after some seconds.
    AfterFile(PathBuf),
}

/// A factory for fake backends, counting the backends which are solving.
struct Fake {
    name: &'static str,
    behaviour: Behaviour,
    solving: Arc<AtomicUsize>,
}

struct FakeBackend {
    behaviour: Behaviour,
    solving: Arc<AtomicUsize>,
    top: usize,
}

impl BackendFactory for Fake {
    fn name(&self) -> String {
        self.name.to_string()
    }

    fn probe(&self) -> Result<(), ErrorKind> {
        Ok(())
    }

    fn build(&self) -> Result<Box<dyn Backend>, ErrorKind> {
        Ok(Box::new(FakeBackend {
            behaviour: self.behaviour.clone(),
            solving: self.solving.clone(),
            top: 0,
        }))
    }
}

impl Backend for FakeBackend {
    fn name(&self) -> String {
        "fake".to_string()
    }

    fn generate_vars(&mut self, n: usize) -> Vec<Lit> {
        let fresh = (self.top + 1..=self.top + n).map(|v| v as Lit).collect();
        self.top += n;
        fresh
    }

    fn add_clause(&mut self, _: &[Lit]) -> Result<(), ErrorKind> {
        Ok(())
    }

    fn add_constraint(&mut self, _: &Constraint) -> Result<(), ErrorKind> {
        Ok(())
    }

    fn solve(&mut self, stop: &StopToken) -> Report {
        self.solving.fetch_add(1, Ordering::SeqCst);
        let report = match &self.behaviour {
            Behaviour::Instant => Report::Satisfiable,
            Behaviour::GiveUp => Report::Unknown,
            Behaviour::Hang => {
                while !stop.is_stopped() {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Report::Unknown
            }
            Behaviour::Panic => {
                self.solving.fetch_sub(1, Ordering::SeqCst);
                panic!("fake backend panic")
            }
            Behaviour::AfterFile(path) => {
                let started = Instant::now();
                loop {
                    if path.exists() {
                        break Report::Satisfiable;
                    }
                    if stop.is_stopped() || started.elapsed() > Duration::from_secs(20) {
                        break Report::Unknown;
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
        };
        self.solving.fetch_sub(1, Ordering::SeqCst);
        report
    }

    fn model(&self, vars: &[Lit]) -> Option<Vec<Lit>> {
        Some(vars.to_vec())
    }

    fn dump(&self, _: &mut dyn Write) -> std::io::Result<()> {
        Ok(())
    }
}

fn entrant(name: &'static str, behaviour: Behaviour, solving: &Arc<AtomicUsize>) -> Entrant {
    Entrant::Thread(Arc::new(Fake {
        name,
        behaviour,
        solving: solving.clone(),
    }))
}

fn formula() -> (Formula, Vec<Lit>) {
    let mut formula = Formula::default();
    let vars = formula.generate_vars(3);
    formula
        .add_constraint(&Constraint::new(vars.clone(), Relation::GreaterOrEqual, 2))
        .unwrap();
    (formula, vars)
}

mod race {
    use super::*;

    #[test]
    fn instant_beats_hang() {
        let solving = Arc::new(AtomicUsize::new(0));
        let entrants = vec![
            entrant("hang", Behaviour::Hang, &solving),
            entrant("instant", Behaviour::Instant, &solving),
        ];
        let runner = Runner::new(entrants, Duration::from_secs(5)).unwrap();
        let (formula, vars) = formula();

        let started = Instant::now();
        let result = runner.race(&formula, &vars, &Deadline::after(Duration::from_secs(60)));
        assert!(started.elapsed() < Duration::from_secs(30));

        assert_eq!(result.backend, "instant");
        assert_eq!(result.verdict, Verdict::Satisfiable(Some(vars)));
        assert_eq!(solving.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknowns_are_set_aside() {
        let solving = Arc::new(AtomicUsize::new(0));
        let entrants = vec![
            entrant("give up", Behaviour::GiveUp, &solving),
            entrant("panic", Behaviour::Panic, &solving),
            entrant("instant", Behaviour::Instant, &solving),
        ];
        let runner = Runner::new(entrants, Duration::from_secs(5)).unwrap();
        let (formula, _) = formula();

        let result = runner.race(&formula, &[], &Deadline::never());
        assert_eq!(result.verdict, Verdict::Satisfiable(None));
        assert_eq!(solving.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn every_unit_unknown() {
        let solving = Arc::new(AtomicUsize::new(0));
        let entrants = vec![
            entrant("give up", Behaviour::GiveUp, &solving),
            entrant("panic", Behaviour::Panic, &solving),
        ];
        let runner = Runner::new(entrants, Duration::from_secs(5)).unwrap();
        let (formula, _) = formula();

        let result = runner.race(&formula, &[], &Deadline::never());
        assert_eq!(result.verdict, Verdict::Unknown);
    }

    #[test]
    fn deadline_during_race() {
        let solving = Arc::new(AtomicUsize::new(0));
        let runner = Runner::new(vec![entrant("hang", Behaviour::Hang, &solving)], Duration::from_secs(5)).unwrap();
        let (formula, _) = formula();

        let started = Instant::now();
        let result = runner.race(&formula, &[], &Deadline::after(Duration::from_millis(50)));
        assert!(started.elapsed() >= Duration::from_millis(50));

        assert_eq!(result.verdict, Verdict::Unknown);
        assert_eq!(solving.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn past_deadline() {
        let solving = Arc::new(AtomicUsize::new(0));
        let runner = Runner::new(vec![entrant("instant", Behaviour::Instant, &solving)], Duration::ZERO).unwrap();
        let (formula, _) = formula();

        let result = runner.race(&formula, &[], &Deadline::after(Duration::ZERO));
        assert_eq!(result.verdict, Verdict::Unknown);
    }
}

mod engines {
    use super::*;

    fn sat(engine: SatEngine, encoding: CardEncoding) -> Entrant {
        Entrant::Thread(Arc::new(BackendConfig::Sat { engine, encoding }))
    }

    #[test]
    fn agree_on_small_formulas() {
        let entrants = [
            sat(SatEngine::Splr, CardEncoding::SeqCounter),
            sat(SatEngine::Splr, CardEncoding::Totalizer),
            sat(SatEngine::Varisat, CardEncoding::SeqCounter),
            sat(SatEngine::Varisat, CardEncoding::Totalizer),
        ];

        for entrant in entrants {
            let runner = Runner::new(vec![entrant], Duration::from_secs(1)).unwrap();

            let mut formula = Formula::default();
            let vars = formula.generate_vars(4);
            let weighted = Constraint::weighted(vars.clone(), vec![1, 1, 2, 3], Relation::GreaterOrEqual, 5);
            formula.add_constraint(&weighted).unwrap();
            formula.add_clause(&[-vars[3]]).unwrap();

            // Without the last literal, the greatest sum is 4.
            let result = runner.race(&formula, &vars, &Deadline::never());
            assert_eq!(result.verdict, Verdict::Unsatisfiable);

            let mut formula = Formula::default();
            let vars = formula.generate_vars(4);
            formula.add_constraint(&weighted).unwrap();
            formula.add_clause(&[-vars[2]]).unwrap();

            let result = runner.race(&formula, &vars, &Deadline::never());
            match result.verdict {
                Verdict::Satisfiable(Some(model)) => assert_eq!(model, vec![vars[0], vars[1], -vars[2], vars[3]]),
                other => panic!("expected a model, found {other}"),
            }
        }
    }
}

#[cfg(target_os = "linux")]
mod processes {
    use super::*;
    use std::{os::unix::fs::PermissionsExt, path::Path};

    /// A solver which writes its pid to the file given as its argument, and then sleeps.
    const SLEEPER: &str = "#!/bin/sh
if [ \"$1\" = \"--version\" ]; then exit 0; fi
echo $$ > \"$1.part\"
mv \"$1.part\" \"$1\"
exec sleep 30
";

    /// Whether the process has exited, allowing a moment for the signal to land.
    fn exited(pid: &str) -> bool {
        let stat = Path::new("/proc").join(pid).join("stat");
        let started = Instant::now();
        while started.elapsed() < Duration::from_secs(5) {
            match std::fs::read_to_string(&stat) {
                Err(_) => return true,
                // The state follows the parenthesised name, and a zombie is done.
                Ok(stat) if stat.rsplit(')').next().is_some_and(|rest| rest.trim_start().starts_with('Z')) => {
                    return true
                }
                Ok(_) => std::thread::sleep(Duration::from_millis(20)),
            }
        }
        false
    }

    #[test]
    fn cancelled_worker_takes_its_solver() {
        let dir = std::env::temp_dir().join(format!("wsn_lifetime-worker-group-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sleeper = dir.join("sleeper.sh");
        std::fs::write(&sleeper, SLEEPER).unwrap();
        std::fs::set_permissions(&sleeper, std::fs::Permissions::from_mode(0o755)).unwrap();
        let pid_file = dir.join("pid");

        let solving = Arc::new(AtomicUsize::new(0));
        let entrants = vec![
            Entrant::Process {
                program: PathBuf::from(env!("CARGO_BIN_EXE_wsn_lifetime")),
                backend: BackendConfig::Smt {
                    command: sleeper.display().to_string(),
                    args: vec![pid_file.display().to_string()],
                },
            },
            entrant("after file", Behaviour::AfterFile(pid_file.clone()), &solving),
        ];
        let runner = Runner::new(entrants, Duration::from_secs(5)).unwrap();
        let (formula, _) = formula();

        let result = runner.race(&formula, &[], &Deadline::after(Duration::from_secs(60)));
        assert_eq!(result.backend, "after file");
        assert_eq!(result.verdict, Verdict::Satisfiable(None));

        let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
        assert!(exited(&pid), "solver {pid} still running after its worker was stopped");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
