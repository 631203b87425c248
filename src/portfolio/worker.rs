/*!
Worker processes.

A process entrant runs the binary with the [WORKER_COMMAND] subcommand.
The worker reads a [WorkerRequest] as JSON from stdin, solves, and writes a [SolverResult] as JSON to stdout.

The supervising side is [supervise], which kills the worker as soon as its stop token is set.
On unix a worker leads its own process group, and the whole group is killed, so no solver the worker started outlives it.
*/

use std::{
    io::{Read, Write},
    path::Path,
    process::{Child, Command, Stdio},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    backends::{self, BackendConfig, StopToken},
    misc::log::targets::{self},
    reports::SolverResult,
    structures::{formula::Formula, literal::Lit},
    types::err::{self, ErrorKind},
};

/// The (hidden) subcommand which runs a worker.
pub const WORKER_COMMAND: &str = "worker";

/// The interval at which a worker is checked against the stop token.
const POLL: Duration = Duration::from_millis(5);

/// A query for a worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub backend: BackendConfig,
    pub formula: Formula,

    /// Variables of the formula whose values are wanted.
    pub requested: Vec<Lit>,
}

/// Answers a single request read from `input`, writing the result to `output`.
pub fn serve(input: impl Read, mut output: impl Write) -> Result<(), ErrorKind> {
    let request: WorkerRequest = serde_json::from_reader(input)
        .map_err(|e| err::WorkerError::Response(e.to_string()))?;

    log::info!(target: targets::WORKER, "Request for {}", request.backend);

    let result = backends::solve_formula(
        &request.backend,
        &request.formula,
        &request.requested,
        &StopToken::new(),
    )?;

    serde_json::to_writer(&mut output, &result).map_err(|e| err::WorkerError::Pipe(e.to_string()))?;
    output.flush().map_err(|e| err::WorkerError::Pipe(e.to_string()))?;
    Ok(())
}

/// Runs `program` as a worker on `request`.
///
/// Returns an unknown result if stopped, after killing the worker.
pub fn supervise(program: &Path, request: &WorkerRequest, stop: &StopToken) -> Result<SolverResult, ErrorKind> {
    let payload = serde_json::to_vec(request).map_err(|e| err::WorkerError::Pipe(e.to_string()))?;

    let mut command = Command::new(program);
    command
        .arg(WORKER_COMMAND)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command
        .spawn()
        .map_err(|e| err::WorkerError::Spawn(format!("{}: {e}", program.display())))?;

    log::debug!(target: targets::WORKER, "Worker {} for {}", child.id(), request.backend);

    let reader = child.stdout.take().map(|mut stdout| {
        std::thread::spawn(move || {
            let mut buffer = String::default();
            let _ = stdout.read_to_string(&mut buffer);
            buffer
        })
    });

    let writer = child
        .stdin
        .take()
        .map(|mut stdin| std::thread::spawn(move || stdin.write_all(&payload)));

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                kill(&mut child);
                return Err(err::WorkerError::Pipe(e.to_string()).into());
            }
        }
        if stop.is_stopped() {
            log::debug!(target: targets::WORKER, "Killing worker {}", child.id());
            kill(&mut child);
            return Ok(SolverResult::unknown(request.backend.to_string()));
        }
        std::thread::sleep(POLL);
    };

    if let Some(Err(e)) = writer.and_then(|handle| handle.join().ok()) {
        return Err(err::WorkerError::Pipe(format!("request for {}: {e}", request.backend)).into());
    }
    let output = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if !status.success() {
        log::warn!(target: targets::WORKER, "Worker for {} exited with {status}", request.backend);
        return Ok(SolverResult::unknown(request.backend.to_string()));
    }

    serde_json::from_str(&output).map_err(|e| err::WorkerError::Response(e.to_string()).into())
}

/// Kills the worker, together with its process group on unix, and reaps it.
fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(group) = libc::pid_t::try_from(child.id()) {
            // SAFETY: The worker leads the group, and is yet to be reaped, so the group id is still its own.
            let killed = unsafe { libc::killpg(group, libc::SIGKILL) };
            if killed != 0 {
                log::debug!(target: targets::WORKER, "No group for worker {group}: {}", std::io::Error::last_os_error());
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backends::{Backend, CardEncoding, SatEngine},
        reports::Verdict,
        structures::constraint::{Constraint, Relation},
    };

    #[test]
    fn serve_in_memory() {
        let mut formula = Formula::default();
        let vars = formula.generate_vars(3);
        formula
            .add_constraint(&Constraint::new(vars.clone(), Relation::GreaterOrEqual, 3))
            .unwrap();

        let request = WorkerRequest {
            backend: BackendConfig::Sat {
                engine: SatEngine::Varisat,
                encoding: CardEncoding::Totalizer,
            },
            formula,
            requested: vars,
        };
        let input = serde_json::to_vec(&request).unwrap();
        let mut output = Vec::default();
        serve(input.as_slice(), &mut output).unwrap();

        let result: SolverResult = serde_json::from_slice(&output).unwrap();
        assert_eq!(result.backend, "varisat+totalizer");
        assert_eq!(result.verdict, Verdict::Satisfiable(Some(vec![1, 2, 3])));
    }

    #[test]
    fn malformed_request() {
        let mut output = Vec::default();
        assert!(matches!(
            serve("{}".as_bytes(), &mut output),
            Err(ErrorKind::Worker(err::WorkerError::Response(_)))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn request_not_read() {
        let mut formula = Formula::default();
        let vars = formula.generate_vars(3);
        for _ in 0..20_000 {
            formula.add_clause(&vars).unwrap();
        }
        let request = WorkerRequest {
            backend: BackendConfig::z3(),
            formula,
            requested: vars,
        };

        // `true` exits without reading the request.
        assert!(matches!(
            supervise(Path::new("true"), &request, &StopToken::new()),
            Err(ErrorKind::Worker(err::WorkerError::Pipe(_)))
        ));
    }

    #[test]
    fn missing_program() {
        let request = WorkerRequest {
            backend: BackendConfig::z3(),
            formula: Formula::default(),
            requested: Vec::default(),
        };
        assert!(matches!(
            supervise(Path::new("/no/such/worker"), &request, &StopToken::new()),
            Err(ErrorKind::Worker(err::WorkerError::Spawn(_)))
        ));
    }
}
