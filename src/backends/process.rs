/*!
External solver programs.

A program is given its input on stdin, while its stdout is read to the end on a separate thread.
The program is checked against a stop token as it runs, and killed (and reaped) once the token is set.
A program is also killed if its input can't be written.
*/

use std::{
    io::{Read, Write},
    process::{Command, Stdio},
    time::Duration,
};

use crate::{
    backends::StopToken,
    misc::log::targets::{self},
    types::err::ErrorKind,
};

/// The interval at which a running program is checked against the stop token.
const POLL: Duration = Duration::from_millis(10);

/// Checks whether `command` can be run, by asking for its version.
pub fn probe(command: &str) -> Result<(), ErrorKind> {
    let status = Command::new(command)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(_) => Ok(()),
        Err(e) => Err(ErrorKind::BackendUnavailable(format!("{command}: {e}"))),
    }
}

/// Runs `command` on `input`, returning its stdout, or None if stopped.
pub fn run(command: &mut Command, input: &[u8], stop: &StopToken) -> std::io::Result<Option<String>> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let reader = child.stdout.take().map(|mut stdout| {
        std::thread::spawn(move || {
            let mut buffer = String::default();
            let _ = stdout.read_to_string(&mut buffer);
            buffer
        })
    });

    // Dropping stdin closes it.
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(input) {
            log::debug!(target: targets::BACKEND, "killing {}: {e}", child.id());
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
    }

    loop {
        if child.try_wait()?.is_some() {
            break;
        }
        if stop.is_stopped() {
            log::debug!(target: targets::BACKEND, "killing {}", child.id());
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(POLL);
    }

    Ok(reader.and_then(|handle| handle.join().ok()))
}
