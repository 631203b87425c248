use std::sync::Arc;

use wsn_lifetime::{
    backends::BackendFactory,
    config::Config,
    portfolio::Entrant,
    types::err::ErrorKind,
};

/// The entrants of each race, as configured.
///
/// Unless racing in-process, each backend runs in a worker process of this binary.
pub fn entrants(config: &Config) -> Result<Vec<Entrant>, ErrorKind> {
    match config.in_process {
        true => Ok(config
            .backends
            .iter()
            .map(|backend| Entrant::Thread(Arc::new(backend.clone()) as Arc<dyn BackendFactory>))
            .collect()),

        false => {
            let program = std::env::current_exe()
                .map_err(|e| ErrorKind::BackendUnavailable(format!("no path to this program: {e}")))?;
            Ok(config
                .backends
                .iter()
                .map(|backend| Entrant::Process {
                    program: program.clone(),
                    backend: backend.clone(),
                })
                .collect())
        }
    }
}
