/*!
Miscelanous items related to [logging](log).

Calls to the log macro are made throughout the library.
These are intended to provide a trace of a search, of each query raced between backends, and of the constraints given to a backend.

Note, no log implementation is provided by the library.
The binary uses [env_logger](https://docs.rs/env_logger/latest/env_logger/), and so output may be narrowed with, e.g., `RUST_LOG=search=info`.
*/

/// Targets to be used within a [log]! macro.
pub mod targets {
    /// Logs related to the [search driver](crate::search)
    pub const SEARCH: &str = "search";

    /// Logs related to the [portfolio race](crate::portfolio)
    pub const PORTFOLIO: &str = "portfolio";

    /// Logs related to [backends](crate::backends), e.g. each constraint added
    pub const BACKEND: &str = "backend";

    /// Logs related to encoding a [network](crate::network)
    pub const ENCODER: &str = "encoder";

    /// Logs from a [worker process](crate::portfolio::worker)
    pub const WORKER: &str = "worker";

    /// Logs related to [verification](crate::network::Network::verify) of a schedule
    pub const VERIFY: &str = "verify";
}
