//! Error types used in the library.
//!
//! - Configuration and encoding errors indicate a problem with the input or a broken contract between the encoder and a backend.
//!   These are never retried.
//! - An oracle timeout is the only outcome which is expected during ordinary use, and stops a search without an answer.
//! - A backend which is unavailable is reported before the first query is made.
//!
//! Names of the error enums --- for the most part --- overlap with the structures they concern.
//  As such, throughout the library err::{self} is often used to prefix use of the types with `err::`.

use crate::structures::literal::Lit;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration(ConfigurationError),
    Encoding(EncodingError),
    Input(InputError),
    Worker(WorkerError),

    /// A decision procedure could not be constructed, with a description of why.
    BackendUnavailable(String),

    /// The deadline of a run elapsed before a query was answered.
    OracleTimeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "Configuration error: {e}"),
            Self::Encoding(e) => write!(f, "Encoding error: {e}"),
            Self::Input(e) => write!(f, "Input error: {e}"),
            Self::Worker(e) => write!(f, "Worker error: {e}"),
            Self::BackendUnavailable(why) => write!(f, "Backend unavailable: {why}"),
            Self::OracleTimeout => write!(f, "No answer within the time limit"),
        }
    }
}

impl std::error::Error for ErrorKind {}

/// Malformed parameters, always detected before any solver is called.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The weights of a constraint do not match its literals.
    WeightCount { literals: usize, weights: usize },

    /// A constraint mentions the literal `0`.
    ZeroLiteral,

    /// The continuous activity cap was requested with a value below one.
    ContinuousCap(usize),

    /// The localized activity cap was requested with a value below one.
    LocalizedCap(usize),

    /// The localized activity cap is not strictly below the continuous activity cap.
    CapOrder { localized: usize, continuous: usize },

    /// Coverage multiplicity below one.
    Coverage(usize),

    /// A sensor range without a known power consumption, and no explicit budget.
    UnknownRange(u32),

    /// A multi-level network without any power levels.
    NoLevels,

    /// A power level with zero power.
    ZeroPowerLevel,

    /// No backend was configured.
    NoBackends,

    /// Some option with a value outside of its permitted bounds.
    OutOfBounds(&'static str),
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WeightCount { literals, weights } => {
                write!(f, "{weights} weights given for {literals} literals")
            }
            Self::ZeroLiteral => write!(f, "0 is not a literal"),
            Self::ContinuousCap(e) => write!(f, "continuous activity cap must be >= 1, got {e}"),
            Self::LocalizedCap(m) => write!(f, "localized activity cap must be >= 1, got {m}"),
            Self::CapOrder {
                localized,
                continuous,
            } => write!(
                f,
                "localized activity cap ({localized}) must be < continuous activity cap ({continuous})"
            ),
            Self::Coverage(k) => write!(f, "coverage must be >= 1, got {k}"),
            Self::UnknownRange(r) => write!(f, "no power consumption known for range {r}"),
            Self::NoLevels => write!(f, "no power levels specified"),
            Self::ZeroPowerLevel => write!(f, "a power level must draw some power"),
            Self::NoBackends => write!(f, "no backend configured"),
            Self::OutOfBounds(name) => write!(f, "{name} is out of bounds"),
        }
    }
}

impl From<ConfigurationError> for ErrorKind {
    fn from(e: ConfigurationError) -> Self {
        ErrorKind::Configuration(e)
    }
}

/// Misuse of a backend, indicating a contract violation between an encoder and an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodingError {
    /// A literal refers to a variable which has not been generated.
    LiteralOutOfRange { literal: Lit, top: u32 },

    /// A recorded formula refers to a variable before it was generated.
    UnmappedLiteral(Lit),
}

impl std::fmt::Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LiteralOutOfRange { literal, top } => {
                write!(f, "literal {literal} outside of the {top} generated variables")
            }
            Self::UnmappedLiteral(literal) => write!(f, "literal {literal} has no mapping"),
        }
    }
}

impl From<EncodingError> for ErrorKind {
    fn from(e: EncodingError) -> Self {
        ErrorKind::Encoding(e)
    }
}

/// Errors when reading a network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputError {
    /// No file was found.
    NoFile(String),

    /// The file could not be read.
    Read(String),

    /// The contents are not a network description.
    Parse(String),

    /// A network without sensors or points.
    Empty,

    /// A compressed file, without support for decompression.
    Compressed,
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFile(path) => write!(f, "no file at {path}"),
            Self::Read(why) => write!(f, "failed to read: {why}"),
            Self::Parse(why) => write!(f, "failed to parse: {why}"),
            Self::Empty => write!(f, "no sensors or points specified"),
            Self::Compressed => write!(f, "compressed input requires the 'xz' feature"),
        }
    }
}

impl From<InputError> for ErrorKind {
    fn from(e: InputError) -> Self {
        ErrorKind::Input(e)
    }
}

/// Errors in the exchange with a worker process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker process could not be started.
    Spawn(String),

    /// The request could not be written to, or the response read from, the worker.
    Pipe(String),

    /// The response of a worker was malformed.
    Response(String),
}

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(why) => write!(f, "failed to start: {why}"),
            Self::Pipe(why) => write!(f, "broken pipe: {why}"),
            Self::Response(why) => write!(f, "malformed response: {why}"),
        }
    }
}

impl From<WorkerError> for ErrorKind {
    fn from(e: WorkerError) -> Self {
        ErrorKind::Worker(e)
    }
}
