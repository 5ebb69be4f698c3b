use thiserror::Error;

use crate::{control::ControlError, method::Method, schedule::ScheduleError};

/// Errors raised while laying out species or configuring a solver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("variable `{0}` is already registered")]
    DuplicateVariable(String),

    #[error("variable `{name}` must have a stride of at least one")]
    ZeroStride { name: String },

    #[error("variable `{name}` starts at offset {offset}, but the record ends at {expected}")]
    MisplacedOffset {
        name: String,
        offset: usize,
        expected: usize,
    },

    #[error("initial trait values must be finite and strictly increasing")]
    UnsortedTraits,

    #[error("{method} needs at least {required} initial trait values, got {given}")]
    TooFewTraits {
        method: Method,
        required: usize,
        given: usize,
    },

    #[error("invalid trait domain [{xb}, {xm}] for {points} points")]
    InvalidDomain { xb: f64, xm: f64, points: usize },

    #[error("{requested} rates requested from a solver using {active}")]
    MethodMismatch { requested: Method, active: Method },

    #[error("cohort introduction times must be finite and non-decreasing")]
    UnsortedSchedule,

    #[error("unknown discretization method `{0}`")]
    UnknownMethod(String),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Errors raised when a named variable or species index does not exist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no variable named `{0}`")]
    UnknownVariable(String),

    #[error("no species with index {0}")]
    UnknownSpecies(usize),
}

/// Errors raised when time integration cannot reach the requested time.
///
/// After any of these the solver stays at its last accepted sub-step.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum IntegrationError {
    #[error("maximum number of sub-steps ({steps}) reached at t = {time}")]
    MaxSteps { time: f64, steps: usize },

    #[error("step size underflow (h = {step_size}) at t = {time}")]
    StepSizeUnderflow { time: f64, step_size: f64 },

    #[error("cannot step backwards from t = {current} to t = {target}")]
    BackwardTime { current: f64, target: f64 },
}

/// Errors raised when the state and rate buffers disagree with the species layout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("state has {state} entries but rates has {rates}")]
    RatesMismatch { state: usize, rates: usize },

    #[error("species segments cover {expected} entries but the buffer has {actual}")]
    SegmentMismatch { expected: usize, actual: usize },

    #[error("species {species}: model returned {actual} extra state values, layout expects {expected}")]
    ExtraStateLength {
        species: usize,
        expected: usize,
        actual: usize,
    },

    #[error("buffer of length {len} is too short for a segment ending at {end}")]
    BufferTooShort { len: usize, end: usize },
}

/// Any error returned by the solver.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error(transparent)]
    Invariant(#[from] InvariantError),
}
