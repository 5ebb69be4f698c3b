//! Observation of solver progress.
//!
//! The solver emits an [`Event`] after every accepted sub-step and after every
//! cohort introduction. An observer may answer with [`Action::StopEarly`],
//! in which case [`Solver::step_to_observed`](crate::Solver::step_to_observed)
//! returns [`Status::StoppedByObserver`] with the state left at that event.
//!
//! `()` observes nothing, and any `FnMut(&Event) -> Option<Action>` closure is
//! an observer.

/// Receives solver events and optionally returns a control action.
pub trait Observer<E, A> {
    /// Handles an event.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

/// Event emitted while stepping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// An adaptive sub-step was accepted.
    SubStep {
        /// Time reached by the sub-step.
        time: f64,
        /// Size of the accepted sub-step.
        step_size: f64,
    },

    /// A cohort was inserted into an EBT or CM species.
    CohortIntroduced {
        /// Introduction time.
        time: f64,
        /// Index of the species.
        species: usize,
    },
}

/// Control actions supported by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop stepping and return the state reached so far.
    StopEarly,
}

/// Indicates how a call to `step_to` terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Reached the requested time.
    Complete,

    /// Stopped early due to an observer action.
    StoppedByObserver,
}
