//! # archpilot-runner
//!
//! The pipeline driver: the [`Supervisor`] decides which generation steps to
//! run and in what order, re-planning after every step; the [`Orchestrator`]
//! owns the session, runs each step's agent under the refinement engine, and
//! persists every artifact as soon as it is produced.

pub mod orchestrator;
pub mod supervisor;

pub use orchestrator::{CancelToken, Orchestrator};
pub use supervisor::{NextStep, PipelinePlan, PlannedStep, StepKind, Supervisor};
