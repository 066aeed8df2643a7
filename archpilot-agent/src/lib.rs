//! Generation agents and the refinement engine.
//!
//! Each agent wraps one inference call pattern behind the [`GenerationAgent`]
//! trait and registers kind-specific acceptance checks; the
//! [`RefinementEngine`] drives any agent through a bounded
//! propose/evaluate/critique loop until a candidate is accepted or the
//! attempt budget runs out.

mod agent;
mod compare;
mod design;
mod diagram;
pub mod parse;
mod refinement;
mod staffing;

pub use agent::{CheckReport, CheckResult, Critique, GenerationAgent, ProposeInput};
pub use compare::{CompareAgent, DEFAULT_CRITERIA};
pub use design::DesignAgent;
pub use diagram::DiagramAgent;
pub use refinement::{RefinementEngine, RefinementOutcome};
pub use staffing::StaffingAgent;
