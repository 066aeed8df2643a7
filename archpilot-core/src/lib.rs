//! # archpilot-core
//!
//! Core traits and types for the archpilot architecture design pipeline.
//!
//! ## Overview
//!
//! This crate provides the foundational abstractions shared by every pipeline
//! component:
//!
//! - [`ArchError`] / [`Result`] - The error taxonomy for all subsystems
//! - [`Artifact`] / [`ArtifactPayload`] - Typed, versioned pipeline outputs
//! - [`Inference`] - The hosted text-generation boundary
//! - [`PromptLibrary`] - Prompt templates with placeholder substitution
//! - [`PipelineRequest`] / [`ResultBundle`] - The pipeline's outer contract
//! - [`RetryConfig`] - Shared bounded-backoff policy for external calls

pub mod artifact;
pub mod error;
pub mod inference;
pub mod payload;
pub mod request;
pub mod retry;
pub mod template;

pub use artifact::{Artifact, ArtifactKind, ArtifactPayload};
pub use error::{ArchError, Result};
pub use inference::{Inference, InferenceRequest};
pub use payload::{
    Comparison, ComparisonEntry, CriterionScore, DesignCandidate, DiagramEdge, DiagramSource,
    PhasePlan, RequirementsProfile, RoleAssignment, ServiceLayer, StaffingPlan,
};
pub use request::{BundleEntry, PipelineRequest, ResultBundle};
pub use retry::{
    RetryConfig, execute_with_retry, is_retryable_error_message, is_retryable_inference_error,
    is_retryable_status_code,
};
pub use template::{
    PromptLibrary, TEMPLATE_COMPARE, TEMPLATE_DESIGN, TEMPLATE_DIAGRAM, TEMPLATE_STAFFING,
    render_template,
};
