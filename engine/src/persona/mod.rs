//! Persona synthesis pipeline
//!
//! The five stages, in the order a run exercises them: the planner draws
//! a concept, the scheduler lays out its timeline, the synthesizer
//! produces commit steps against a running snapshot, the materializer
//! writes them as real git history, and the orchestrator runs the whole
//! batch with bounded parallelism.

pub mod catalog;
pub mod materializer;
pub mod orchestrator;
pub mod planner;
pub mod schedule;
pub mod synthesizer;
pub mod types;

pub use materializer::{materialize, LocalRepository};
pub use orchestrator::{Orchestrator, RunRequest};
pub use planner::ConceptPlanner;
pub use schedule::{schedule, ScheduleError};
pub use synthesizer::StepSynthesizer;
pub use types::{
    CommitStep, Complexity, EditSet, FileEdit, FileEditKind, FileSnapshot, LanguageHints,
    NameStyle, ProjectConcept, RepoOutcome, RepositoryPlan, RunSummary, Timeline,
};
