//! Booking workflow domain: the ordered step sequence, its status state
//! machine, and the reorder/finalize operations.

pub mod category;
pub mod engine;
pub mod model;

pub use category::StepCategory;
pub use engine::{EngineError, SaveOutcome};
pub use model::{Step, StepMetadata, StepStatus, Workflow};
