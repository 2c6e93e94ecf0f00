pub mod batch;
pub mod copier;
pub mod normalizer;
pub mod orchestrator;
pub mod report;
pub mod scanner;

pub use batch::BatchWriter;
pub use copier::{CopyManifest, CopyOutcome, EnvironmentCopier, PrincipalCopyOutcome};
pub use normalizer::{Normalized, Normalizer, PendingUpdate};
pub use orchestrator::{confirmation_gate, CollectionPlan, Migration, RunFailure, RunPhase};
pub use report::{FieldSkip, RunReport};
pub use scanner::scan;
