pub mod paper;
pub mod run;

pub use paper::PaperRef;
pub use run::{
    FailurePolicy, FailureRecord, RunContext, RunOutcome, RunResult, RunState, StageFailure,
    StageName, StageResult,
};
