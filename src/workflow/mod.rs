pub mod paper_ctx;
pub mod paper_flow;
pub mod stage_runner;
pub mod stages;

pub use paper_ctx::PaperCtx;
pub use paper_flow::{PaperFlow, PaperOutcome};
pub use stage_runner::{RetryPolicy, StageRunner};
pub use stages::{
    AudioSynthesis, GenerationSettings, Listing, ListingFetch, PaperFetch, ScriptGenerate,
    SummarizeSelect, SummaryOutput,
};
