// Domain models shared by the scheduler, recorder and exporters

mod probe;
mod report;
mod run;

pub use probe::{NOT_MEASURED, PageTimings, ProbeFailure, ProbeResult, ProbeStatus};
pub use report::{BucketRow, ExpositionSample, ProbeCounts, RunManifest, SummaryRow};
pub use run::{RunContext, new_run_id};
