pub mod orchestrator;
pub mod report;

pub use orchestrator::{Progress, TransferOrchestrator, TransferStage, track_percent};
pub use report::{FailedTrack, TransferRecord, TransferReport};
