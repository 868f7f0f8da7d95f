//! Phase sequencer and run registry.
//!
//! A run moves Research -> review -> Briefs -> review -> Production. Each
//! phase runs on a background task; the `*Review` phases wait for
//! [`RunManager::approve`], which a CLI prompt or the dashboard calls.

pub mod index;
pub mod manager;
pub mod phases;
pub mod run;
pub mod state;

pub use index::{brief_index, final_report, production_index};
pub use manager::RunManager;
pub use phases::Phase;
pub use run::{PipelineRun, Progress, RunPhase, RunSnapshot, RunSummary};
pub use state::{PipelineState, ProductionSummary};
