pub mod browser;
pub mod config;
pub mod error;
pub mod filler;
pub mod fingerprint;
pub mod orchestrator;
pub mod proposer;
pub mod session;
pub mod snapshot;
pub mod store;

// Re-export commonly used items
pub use browser::chrome::{ChromeDriver, ConnectionMode};
pub use browser::page::{ElementDescriptor, ElementInfo, ElementQuery, ExplorerPage};
pub use browser::probe::MutationState;
pub use config::ExplorerConfig;
pub use error::{ExplorerError, Result};
pub use fingerprint::{fingerprint, Fingerprint};
pub use orchestrator::{capture, CaptureOutcome, Explorer, RunSummary, StopReason};
pub use proposer::{score, Action, ChoiceReason, Proposer, ScoringPolicy, Vocabulary};
pub use session::{SessionCookie, SessionFile};
pub use snapshot::{extract, DialogRecord, NodeRecord, Snapshot};
pub use store::{ActionPhase, ActionRecord, StepLocation, StepStore};
