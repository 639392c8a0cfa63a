//! Newsdesk engine: backend client, job execution and unattended runs.
mod api;
mod auto;
mod client;
mod clock;
mod executor;
mod persist;
mod publication;
mod registry;
mod settings;
mod store;
mod types;

pub use api::NewsApi;
pub use auto::{AutoRunner, RunOutcome};
pub use client::ReqwestNewsApi;
pub use clock::{Clock, ManualClock, SystemClock};
pub use executor::{EngineEvent, EngineHandle};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use publication::{publish_and_wait, wait_for_publication, PollOutcome};
pub use registry::{ProcessingRegistry, RunToken};
pub use settings::{ApiSettings, AutoSettings, PromptSettings, PublishSettings};
pub use store::{MemoryStore, RegistryStore, StoreError};
pub use types::{ApiError, FailureKind, PublicationRecord, PublishRequest};
