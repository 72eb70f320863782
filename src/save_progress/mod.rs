//! Progress reporting for save operations
//!
//! Callers observe a save through two sinks: one receiving per-attachment
//! progress and one receiving the saved items once. The gate in front of the
//! attachment sink keeps every attachment's report sequence ordered.

pub mod gate;
pub mod registry;
pub mod sinks;

pub use gate::ProgressGate;
pub use registry::{AttachmentCallback, AttachmentCallbackRegistry};
pub use sinks::{AttachmentProgress, AttachmentProgressSink, ItemsDoneSink, NoOpProgress};
