//! Save engine: destinations, sessions and the coordinator choosing between them

pub mod coordinator;
pub mod save_types;
pub mod session;

pub use coordinator::SaveCoordinator;
pub use save_types::{SaveDestination, SaveError, SaveOutcome, SaveResult};
pub use session::{DestinationCapabilities, Session};
