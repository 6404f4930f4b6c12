//! Transfer module - main module file
//!
//! Atomic member-to-member transfers on a single pooled connection: request checks, the
//! connection guard and its state machine, destination policy, and the coordinator.

pub mod coordinator;
pub mod errors;
pub mod guard;
pub mod policy;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use coordinator::TransferCoordinator;
pub use errors::TransferError;
pub use guard::ConnectionGuard;
pub use policy::TransferPolicy;
pub use state::ConnectionState;
pub use types::TransferRequest;
