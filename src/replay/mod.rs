//! Recorded sessions and batch classification
//!
//! Persistence for ordered point captures and the offline half of the
//! detector: replaying a recorded session through the same `push` contract
//! the live path uses, aggregating a session-level summary.

pub mod session;

pub use session::{PointSession, ReplayOutcome, SessionSummary};
