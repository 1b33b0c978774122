// Use cases layer: match synchronization and headless play.

pub mod autopilot;
pub mod session;
pub mod types;


pub use session::{MatchSession, SessionSettings};
pub use types::{ExitReason, MatchView, Notice, Notification};
