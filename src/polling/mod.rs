//! Status polling for long-running backend jobs.
//!
//! A poll loop asks the backend for a job's status on a fixed interval until
//! the tracked step completes, fails, or the poll budget runs out. At most one
//! loop is active per [`PollSlot`]; starting another cancels the previous one.

pub mod poller;
pub mod slot;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use poller::{PollConfig, PollOutcome};
pub use slot::PollSlot;
pub use source::{StatusSource, StoredResultFirst};
