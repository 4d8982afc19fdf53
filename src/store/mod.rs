//! Persistence-backed services. Each is a cheap handle over the managed
//! database and can be taken directly as a request guard.

mod credentials;
mod ledger;
mod recorder;

pub use credentials::{Credentials, ProfileUpdateOutcome};
pub use ledger::Ledger;
pub use recorder::VoteRecorder;
