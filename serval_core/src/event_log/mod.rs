//! Append-only structured event log.
//!
//! Every step the resolver takes is recorded as a typed event; the log is
//! consumed downstream for diagnosis and for diffing runs, and is never
//! mutated after a resolution completes.

mod event;
mod record;
mod stats;

pub use event::{LabelScope, ResolutionEvent};
pub use record::{EventLevel, EventLog, EventRecord};
pub use stats::EventStats;
