//! Serval policy resolution engine.
//!
//! Walks a declared policy graph and computes, for every dependency, the
//! set of component instances that must exist to satisfy it, along with
//! calculated labels, code/discovery parameters, an inter-instance edge
//! graph, and an append-only structured event log.

pub mod engine;
pub mod error;
pub mod eval;
pub mod event_log;
pub mod external;
pub mod lang;

// Re-export commonly used types
pub use engine::resolve::{
    CancelToken, ComponentInstance, ComponentInstanceKey, PolicyResolver, Resolution,
    ResolverConfig,
};
pub use error::{Error, ErrorDetails, ResolutionError, Result};
pub use event_log::{EventLevel, EventLog, EventRecord, ResolutionEvent};
