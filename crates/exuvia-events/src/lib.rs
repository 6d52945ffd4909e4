//! Lifecycle events for the Exuvia engine.
//!
//! Every engine outcome, including rejections, produces one immutable
//! [`LifecycleEvent`] handed to an [`EventSink`]. Events are the audit
//! trail: [`replay::Projection`] rebuilds each entity's observable state
//! from them alone.
//!
//! # Modules
//!
//! - [`payload`] -- Typed detail structs carried in each event
//! - [`sink`] -- The sink trait plus null, in-memory and broadcast sinks
//! - [`replay`] -- Reconstruction of entity state from an event stream

pub mod payload;
pub mod replay;
pub mod sink;

pub use payload::{
    MoltedDetails, NavigatedDetails, PropagatedDetails, RejectedDetails, SpawnedDetails,
    TargetUpdate, TerminatedDetails,
};
pub use replay::{Projection, ProjectedEntity, ReplayError};
pub use sink::{ChannelSink, EventSink, LifecycleEvent, MemorySink, NullSink};
