//! Publish policy for snapshot slots.
//!
//! A [`Publisher`] samples a [`SampleSource`] once per tick and asks its
//! [`PublishGate`] whether the sample is worth broadcasting: on meaningful
//! change, on a heartbeat, or immediately when the source's health flips.

pub mod gate;
pub mod publisher;
pub mod source;
pub mod task;
pub mod ticker;

pub use gate::{Decision, GatePolicy, PublishGate, max_abs_delta};
pub use publisher::{Publisher, PublisherStats, spawn_publisher};
pub use source::{ChannelSnapshot, SampleSource, Sampled, copy_channels};
pub use task::{Shutdown, TaskSpec, spawn_periodic};
pub use ticker::Ticker;
