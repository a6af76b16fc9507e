//! Visibility gate and render dispatch
//!
//! Handler application (resource and topic) always happens; only the render
//! callback is gated on visibility. Every call into user code goes through
//! [`isolate`], so a failing callback is logged and counted but never
//! disturbs the reconciler, the connection, or sibling subscriptions.

pub mod dispatch;
pub mod visibility;

pub use dispatch::{dispatch, isolate, Callback, RenderOutcome};
pub use visibility::{should_render, VisibilityFlag};
