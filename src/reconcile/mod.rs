//! Snapshot/event-stream reconciliation
//!
//! A subscription that has a resource must never observe a gap between its
//! snapshot and the live stream, nor apply an event twice. The
//! [`Reconciler`] achieves that with a two-phase boot:
//!
//! ```text
//!   Empty ──event──► AwaitingSnapshot ──snapshot──► Steady
//!     │               (queue events)     (drop subsumed,
//!     │                                   replay the rest)
//!     └──event, no resource──────────────────────► Steady
//! ```
//!
//! The machine is pure: it never performs I/O or calls user code. It tells
//! the driver what to do through [`Step`] and [`Reconciled`].

pub mod machine;
pub mod policy;
pub mod queue;

pub use machine::{BootState, Phase, Reconciled, Reconciler, Step};
pub use policy::DedupPolicy;
pub use queue::EventQueue;
