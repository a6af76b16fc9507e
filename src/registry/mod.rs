//! Label registry for message routing
//!
//! The registry tracks which subscriptions listen on which topic label and
//! computes the desired label set that must be announced to the server on
//! every (re)connect.
//!
//! # Architecture
//!
//! ```text
//!              SubscriptionRegistry
//!        ┌──────────────────────────────┐
//!        │ listeners: BTreeMap<label,   │
//!        │   [ListenerEntry {           │
//!        │      id, subscription }]     │
//!        │ >                            │
//!        └──────────────┬───────────────┘
//!                       │
//!   PushMessage ──► route(label) ──► [sub-1, sub-3] ──► Reconciler
//!                       │
//!               desired_labels() ──► announce on connection_open
//! ```
//!
//! Each label maps to an ordered list of listeners, so two subscriptions on
//! the same label never overwrite each other; routing preserves registration
//! order.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{ListenerEntry, ListenerId};
pub use error::RegistryError;
pub use store::SubscriptionRegistry;
