//! # Transactions
//!
//! Every storage owns one pending-write log and one listener registry.
//!
//! ## State Machine
//!
//! ```text
//!            write / select_union_position / clear
//! ┌──────┐ ─────────────────────────────────────> ┌─────────┐
//! │ Idle │                                        │ Pending │ ──┐ write
//! └──────┘ <───────────────────────────────────── └─────────┘ <─┘
//!             commit (apply + notify) / rollback
//! ```
//!
//! - Pending writes are visible to `read` on the same storage and invisible to
//!   `read_committed`.
//! - `commit` validates every staged operation before touching any buffer, so
//!   it either applies everything and notifies, or fails with buffers as they
//!   were and the log still pending.
//! - `rollback` drops the log. Nothing is notified.
//! - An empty commit returns an empty [`ActionSet`] and notifies nobody.
//!
//! ## Module Structure
//!
//! - `pending`: staged operation log with read-your-writes indexes
//! - `action`: `Action` and `ActionSet`
//! - `listener`: `ListenerRegistry` and `ListenerId`

mod action;
mod listener;
mod pending;

pub use action::{Action, ActionSet};
pub use listener::{ListenerFn, ListenerId};
pub use pending::TxnState;

pub(crate) use listener::{ListenTarget, ListenerRegistry};
pub(crate) use pending::{PendingOp, TransactionManager};
