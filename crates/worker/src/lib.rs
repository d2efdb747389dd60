//! Execution units and the pools that schedule decode jobs onto them.
//!
//! Two topologies share the same execution units:
//!
//! - [`WorkerPool`]: private slots, orchestration state behind a mutex.
//!   Used when each renderer owns its workers.
//! - [`SharedPool`]: one actor task per job kind that many clients connect
//!   to through [`MessagePort`]s.
//!
//! Both report [`PoolEvent`]s on a broadcast channel and a [`PoolStatus`]
//! snapshot on request.

pub mod events;
pub mod pool;
pub mod shared;
pub mod unit;

pub use events::{PoolEvent, PoolStatus};
pub use pool::WorkerPool;
pub use shared::{MessageId, MessagePort, PortInbox, PortReply, PortSender, SharedPool, SharedPoolError};
pub use unit::ExecutionUnit;
