//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher asks the pool for a live snapshot
//!     → pool.rs (Alive(): concurrent-read, atomically reconfigurable)
//!     → round_robin.rs (Select: pick one entry from the snapshot)
//!     → backend.rs (Serve: forward, flip liveness on failure)
//! ```

pub mod backend;
pub mod pool;
pub mod round_robin;

use std::sync::Arc;

use crate::error::PoolError;
use backend::BackendEntry;

/// Chooses one entry from a snapshot of live entries. Implementations
/// must be safe under concurrent callers. The core ships Round-Robin;
/// this trait is the seam for substituting another policy (e.g.
/// weighted) without touching the Dispatcher.
pub trait SelectionPolicy: Send + Sync {
    fn select(&self, snapshot: &[Arc<BackendEntry>]) -> Result<Arc<BackendEntry>, PoolError>;
}
