//! Buffer pool: an in-memory page cache with a pin/unpin discipline.
//!
//! - [`BufferPool`]: fixed frame array, page table, eviction
//! - [`PageReadGuard`] / [`PageWriteGuard`]: RAII pins over cached pages
//! - [`Replacer`] / [`ClockReplacer`]: eviction policy

mod error;
mod frame;
mod guard;
mod pool;
mod replacer;

pub use error::BufferPoolError;
pub use frame::FrameId;
pub use guard::{PageReadGuard, PageWriteGuard};
pub use pool::{BufferPool, BufferPoolConfig};
pub use replacer::{ClockReplacer, Replacer};
