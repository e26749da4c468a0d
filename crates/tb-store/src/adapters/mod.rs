//! Adapters implementing the store ports.

pub mod memory;
pub mod session;

pub use memory::MemoryStateStore;
pub use session::{MemorySessionStore, StoreBackedSessionStore};
