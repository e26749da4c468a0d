//! Ports: the traits services program against.

pub mod session;
pub mod state_store;

pub use session::{Session, SessionStore};
pub use state_store::StateStore;
