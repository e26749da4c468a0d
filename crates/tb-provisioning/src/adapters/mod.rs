//! Adapters: SSH transport and in-memory server directory.

pub mod directory;
pub mod ssh;

pub use directory::StaticServerDirectory;
pub use ssh::{SshConfig, SshTransport};
