//! Registry application service.

pub mod registry;

pub use registry::AccountRegistry;
