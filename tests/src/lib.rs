//! # Tollbooth Test Suite
//!
//! Cross-subsystem tests exercising the full order lifecycle against
//! in-memory adapters and scripted doubles.
//!
//! ## Structure
//!
//! ```text
//! tests/src/integration/
//! ├── flows.rs     # Happy-path lifecycles end to end
//! ├── races.rs     # Concurrent triggers collapsing to one outcome
//! ├── recovery.rs  # Crash windows and re-invocation safety
//! └── expiry.rs    # Sweep and reminder behavior over mock time
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tb-tests
//! cargo test -p tb-tests integration::races::
//! ```

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

pub mod integration;
