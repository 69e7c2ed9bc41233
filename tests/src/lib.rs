//! # Wallet Session Test Suite
//!
//! Unified test crate driving `WalletSession` end to end.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs        # Numbered session scenarios against the in-memory wallet
//!     ├── concurrency.rs  # Interleaved events, reconnects and late responses
//!     └── properties.rs   # Property tests (proptest)
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ws-tests
//! cargo test -p ws-tests integration::concurrency::
//! ```

#![allow(dead_code)]

pub mod integration;
