//! Cross-component session tests.

pub mod concurrency;
pub mod flows;
