//! Cross-module integration test support for tinychain.
//!
//! Unit tests live next to their modules; the scenarios that cross crate
//! boundaries (chain engine + consensus + network) live under `tests/`.

pub mod helpers;
