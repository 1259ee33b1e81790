//! ChronMap Integration Tests
//!
//! End-to-end behavior through the public facade: persistence across
//! restarts, debounced snapshots, the instance registry, composite keys
//! and presets.

mod common;

mod composite_keys;
mod lifecycle;
mod persistence;
mod presets;
mod registry;
mod snapshots;
