//! Workspace root package for Sonar.
//!
//! Hosts the cross-crate integration tests under `tests/` and the telemetry
//! benchmarks under `benches/`. Library users should depend on the `sonar`
//! crate directly; everything it exports is re-exported here.

pub use sonar::*;
