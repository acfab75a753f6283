//! Common test utilities for zarr-export integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod gateway;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use gateway::*;
