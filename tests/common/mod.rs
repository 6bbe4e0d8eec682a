//! Common test utilities for gridprop.
//!
//! Each integration test binary uses a different subset of these helpers.
#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
#[cfg(feature = "netcdf")]
pub mod test_data;
