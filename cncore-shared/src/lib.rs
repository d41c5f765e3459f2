//! Types shared between the cn-core library and its binary.

pub mod errors;

pub use errors::{CncoreError, CncoreResult, CommandFailureInfo};
