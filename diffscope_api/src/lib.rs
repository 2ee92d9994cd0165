//! Shared diffscope data models consumed by the core library and backends.

pub mod change;
pub mod report;
pub mod revision;

pub use change::*;
pub use report::*;
pub use revision::*;
