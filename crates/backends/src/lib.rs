#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

//! Concrete `TaskExecutor` (C1) implementations.

pub mod http_bridge;
pub mod mock;
pub mod pure_code;

pub use http_bridge::HttpBridgeExecutor;
pub use mock::MockExecutor;
pub use pure_code::PureCodeExecutor;