pub mod async_op;
pub mod buffer;
pub mod buffer_pool;
pub mod col;
pub mod constant;
pub mod diagnostics;
pub mod error;
pub mod handler;
mod opts;
pub mod protocol;
pub mod sync;

pub use opts::{AuthMechanism, Opts, SslMode};

#[cfg(test)]
mod opts_test;
