//! Command handlers, one module per top-level subcommand.

pub mod export;
pub mod onboard;
pub mod stream;

mod util;
