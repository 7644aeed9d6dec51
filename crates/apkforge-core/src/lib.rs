//! apkforge core: pipeline stages, SDK provisioning, and IO.
#![allow(missing_docs)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Every stage talks to the outside world through a [`Host`] so tests can
//! script subprocesses and `PATH` lookups, and reports progress through a
//! [`Reporter`] so the CLI owns presentation.

pub mod builder;
pub mod clean;
pub mod config;
pub mod deps;
pub mod device;
pub mod error;
pub mod host;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod probe;
pub mod reporter;
pub mod sdk;
pub mod verify;

pub use config::{ConfigError, Settings};
pub use error::StageError;
pub use host::{Host, Invocation, SystemHost, ToolOutput};
pub use pipeline::Pipeline;
pub use reporter::{NullReporter, Reporter};

/// User agent string for HTTP requests
pub const USER_AGENT: &str = concat!("apkforge/", env!("CARGO_PKG_VERSION"));
