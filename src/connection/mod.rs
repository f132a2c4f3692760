// ABOUTME: Connection abstraction for deployment transports.
// ABOUTME: Adapter contract, per-host manager, process results, SSH and local adapters.

mod adapter;
mod error;
mod local;
mod manager;
mod process;
mod ssh;

pub use adapter::ConnectionAdapter;
pub use error::{ConnectionError, Result};
pub use local::{LocalConnection, LocalSettings};
pub use manager::ConnectionManager;
pub use process::ProcessExecutionResult;
pub use ssh::{SshConnection, SshSettings};
