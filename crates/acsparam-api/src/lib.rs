// acsparam-api: Async Rust client for the ACS northbound interface

pub mod error;
pub mod nbi;
pub mod transport;

pub use error::Error;
pub use nbi::{BasicAuth, NbiClient, TaskOptions, TaskStatus};
pub use transport::{TlsMode, TransportConfig};
