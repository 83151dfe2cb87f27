//! Relay transport module
//!
//! The relay is the remote messaging backend that receives exports. Its
//! transport only accepts bounded-size parts:
//!
//! 1. Each part is uploaded under one random transfer identifier
//! 2. A single commit call binds the parts into one addressable file,
//!    delivered with a caption
//! 3. Plain text lines can be pushed for status reporting
//!
//! The wire protocol itself lives behind [`RelayTransport`]; the HTTP
//! implementation is in [`http_client`].

pub mod http_client;
pub mod transport;
pub mod types;

pub use http_client::HttpRelay;
pub use transport::RelayTransport;
pub use types::RelayError;
