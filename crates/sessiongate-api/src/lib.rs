// sessiongate-api: Async HTTP client for remote session endpoints

pub mod error;
pub mod session;
pub mod transport;

pub use error::Error;
pub use session::{SessionClient, SessionEndpoints};
pub use transport::{TlsMode, TransportConfig};
