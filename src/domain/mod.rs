pub mod connection;
pub mod errors;
pub mod models;
pub mod payload;
pub mod pending;
pub mod removal;
pub mod service;

pub use connection::{ConnectionState, ConnectionSupervisor};
pub use errors::*;
pub use models::*;
pub use payload::{build_payload, NetworkSnapshot};
pub use pending::{PendingEntry, PendingQueue};
pub use removal::RemovalRegistry;
pub use service::ProxySyncService;
