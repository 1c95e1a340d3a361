pub mod socket_bus;

pub use socket_bus::{SocketBus, SocketResolverClient};
