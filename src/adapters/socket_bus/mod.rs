mod bus;
mod client;
mod wire;

pub use bus::SocketBus;
pub use client::SocketResolverClient;
