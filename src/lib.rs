pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::SocketBus;
pub use domain::{Ipv4Settings, Ipv6Settings, ProxyMethod, ProxySettings, ProxySyncService};
