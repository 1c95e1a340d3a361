pub mod resolver_bus;

pub use resolver_bus::{PresenceEvent, ResolverBusPort, ResolverClient};
