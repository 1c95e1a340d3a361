use ipnet::{Ipv4Net, Ipv6Net};
use std::fmt;
use url::Url;

/// How a client should discover its proxy. `Auto` carries the PAC data so
/// that a direct configuration can never smuggle a script along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMethod {
    Auto {
        pac_url: Option<Url>,
        pac_script: Option<String>,
    },
    None,
}

impl ProxyMethod {
    /// The vocabulary the proxy resolver accepts is not ours: our "none"
    /// is its "direct".
    pub fn wire_name(&self) -> &'static str {
        match self {
            ProxyMethod::Auto { .. } => "auto",
            ProxyMethod::None => "direct",
        }
    }
}

/// Read-only proxy configuration for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub method: ProxyMethod,
    pub browser_only: bool,
}

impl ProxySettings {
    pub fn new(method: ProxyMethod) -> Self {
        Self {
            method,
            browser_only: false,
        }
    }

    pub fn with_browser_only(mut self, browser_only: bool) -> Self {
        self.browser_only = browser_only;
        self
    }
}

/// Read-only IPv4 state of an interface. Addresses and routes keep their
/// prefix length; `Ipv4Net`'s `Display` is exactly the CIDR string the
/// resolver expects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv4Settings {
    pub searches: Vec<String>,
    pub domains: Vec<String>,
    pub addresses: Vec<Ipv4Net>,
    pub routes: Vec<Ipv4Net>,
}

/// Read-only IPv6 state of an interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv6Settings {
    pub searches: Vec<String>,
    pub domains: Vec<String>,
    pub addresses: Vec<Ipv6Net>,
    pub routes: Vec<Ipv6Net>,
}

/// The closed key table of the resolver's `CreateProxyConfiguration`
/// operation. Payloads can only ever carry these keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Interface,
    Method,
    Url,
    Script,
    BrowserOnly,
    Domains,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Interface => "Interface",
            FieldKey::Method => "Method",
            FieldKey::Url => "URL",
            FieldKey::Script => "Script",
            FieldKey::BrowserOnly => "BrowserOnly",
            FieldKey::Domains => "Domains",
        }
    }
}

/// Value types the resolver accepts. A tagged union instead of a dynamic
/// variant so the payload is enumerable at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    StrList(Vec<String>),
}

/// One built proxy configuration, ready for delivery. Field order is the
/// order the builder emitted; it is fixed once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPayload {
    fields: Vec<(FieldKey, FieldValue)>,
}

impl ConfigPayload {
    pub(crate) fn from_fields(fields: Vec<(FieldKey, FieldValue)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(FieldKey, FieldValue)] {
        &self.fields
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// The interface this payload was built for, if any.
    pub fn interface(&self) -> Option<&str> {
        match self.get(FieldKey::Interface) {
            Some(FieldValue::Str(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Key used by the pending queue and the removal registry. A payload
    /// built without an interface hangs off the `None` key, which is a
    /// valid key of its own.
    pub fn interface_key(&self) -> Option<String> {
        self.interface().map(str::to_owned)
    }
}

/// Opaque identifier the resolver assigns to one accepted configuration.
/// Required to revoke it later; meaningless to us otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigHandle(String);

impl ConfigHandle {
    pub fn new<S: Into<String>>(handle: S) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
