use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use pacsync::domain::{Ipv4Settings, Ipv6Settings, ProxyMethod, ProxySettings, ProxySyncService};
use pacsync::SocketBus;

#[derive(Parser, Debug)]
#[clap(version = env!("PACSYNC_VERSION"))]
struct Opts {
    /// Socket the proxy resolver listens on
    #[clap(long, short = 's', default_value = "/run/pacrunner/bus.sock")]
    socket: PathBuf,

    /// TOML file holding the interface profiles to synchronize
    #[clap(long, short = 'p', default_value = "pacsync.toml")]
    profiles: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Profiles {
    profiles: Vec<Profile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Profile {
    interface: Option<String>,
    /// "auto" or "direct"
    method: String,
    pac_url: Option<String>,
    pac_script_file: Option<PathBuf>,
    #[serde(default)]
    browser_only: bool,
    ip4: Option<IpProfile>,
    ip6: Option<IpProfile>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IpProfile {
    #[serde(default)]
    searches: Vec<String>,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    addresses: Vec<String>,
    #[serde(default)]
    routes: Vec<String>,
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            profiles: vec![Profile {
                interface: Some("eth0".to_string()),
                method: "direct".to_string(),
                pac_url: None,
                pac_script_file: None,
                browser_only: false,
                ip4: Some(IpProfile {
                    searches: vec![],
                    domains: vec!["example.com".to_string()],
                    addresses: vec!["192.0.2.10/24".to_string()],
                    routes: vec![],
                }),
                ip6: None,
            }],
        }
    }
}

impl Profile {
    fn settings(&self) -> Result<(ProxySettings, Option<Ipv4Settings>, Option<Ipv6Settings>), String> {
        let method = match self.method.as_str() {
            "auto" => {
                let pac_url = match &self.pac_url {
                    Some(raw) => Some(
                        Url::parse(raw).map_err(|err| format!("bad pac_url {:?}: {}", raw, err))?,
                    ),
                    None => None,
                };
                let pac_script = match &self.pac_script_file {
                    Some(path) => Some(
                        std::fs::read_to_string(path)
                            .map_err(|err| format!("cannot read {}: {}", path.display(), err))?,
                    ),
                    None => None,
                };
                ProxyMethod::Auto {
                    pac_url,
                    pac_script,
                }
            }
            "direct" => ProxyMethod::None,
            other => return Err(format!("unknown method {:?}", other)),
        };
        let ip4 = self.ip4.as_ref().map(IpProfile::ipv4_settings).transpose()?;
        let ip6 = self.ip6.as_ref().map(IpProfile::ipv6_settings).transpose()?;
        Ok((
            ProxySettings::new(method).with_browser_only(self.browser_only),
            ip4,
            ip6,
        ))
    }
}

impl IpProfile {
    fn ipv4_settings(&self) -> Result<Ipv4Settings, String> {
        Ok(Ipv4Settings {
            searches: self.searches.clone(),
            domains: self.domains.clone(),
            addresses: parse_nets(&self.addresses)?,
            routes: parse_nets(&self.routes)?,
        })
    }

    fn ipv6_settings(&self) -> Result<Ipv6Settings, String> {
        Ok(Ipv6Settings {
            searches: self.searches.clone(),
            domains: self.domains.clone(),
            addresses: parse_nets(&self.addresses)?,
            routes: parse_nets(&self.routes)?,
        })
    }
}

fn parse_nets<T>(raw: &[String]) -> Result<Vec<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.iter()
        .map(|net| {
            net.parse::<T>()
                .map_err(|err| format!("bad network {:?}: {}", net, err))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pacsync=debug".into()),
        )
        .init();

    let opts = Opts::parse();
    let config: Profiles = confy::load_path(&opts.profiles)?;

    let bus = Arc::new(SocketBus::new(&opts.socket));
    let service = ProxySyncService::new(bus);
    service.start().await;

    let mut synced = Vec::new();
    for profile in &config.profiles {
        match profile.settings() {
            Ok((proxy, ip4, ip6)) => {
                service
                    .send(profile.interface.as_deref(), &proxy, ip4.as_ref(), ip6.as_ref())
                    .await;
                synced.push(profile.interface.clone());
            }
            Err(reason) => warn!("skipping profile for {:?}: {}", profile.interface, reason),
        }
    }
    info!(
        "synchronizing {} interface profiles via {}",
        synced.len(),
        opts.socket.display()
    );

    tokio::signal::ctrl_c().await?;

    info!("shutting down, revoking synchronized configurations");
    for interface in &synced {
        service.remove(interface.as_deref()).await;
    }
    // Revocations are fire-and-forget; give them a moment on the wire.
    tokio::time::sleep(Duration::from_millis(200)).await;
    service.stop().await;
    Ok(())
}
