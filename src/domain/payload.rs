use crate::domain::models::{
    ConfigPayload, FieldKey, FieldValue, Ipv4Settings, Ipv6Settings, ProxyMethod, ProxySettings,
};

/// Flattened DNS and address state of one interface, in the order the
/// resolver's matcher wants it: IPv4 before IPv6, and within each family
/// searches, then domains, then addresses, then routes. Duplicates are
/// kept; the resolver does its own matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSnapshot {
    entries: Vec<String>,
}

impl NetworkSnapshot {
    pub fn collect(ip4: Option<&Ipv4Settings>, ip6: Option<&Ipv6Settings>) -> Self {
        let mut entries = Vec::new();
        if let Some(ip4) = ip4 {
            entries.extend(ip4.searches.iter().cloned());
            entries.extend(ip4.domains.iter().cloned());
            entries.extend(ip4.addresses.iter().map(|net| net.to_string()));
            entries.extend(ip4.routes.iter().map(|net| net.to_string()));
        }
        if let Some(ip6) = ip6 {
            entries.extend(ip6.searches.iter().cloned());
            entries.extend(ip6.domains.iter().cloned());
            entries.extend(ip6.addresses.iter().map(|net| net.to_string()));
            entries.extend(ip6.routes.iter().map(|net| net.to_string()));
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Build the configuration payload for one interface. The field order is
/// part of the contract with the resolver and never varies: Interface,
/// Method, URL, Script, BrowserOnly, Domains, each present only when it
/// has something to say (Method and BrowserOnly always do).
pub fn build_payload(
    interface: Option<&str>,
    proxy: &ProxySettings,
    ip4: Option<&Ipv4Settings>,
    ip6: Option<&Ipv6Settings>,
) -> ConfigPayload {
    let mut fields = Vec::new();

    if let Some(interface) = interface {
        fields.push((
            FieldKey::Interface,
            FieldValue::Str(interface.to_owned()),
        ));
    }

    fields.push((
        FieldKey::Method,
        FieldValue::Str(proxy.method.wire_name().to_owned()),
    ));

    if let ProxyMethod::Auto {
        pac_url,
        pac_script,
    } = &proxy.method
    {
        if let Some(pac_url) = pac_url {
            fields.push((FieldKey::Url, FieldValue::Str(pac_url.to_string())));
        }
        if let Some(pac_script) = pac_script {
            fields.push((FieldKey::Script, FieldValue::Str(pac_script.clone())));
        }
    }

    fields.push((FieldKey::BrowserOnly, FieldValue::Bool(proxy.browser_only)));

    let snapshot = NetworkSnapshot::collect(ip4, ip6);
    if !snapshot.is_empty() {
        fields.push((
            FieldKey::Domains,
            FieldValue::StrList(snapshot.into_entries()),
        ));
    }

    ConfigPayload::from_fields(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn auto(pac_url: Option<&str>, pac_script: Option<&str>) -> ProxySettings {
        ProxySettings::new(ProxyMethod::Auto {
            pac_url: pac_url.map(|u| Url::parse(u).unwrap()),
            pac_script: pac_script.map(str::to_owned),
        })
    }

    fn keys(payload: &ConfigPayload) -> Vec<&'static str> {
        payload.fields().iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_direct_method_uses_resolver_vocabulary() {
        let payload = build_payload(
            Some("eth0"),
            &ProxySettings::new(ProxyMethod::None),
            None,
            None,
        );
        assert_eq!(
            payload.get(FieldKey::Method),
            Some(&FieldValue::Str("direct".to_owned()))
        );
    }

    #[test]
    fn test_auto_method_carries_url_and_script() {
        let payload = build_payload(
            Some("eth0"),
            &auto(Some("http://example.com/proxy.pac"), Some("function FindProxyForURL(u, h) { return \"DIRECT\"; }")),
            None,
            None,
        );
        assert_eq!(
            payload.get(FieldKey::Method),
            Some(&FieldValue::Str("auto".to_owned()))
        );
        assert_eq!(
            payload.get(FieldKey::Url),
            Some(&FieldValue::Str("http://example.com/proxy.pac".to_owned()))
        );
        assert!(matches!(
            payload.get(FieldKey::Script),
            Some(FieldValue::Str(_))
        ));
    }

    #[test]
    fn test_auto_without_pac_data_omits_url_and_script() {
        let payload = build_payload(Some("eth0"), &auto(None, None), None, None);
        assert_eq!(payload.get(FieldKey::Url), None);
        assert_eq!(payload.get(FieldKey::Script), None);
        assert_eq!(
            payload.get(FieldKey::BrowserOnly),
            Some(&FieldValue::Bool(false))
        );
    }

    #[test]
    fn test_interface_key_is_absent_when_no_interface_given() {
        let payload = build_payload(None, &ProxySettings::new(ProxyMethod::None), None, None);
        assert_eq!(payload.get(FieldKey::Interface), None);
        assert_eq!(payload.interface(), None);
        assert_eq!(payload.interface_key(), None);
        assert_eq!(keys(&payload), vec!["Method", "BrowserOnly"]);
    }

    #[test]
    fn test_browser_only_flag_is_always_emitted() {
        let plain = build_payload(None, &ProxySettings::new(ProxyMethod::None), None, None);
        assert_eq!(
            plain.get(FieldKey::BrowserOnly),
            Some(&FieldValue::Bool(false))
        );

        let flagged = build_payload(
            None,
            &ProxySettings::new(ProxyMethod::None).with_browser_only(true),
            None,
            None,
        );
        assert_eq!(
            flagged.get(FieldKey::BrowserOnly),
            Some(&FieldValue::Bool(true))
        );
    }

    #[test]
    fn test_domains_follow_family_then_category_order() {
        let ip4 = Ipv4Settings {
            searches: vec!["corp.example.com".to_owned()],
            domains: vec!["example.com".to_owned()],
            addresses: vec!["192.0.2.10/24".parse().unwrap()],
            routes: vec!["198.51.100.0/24".parse().unwrap()],
        };
        let ip6 = Ipv6Settings {
            searches: vec!["v6.example.com".to_owned()],
            domains: vec!["example.org".to_owned()],
            addresses: vec!["2001:db8::1/64".parse().unwrap()],
            routes: vec!["2001:db8:1::/48".parse().unwrap()],
        };
        let payload = build_payload(
            Some("eth0"),
            &ProxySettings::new(ProxyMethod::None),
            Some(&ip4),
            Some(&ip6),
        );
        let Some(FieldValue::StrList(domains)) = payload.get(FieldKey::Domains) else {
            panic!("expected a Domains entry");
        };
        assert_eq!(
            domains,
            &vec![
                "corp.example.com".to_owned(),
                "example.com".to_owned(),
                "192.0.2.10/24".to_owned(),
                "198.51.100.0/24".to_owned(),
                "v6.example.com".to_owned(),
                "example.org".to_owned(),
                "2001:db8::1/64".to_owned(),
                "2001:db8:1::/48".to_owned(),
            ]
        );
    }

    #[test]
    fn test_duplicate_domains_are_preserved() {
        let ip4 = Ipv4Settings {
            searches: vec!["example.com".to_owned()],
            domains: vec!["example.com".to_owned()],
            ..Default::default()
        };
        let payload = build_payload(
            Some("eth0"),
            &ProxySettings::new(ProxyMethod::None),
            Some(&ip4),
            None,
        );
        let Some(FieldValue::StrList(domains)) = payload.get(FieldKey::Domains) else {
            panic!("expected a Domains entry");
        };
        assert_eq!(domains.len(), 2);
    }

    #[test]
    fn test_empty_snapshot_omits_domains() {
        let payload = build_payload(
            Some("eth0"),
            &ProxySettings::new(ProxyMethod::None),
            Some(&Ipv4Settings::default()),
            Some(&Ipv6Settings::default()),
        );
        assert_eq!(payload.get(FieldKey::Domains), None);
    }

    #[test]
    fn test_field_order_is_stable() {
        let ip4 = Ipv4Settings {
            domains: vec!["example.com".to_owned()],
            ..Default::default()
        };
        let payload = build_payload(
            Some("wlan0"),
            &auto(Some("http://example.com/proxy.pac"), Some("// pac")),
            Some(&ip4),
            None,
        );
        assert_eq!(
            keys(&payload),
            vec!["Interface", "Method", "URL", "Script", "BrowserOnly", "Domains"]
        );
    }
}
