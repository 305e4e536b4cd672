// Location resolution and region classification - the inputs for every
// location-aware policy in the platform (theme selection, verification
// routing, comment metadata).
//
// NO HTTP dependencies here - the actual geo database sits behind the
// GeoProvider port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Geo provider error: {0}")]
    Provider(String),
}

/// Raw record returned by a geo database lookup.
#[derive(Debug, Clone)]
pub struct GeoRecord {
    pub country: String,
    pub region: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Port for the geo lookup database.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Look up an IP address. `Ok(None)` means the database has no entry for
    /// it - callers fall back to defaults, a miss is never an error.
    async fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>, GeoError>;
}

/// Normalized location attached to a request or stored on a user record.
///
/// Immutable once attached; a later resolution replaces the whole value.
/// "No location" is `Option<Location>`, never a sentinel - the `Unknown`
/// region inside [`Location::fallback`] is a real value that simply fails
/// every regional classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub region: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Placeholder used for loopback/private addresses and as the last
    /// resort when nothing better is known.
    pub fn fallback() -> Self {
        Self {
            country: "IN".to_string(),
            region: "Unknown".to_string(),
            city: "localhost".to_string(),
            latitude: 20.5937,
            longitude: 78.9629,
        }
    }
}

/// Resolves client IPs into [`Location`]s through an injected [`GeoProvider`].
///
/// A pure function of its input at call time: no retries, no caching.
pub struct LocationResolver<P: GeoProvider> {
    provider: P,
}

impl<P: GeoProvider> LocationResolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Resolve an IP to a location.
    ///
    /// Loopback, private and unspecified addresses short-circuit to the
    /// fixed placeholder rather than failing - development traffic never has
    /// a public address. A database miss returns `Ok(None)`.
    pub async fn resolve(&self, ip: IpAddr) -> Result<Option<Location>, GeoError> {
        if is_local_address(ip) {
            return Ok(Some(Location::fallback()));
        }

        let record = self.provider.lookup(ip).await?;
        Ok(record.map(|r| Location {
            country: r.country,
            region: r.region,
            city: r.city,
            latitude: r.latitude,
            longitude: r.longitude,
        }))
    }
}

fn is_local_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

/// Registration-flow merge: region and city the user declared win over the
/// IP-derived values, country and coordinates come from the IP lookup, and
/// the placeholder fills whatever is left.
pub fn merge_declared(
    declared_region: Option<&str>,
    declared_city: Option<&str>,
    ip_location: Option<&Location>,
) -> Location {
    let base = ip_location.cloned().unwrap_or_else(Location::fallback);

    let region = declared_region
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or(base.region);
    let city = declared_city
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or(base.city);

    Location {
        country: base.country,
        region,
        city,
        latitude: base.latitude,
        longitude: base.longitude,
    }
}

/// Canonical southern states plus the aliases, abbreviations and
/// misspellings we have actually seen in user-declared data.
const SOUTHERN_REGIONS: &[&str] = &[
    // Tamil Nadu
    "TN",
    "Tamil Nadu",
    "Tamilnadu",
    "Tamil-Nadu",
    // Kerala
    "KL",
    "Kerala",
    "Kerela",
    // Karnataka
    "KA",
    "Karnataka",
    "Karnatka",
    "Karnātaka",
    // Andhra Pradesh
    "AP",
    "Andhra Pradesh",
    "Andhra",
    "AndhraPradesh",
    "Andhra-Pradesh",
    // Telangana
    "TG",
    "TS",
    "Telangana",
    "Telengana",
    "Telagana",
];

fn normalize_region(region: &str) -> String {
    region
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Whether a region string names one of the southern states.
///
/// Case-insensitive, whitespace/hyphen-stripped, and containment is checked
/// in both directions so minor variations ("State of Tamil Nadu", "Tamil")
/// still classify. Empty input is never southern.
pub fn is_southern_region(region: &str) -> bool {
    let normalized = normalize_region(region);
    if normalized.is_empty() {
        return false;
    }

    SOUTHERN_REGIONS.iter().any(|alias| {
        let alias = normalize_region(alias);
        normalized.contains(&alias) || alias.contains(&normalized)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct FixedGeo(Option<GeoRecord>);

    #[async_trait]
    impl GeoProvider for FixedGeo {
        async fn lookup(&self, _ip: IpAddr) -> Result<Option<GeoRecord>, GeoError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn southern_aliases_classify() {
        for region in [
            "Tamil Nadu",
            "tamilnadu",
            "TAMIL-NADU",
            "TN",
            "Kerala",
            "Kerela",
            "Karnataka",
            "Karnatka",
            "Andhra Pradesh",
            "AndhraPradesh",
            "Telangana",
            "Telengana",
            "TS",
            "  kerala  ",
        ] {
            assert!(is_southern_region(region), "{region} should be southern");
        }
    }

    #[test]
    fn non_southern_regions_do_not_classify() {
        for region in ["Delhi", "Maharashtra", "West Bengal", "Punjab", "Unknown"] {
            assert!(!is_southern_region(region), "{region} should not be southern");
        }
    }

    #[test]
    fn empty_region_is_not_southern() {
        assert!(!is_southern_region(""));
        assert!(!is_southern_region("   "));
    }

    #[tokio::test]
    async fn loopback_resolves_to_placeholder() {
        let resolver = LocationResolver::new(FixedGeo(None));
        let location = resolver
            .resolve(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(location.region, "Unknown");
        assert_eq!(location.country, "IN");
        assert!(!is_southern_region(&location.region));
    }

    #[tokio::test]
    async fn private_address_never_hits_the_provider() {
        struct PanickingGeo;

        #[async_trait]
        impl GeoProvider for PanickingGeo {
            async fn lookup(&self, _ip: IpAddr) -> Result<Option<GeoRecord>, GeoError> {
                panic!("provider must not be called for private addresses");
            }
        }

        let resolver = LocationResolver::new(PanickingGeo);
        let location = resolver
            .resolve("192.168.1.20".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(location, Some(Location::fallback()));
    }

    #[tokio::test]
    async fn provider_hit_maps_into_location() {
        let resolver = LocationResolver::new(FixedGeo(Some(GeoRecord {
            country: "IN".to_string(),
            region: "Tamil Nadu".to_string(),
            city: "Chennai".to_string(),
            latitude: 13.08,
            longitude: 80.27,
        })));

        let location = resolver
            .resolve("103.48.198.141".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(location.region, "Tamil Nadu");
        assert_eq!(location.city, "Chennai");
    }

    #[tokio::test]
    async fn provider_miss_is_none_not_error() {
        let resolver = LocationResolver::new(FixedGeo(None));
        let location = resolver.resolve("8.8.8.8".parse().unwrap()).await.unwrap();
        assert_eq!(location, None);
    }

    #[test]
    fn declared_region_wins_over_ip_location() {
        let ip_location = Location {
            country: "IN".to_string(),
            region: "Maharashtra".to_string(),
            city: "Mumbai".to_string(),
            latitude: 19.07,
            longitude: 72.87,
        };

        let merged = merge_declared(Some("Kerala"), Some("Kochi"), Some(&ip_location));
        assert_eq!(merged.region, "Kerala");
        assert_eq!(merged.city, "Kochi");
        // Coordinates and country still come from the lookup.
        assert_eq!(merged.country, "IN");
        assert!((merged.latitude - 19.07).abs() < f64::EPSILON);
    }

    #[test]
    fn merge_falls_back_to_placeholder() {
        let merged = merge_declared(None, None, None);
        assert_eq!(merged, Location::fallback());

        let merged = merge_declared(Some(""), Some("  "), None);
        assert_eq!(merged.region, "Unknown");
        assert_eq!(merged.city, "localhost");
    }
}
