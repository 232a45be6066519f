//! Address geocoding through an ordered provider chain.
//!
//! Chain rules:
//! - a match returns `Found` immediately
//! - an empty candidate list falls through to the next provider
//! - a non-2xx answer, or a 2xx body that cannot be parsed, is returned at
//!   once as `ProviderError` with the HTTP status
//! - a transport failure (timeout, connection) falls through; if the chain
//!   ends without a match, the last transport failure is reported instead of
//!   `NotFound`
//!
//! `Found` and `NotFound` are memoized by the trimmed address; provider errors
//! never are.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{GeoPoint, GeocodeResult};

pub const BAN_URL: &str = "https://api-adresse.data.gouv.fr/search/";
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_CONTACT_EMAIL: &str = "contact@exemple.org";
const ACCEPT_LANGUAGE_FR: &str = "fr-FR,fr;q=0.9,en;q=0.6";
const DETAIL_MAX_CHARS: usize = 300;

/// What one provider made of one address.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Match(GeoPoint),
    Empty,
    /// The provider answered, but not with something usable.
    Failed { status: u16, detail: String },
    /// No answer at all.
    Transport { detail: String, timeout: bool },
}

pub trait GeocodeProvider {
    fn name(&self) -> &str;
    fn lookup(&self, address: &str) -> ProviderOutcome;
}

/// Identifying blocking HTTP client shared by the real providers.
pub fn http_client(contact_email: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_FR));
    Client::builder()
        .user_agent(format!("LYRAE/1.0 ({contact_email})"))
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

/// Send a GET and classify the answer; `parse` only sees 2xx bodies.
fn fetch(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
    parse: fn(&str) -> Result<Option<GeoPoint>, String>,
) -> ProviderOutcome {
    let resp = match client.get(url).query(query).send() {
        Ok(r) => r,
        Err(e) => return transport(e),
    };
    let status = resp.status();
    let body = match resp.text() {
        Ok(b) => b,
        Err(e) => return transport(e),
    };
    if !status.is_success() {
        return ProviderOutcome::Failed {
            status: status.as_u16(),
            detail: truncate(&body),
        };
    }
    match parse(&body) {
        Ok(Some(point)) => ProviderOutcome::Match(point),
        Ok(None) => ProviderOutcome::Empty,
        Err(detail) => ProviderOutcome::Failed {
            status: status.as_u16(),
            detail,
        },
    }
}

fn transport(e: reqwest::Error) -> ProviderOutcome {
    ProviderOutcome::Transport {
        timeout: e.is_timeout(),
        detail: e.to_string(),
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(DETAIL_MAX_CHARS).collect()
}

fn checked_point(lat: f64, lon: f64, display_name: String, provider: &str) -> Result<GeoPoint, String> {
    if !(lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)) {
        return Err(format!("coordinates out of range: lat={lat}, lon={lon}"));
    }
    Ok(GeoPoint {
        lat,
        lon,
        display_name,
        provider: provider.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Base Adresse Nationale
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BanResponse {
    #[serde(default)]
    features: Vec<BanFeature>,
}

#[derive(Debug, Deserialize)]
struct BanFeature {
    geometry: BanGeometry,
    #[serde(default)]
    properties: BanProperties,
}

#[derive(Debug, Deserialize)]
struct BanGeometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct BanProperties {
    label: Option<String>,
}

/// French national address base. Precise for French street addresses.
pub struct BanProvider {
    client: Client,
}

impl BanProvider {
    pub const NAME: &'static str = "BAN";

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Parse a BAN GeoJSON answer. Coordinates are `[lon, lat]`.
    pub fn parse(body: &str) -> Result<Option<GeoPoint>, String> {
        let resp: BanResponse =
            serde_json::from_str(body).map_err(|e| format!("unreadable BAN response: {e}"))?;
        let Some(first) = resp.features.into_iter().next() else {
            return Ok(None);
        };
        let (lon, lat) = match first.geometry.coordinates.as_slice() {
            [lon, lat, ..] => (*lon, *lat),
            _ => return Err("BAN feature without [lon, lat] coordinates".to_string()),
        };
        let display = first.properties.label.unwrap_or_default();
        checked_point(lat, lon, display, Self::NAME).map(Some)
    }
}

impl GeocodeProvider for BanProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lookup(&self, address: &str) -> ProviderOutcome {
        fetch(&self.client, BAN_URL, &[("q", address), ("limit", "1")], Self::parse)
    }
}

// ---------------------------------------------------------------------------
// Nominatim
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

/// OpenStreetMap Nominatim, restricted to France.
pub struct NominatimProvider {
    client: Client,
}

impl NominatimProvider {
    pub const NAME: &'static str = "Nominatim";

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Parse a Nominatim JSON array. Coordinates arrive as strings.
    pub fn parse(body: &str) -> Result<Option<GeoPoint>, String> {
        let places: Vec<NominatimPlace> =
            serde_json::from_str(body).map_err(|e| format!("unreadable Nominatim response: {e}"))?;
        let Some(first) = places.into_iter().next() else {
            return Ok(None);
        };
        let lat = first
            .lat
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid latitude '{}'", first.lat))?;
        let lon = first
            .lon
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid longitude '{}'", first.lon))?;
        checked_point(lat, lon, first.display_name.unwrap_or_default(), Self::NAME).map(Some)
    }
}

impl GeocodeProvider for NominatimProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lookup(&self, address: &str) -> ProviderOutcome {
        fetch(
            &self.client,
            NOMINATIM_URL,
            &[
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
                ("countrycodes", "fr"),
                ("q", address),
            ],
            Self::parse,
        )
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub struct GeocodeResolver {
    providers: Vec<Box<dyn GeocodeProvider>>,
    cache: HashMap<String, GeocodeResult>,
}

impl GeocodeResolver {
    pub fn new(providers: Vec<Box<dyn GeocodeProvider>>) -> Self {
        Self {
            providers,
            cache: HashMap::new(),
        }
    }

    /// BAN first, Nominatim second, sharing one identifying client.
    pub fn french_chain(contact_email: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = http_client(contact_email, timeout)?;
        Ok(Self::new(vec![
            Box::new(BanProvider::new(client.clone())),
            Box::new(NominatimProvider::new(client)),
        ]))
    }

    pub fn resolve(&mut self, address: &str) -> GeocodeResult {
        let key = address.trim();
        if key.is_empty() {
            return GeocodeResult::NotFound;
        }
        if let Some(hit) = self.cache.get(key) {
            debug!(address = key, "geocode cache hit");
            return hit.clone();
        }

        let result = self.run_chain(key);
        if !matches!(result, GeocodeResult::ProviderError { .. }) {
            self.cache.insert(key.to_string(), result.clone());
        }
        result
    }

    pub fn cached(&self, address: &str) -> Option<&GeocodeResult> {
        self.cache.get(address.trim())
    }

    fn run_chain(&self, address: &str) -> GeocodeResult {
        let mut last_transport = None;
        for provider in &self.providers {
            debug!(provider = provider.name(), "geocoding attempt");
            match provider.lookup(address) {
                ProviderOutcome::Match(mut point) => {
                    if point.display_name.trim().is_empty() {
                        point.display_name = address.to_string();
                    }
                    info!(provider = provider.name(), lat = point.lat, lon = point.lon, "address located");
                    return GeocodeResult::Found(point);
                }
                ProviderOutcome::Empty => {
                    debug!(provider = provider.name(), "no candidates");
                }
                ProviderOutcome::Failed { status, detail } => {
                    warn!(provider = provider.name(), status, %detail, "geocoding provider error");
                    return GeocodeResult::ProviderError {
                        status: Some(status),
                        detail,
                        provider: provider.name().to_string(),
                    };
                }
                ProviderOutcome::Transport { detail, timeout } => {
                    warn!(provider = provider.name(), timeout, %detail, "geocoding provider unreachable");
                    last_transport = Some(GeocodeResult::ProviderError {
                        status: None,
                        detail,
                        provider: provider.name().to_string(),
                    });
                }
            }
        }
        last_transport.unwrap_or(GeocodeResult::NotFound)
    }
}
