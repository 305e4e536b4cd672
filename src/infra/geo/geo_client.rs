// HTTP implementation of the GeoProvider port, backed by an ip-api.com
// compatible endpoint.

use crate::core::location::{GeoError, GeoProvider, GeoRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

pub struct HttpGeoClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGeoClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Wire format of the lookup endpoint. Unknown fields are ignored; missing
/// ones default so a sparse record still deserializes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoResponse {
    status: String,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    region_name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

#[async_trait]
impl GeoProvider for HttpGeoClient {
    async fn lookup(&self, ip: IpAddr) -> Result<Option<GeoRecord>, GeoError> {
        let url = format!("{}/json/{}", self.base_url, ip);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GeoError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeoError::Provider(format!(
                "geo lookup returned HTTP {}",
                response.status()
            )));
        }

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|e| GeoError::Provider(e.to_string()))?;

        // The API reports misses in-band with an HTTP 200.
        if body.status != "success" {
            return Ok(None);
        }

        Ok(Some(GeoRecord {
            country: body.country_code,
            region: body.region_name,
            city: body.city,
            latitude: body.lat,
            longitude: body.lon,
        }))
    }
}
