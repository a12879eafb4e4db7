use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, error};

use crate::{
    Temperature,
    deadline::Deadline,
    error::{Error, Result},
    fetch::ResilientFetcher,
};

use super::{ProviderId, TemperatureProvider};

#[derive(Debug, Clone)]
pub struct HgWeatherProvider {
    fetcher: ResilientFetcher,
    base_url: Url,
    api_key: String,
}

impl HgWeatherProvider {
    pub fn new(fetcher: ResilientFetcher, base_url: Url, api_key: String) -> Self {
        Self { fetcher, base_url, api_key }
    }
}

#[derive(Debug, Deserialize)]
struct HgResults {
    temp: f64,
    #[serde(default)]
    city: String,
}

#[derive(Debug, Deserialize)]
struct HgResponse {
    #[serde(default)]
    valid_key: bool,
    results: Option<HgResults>,
}

fn parse_temperature(city: &str, body: &str) -> Result<Temperature> {
    let provider = ProviderId::HgWeather.as_str();
    let parsed: HgResponse =
        serde_json::from_str(body).map_err(|source| Error::Decode { provider, source })?;

    if !parsed.valid_key {
        error!("invalid API key provided for HG Weather");
        return Err(Error::InvalidCredential { provider });
    }

    let results = parsed
        .results
        .ok_or_else(|| Error::NotFound { provider, subject: city.to_string() })?;

    debug!(requested = %city, reported = %results.city, temp = results.temp, "hgweather reading");
    Ok(Temperature::from_celsius(results.temp))
}

#[async_trait]
impl TemperatureProvider for HgWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::HgWeather
    }

    async fn current_temperature(&self, city: &str, deadline: &Deadline) -> Result<Temperature> {
        let body = self
            .fetcher
            .get(&self.base_url, &[("city_name", city), ("key", self.api_key.as_str())], deadline)
            .await?;

        parse_temperature(city, &body)
    }
}
