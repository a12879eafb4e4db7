use crate::{
    Config, PostalCode, Temperature,
    deadline::Deadline,
    error::Result,
    fetch::ResilientFetcher,
    provider::{brasilapi::BrasilApiProvider, hgweather::HgWeatherProvider, viacep::ViaCepProvider},
};
use async_trait::async_trait;
use reqwest::Url;
use std::{fmt::Debug, sync::Arc};

pub mod brasilapi;
pub mod hgweather;
pub mod viacep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    BrasilApi,
    ViaCep,
    HgWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::BrasilApi => "brasilapi",
            ProviderId::ViaCep => "viacep",
            ProviderId::HgWeather => "hgweather",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a postal code to `"<locality>,<region>"`.
#[async_trait]
pub trait CityProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn lookup_city(&self, cep: &PostalCode, deadline: &Deadline) -> Result<String>;
}

/// Resolves a city string to its current temperature.
#[async_trait]
pub trait TemperatureProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn current_temperature(&self, city: &str, deadline: &Deadline) -> Result<Temperature>;
}

/// The concrete providers, wired from config and sharing one fetcher.
#[derive(Debug, Clone)]
pub struct Providers {
    pub primary: Arc<dyn CityProvider>,
    pub secondary: Arc<dyn CityProvider>,
    pub temperature: Arc<dyn TemperatureProvider>,
}

/// Construct every provider from config.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Providers> {
    let api_key = config.api_key()?;
    let fetcher = ResilientFetcher::with_timeout(
        config.timeouts.http_client(),
        config.backoff.policy(),
    )?;

    let brasil_api_url = parse_base_url(&config.providers.brasil_api_url)?;
    let via_cep_url = parse_base_url(&config.providers.via_cep_url)?;
    let hg_weather_url = parse_base_url(&config.providers.hg_weather_url)?;

    Ok(Providers {
        primary: Arc::new(BrasilApiProvider::new(fetcher.clone(), brasil_api_url)),
        secondary: Arc::new(ViaCepProvider::new(fetcher.clone(), via_cep_url)),
        temperature: Arc::new(HgWeatherProvider::new(fetcher, hg_weather_url, api_key.to_owned())),
    })
}

fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid provider URL '{raw}': {e}"))
}

/// `base` with `segments` appended as path segments.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
