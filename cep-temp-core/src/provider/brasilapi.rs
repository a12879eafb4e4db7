use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::{
    PostalCode,
    deadline::Deadline,
    error::{Error, Result},
    fetch::ResilientFetcher,
};

use super::{CityProvider, ProviderId, join_segments};

#[derive(Debug, Clone)]
pub struct BrasilApiProvider {
    fetcher: ResilientFetcher,
    base_url: Url,
}

impl BrasilApiProvider {
    pub fn new(fetcher: ResilientFetcher, base_url: Url) -> Self {
        Self { fetcher, base_url }
    }
}

#[derive(Debug, Deserialize)]
struct BrasilApiResponse {
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
}

fn parse_city(cep: &PostalCode, body: &str) -> Result<String> {
    let parsed: BrasilApiResponse = serde_json::from_str(body)
        .map_err(|source| Error::Decode { provider: ProviderId::BrasilApi.as_str(), source })?;

    if parsed.city.trim().is_empty() {
        return Err(Error::NotFound {
            provider: ProviderId::BrasilApi.as_str(),
            subject: cep.to_string(),
        });
    }

    Ok(format!("{},{}", parsed.city, parsed.state))
}

#[async_trait]
impl CityProvider for BrasilApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::BrasilApi
    }

    async fn lookup_city(&self, cep: &PostalCode, deadline: &Deadline) -> Result<String> {
        let url = join_segments(&self.base_url, &[cep.as_str()]);
        let body = self.fetcher.get(&url, &[], deadline).await?;
        let city = parse_city(cep, &body)?;
        debug!(%cep, %city, "brasilapi resolved cep");
        Ok(city)
    }
}
