use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    PostalCode,
    deadline::Deadline,
    error::{Error, Result},
    fetch::ResilientFetcher,
};

use super::{CityProvider, ProviderId, join_segments};

#[derive(Debug, Clone)]
pub struct ViaCepProvider {
    fetcher: ResilientFetcher,
    base_url: Url,
}

impl ViaCepProvider {
    pub fn new(fetcher: ResilientFetcher, base_url: Url) -> Self {
        Self { fetcher, base_url }
    }
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    /// Present on unknown CEPs; ViaCEP has sent both `true` and `"true"`.
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepResponse {
    fn is_error(&self) -> bool {
        match &self.erro {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.is_empty() && s != "false",
            Some(_) => true,
        }
    }
}

fn parse_city(cep: &PostalCode, body: &str) -> Result<String> {
    let parsed: ViaCepResponse = serde_json::from_str(body)
        .map_err(|source| Error::Decode { provider: ProviderId::ViaCep.as_str(), source })?;

    if parsed.is_error() || parsed.localidade.trim().is_empty() {
        warn!(%cep, "viacep reported unknown cep");
        return Err(Error::NotFound { provider: ProviderId::ViaCep.as_str(), subject: cep.to_string() });
    }

    Ok(format!("{},{}", parsed.localidade, parsed.uf))
}

#[async_trait]
impl CityProvider for ViaCepProvider {
    fn id(&self) -> ProviderId {
        ProviderId::ViaCep
    }

    async fn lookup_city(&self, cep: &PostalCode, deadline: &Deadline) -> Result<String> {
        let url = join_segments(&self.base_url, &[cep.as_str(), "json", ""]);
        let body = self.fetcher.get(&url, &[], deadline).await?;
        let city = parse_city(cep, &body)?;
        debug!(%cep, %city, "viacep resolved cep");
        Ok(city)
    }
}
