//! Sequences validation, city resolution, temperature resolution and
//! unit conversion for one lookup.

use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    PostalCode, TemperatureReport,
    config::TimeoutsConfig,
    deadline::Deadline,
    error::Error,
    provider::Providers,
    resolver::{CityResolver, TemperatureResolver},
};

/// A failed lookup, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid zipcode")]
    InvalidZipcode(#[source] Error),

    #[error("can not find zipcode")]
    CityNotFound(#[source] Error),

    #[error("can not find temperature in Celsius for City: {city}.")]
    TemperatureUnavailable {
        city: String,
        #[source]
        source: Error,
    },
}

/// Per-stage deadlines. Each stage gets a fresh budget, bounded by the
/// caller's deadline.
#[derive(Debug, Clone, Copy)]
pub struct StageTimeouts {
    pub city: Duration,
    pub temperature: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self { city: Duration::from_secs(1), temperature: Duration::from_secs(1) }
    }
}

impl From<&TimeoutsConfig> for StageTimeouts {
    fn from(cfg: &TimeoutsConfig) -> Self {
        Self { city: cfg.city(), temperature: cfg.temperature() }
    }
}

#[derive(Debug, Clone)]
pub struct TemperatureService {
    cities: CityResolver,
    temperatures: TemperatureResolver,
    timeouts: StageTimeouts,
}

impl TemperatureService {
    pub fn new(cities: CityResolver, temperatures: TemperatureResolver, timeouts: StageTimeouts) -> Self {
        Self { cities, temperatures, timeouts }
    }

    pub fn from_providers(providers: Providers, timeouts: StageTimeouts) -> Self {
        Self::new(
            CityResolver::new(providers.primary, providers.secondary),
            TemperatureResolver::new(providers.temperature),
            timeouts,
        )
    }

    /// Resolves the temperature for a raw postal code within `deadline`.
    #[instrument(skip(self, deadline))]
    pub async fn lookup(&self, raw_cep: &str, deadline: &Deadline) -> Result<TemperatureReport, LookupError> {
        let cep = PostalCode::try_from(raw_cep).map_err(LookupError::InvalidZipcode)?;

        let city = self
            .cities
            .resolve_city(&cep, &deadline.child(self.timeouts.city))
            .await
            .map_err(|err| {
                warn!(error = %err, "city lookup failed");
                LookupError::CityNotFound(err)
            })?;

        let temperature = self
            .temperatures
            .resolve_temperature(&city, &deadline.child(self.timeouts.temperature))
            .await
            .map_err(|source| {
                warn!(%city, error = %source, "temperature lookup failed");
                LookupError::TemperatureUnavailable { city: city.clone(), source }
            })?;

        let report = TemperatureReport::from(temperature);
        info!(%city, ?report, "lookup complete");
        Ok(report)
    }
}
