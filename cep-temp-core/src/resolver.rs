//! City and temperature resolution on top of the providers.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    PostalCode, Temperature,
    deadline::Deadline,
    error::Result,
    provider::{CityProvider, TemperatureProvider},
    race::{Candidate, race},
};

/// Races two city providers for the same postal code.
#[derive(Debug, Clone)]
pub struct CityResolver {
    primary: Arc<dyn CityProvider>,
    secondary: Arc<dyn CityProvider>,
}

impl CityResolver {
    pub fn new(primary: Arc<dyn CityProvider>, secondary: Arc<dyn CityProvider>) -> Self {
        Self { primary, secondary }
    }

    #[instrument(skip_all, fields(cep = %cep))]
    pub async fn resolve_city(&self, cep: &PostalCode, deadline: &Deadline) -> Result<String> {
        let candidates = [&self.primary, &self.secondary]
            .into_iter()
            .map(|provider| city_candidate(provider.clone(), cep.clone()))
            .collect();

        let city = race(candidates, deadline).await?;
        info!(%city, "city resolved");
        Ok(city)
    }
}

fn city_candidate(provider: Arc<dyn CityProvider>, cep: PostalCode) -> Candidate<String> {
    Candidate::new(provider.id().as_str(), move |deadline| async move {
        provider.lookup_city(&cep, &deadline).await
    })
}

/// Single-provider temperature lookup.
#[derive(Debug, Clone)]
pub struct TemperatureResolver {
    provider: Arc<dyn TemperatureProvider>,
}

impl TemperatureResolver {
    pub fn new(provider: Arc<dyn TemperatureProvider>) -> Self {
        Self { provider }
    }

    #[instrument(skip_all, fields(city = %city))]
    pub async fn resolve_temperature(&self, city: &str, deadline: &Deadline) -> Result<Temperature> {
        let temperature = self.provider.current_temperature(city, deadline).await?;
        info!(celsius = temperature.celsius, "temperature resolved");
        Ok(temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, provider::ProviderId};
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Debug)]
    struct StubCity {
        id: ProviderId,
        delay: Duration,
        answer: std::result::Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl CityProvider for StubCity {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn lookup_city(&self, _cep: &PostalCode, deadline: &Deadline) -> Result<String> {
            deadline.sleep(self.delay).await?;
            self.answer.map(str::to_string).map_err(|message| Error::Transport {
                url: self.id.to_string(),
                message: message.to_string(),
            })
        }
    }

    #[derive(Debug)]
    struct StubTemperature(std::result::Result<f64, &'static str>);

    #[async_trait]
    impl TemperatureProvider for StubTemperature {
        fn id(&self) -> ProviderId {
            ProviderId::HgWeather
        }

        async fn current_temperature(&self, _city: &str, _deadline: &Deadline) -> Result<Temperature> {
            match self.0 {
                Ok(c) => Ok(Temperature::from_celsius(c)),
                Err(_) => Err(Error::InvalidCredential { provider: "hgweather" }),
            }
        }
    }

    fn resolver(
        primary: (Duration, std::result::Result<&'static str, &'static str>),
        secondary: (Duration, std::result::Result<&'static str, &'static str>),
    ) -> CityResolver {
        CityResolver::new(
            Arc::new(StubCity { id: ProviderId::BrasilApi, delay: primary.0, answer: primary.1 }),
            Arc::new(StubCity { id: ProviderId::ViaCep, delay: secondary.0, answer: secondary.1 }),
        )
    }

    fn cep() -> PostalCode {
        PostalCode::try_from("12345678").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn primary_answers_secondary_fails() {
        let r = resolver((Duration::ZERO, Ok("A")), (Duration::ZERO, Err("via cep error")));
        let deadline = Deadline::after(Duration::from_secs(1));

        assert_eq!(r.resolve_city(&cep(), &deadline).await.unwrap(), "A");
    }

    #[tokio::test(start_paused = true)]
    async fn primary_fails_secondary_answers() {
        let r = resolver((Duration::ZERO, Err("brasil api error")), (Duration::ZERO, Ok("B")));
        let deadline = Deadline::after(Duration::from_secs(1));

        assert_eq!(r.resolve_city(&cep(), &deadline).await.unwrap(), "B");
    }

    #[tokio::test(start_paused = true)]
    async fn slower_provider_still_wins_when_faster_fails() {
        let r = resolver(
            (Duration::from_millis(900), Ok("slow primary")),
            (Duration::from_millis(10), Err("via cep error")),
        );
        let deadline = Deadline::after(Duration::from_secs(1));

        assert_eq!(r.resolve_city(&cep(), &deadline).await.unwrap(), "slow primary");
    }

    #[tokio::test(start_paused = true)]
    async fn both_failing_is_an_error() {
        let r = resolver((Duration::ZERO, Err("brasil api error")), (Duration::ZERO, Err("via cep error")));
        let deadline = Deadline::after(Duration::from_secs(1));

        let err = r.resolve_city(&cep(), &deadline).await.unwrap_err();
        assert!(matches!(err, Error::AllCandidatesFailed { attempted: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn both_slow_hits_deadline() {
        let r = resolver((Duration::from_secs(2), Ok("A")), (Duration::from_secs(2), Ok("B")));
        let deadline = Deadline::after(Duration::from_secs(1));

        let err = r.resolve_city(&cep(), &deadline).await.unwrap_err();
        assert!(err.is_deadline(), "expected deadline error, got {err:?}");
    }

    #[tokio::test]
    async fn temperature_passes_through() {
        let r = TemperatureResolver::new(Arc::new(StubTemperature(Ok(25.0))));
        let deadline = Deadline::after(Duration::from_secs(1));

        let t = r.resolve_temperature("São Paulo,SP", &deadline).await.unwrap();
        assert_eq!(t.celsius, 25.0);
    }

    #[tokio::test]
    async fn temperature_error_is_surfaced() {
        let r = TemperatureResolver::new(Arc::new(StubTemperature(Err("bad key"))));
        let deadline = Deadline::after(Duration::from_secs(1));

        let err = r.resolve_temperature("São Paulo,SP", &deadline).await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredential { .. }));
    }
}
