//! Core library for the `cep-temp` service.
//!
//! This crate defines:
//! - Deadlines threaded through every outbound call
//! - A resilient fetch primitive (bounded retry with exponential backoff)
//! - A first-success race over redundant sources
//! - The CEP and weather providers, and the resolvers built on them
//! - Configuration & credentials handling
//!
//! It is used by the `cep-temp` binary, but can also be reused by other binaries or services.

pub mod config;
pub mod deadline;
pub mod error;
pub mod fetch;
pub mod model;
pub mod provider;
pub mod race;
pub mod resolver;
pub mod service;

pub use config::Config;
pub use deadline::Deadline;
pub use error::{Error, Result};
pub use fetch::{BackoffPolicy, ResilientFetcher};
pub use model::{PostalCode, Temperature, TemperatureReport};
pub use provider::{CityProvider, ProviderId, Providers, TemperatureProvider, providers_from_config};
pub use race::{Candidate, RaceOutcome, race};
pub use resolver::{CityResolver, TemperatureResolver};
pub use service::{LookupError, StageTimeouts, TemperatureService};
