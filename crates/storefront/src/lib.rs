//! Boutique Storefront library.
//!
//! This crate provides the REST backend as a library, allowing it to be
//! tested and reused by the CLI (migrations, catalog seeding).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

/// Fixtures shared by handler and config tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::net::{IpAddr, Ipv4Addr};

    use secrecy::SecretString;

    use crate::config::{JwtConfig, StorefrontConfig};
    use crate::db::create_lazy_pool;
    use crate::state::AppState;

    /// A complete configuration that needs no environment.
    pub fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/boutique_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3001,
            base_url: "http://localhost:3001/".to_string(),
            cors_origin: None,
            jwt: JwtConfig {
                secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"),
                expiry_hours: 24,
            },
            google: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    /// Application state over a pool that only connects when first used.
    ///
    /// Must be called inside a Tokio runtime.
    #[allow(clippy::expect_used)]
    pub fn test_state() -> AppState {
        let config = test_config();
        let pool = create_lazy_pool(&config.database_url).expect("lazy pool");
        AppState::new(config, pool).expect("state without Google")
    }
}
