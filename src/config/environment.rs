//! Configuración de variables de entorno
//!
//! Este módulo carga la configuración del servicio desde el entorno (tras
//! `dotenvy`). Las variables ausentes toman valores de desarrollo; las
//! presentes pero mal formadas son un error de arranque.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Política del libro de kilometraje
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MileagePolicy {
    /// Salto máximo aceptado en una actualización manual (cota anti-fraude)
    pub max_manual_jump: i64,
    /// Diferencia a partir de la cual el odómetro de inicio se marca como anómalo
    pub start_odometer_tolerance: i64,
    /// Aplica también la cota anti-fraude al cerrar un viaje
    pub enforce_jump_on_trip_end: bool,
}

impl Default for MileagePolicy {
    fn default() -> Self {
        Self {
            max_manual_jump: 10_000,
            start_odometer_tolerance: 100,
            enforce_jump_on_trip_end: false,
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub max_concurrent_requests: usize,
    pub mileage: MileagePolicy,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            jwt_secret: "development-secret".to_string(),
            jwt_expiration: 86_400,
            cors_origins: Vec::new(),
            max_concurrent_requests: 512,
            mileage: MileagePolicy::default(),
        }
    }
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let mileage_defaults = MileagePolicy::default();

        let config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration: parse_var("JWT_EXPIRATION", defaults.jwt_expiration)?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| split_origins(&origins))
                .unwrap_or(defaults.cors_origins),
            max_concurrent_requests: parse_var("MAX_CONCURRENT_REQUESTS", defaults.max_concurrent_requests)?,
            mileage: MileagePolicy {
                max_manual_jump: parse_var("MAX_MANUAL_MILEAGE_JUMP", mileage_defaults.max_manual_jump)?,
                start_odometer_tolerance: parse_var(
                    "START_ODOMETER_TOLERANCE",
                    mileage_defaults.start_odometer_tolerance,
                )?,
                enforce_jump_on_trip_end: parse_var(
                    "ENFORCE_JUMP_ON_TRIP_END",
                    mileage_defaults.enforce_jump_on_trip_end,
                )?,
            },
        };

        if config.is_production() && config.jwt_secret == Self::default().jwt_secret {
            anyhow::bail!("JWT_SECRET must be set in production");
        }

        Ok(config)
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mileage_policy_defaults() {
        let policy = MileagePolicy::default();
        assert_eq!(policy.max_manual_jump, 10_000);
        assert_eq!(policy.start_odometer_tolerance, 100);
        assert!(!policy.enforce_jump_on_trip_end);
    }

    #[test]
    fn test_parse_var_reads_and_rejects() {
        env::set_var("FLEET_TRIPS_TEST_JUMP", " 2500 ");
        assert_eq!(parse_var("FLEET_TRIPS_TEST_JUMP", 10_000i64).unwrap(), 2_500);

        env::set_var("FLEET_TRIPS_TEST_JUMP", "lots");
        assert!(parse_var("FLEET_TRIPS_TEST_JUMP", 10_000i64).is_err());

        env::remove_var("FLEET_TRIPS_TEST_JUMP");
        assert_eq!(parse_var("FLEET_TRIPS_TEST_JUMP", 10_000i64).unwrap(), 10_000);
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins("https://a.example, https://b.example,,"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
