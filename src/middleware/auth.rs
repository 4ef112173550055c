//! Autenticación JWT
//!
//! La emisión de tokens pertenece al servicio de identidad. Aquí solo se
//! decodifica el bearer token y se expone el usuario autenticado (conductor o
//! personal de flota) con su tenant.

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::EnvironmentConfig, state::AppState, utils::errors::AppError};

/// Rol del usuario dentro del tenant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Driver,
    Manager,
    Admin,
}

/// Claims del JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub tenant_id: String,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

/// Usuario autenticado que se inyecta en los handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// Exige rol de personal de flota (manager o admin)
    pub fn require_staff(&self) -> Result<(), AppError> {
        match self.role {
            UserRole::Manager | UserRole::Admin => Ok(()),
            UserRole::Driver => Err(AppError::Forbidden(
                "Se requieren permisos de gestión de flota".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Token de autorización requerido".to_string()))?;

        decode_token(token, &state.config)
    }
}

pub fn decode_token(token: &str, config: &EnvironmentConfig) -> Result<AuthenticatedUser, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Token inválido".to_string()))?
    .claims;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("ID de usuario inválido".to_string()))?;
    let tenant_id = Uuid::parse_str(&claims.tenant_id)
        .map_err(|_| AppError::Unauthorized("ID de tenant inválido".to_string()))?;

    Ok(AuthenticatedUser {
        user_id,
        tenant_id,
        role: claims.role,
    })
}

/// Genera un JWT con el mismo formato que el servicio de identidad
pub fn generate_jwt_token(
    user_id: Uuid,
    tenant_id: Uuid,
    role: UserRole,
    config: &EnvironmentConfig,
) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(config.jwt_expiration as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        tenant_id: tenant_id.to_string(),
        role,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(config.jwt_secret.as_ref()))
        .map_err(|e| AppError::Internal(format!("Error generando JWT: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let config = EnvironmentConfig::default();
        let (user, tenant) = (Uuid::new_v4(), Uuid::new_v4());

        let token = generate_jwt_token(user, tenant, UserRole::Driver, &config).unwrap();
        let decoded = decode_token(&token, &config).unwrap();

        assert_eq!(decoded.user_id, user);
        assert_eq!(decoded.tenant_id, tenant);
        assert_eq!(decoded.role, UserRole::Driver);
        assert!(decoded.require_staff().is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let config = EnvironmentConfig::default();
        let other = EnvironmentConfig {
            jwt_secret: "another-secret".to_string(),
            ..EnvironmentConfig::default()
        };

        let token = generate_jwt_token(Uuid::new_v4(), Uuid::new_v4(), UserRole::Admin, &other).unwrap();
        assert!(matches!(decode_token(&token, &config), Err(AppError::Unauthorized(_))));
    }
}
