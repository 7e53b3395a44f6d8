use axum::extract::FromRef;
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
        } = state.config.jwt.clone();
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
        }
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }
}

/// Token minting lives in the identity service; tests mint their own.
#[cfg(test)]
pub fn sign(
    cfg: &JwtConfig,
    user_id: uuid::Uuid,
    role: &str,
    kind: super::TokenKind,
) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};

    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id,
        role: role.to_owned(),
        iat: now.unix_timestamp() as usize,
        exp: (now + Duration::minutes(5)).unix_timestamp() as usize,
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        kind,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
    .expect("sign token")
}
