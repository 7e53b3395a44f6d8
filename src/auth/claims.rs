use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tokens come from the identity service; only `access` tokens open the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// Bearer token payload. `iss` and `aud` are checked on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    /// Missing on tokens minted before roles existed; treated as a member.
    #[serde(default)]
    pub role: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}
