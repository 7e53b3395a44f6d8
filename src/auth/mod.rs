mod claims;
mod extractors;
pub mod jwt;

pub use claims::TokenKind;
pub use extractors::AuthContext;
