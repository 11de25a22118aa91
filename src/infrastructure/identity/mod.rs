//! Identity provider implementations.

mod jwt;

pub use jwt::{IdTokenClaims, JwtIdentityProvider, SessionClaims};
