//! Authentication and workspace authorization module
//!
//! Caller identity comes from the identity provider's ID token; access to a
//! workspace comes from a workspace token checked against the role
//! hierarchy on every request.

pub mod gate;
pub mod identity;
pub mod jwt;
pub mod role;
pub mod verifier;

pub use gate::{body_or_empty, parse_body, AuthorizationGate, ScopedAccess, WORKSPACE_TOKEN_FIELD};
pub use identity::{IdentityProvider, JwtIdentityProvider};
pub use jwt::{TokenIssuer, WorkspaceTokenMap};
pub use role::Role;
pub use verifier::{RefreshPolicy, WorkspaceTokenVerifier};
