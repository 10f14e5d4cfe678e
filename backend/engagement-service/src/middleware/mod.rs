/// HTTP middleware for engagement-service
///
/// The identity middleware turns a bearer token into a verified
/// `AuthenticatedActor`; request metrics live in `crate::metrics`.
pub mod identity;

pub use identity::{AuthenticatedActor, Claims, JwtAuthMiddleware, JwtValidator};
