//! Request guards shared by the services.
//!
//! * [`active_user_filter`] rejects requests to protected path/method pairs
//!   when the calling admin user is unknown or deactivated.
//! * [`token_auth`] verifies the bearer token (or `session` cookie) with the
//!   authorization server's introspection endpoint.

mod active_user;
mod introspect;
mod template;

pub use active_user::{
    ActiveUserFilter, LookupError, UserLookup, UserStatus, active_user_filter, check_user_status,
};
pub use introspect::{
    AuthServerIntrospector, IntrospectionError, IntrospectionSettings, TokenIntrospector,
    extract_token, token_auth,
};
pub use template::{ProtectedPath, ProtectedRoutes, RouteConfigError, UriTemplate};
