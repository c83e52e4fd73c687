/// Router Module Index
///
/// The stub's routes, split by the access level they require.

/// Routes open to anonymous callers: health and login.
pub mod public;

/// Routes that need a valid token but no particular role.
pub mod authenticated;

/// The `/admin` surface. Role checks happen inside the handlers.
pub mod admin;
