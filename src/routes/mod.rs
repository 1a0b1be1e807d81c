/// Router Module Index
///
/// Page routes are grouped by the route owner the classifier assigns them, so
/// each group gets exactly the enforcement tier its owner calls for. The API
/// group sits outside the edge gate's reach by path convention.

/// Public and auth-only pages. Edge gate only.
pub mod public;

/// `/dashboard` pages. Edge gate plus the user-only role guard.
pub mod user;

/// `/admin` pages. Edge gate plus the admin-only role guard.
pub mod admin;

/// `/my-profile` and `/settings`. Edge gate only; any authenticated role.
pub mod common;

/// `/api/*` JSON endpoints backing the client-side session.
pub mod api;
