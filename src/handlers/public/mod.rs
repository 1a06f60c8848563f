// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition plus the liveness endpoints. Every input here comes from
// an anonymous caller and is validated before it reaches the store.
pub mod auth;
pub mod home;
