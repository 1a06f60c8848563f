// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (access token required)
pub mod protected; // Tier 2: access token checked by middleware::require_access
pub mod public; // Tier 1: token acquisition and liveness
