// handlers/public/auth/mod.rs - Public authentication handlers
//
// POST /register and POST /login issue a fresh token pair.
// GET /refresh trades a refresh token for a new pair.
pub mod login;
pub mod refresh;
pub mod register;
pub mod utils;

pub use login::login;
pub use refresh::refresh;
pub use register::register;
