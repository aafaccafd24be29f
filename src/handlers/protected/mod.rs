// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every handler here runs behind jwt_auth_middleware and reads the caller
// from the AuthUser extension. Card queries are always scoped to that user.

pub mod auth;
pub mod cards;
