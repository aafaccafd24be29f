// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Route Prefix: /api/register, /api/login, /api/refresh-token, /api/logout

pub mod auth;
