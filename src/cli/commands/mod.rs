pub mod auth;
pub mod cards;
pub mod server;
