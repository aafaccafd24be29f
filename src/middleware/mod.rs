pub mod auth;
pub mod response;
pub mod security_headers;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use security_headers::security_headers_middleware;
