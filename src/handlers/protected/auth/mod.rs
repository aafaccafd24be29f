pub mod logout_all;
pub mod whoami;

pub use logout_all::logout_all_post;
pub use whoami::whoami_get;
