//! Authentication: tokens, password hashing and request extractors.
pub mod extract;
pub mod jwt;
pub mod password;

pub use extract::{AdminUser, CurrentUser};
