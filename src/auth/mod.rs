pub mod identity;
pub mod password;
pub mod token;

pub use identity::VerifiedIdentity;
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, IssuedToken, TokenError, TokenService};
