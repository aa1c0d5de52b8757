mod password;
pub use password::{hash_password, verify_password};
mod jwt;
pub use jwt::{UserClaims, generate_token, process_token};
mod token;
pub use token::{generate_tx_ref, generate_verification_code};
mod error;
pub use error::{CryptError, CryptResult};
