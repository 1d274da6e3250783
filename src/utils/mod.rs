pub mod crypto;
pub mod signature;
pub mod token;
