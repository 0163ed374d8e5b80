pub mod asic;
pub mod constants;
pub mod crypto;
pub mod der;
pub mod types;
pub mod xades;
pub mod xml;
