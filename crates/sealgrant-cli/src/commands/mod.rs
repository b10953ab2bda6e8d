pub mod config;
pub mod inspect;
pub mod keygen;
pub mod mint;
