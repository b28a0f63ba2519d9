pub mod config;
pub mod constants;
pub mod error;
pub mod fee_splitter;
pub mod types;

pub use config::Config;
pub use constants::*;
pub use error::ReferralError;
pub use fee_splitter::split_fee;
pub use types::*;
