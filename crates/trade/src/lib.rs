pub mod account;
pub mod executor;
pub mod position;
pub mod stats;
