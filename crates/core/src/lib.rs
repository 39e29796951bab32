pub mod common;
pub mod config;
pub mod market;
pub mod sim;
pub mod trade;
