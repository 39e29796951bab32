pub mod clock;
pub mod generator;
pub mod session;
