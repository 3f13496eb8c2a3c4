pub mod bus;

pub use bus::{Bmb, BmbCommand, BmbOpcode, BmbResponse, BusMaster};
