pub mod config;
pub mod error;
pub mod etvr;
pub mod eye;
pub mod http;
pub mod osc;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use etvr::{Etvr, EtvrStatus};

pub const HTTP_DEFAULT_HOSTNAME: &str = "127.0.0.1";
pub const HTTP_DEFAULT_PORT: u16 = 8000;
