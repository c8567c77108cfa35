use tracker_core::config::CONFIG_FILE_NAME;
use tracker_core::{HTTP_DEFAULT_HOSTNAME, HTTP_DEFAULT_PORT};

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(name = "etvr")]
#[command(about = "Eye tracking backend: OSC bridge and HTTP control surface")]
pub struct Cli {
    /// Config file, created with defaults if missing.
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Address the HTTP control surface listens on.
    #[arg(long, default_value = HTTP_DEFAULT_HOSTNAME)]
    pub bind: IpAddr,

    #[arg(long, default_value_t = HTTP_DEFAULT_PORT)]
    pub port: u16,

    /// Directory for `etvr.log`.
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
}

impl Cli {
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
