use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
pub struct Args {
    /// Whether clients connect over https.
    /// If so, the session cookie is sent as a secure cookie.
    #[arg(short, long)]
    secure: bool,

    /// The address to listen on. By default only the IPv4 loopback.
    #[arg(short, long)]
    address: Option<String>,

    /// The port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Directory holding users.json and verbs.json.
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory of pages, templates and assets.
    #[arg(long, default_value = "public")]
    public_dir: PathBuf,

    /// Seconds between saves of any changed store.
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    save_interval: u64,
}

impl Args {
    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.address
            .as_deref()
            .unwrap_or("127.0.0.1")
            .parse()
            .map(|addr: IpAddr| (addr, self.port).into())
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn verbs_path(&self) -> PathBuf {
        self.data_dir.join("verbs.json")
    }

    pub fn public_dir(&self) -> &PathBuf {
        &self.public_dir
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval)
    }
}
