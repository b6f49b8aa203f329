//! Process configuration flags.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Command-line configuration for the gateway process.
#[derive(Debug, Parser)]
#[command(
    name = "lti-gateway",
    about = "OAuth-signed launch gateway for survey participant sessions"
)]
pub struct Args {
    /// Socket address to bind the HTTP server on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Absolute base URL participant redirects are built under.
    #[arg(long, default_value = "http://localhost:8080")]
    pub public_base_url: Url,

    /// Path to the JSON launch policy document.
    #[arg(long, default_value = "policies.json")]
    pub policies: PathBuf,

    /// Print a freshly provisioned consumer key/secret pair and exit.
    #[arg(long)]
    pub provision_consumer: bool,
}
