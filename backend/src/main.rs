//! Gateway entry-point: loads launch policies, wires the embedded
//! participant store, and serves the launch endpoint.

use actix_web::{HttpServer, web};
use clap::Parser as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use lti_gateway::domain::{Consumer, OsRngTokenGenerator};
use lti_gateway::inbound::http::health::HealthState;
use lti_gateway::outbound::settings::JsonPolicyStore;
use lti_gateway::server::{self, config::Args};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = Args::parse();

    if args.provision_consumer {
        let consumer = Consumer::provision(&OsRngTokenGenerator);
        println!("key:    {}", consumer.key());
        println!("secret: {}", consumer.secret());
        return Ok(());
    }

    let policies = JsonPolicyStore::from_path(&args.policies)
        .map_err(|e| std::io::Error::other(format!("failed to load launch policies: {e}")))?;
    info!(surveys = policies.len(), "launch policies loaded");

    let state = server::build_state(policies, args.public_base_url.clone())
        .map_err(|e| std::io::Error::other(format!("failed to prepare participant store: {e}")))?;

    let health_state = web::Data::new(HealthState::new());
    // Clone for the server factory so the readiness probe stays accessible.
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        server::build_app(state.clone(), server_health_state.clone())
    })
    .bind(args.bind)?;

    health_state.mark_ready();
    info!(bind = %args.bind, "lti gateway listening");
    server.run().await
}
