//! Injective proposer - one-shot spot market launch proposal submitter
//!
//! Resolves a network profile, connects to the node, unlocks a signing key,
//! builds a spot market launch proposal and broadcasts it, then waits for
//! inclusion and reports the gas fee paid.

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod chain;
mod config;
mod error;
mod network;
mod proposal;
mod proto;
mod tx;
mod wallet;

use chain::ChainTransport;
use config::Settings;
use error::SubmitterResult;
use network::NetworkProfile;
use tx::TransactionSubmitter;
use wallet::SigningIdentity;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Injective proposer v{}", env!("CARGO_PKG_VERSION"));

    tokio::select! {
        result = run() => {
            if let Err(ref e) = result {
                if e.is_fatal() {
                    error!("Fatal {} error, nothing was submitted: {}", e.stage(), e);
                } else {
                    error!("{} stage failed: {}", e.stage(), e);
                }
            }
            result?;
        }
        _ = shutdown_signal() => {
            anyhow::bail!("Interrupted before the submission completed");
        }
    }

    Ok(())
}

/// configure -> connect -> identify -> construct -> submit -> wait -> query -> report
async fn run() -> SubmitterResult<()> {
    let settings = Settings::load()?;

    submit_proposal(&settings, |profile| async move {
        let connection = chain::connect(&profile).await?;
        info!(
            "Submitting through {} on {}",
            connection.endpoint(),
            connection.chain_id()
        );
        Ok(Arc::new(connection) as Arc<dyn ChainTransport>)
    })
    .await
}

/// Drive one submission, stopping at the first failing stage
///
/// `connect` opens the node connection for the resolved profile.
async fn submit_proposal<C, F>(settings: &Settings, connect: C) -> SubmitterResult<()>
where
    C: FnOnce(NetworkProfile) -> F,
    F: Future<Output = SubmitterResult<Arc<dyn ChainTransport>>>,
{
    let profile = network::load_network_profile(&settings.network, &settings.networks)?;
    info!(
        "Using network {} (chain {}, gRPC {})",
        profile.name, profile.chain_id, profile.grpc_endpoint
    );

    let transport = connect(profile.clone()).await?;

    let identity = match settings.keyring.private_key_hex {
        Some(ref key) => SigningIdentity::from_private_key_hex(key)?,
        None => wallet::resolve_identity(
            &settings.keyring_dir(),
            &settings.keyring.backend,
            &settings.keyring.account,
            &settings.keyring.passphrase,
        )?,
    };
    info!(
        "Signing as {} ({}, {:?})",
        identity.name(),
        identity.address(),
        identity.eth_address()
    );

    let message = proposal::build_proposal(&settings.proposal)?;

    let mut submitter = TransactionSubmitter::new(
        transport,
        &profile,
        &settings.gas,
        settings.broadcast.clone(),
        settings.confirmation.clone(),
    );

    let handle = submitter
        .submit(&identity, &message, &settings.proposal.deposit)
        .await?;
    if let Some(gas_used) = handle.simulated_gas {
        println!("---Simulation Response---");
        println!("gas used: {}", gas_used);
    }
    println!("---Transaction Response---");
    println!("tx hash: {} ({} broadcast)", handle.tx_hash, handle.mode);
    println!("gas wanted: {}", handle.gas_wanted);
    println!("gas fee: {}", handle.fee);

    if let Some(pending) = submitter.in_flight() {
        info!("Waiting for {} to be included", pending);
    }
    let record = submitter.wait_for_inclusion(&handle).await?;
    println!("included at height: {} (code {})", record.height, record.code);
    println!("gas wanted: {}, gas used: {}", record.gas_wanted, record.gas_used);

    let fee = submitter.query_fee(&handle).await?;
    println!("gas fee paid: {}", fee);

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,injective_proposer=debug,hyper=warn,reqwest=warn")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
