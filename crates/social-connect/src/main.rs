//! Social Connect - Entry point.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use odis_client::{NoBlinding, OdisClient};
use social_connect::{
    AttestationRegistry, CeloLedger, Config, Identifier, OdisIdentifierService, QuotaOutcome,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Link phone numbers to Celo accounts as an attestation issuer.
#[derive(Parser, Debug)]
#[command(name = "social-connect", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register an attestation from a phone number to an account
    Register {
        /// Phone number in E.164 format
        phone_number: String,
        /// Account to link
        address: String,
        /// Revoke any existing mapping from this issuer first
        #[arg(long)]
        force: bool,
    },
    /// List the accounts this issuer linked to a phone number
    Lookup {
        /// Phone number in E.164 format
        phone_number: String,
    },
    /// Revoke the mapping from a phone number to an account
    Revoke {
        /// Phone number in E.164 format
        phone_number: String,
        /// Linked account
        address: String,
    },
    /// Show the issuer's remaining ODIS quota
    Quota {
        /// Buy more quota if none is left
        #[arg(long)]
        top_up: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.log.level);

    let issuer = Arc::new(config.issuer_context()?);
    info!("Issuer: {}", issuer.address());

    let ledger = CeloLedger::connect(
        &config.celo.rpc_url,
        config.registry_address()?,
        &issuer.issuer,
    )
    .context("Failed to create Celo ledger")?;

    let odis = OdisClient::new(config.service_context(), config.odis.timeout)
        .context("Failed to create ODIS client")?;
    warn!("Using unblinded ODIS queries");
    let service = OdisIdentifierService::new(odis, Arc::new(NoBlinding));

    let registry = AttestationRegistry::new(Arc::new(ledger), Arc::new(service), issuer.clone())
        .with_top_up_unit(config.top_up_unit());

    match cli.command {
        Command::Register {
            phone_number,
            address,
            force,
        } => {
            let target = parse_address(&address)?;
            let receipt = registry
                .register(&Identifier::phone_number(phone_number.clone()), target, force)
                .await?;
            println!(
                "Linked {} to {} (tx {})",
                phone_number, target, receipt.tx_hash
            );
        }
        Command::Lookup { phone_number } => {
            let lookup = registry
                .lookup(&Identifier::phone_number(phone_number.clone()))
                .await?;
            if lookup.is_empty() {
                println!("No accounts linked to {}", phone_number);
            }
            for mapping in lookup.mappings() {
                println!(
                    "{} is linked to {} (issuer {})",
                    phone_number, mapping.account, mapping.signer
                );
            }
        }
        Command::Revoke {
            phone_number,
            address,
        } => {
            let account = parse_address(&address)?;
            let obfuscated = registry
                .resolver()
                .resolve(&Identifier::phone_number(phone_number.clone()))
                .await?;
            let receipt = registry
                .revoke(obfuscated, registry.issuer(), account)
                .await?;
            println!(
                "Unlinked {} from {} (tx {})",
                phone_number, account, receipt.tx_hash
            );
        }
        Command::Quota { top_up: false } => {
            let status = registry.quota().quota_status().await?;
            println!(
                "Remaining ODIS quota: {} ({} of {} used)",
                status.remaining_quota, status.performed_query_count, status.total_quota
            );
        }
        Command::Quota { top_up: true } => match registry.quota().ensure_quota().await? {
            QuotaOutcome::Sufficient { remaining_quota } => {
                println!("Remaining ODIS quota: {}", remaining_quota);
            }
            QuotaOutcome::ToppedUp {
                remaining_quota, ..
            } => match remaining_quota {
                Some(remaining) => println!("Topped up, remaining ODIS quota: {}", remaining),
                None => println!("Topped up, remaining ODIS quota unknown"),
            },
        },
    }

    Ok(())
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .trim()
        .parse()
        .with_context(|| format!("Invalid address: {}", address))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
