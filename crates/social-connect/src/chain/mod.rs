//! On-chain [`Ledger`](crate::ledger::Ledger) implementations.

mod celo;

pub use celo::{CeloLedger, CELO_REGISTRY_ADDRESS};
