use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use alloy_primitives::{keccak256, Address, Bytes, B256};
use anyhow::{anyhow, ensure, Context as _, Result};
use bond_sdk::{
    AddressRegistry, AlloyHttpTransport, EvmCall, EvmReceiptTransport, EvmTransport,
    EvmViewTransport, StatusReporter, TxHash, TxReceipt, TxStatus,
};
use clap::Args;
use log::info;

use bond_sdk::Result as SdkResult;

/// Options shared by every subcommand.
pub struct Context {
    pub registry: Option<PathBuf>,
    pub network: u64,
}

impl Context {
    pub fn load_registry(&self) -> Result<AddressRegistry> {
        let path = self
            .registry
            .as_ref()
            .context("--registry is required for this command")?;
        AddressRegistry::load(path).with_context(|| format!("load registry {}", path.display()))
    }
}

#[derive(Clone, Debug, Args)]
pub struct RpcArgs {
    /// EVM JSON-RPC endpoint.
    #[arg(long)]
    pub evm_rpc: Option<String>,
}

impl RpcArgs {
    pub fn read_transport(&self) -> Result<AlloyHttpTransport> {
        let rpc = self.evm_rpc.as_ref().context("--evm-rpc is required")?;
        Ok(AlloyHttpTransport::read_only(rpc)?)
    }
}

#[derive(Clone, Debug, Args)]
pub struct TxArgs {
    /// EVM JSON-RPC endpoint (required unless --dry-run).
    #[arg(long)]
    pub evm_rpc: Option<String>,
    /// Private key for the caller (required unless --dry-run).
    #[arg(long, value_name = "HEX64")]
    pub private_key: Option<String>,
    /// Do not submit transactions, only print calldata/value.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl TxArgs {
    pub fn transport(&self) -> Result<CliTransport> {
        if self.dry_run {
            info!("dry run: transactions are printed, not broadcast");
            return Ok(CliTransport::DryRun(DryRunTransport::default()));
        }
        let rpc = self
            .evm_rpc
            .as_ref()
            .context("--evm-rpc is required unless --dry-run")?;
        let pk = self
            .private_key
            .as_ref()
            .context("--private-key is required unless --dry-run")?;
        Ok(CliTransport::Rpc(AlloyHttpTransport::new(rpc, pk)?))
    }
}

/// Records sends instead of broadcasting them. View calls are answered with
/// a single zero word so pre-flight reads succeed.
#[derive(Clone, Default)]
pub struct DryRunTransport {
    sent: Arc<Mutex<Vec<EvmCall>>>,
}

impl DryRunTransport {
    pub fn calls(&self) -> Vec<EvmCall> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl EvmTransport for DryRunTransport {
    fn send(&self, call: EvmCall) -> SdkResult<B256> {
        let hash = keccak256(&call.data);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(call);
        }
        Ok(hash)
    }
}

impl EvmViewTransport for DryRunTransport {
    fn call_view(&self, call: EvmCall) -> SdkResult<Bytes> {
        println!(
            "dry-run view -> to: {}, data: {} (answered with zero)",
            format_address(call.to),
            format_hex(&call.data)
        );
        Ok(Bytes::from(vec![0u8; 32]))
    }
}

impl EvmReceiptTransport for DryRunTransport {
    fn wait_for_receipt(&self, tx_hash: B256, _confirmations: u64) -> SdkResult<TxReceipt> {
        Ok(TxReceipt {
            tx_hash,
            block_number: None,
            success: true,
        })
    }
}

/// Transport picked from `--dry-run` / `--evm-rpc`.
pub enum CliTransport {
    DryRun(DryRunTransport),
    Rpc(AlloyHttpTransport),
}

impl CliTransport {
    /// Prints what a dry run would have submitted.
    pub fn print_dry_run(&self) {
        if let Self::DryRun(transport) = self {
            for call in transport.calls() {
                println!(
                    "dry-run call -> to: {}, gas_limit: {}, value: {}, data: {}",
                    format_address(call.to),
                    call.gas_limit.unwrap_or(0),
                    call.value,
                    format_hex(&call.data)
                );
            }
        }
    }
}

impl EvmTransport for CliTransport {
    fn send(&self, call: EvmCall) -> SdkResult<B256> {
        match self {
            Self::DryRun(transport) => transport.send(call),
            Self::Rpc(transport) => transport.send(call),
        }
    }
}

impl EvmViewTransport for CliTransport {
    fn call_view(&self, call: EvmCall) -> SdkResult<Bytes> {
        match self {
            Self::DryRun(transport) => transport.call_view(call),
            Self::Rpc(transport) => transport.call_view(call),
        }
    }
}

impl EvmReceiptTransport for CliTransport {
    fn wait_for_receipt(&self, tx_hash: B256, confirmations: u64) -> SdkResult<TxReceipt> {
        match self {
            Self::DryRun(transport) => transport.wait_for_receipt(tx_hash, confirmations),
            Self::Rpc(transport) => transport.wait_for_receipt(tx_hash, confirmations),
        }
    }
}

/// Prints every status transition on stdout.
pub struct ConsoleReporter;

impl StatusReporter for ConsoleReporter {
    fn on_status(&self, status: TxStatus, message: Option<&str>) {
        match message {
            Some(message) => println!("status: {status} ({message})"),
            None => println!("status: {status}"),
        }
    }
}

pub fn parse_address(value: &str) -> Result<Address> {
    let trimmed = value.trim().trim_start_matches("0x");
    let bytes = hex::decode(trimmed).map_err(|e| anyhow!("decode address: {e}"))?;
    ensure!(
        bytes.len() == 20,
        "address must be 20 bytes, got {}",
        bytes.len()
    );
    Ok(Address::from_slice(&bytes))
}

pub fn format_tx_hash(hash: TxHash) -> String {
    format_hex(&hash.bytes())
}

pub fn format_address(address: Address) -> String {
    format_hex(address.as_slice())
}

pub fn format_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
