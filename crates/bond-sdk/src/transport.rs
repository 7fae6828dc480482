//! Transport abstractions for EVM RPC interactions.

#[cfg(not(target_arch = "wasm32"))]
use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{hex, Address, Bytes, B256, U256};
#[cfg(not(target_arch = "wasm32"))]
use alloy_provider::{Provider, ProviderBuilder};
#[cfg(not(target_arch = "wasm32"))]
use alloy_rpc_types::eth::transaction::{TransactionInput, TransactionRequest};
#[cfg(not(target_arch = "wasm32"))]
use alloy_signer::Signer;
#[cfg(not(target_arch = "wasm32"))]
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Revert, SolError};
#[cfg(not(target_arch = "wasm32"))]
use log::{debug, info};
use serde_json::Value;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;
#[cfg(not(target_arch = "wasm32"))]
use tokio::runtime::Runtime;

use crate::error::{Result, RpcFailure};

/// Encoded EVM call that can be dispatched via a transport.
#[derive(Clone, Debug)]
pub struct EvmCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: Option<u64>,
}

impl EvmCall {
    pub fn new(to: Address, data: impl Into<Bytes>, value: U256) -> Self {
        Self {
            to,
            data: data.into(),
            value,
            gas_limit: None,
        }
    }

    pub fn with_gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(gas);
        self
    }
}

/// Outcome of a mined transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// `false` when the transaction was included but reverted.
    pub success: bool,
}

/// Abstraction over signing and sending EVM transactions.
///
/// Implementations surface signer and node failures as [`crate::Error::Rpc`]
/// so the orchestrator can tell a user rejection apart from a revert.
pub trait EvmTransport: Send + Sync {
    fn send(&self, call: EvmCall) -> Result<B256>;
}

/// Abstraction over read-only `eth_call` style interactions.
pub trait EvmViewTransport: Send + Sync {
    fn call_view(&self, call: EvmCall) -> Result<Bytes>;
}

/// Abstraction over waiting for a sent transaction to be mined.
pub trait EvmReceiptTransport: Send + Sync {
    /// Blocks until `tx_hash` has at least `confirmations` confirmations.
    fn wait_for_receipt(&self, tx_hash: B256, confirmations: u64) -> Result<TxReceipt>;
}

impl<T: EvmTransport + ?Sized> EvmTransport for &T {
    fn send(&self, call: EvmCall) -> Result<B256> {
        (**self).send(call)
    }
}

impl<T: EvmViewTransport + ?Sized> EvmViewTransport for &T {
    fn call_view(&self, call: EvmCall) -> Result<Bytes> {
        (**self).call_view(call)
    }
}

impl<T: EvmReceiptTransport + ?Sized> EvmReceiptTransport for &T {
    fn wait_for_receipt(&self, tx_hash: B256, confirmations: u64) -> Result<TxReceipt> {
        (**self).wait_for_receipt(tx_hash, confirmations)
    }
}

/// Builds an [`RpcFailure`] from the pieces of a JSON-RPC error response.
///
/// `data` is the raw JSON of the `data` member. Nodes put either hex revert
/// data there or a nested `{ "message": .., "data": .. }` object.
pub fn rpc_failure_from_parts(code: Option<i64>, message: &str, data: Option<&str>) -> RpcFailure {
    let mut failure = RpcFailure::new(message);
    failure.code = code;
    let Some(value) = data.and_then(|raw| serde_json::from_str::<Value>(raw).ok()) else {
        return failure;
    };
    match &value {
        Value::String(revert_data) => {
            failure.revert_reason = decode_revert_data(revert_data);
        }
        Value::Object(fields) => {
            if let Some(nested) = fields.get("message").and_then(Value::as_str) {
                failure.data_message = Some(nested.to_string());
            }
            if let Some(revert_data) = fields.get("data").and_then(Value::as_str) {
                failure.revert_reason = decode_revert_data(revert_data);
            }
        }
        _ => {}
    }
    failure
}

/// Decodes `Error(string)` revert data into its reason.
pub fn decode_revert_data(revert_data: &str) -> Option<String> {
    let bytes = hex::decode(revert_data.trim()).ok()?;
    Revert::abi_decode(&bytes, true)
        .ok()
        .map(|revert| revert.reason)
}

#[cfg(not(target_arch = "wasm32"))]
fn transport_failure<E: std::fmt::Display>(context: &str, err: E) -> RpcFailure {
    RpcFailure::new(format!("{context}: {err}"))
}

#[cfg(not(target_arch = "wasm32"))]
/// JSON-RPC transport backed by Alloy's provider stack and a local private key signer.
pub struct AlloyHttpTransport {
    rpc_url: reqwest::Url,
    wallet: Option<PrivateKeySigner>,
    runtime: Arc<Runtime>,
    chain_id: u64,
    default_gas: u64,
    poll_interval: Duration,
}

#[cfg(not(target_arch = "wasm32"))]
impl AlloyHttpTransport {
    /// Builds a new transport targeting `rpc_url` and signing with `private_key_hex`.
    pub fn new(rpc_url: &str, private_key_hex: &str) -> Result<Self> {
        let mut transport = Self::read_only(rpc_url)?;
        let mut wallet: PrivateKeySigner = private_key_hex
            .parse()
            .map_err(|err| transport_failure("transport init (private key)", err))?;
        wallet.set_chain_id(Some(transport.chain_id));
        info!(
            "transport ready: chain_id={} signer={}",
            transport.chain_id,
            wallet.address()
        );
        transport.wallet = Some(wallet);
        Ok(transport)
    }

    /// Builds a transport that can only serve view calls and receipts.
    pub fn read_only(rpc_url: &str) -> Result<Self> {
        let runtime =
            Runtime::new().map_err(|err| transport_failure("transport init (runtime)", err))?;
        let url = reqwest::Url::parse(rpc_url)
            .map_err(|err| transport_failure("transport init (url parse)", err))?;

        let base_provider = ProviderBuilder::new().on_http(url.clone());
        let chain_id = runtime
            .block_on(base_provider.get_chain_id())
            .map_err(|err| transport_failure("transport init (chain_id)", err))?;
        debug!("connected to {url}: chain_id={chain_id}");

        Ok(Self {
            rpc_url: url,
            wallet: None,
            runtime: Arc::new(runtime),
            chain_id,
            default_gas: 500_000,
            poll_interval: Duration::from_secs(2),
        })
    }

    /// Overrides how often the receipt wait polls the node.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(100));
        self
    }

    /// Chain id reported by the node at construction time.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|wallet| wallet.address())
    }

    fn build_transaction(&self, call: EvmCall) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .gas_limit(call.gas_limit.unwrap_or(self.default_gas))
            .input(TransactionInput::from(call.data.clone()))
            .value(call.value);
        tx.from = self.signer_address();
        tx.to = Some(alloy_primitives::TxKind::Call(call.to));
        tx
    }
}

#[cfg(not(target_arch = "wasm32"))]
macro_rules! node_failure {
    ($err:expr) => {{
        let err = $err;
        match err.as_error_resp() {
            Some(payload) => rpc_failure_from_parts(
                Some(payload.code),
                &payload.message.to_string(),
                payload.data.as_ref().map(|raw| raw.get()),
            ),
            None => RpcFailure::new(err.to_string()),
        }
    }};
}

#[cfg(not(target_arch = "wasm32"))]
impl EvmTransport for AlloyHttpTransport {
    fn send(&self, call: EvmCall) -> Result<B256> {
        let wallet = self
            .wallet
            .clone()
            .ok_or_else(|| RpcFailure::new("transport has no signer"))?;
        let tx = self.build_transaction(call);
        let rpc_url = self.rpc_url.clone();
        let fut = async move {
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(EthereumWallet::new(wallet))
                .on_http(rpc_url);
            provider.send_transaction(tx).await
        };
        let pending = self
            .runtime
            .block_on(fut)
            .map_err(|err| node_failure!(err))?;
        debug!("transaction sent: {}", pending.tx_hash());
        Ok(*pending.tx_hash())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EvmViewTransport for AlloyHttpTransport {
    fn call_view(&self, call: EvmCall) -> Result<Bytes> {
        let req = self.build_transaction(call);
        let rpc_url = self.rpc_url.clone();
        let fut = async move {
            let provider = ProviderBuilder::new().on_http(rpc_url);
            provider.call(&req).await
        };
        self.runtime
            .block_on(fut)
            .map_err(|err| node_failure!(err).into())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EvmReceiptTransport for AlloyHttpTransport {
    fn wait_for_receipt(&self, tx_hash: B256, confirmations: u64) -> Result<TxReceipt> {
        let rpc_url = self.rpc_url.clone();
        let poll = self.poll_interval;
        let required = confirmations.max(1);
        let fut = async move {
            let provider = ProviderBuilder::new().on_http(rpc_url);
            loop {
                let receipt = provider
                    .get_transaction_receipt(tx_hash)
                    .await
                    .map_err(|err| node_failure!(err))?;
                if let Some(receipt) = receipt {
                    let mined_at = ReceiptResponse::block_number(&receipt);
                    let head = provider
                        .get_block_number()
                        .await
                        .map_err(|err| node_failure!(err))?;
                    let confirmed = match mined_at {
                        Some(block) => head.saturating_sub(block) + 1 >= required,
                        None => false,
                    };
                    if confirmed {
                        return Ok::<_, RpcFailure>(TxReceipt {
                            tx_hash,
                            block_number: mined_at,
                            success: ReceiptResponse::status(&receipt),
                        });
                    }
                }
                tokio::time::sleep(poll).await;
            }
        };
        let receipt = self.runtime.block_on(fut)?;
        debug!(
            "receipt {}: block={:?} success={}",
            receipt.tx_hash, receipt.block_number, receipt.success
        );
        Ok(receipt)
    }
}
