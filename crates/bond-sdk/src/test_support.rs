//! Scripted in-memory chain shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    error::{Error, Result, RpcFailure},
    transport::{EvmCall, EvmReceiptTransport, EvmTransport, EvmViewTransport, TxReceipt},
};

type ViewKey = (Address, Vec<u8>);

/// Answers view calls from canned return data and records every interaction.
///
/// Exact-calldata responses win over selector-wide ones, so a test can pin a
/// specific argument while leaving the rest of a contract generic.
#[derive(Clone)]
pub(crate) struct MockChain {
    views: Arc<Mutex<HashMap<ViewKey, std::result::Result<Vec<u8>, RpcFailure>>>>,
    view_calls: Arc<Mutex<Vec<EvmCall>>>,
    sent: Arc<Mutex<Vec<EvmCall>>>,
    send_failures: Arc<Mutex<VecDeque<RpcFailure>>>,
    receipt_failure: Arc<Mutex<Option<RpcFailure>>>,
    receipts_succeed: Arc<Mutex<bool>>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            views: Arc::default(),
            view_calls: Arc::default(),
            sent: Arc::default(),
            send_failures: Arc::default(),
            receipt_failure: Arc::default(),
            receipts_succeed: Arc::new(Mutex::new(true)),
            journal: Arc::default(),
        }
    }
}

impl MockChain {
    pub(crate) fn on_view<C: SolCall>(&self, to: Address, returns: Vec<u8>) {
        self.views
            .lock()
            .unwrap()
            .insert((to, C::SELECTOR.to_vec()), Ok(returns));
    }

    pub(crate) fn on_view_with_args(&self, to: Address, calldata: Vec<u8>, returns: Vec<u8>) {
        self.views.lock().unwrap().insert((to, calldata), Ok(returns));
    }

    pub(crate) fn fail_view<C: SolCall>(&self, to: Address, failure: RpcFailure) {
        self.views
            .lock()
            .unwrap()
            .insert((to, C::SELECTOR.to_vec()), Err(failure));
    }

    /// The next `send` fails with `failure` instead of returning a hash.
    pub(crate) fn fail_next_send(&self, failure: RpcFailure) {
        self.send_failures.lock().unwrap().push_back(failure);
    }

    pub(crate) fn fail_receipt(&self, failure: RpcFailure) {
        *self.receipt_failure.lock().unwrap() = Some(failure);
    }

    /// Receipts report the transaction as reverted.
    pub(crate) fn revert_receipts(&self) {
        *self.receipts_succeed.lock().unwrap() = false;
    }

    pub(crate) fn view_calls(&self) -> Vec<EvmCall> {
        self.view_calls.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<EvmCall> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn record(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().push(entry.into());
    }

    /// Chain interactions and anything tests [`MockChain::record`]ed, in order.
    pub(crate) fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

impl EvmViewTransport for MockChain {
    fn call_view(&self, call: EvmCall) -> Result<Bytes> {
        self.view_calls.lock().unwrap().push(call.clone());
        let views = self.views.lock().unwrap();
        let exact = views.get(&(call.to, call.data.to_vec()));
        let by_selector = || views.get(&(call.to, call.data[..4].to_vec()));
        match exact.or_else(by_selector) {
            Some(Ok(returns)) => Ok(Bytes::from(returns.clone())),
            Some(Err(failure)) => Err(Error::Rpc(failure.clone())),
            None => Err(Error::Rpc(RpcFailure::new(format!(
                "execution reverted: no stub for 0x{} on {}",
                alloy_primitives::hex::encode(&call.data[..4]),
                call.to
            )))),
        }
    }
}

impl EvmTransport for MockChain {
    fn send(&self, call: EvmCall) -> Result<B256> {
        self.record(format!(
            "send:0x{}",
            alloy_primitives::hex::encode(&call.data[..4])
        ));
        if let Some(failure) = self.send_failures.lock().unwrap().pop_front() {
            return Err(Error::Rpc(failure));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(call);
        Ok(B256::with_last_byte(sent.len() as u8))
    }
}

impl EvmReceiptTransport for MockChain {
    fn wait_for_receipt(&self, tx_hash: B256, _confirmations: u64) -> Result<TxReceipt> {
        self.record("receipt");
        if let Some(failure) = self.receipt_failure.lock().unwrap().clone() {
            return Err(Error::Rpc(failure));
        }
        Ok(TxReceipt {
            tx_hash,
            block_number: Some(1_000),
            success: *self.receipts_succeed.lock().unwrap(),
        })
    }
}

/// ABI encoding of a single `uint256` return.
pub(crate) fn uint(value: U256) -> Vec<u8> {
    words(&[value])
}

pub(crate) fn words(values: &[U256]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|value| value.to_be_bytes::<32>())
        .collect()
}

/// `terms()` return data with the given vesting term and fixed other fields.
pub(crate) fn encode_terms(vesting_term: u64) -> Vec<u8> {
    words(&[
        U256::from(40u64),
        U256::from(vesting_term),
        U256::from(1_000u64),
        U256::from(50u64),
        U256::from(500u64),
        U256::from(1_000_000_000_000u64),
    ])
}
