//! In-memory wallet, chain and target-chain doubles for the flow tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{address, Address, Bytes, B256, U256, U64};
use alloy_sol_types::SolCall;
use async_trait::async_trait;

use crate::config::SaleContracts;
use crate::errors::SaleError;
use crate::evm::abi::IERC20;
use crate::evm::receipt::TransactionReceipt;
use crate::evm::{EvmReader, TransactionRequest};
use crate::substrate::{TargetChain, TransferReceipt};
use crate::wallet::{ConnectionKind, Wallet, WalletContext};

pub const TOKEN: Address = address!("337610d27c682e347c9cd60bd4b3b107c9d34ddd");
pub const SALE: Address = address!("1ea5d1c9434b89b03c4aac95dd4c56cd86430385");
pub const BUYER_SS58: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

pub fn contracts() -> SaleContracts {
    SaleContracts {
        token: TOKEN,
        sale: SALE,
        decimals: 18,
        poll_interval: Duration::from_millis(1),
    }
}

struct Pending {
    polls_left: u32,
    success: bool,
}

struct ChainState {
    allowance: U256,
    approve_sets_allowance: bool,
    approve_succeeds: bool,
    order_succeeds: bool,
    rejection: Option<(i64, String)>,
    sent: Vec<TransactionRequest>,
    pending: HashMap<B256, Pending>,
    receipt_polls: usize,
    next_hash: u8,
    disconnects: usize,
}

/// Wallet plus EVM node. Every sent transaction is mined on the next
/// receipt poll unless [`FakeChain::mine_after`] says otherwise.
pub struct FakeChain {
    chain_id: u64,
    accounts: Vec<Address>,
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub const OWNER: Address = address!("00000000000000000000000000000000000000aa");

    pub fn new() -> Self {
        Self {
            chain_id: 56,
            accounts: vec![Self::OWNER],
            state: Mutex::new(ChainState {
                allowance: U256::ZERO,
                approve_sets_allowance: true,
                approve_succeeds: true,
                order_succeeds: true,
                rejection: None,
                sent: Vec::new(),
                pending: HashMap::new(),
                receipt_polls: 0,
                next_hash: 1,
                disconnects: 0,
            }),
        }
    }

    pub fn on_chain(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn without_accounts(mut self) -> Self {
        self.accounts.clear();
        self
    }

    pub fn with_allowance(self, allowance: U256) -> Self {
        self.state.lock().unwrap().allowance = allowance;
        self
    }

    /// Approvals mine successfully but leave the allowance untouched.
    pub fn approvals_not_applied(self) -> Self {
        self.state.lock().unwrap().approve_sets_allowance = false;
        self
    }

    pub fn reverting_approvals(self) -> Self {
        self.state.lock().unwrap().approve_succeeds = false;
        self
    }

    pub fn reverting_orders(self) -> Self {
        self.state.lock().unwrap().order_succeeds = false;
        self
    }

    /// The wallet refuses to sign with the given EIP-1193 error.
    pub fn rejecting(self, code: i64, message: &str) -> Self {
        self.state.lock().unwrap().rejection = Some((code, message.to_string()));
        self
    }

    pub fn mine_after(&self, hash: B256, polls: u32, success: bool) {
        self.state.lock().unwrap().pending.insert(
            hash,
            Pending {
                polls_left: polls,
                success,
            },
        );
    }

    pub fn receipt_polls(&self) -> usize {
        self.state.lock().unwrap().receipt_polls
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn allowance(&self) -> U256 {
        self.state.lock().unwrap().allowance
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    pub fn context(chain: &Arc<FakeChain>) -> WalletContext {
        WalletContext {
            wallet: chain.clone(),
            reader: chain.clone(),
        }
    }
}

#[async_trait]
impl Wallet for FakeChain {
    fn kind(&self) -> ConnectionKind {
        ConnectionKind::Injected
    }

    async fn accounts(&self) -> Result<Vec<Address>, SaleError> {
        Ok(self.accounts.clone())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, SaleError> {
        let mut state = self.state.lock().unwrap();
        if let Some((code, message)) = &state.rejection {
            return Err(SaleError::rpc_transaction(*code, message.clone()));
        }

        let hash = B256::repeat_byte(state.next_hash);
        state.next_hash += 1;

        let success = if tx.data.starts_with(&IERC20::approveCall::SELECTOR) {
            let call = IERC20::approveCall::abi_decode(&tx.data, true).unwrap();
            if state.approve_succeeds && state.approve_sets_allowance {
                state.allowance = call.value;
            }
            state.approve_succeeds
        } else {
            state.order_succeeds
        };
        state.pending.insert(
            hash,
            Pending {
                polls_left: 0,
                success,
            },
        );
        state.sent.push(tx);
        Ok(hash)
    }

    async fn disconnect(&self) -> Result<(), SaleError> {
        self.state.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

#[async_trait]
impl EvmReader for FakeChain {
    async fn chain_id(&self) -> Result<u64, SaleError> {
        Ok(self.chain_id)
    }

    async fn call(&self, _to: Address, data: Bytes) -> Result<Bytes, SaleError> {
        assert!(data.starts_with(&IERC20::allowanceCall::SELECTOR));
        let allowance = self.state.lock().unwrap().allowance;
        Ok(Bytes::from(allowance.to_be_bytes::<32>().to_vec()))
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, SaleError> {
        let mut state = self.state.lock().unwrap();
        state.receipt_polls += 1;
        let Some(pending) = state.pending.get_mut(&hash) else {
            return Ok(None);
        };
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return Ok(None);
        }
        Ok(Some(TransactionReceipt {
            transaction_hash: hash,
            status: Some(if pending.success { U64::from(1) } else { U64::ZERO }),
            block_number: Some(U64::from(100)),
        }))
    }
}

/// Records transfers instead of talking to a node.
#[derive(Default)]
pub struct FakeTarget {
    transfers: Mutex<Vec<(String, u128)>>,
    fail_with: Option<String>,
}

impl FakeTarget {
    pub fn failing(message: &str) -> Self {
        Self {
            transfers: Mutex::default(),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn transfers(&self) -> Vec<(String, u128)> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetChain for FakeTarget {
    async fn transfer(&self, dest: &str, amount: u128) -> Result<TransferReceipt, SaleError> {
        if let Some(message) = &self.fail_with {
            return Err(SaleError::transaction(message.clone()));
        }
        let mut transfers = self.transfers.lock().unwrap();
        transfers.push((dest.to_string(), amount));
        Ok(TransferReceipt {
            extrinsic_hash: format!("0x{:064x}", transfers.len()),
            nonce: transfers.len() as u64 - 1,
            signer: "transfer-account".to_string(),
            dest: dest.to_string(),
            amount,
        })
    }
}
