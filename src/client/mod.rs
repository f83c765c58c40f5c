//! Client-side machinery: RPC transport, key storage, nonce management,
//! transaction building, and the wallet adapter seam.

mod client;
mod keystore;
mod nonce_manager;
mod query;
mod rpc;
mod signer;
mod transaction;
mod wallet;

pub use client::{Client, ClientBuilder};
pub use keystore::{InMemoryKeyStore, KeyStore};
pub use nonce_manager::NonceManager;
pub use query::{AccessKeysQuery, AccountExistsQuery, AccountQuery, BalanceQuery, ViewCall};
pub use rpc::{is_retryable_status, NetworkConfig, RetryConfig, RpcClient, LOCALNET, MAINNET, TESTNET};
pub use signer::{FnSigner, SignFuture, Signer};
pub use transaction::{
    CallBuilder, DelegateOptions, DelegateResult, TransactionBuilder, TransactionSend,
};
pub use wallet::{
    action_to_wallet_json, wallet_transaction_to_json, DelegateActionRequest, SignDelegateRequest,
    Wallet, WalletAccount, WalletSignedDelegate, WalletTransaction,
};
