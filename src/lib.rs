//! # near-quill
//!
//! A NEAR Protocol client: construct, sign and submit transactions, read
//! account and contract state over JSON-RPC, and integrate external wallet
//! signers.
//!
//! ## Quick start
//!
//! Read-only operations need no credentials:
//!
//! ```rust,no_run
//! use near_quill::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::testnet().build()?;
//!
//!     let balance = client.balance("alice.testnet").await?;
//!     println!("Available: {}", balance.available);
//!
//!     let count: Option<u64> = client.view("counter.testnet", "get_count").await?;
//!     println!("Count: {count:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! Writes need a signing key:
//!
//! ```rust,no_run
//! use near_quill::*;
//!
//! # async fn example() -> Result<(), Error> {
//! let client = Client::testnet()
//!     .credentials("ed25519:YOUR_SECRET_KEY", "you.testnet")?
//!     .build()?;
//!
//! client.transfer("friend.testnet", "1 NEAR").await?;
//!
//! client
//!     .call("counter.testnet", "increment")
//!     .args(serde_json::json!({ "by": 1 }))
//!     .gas("30 Tgas")
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Design
//!
//! - **Explicit units** — amounts carry a unit (`"1 NEAR"`, `"1 yocto"`,
//!   or a `u128` of yoctoNEAR); bare numbers are rejected.
//! - **One receiver per transaction** — [`Client::transaction`] fixes the
//!   receiver; chained actions execute against it atomically.
//! - **Replay-safe nonces** — a single-flight [`NonceManager`] hands out
//!   contiguous nonces per access key, so concurrent sends never collide;
//!   an observed collision triggers an automatic refetch and re-sign.
//! - **Wallet seam** — configure a [`Wallet`] and writes route through it
//!   (including NEP-366 delegate actions); local key material is never
//!   touched on that path.
//!
//! ## Meta-transactions
//!
//! Build a delegate action a relayer can submit on the user's behalf:
//!
//! ```rust,no_run
//! use near_quill::*;
//!
//! # async fn example(client: Client) -> Result<(), Error> {
//! let result = client
//!     .transaction("contract.testnet")
//!     .call("add_message")
//!     .args(serde_json::json!({ "text": "hello" }))
//!     .delegate(Default::default())
//!     .await?;
//!
//! // Ship `result.payload` (base64) to the relayer.
//! # Ok(())
//! # }
//! ```
//!
//! The relayer wraps it into its own transaction:
//!
//! ```rust,no_run
//! use near_quill::*;
//!
//! # async fn example(relayer: Client, payload: &str) -> Result<(), Error> {
//! let signed = SignedDelegateAction::from_base64(payload)?;
//! relayer
//!     .transaction(signed.sender_id().as_str())
//!     .signed_delegate_action(signed)
//!     .send()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Every operation returns `Result<T, Error>`; RPC failures are classified
//! into [`RpcError`] kinds with a [`is_retryable`](RpcError::is_retryable)
//! predicate driving the transport retry loop.

pub mod client;
pub mod error;
pub mod types;

pub use error::{
    Error, KeyStoreError, ParseAccountIdError, ParseAmountError, ParseGasError, ParseHashError,
    ParseKeyError, RpcError, SignerError, WalletError,
};
pub use types::nep413;
pub use types::*;

pub use client::{
    AccessKeysQuery, AccountExistsQuery, AccountQuery, BalanceQuery, CallBuilder, Client,
    ClientBuilder, DelegateOptions, DelegateResult, FnSigner, InMemoryKeyStore, KeyStore,
    NonceManager, RetryConfig, RpcClient, Signer, TransactionBuilder, TransactionSend, ViewCall,
    Wallet, WalletAccount, WalletSignedDelegate, WalletTransaction,
};
