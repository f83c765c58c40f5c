//! Core data model: accounts, keys, actions, transactions, and the RPC
//! response types.

mod account;
mod action;
mod block_reference;
mod exec_error;
mod hash;
mod key;
pub mod nep413;
mod network;
mod rpc;
mod transaction;
mod units;

pub use account::AccountId;
pub use action::{
    AccessKey, AccessKeyPermission, Action, AddKeyAction, CreateAccountAction,
    DecodeError as DelegateDecodeError, DelegateAction, DeleteAccountAction, DeleteKeyAction,
    DeployContractAction, DeployGlobalContractAction, DeterministicAccountStateInit,
    DeterministicAccountStateInitV1, DeterministicStateInitAction, FunctionCallAction,
    FunctionCallPermission, GlobalContractDeployMode, GlobalContractIdentifier, NonDelegateAction,
    SignedDelegateAction, StakeAction, TransferAction, UseGlobalContractAction,
    DELEGATE_ACTION_PREFIX,
};
pub use block_reference::{BlockReference, Finality, TxExecutionStatus};
pub use exec_error::{
    ActionError, ActionErrorKind, ActionsValidationError, CompilationError, FunctionCallError,
    HostError, InvalidAccessKeyError, InvalidTxError, MethodResolveError, ReceiptValidationError,
    TxExecutionError, WasmTrap,
};
pub use hash::CryptoHash;
pub use key::{KeyPair, KeyType, PublicKey, SecretKey, Signature};
pub use network::Network;
pub use rpc::{
    AccessKeyDetails, AccessKeyInfoView, AccessKeyListView, AccessKeyPermissionView, AccessKeyView,
    AccountBalance, AccountView, ActionView, ExecutionOutcome, ExecutionOutcomeWithId,
    ExecutionStatus, FinalExecutionOutcome, FinalExecutionStatus, GasPrice, MerkleDirection,
    MerklePathItem, NodeVersion, StatusResponse, SyncInfo, TransactionView, ViewFunctionResult,
    STORAGE_AMOUNT_PER_BYTE,
};
pub use transaction::{SignedTransaction, Transaction};
pub use units::{Gas, IntoGas, IntoNearToken, NearToken};
