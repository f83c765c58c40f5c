//! Typed execution failures, mirroring the JSON the node returns inside
//! `ExecutionStatus::Failure`. Variant names match the wire format.

use serde::Deserialize;

use super::{AccountId, Gas, NearToken, PublicKey};

/// Failure of a transaction or receipt.
#[derive(Debug, Clone, Deserialize)]
pub enum TxExecutionError {
    /// An action failed during execution.
    ActionError(ActionError),
    /// The transaction was rejected during validation.
    InvalidTxError(InvalidTxError),
}

impl TxExecutionError {
    /// The function-call failure nested in this error, if any.
    pub fn function_call_error(&self) -> Option<&FunctionCallError> {
        match self {
            TxExecutionError::ActionError(ActionError {
                kind: ActionErrorKind::FunctionCallError(e),
                ..
            }) => Some(e),
            _ => None,
        }
    }

    /// The nonce pair from an `InvalidNonce` validation failure, if any.
    pub fn invalid_nonce(&self) -> Option<(u64, u64)> {
        match self {
            TxExecutionError::InvalidTxError(InvalidTxError::InvalidNonce {
                tx_nonce,
                ak_nonce,
            }) => Some((*tx_nonce, *ak_nonce)),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActionError(e) => write!(f, "ActionError: {e}"),
            Self::InvalidTxError(e) => write!(f, "InvalidTxError: {e}"),
        }
    }
}

impl std::error::Error for TxExecutionError {}

/// An error during action execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionError {
    /// Index of the failed action in the transaction, when defined.
    #[serde(default)]
    pub index: Option<u64>,
    pub kind: ActionErrorKind,
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(i) => write!(f, "action #{i}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Kind of action failure.
#[derive(Debug, Clone, Deserialize)]
pub enum ActionErrorKind {
    AccountAlreadyExists {
        account_id: AccountId,
    },
    AccountDoesNotExist {
        account_id: AccountId,
    },
    CreateAccountOnlyByRegistrar {
        account_id: AccountId,
        predecessor_id: AccountId,
        registrar_account_id: AccountId,
    },
    CreateAccountNotAllowed {
        account_id: AccountId,
        predecessor_id: AccountId,
    },
    ActorNoPermission {
        account_id: AccountId,
        actor_id: AccountId,
    },
    DeleteKeyDoesNotExist {
        account_id: AccountId,
        public_key: PublicKey,
    },
    AddKeyAlreadyExists {
        account_id: AccountId,
        public_key: PublicKey,
    },
    DeleteAccountStaking {
        account_id: AccountId,
    },
    LackBalanceForState {
        account_id: AccountId,
        amount: NearToken,
    },
    TriesToUnstake {
        account_id: AccountId,
    },
    TriesToStake {
        account_id: AccountId,
        balance: NearToken,
        locked: NearToken,
        stake: NearToken,
    },
    InsufficientStake {
        account_id: AccountId,
        minimum_stake: NearToken,
        stake: NearToken,
    },
    FunctionCallError(FunctionCallError),
    NewReceiptValidationError(ReceiptValidationError),
    OnlyImplicitAccountCreationAllowed {
        account_id: AccountId,
    },
    DeleteAccountWithLargeState {
        account_id: AccountId,
    },
    DelegateActionInvalidSignature,
    DelegateActionSenderDoesNotMatchTxReceiver {
        receiver_id: AccountId,
        sender_id: AccountId,
    },
    DelegateActionExpired,
    DelegateActionAccessKeyError(InvalidAccessKeyError),
    DelegateActionInvalidNonce {
        ak_nonce: u64,
        delegate_nonce: u64,
    },
    DelegateActionNonceTooLarge {
        delegate_nonce: u64,
        upper_bound: u64,
    },
    GlobalContractDoesNotExist {
        identifier: serde_json::Value,
    },
}

impl std::fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountAlreadyExists { account_id } => {
                write!(f, "account {account_id} already exists")
            }
            Self::AccountDoesNotExist { account_id } => {
                write!(f, "account {account_id} does not exist")
            }
            Self::LackBalanceForState { account_id, amount } => {
                write!(f, "account {account_id} lacks {amount} for state")
            }
            Self::FunctionCallError(e) => write!(f, "{e}"),
            Self::DelegateActionExpired => write!(f, "delegate action expired"),
            Self::DelegateActionInvalidSignature => write!(f, "delegate action signature invalid"),
            _ => write!(f, "{self:?}"),
        }
    }
}

/// Rejection during transaction validation, before execution.
#[derive(Debug, Clone, Deserialize)]
pub enum InvalidTxError {
    InvalidAccessKeyError(InvalidAccessKeyError),
    InvalidSignerId {
        signer_id: String,
    },
    SignerDoesNotExist {
        signer_id: AccountId,
    },
    InvalidNonce {
        ak_nonce: u64,
        tx_nonce: u64,
    },
    NonceTooLarge {
        tx_nonce: u64,
        upper_bound: u64,
    },
    InvalidReceiverId {
        receiver_id: String,
    },
    InvalidSignature,
    NotEnoughBalance {
        balance: NearToken,
        cost: NearToken,
        signer_id: AccountId,
    },
    LackBalanceForState {
        amount: NearToken,
        signer_id: AccountId,
    },
    CostOverflow,
    InvalidChain,
    Expired,
    ActionsValidation(ActionsValidationError),
    TransactionSizeExceeded {
        limit: u64,
        size: u64,
    },
    InvalidTransactionVersion,
    StorageError(serde_json::Value),
    ShardCongested {
        congestion_level: f64,
        shard_id: u32,
    },
    ShardStuck {
        missed_chunks: u64,
        shard_id: u32,
    },
}

impl std::fmt::Display for InvalidTxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid signature"),
            Self::InvalidNonce { ak_nonce, tx_nonce } => write!(
                f,
                "invalid nonce: tx nonce {tx_nonce}, access key nonce {ak_nonce}"
            ),
            Self::NotEnoughBalance {
                signer_id, cost, ..
            } => write!(f, "{signer_id} does not have enough balance to cover {cost}"),
            Self::Expired => write!(f, "transaction has expired"),
            Self::ShardCongested { shard_id, .. } => write!(f, "shard {shard_id} is congested"),
            Self::ShardStuck { shard_id, .. } => write!(f, "shard {shard_id} is stuck"),
            _ => write!(f, "{self:?}"),
        }
    }
}

/// Access key validation failure.
#[derive(Debug, Clone, Deserialize)]
pub enum InvalidAccessKeyError {
    AccessKeyNotFound {
        account_id: AccountId,
        public_key: PublicKey,
    },
    ReceiverMismatch {
        ak_receiver: String,
        tx_receiver: AccountId,
    },
    MethodNameMismatch {
        method_name: String,
    },
    RequiresFullAccess,
    NotEnoughAllowance {
        account_id: AccountId,
        allowance: NearToken,
        cost: NearToken,
        public_key: PublicKey,
    },
    DepositWithFunctionCall,
}

/// Failure inside a contract function call.
#[derive(Debug, Clone, Deserialize)]
pub enum FunctionCallError {
    WasmUnknownError,
    CompilationError(CompilationError),
    LinkError { msg: String },
    MethodResolveError(MethodResolveError),
    WasmTrap(WasmTrap),
    HostError(HostError),
    /// Contract panic or other guest-side execution failure.
    ExecutionError(String),
}

impl FunctionCallError {
    /// The panic / error message a caller should see.
    pub fn panic_message(&self) -> Option<String> {
        match self {
            Self::ExecutionError(msg) => Some(msg.clone()),
            Self::HostError(HostError::GuestPanic { panic_msg }) => Some(panic_msg.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Display for FunctionCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExecutionError(msg) => write!(f, "execution error: {msg}"),
            Self::HostError(e) => write!(f, "host error: {e:?}"),
            Self::WasmTrap(e) => write!(f, "wasm trap: {e:?}"),
            Self::CompilationError(e) => write!(f, "compilation error: {e:?}"),
            Self::MethodResolveError(e) => write!(f, "method resolve error: {e:?}"),
            Self::LinkError { msg } => write!(f, "link error: {msg}"),
            Self::WasmUnknownError => write!(f, "unknown wasm error"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub enum CompilationError {
    CodeDoesNotExist { account_id: AccountId },
    PrepareError(serde_json::Value),
    WasmerCompileError { msg: String },
}

#[derive(Debug, Clone, Deserialize)]
pub enum MethodResolveError {
    MethodEmptyName,
    MethodNotFound,
    MethodInvalidSignature,
}

#[derive(Debug, Clone, Deserialize)]
pub enum WasmTrap {
    Unreachable,
    IncorrectCallIndirectSignature,
    MemoryOutOfBounds,
    #[serde(rename = "CallIndirectOOB")]
    CallIndirectOob,
    IllegalArithmetic,
    MisalignedAtomicAccess,
    IndirectCallToNull,
    StackOverflow,
    GenericTrap,
}

/// Host-function failure. The variant set follows the node's VM error
/// surface; fields are kept only where callers read them.
#[derive(Debug, Clone, Deserialize)]
pub enum HostError {
    #[serde(rename = "BadUTF16")]
    BadUtf16,
    #[serde(rename = "BadUTF8")]
    BadUtf8,
    GasExceeded,
    GasLimitExceeded,
    BalanceExceeded,
    EmptyMethodName,
    GuestPanic { panic_msg: String },
    IntegerOverflow,
    InvalidPromiseIndex { promise_idx: u64 },
    CannotAppendActionToJointPromise,
    CannotReturnJointPromise,
    InvalidPromiseResultIndex { result_idx: u64 },
    InvalidRegisterId { register_id: u64 },
    MemoryAccessViolation,
    InvalidReceiptIndex { receipt_index: u64 },
    InvalidIteratorIndex { iterator_index: u64 },
    InvalidAccountId,
    InvalidMethodName,
    InvalidPublicKey,
    ProhibitedInView { method_name: String },
    NumberOfLogsExceeded { limit: u64 },
    KeyLengthExceeded { length: u64, limit: u64 },
    ValueLengthExceeded { length: u64, limit: u64 },
    TotalLogLengthExceeded { length: u64, limit: u64 },
    NumberPromisesExceeded { limit: u64, number_of_promises: u64 },
    NumberInputDataDependenciesExceeded {
        limit: u64,
        number_of_input_data_dependencies: u64,
    },
    ReturnedValueLengthExceeded { length: u64, limit: u64 },
    ContractSizeExceeded { limit: u64, size: u64 },
    Deprecated { method_name: String },
    #[serde(rename = "ECRecoverError")]
    EcRecoverError { msg: String },
    AltBn128InvalidInput { msg: String },
    Ed25519VerifyInvalidInput { msg: String },
}

/// Action-list validation failure.
#[derive(Debug, Clone, Deserialize)]
pub enum ActionsValidationError {
    DeleteActionMustBeFinal,
    TotalPrepaidGasExceeded {
        limit: Gas,
        total_prepaid_gas: Gas,
    },
    TotalNumberOfActionsExceeded {
        limit: u64,
        total_number_of_actions: u64,
    },
    AddKeyMethodNamesNumberOfBytesExceeded {
        limit: u64,
        total_number_of_bytes: u64,
    },
    AddKeyMethodNameLengthExceeded {
        length: u64,
        limit: u64,
    },
    IntegerOverflow,
    InvalidAccountId {
        account_id: String,
    },
    ContractSizeExceeded {
        limit: u64,
        size: u64,
    },
    FunctionCallMethodNameLengthExceeded {
        length: u64,
        limit: u64,
    },
    FunctionCallArgumentsLengthExceeded {
        length: u64,
        limit: u64,
    },
    UnsuitableStakingKey {
        public_key: PublicKey,
    },
    FunctionCallZeroAttachedGas,
    DelegateActionMustBeOnlyOne,
    UnsupportedProtocolFeature {
        protocol_feature: String,
        version: u32,
    },
    InvalidDeterministicStateInitReceiver {
        derived_id: AccountId,
        receiver_id: AccountId,
    },
}

/// Receipt validation failure.
#[derive(Debug, Clone, Deserialize)]
pub enum ReceiptValidationError {
    InvalidPredecessorId {
        account_id: String,
    },
    InvalidReceiverId {
        account_id: String,
    },
    InvalidSignerId {
        account_id: String,
    },
    InvalidDataReceiverId {
        account_id: String,
    },
    ReturnedValueLengthExceeded {
        length: u64,
        limit: u64,
    },
    NumberInputDataDependenciesExceeded {
        limit: u64,
        number_of_input_data_dependencies: u64,
    },
    ActionsValidation(ActionsValidationError),
    ReceiptSizeExceeded {
        limit: u64,
        size: u64,
    },
}
