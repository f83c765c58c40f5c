//! RPC response types.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer};

use super::exec_error::{FunctionCallError, TxExecutionError};
use super::{AccountId, CryptoHash, Gas, NearToken};

// ============================================================================
// Account types
// ============================================================================

/// Cost per byte of storage in yoctoNEAR (protocol constant, 10^19).
pub const STORAGE_AMOUNT_PER_BYTE: u128 = 10_000_000_000_000_000_000;

/// Account information from a `view_account` query.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountView {
    /// Total balance, including locked.
    pub amount: NearToken,
    /// Locked (staked) balance.
    pub locked: NearToken,
    /// Hash of the deployed contract code, or zeros.
    pub code_hash: CryptoHash,
    /// Storage used in bytes.
    pub storage_usage: u64,
    #[serde(default)]
    pub storage_paid_at: u64,
    pub block_height: u64,
    pub block_hash: CryptoHash,
}

impl AccountView {
    fn storage_required(&self) -> NearToken {
        NearToken::yocto(STORAGE_AMOUNT_PER_BYTE.saturating_mul(self.storage_usage as u128))
    }

    /// Spendable balance: liquid amount minus whatever portion of the
    /// storage requirement the stake does not already cover.
    pub fn available(&self) -> NearToken {
        let required = self.storage_required();
        if self.locked >= required {
            return self.amount;
        }
        self.amount.saturating_sub(required.saturating_sub(self.locked))
    }

    /// Whether a contract is deployed on this account.
    pub fn has_contract(&self) -> bool {
        !self.code_hash.is_zero()
    }
}

/// Summarized balance derived from an [`AccountView`].
#[derive(Debug, Clone)]
pub struct AccountBalance {
    pub total: NearToken,
    pub available: NearToken,
    pub locked: NearToken,
    pub storage_usage: u64,
}

impl From<AccountView> for AccountBalance {
    fn from(view: AccountView) -> Self {
        Self {
            total: view.amount,
            available: view.available(),
            locked: view.locked,
            storage_usage: view.storage_usage,
        }
    }
}

impl std::fmt::Display for AccountBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.available)
    }
}

/// Access key state from a `view_access_key` query.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
    pub permission: AccessKeyPermissionView,
    pub block_height: u64,
    pub block_hash: CryptoHash,
}

/// Access key state without block info, as it appears in key lists.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessKeyDetails {
    pub nonce: u64,
    pub permission: AccessKeyPermissionView,
}

/// Permission as rendered on the RPC JSON surface. `FullAccess` arrives as
/// a bare string, the function-call form as an object.
#[derive(Debug, Clone, Deserialize)]
pub enum AccessKeyPermissionView {
    FullAccess,
    FunctionCall {
        allowance: Option<NearToken>,
        receiver_id: AccountId,
        method_names: Vec<String>,
    },
}

/// Result of a `view_access_key_list` query.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessKeyListView {
    pub keys: Vec<AccessKeyInfoView>,
    pub block_height: u64,
    pub block_hash: CryptoHash,
}

/// One entry of an access key list.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessKeyInfoView {
    pub public_key: super::PublicKey,
    pub access_key: AccessKeyDetails,
}

// ============================================================================
// Execution outcomes
// ============================================================================

/// The execution level a `send_tx` response has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalExecutionStatus {
    None,
    Included,
    IncludedFinal,
    ExecutedOptimistic,
    Executed,
    Final,
}

impl FinalExecutionStatus {
    /// Whether this level carries execution detail (status, outcomes).
    pub fn has_execution_detail(&self) -> bool {
        matches!(
            self,
            FinalExecutionStatus::ExecutedOptimistic
                | FinalExecutionStatus::Executed
                | FinalExecutionStatus::Final
        )
    }
}

/// Outcome of `send_tx` / `EXPERIMENTAL_tx_status`.
///
/// For `NONE`, `INCLUDED` and `INCLUDED_FINAL` the node omits everything
/// except `final_execution_status`; the client fills `transaction` with a
/// minimal view carrying the locally computed hash so callers always see
/// one.
#[derive(Debug, Clone, Deserialize)]
pub struct FinalExecutionOutcome {
    pub final_execution_status: FinalExecutionStatus,
    #[serde(default)]
    pub status: Option<ExecutionStatus>,
    #[serde(default)]
    pub transaction: Option<TransactionView>,
    #[serde(default)]
    pub transaction_outcome: Option<ExecutionOutcomeWithId>,
    #[serde(default)]
    pub receipts_outcome: Vec<ExecutionOutcomeWithId>,
    /// Full receipts, populated by `EXPERIMENTAL_tx_status` only.
    #[serde(default)]
    pub receipts: Vec<serde_json::Value>,
}

impl FinalExecutionOutcome {
    /// Whether execution succeeded.
    pub fn is_success(&self) -> bool {
        matches!(
            &self.status,
            Some(ExecutionStatus::SuccessValue(_) | ExecutionStatus::SuccessReceiptId(_))
        )
    }

    /// Whether execution failed.
    pub fn is_failure(&self) -> bool {
        matches!(&self.status, Some(ExecutionStatus::Failure(_)))
    }

    /// Whether the response is the minimal (pre-execution) shape.
    pub fn is_pending(&self) -> bool {
        !self.final_execution_status.has_execution_detail()
    }

    /// The base64-decoded success value, if any.
    pub fn success_value(&self) -> Option<Vec<u8>> {
        match &self.status {
            Some(ExecutionStatus::SuccessValue(s)) => STANDARD.decode(s).ok(),
            _ => None,
        }
    }

    /// The success value parsed as JSON.
    pub fn success_value_json<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.success_value()
            .and_then(|v| serde_json::from_slice(&v).ok())
    }

    /// The typed failure, if any.
    pub fn failure(&self) -> Option<&TxExecutionError> {
        match &self.status {
            Some(ExecutionStatus::Failure(e)) => Some(e),
            _ => None,
        }
    }

    /// The transaction hash (from the full or synthesized view).
    pub fn transaction_hash(&self) -> Option<&CryptoHash> {
        self.transaction.as_ref().map(|t| &t.hash)
    }

    /// Walk the transaction outcome and every receipt outcome for the
    /// first function-call failure, returning it with the outcome it
    /// occurred in.
    pub fn find_function_call_failure(&self) -> Option<(&FunctionCallError, &ExecutionOutcome)> {
        self.transaction_outcome
            .iter()
            .chain(self.receipts_outcome.iter())
            .find_map(|o| match &o.outcome.status {
                ExecutionStatus::Failure(e) => e
                    .function_call_error()
                    .map(|fce| (fce, &o.outcome)),
                _ => None,
            })
    }

    /// The first failure of any kind across all outcomes, including the
    /// top-level status.
    pub fn find_failure(&self) -> Option<&TxExecutionError> {
        if let Some(e) = self.failure() {
            return Some(e);
        }
        self.transaction_outcome
            .iter()
            .chain(self.receipts_outcome.iter())
            .find_map(|o| match &o.outcome.status {
                ExecutionStatus::Failure(e) => Some(e),
                _ => None,
            })
    }

    /// Total gas burnt across the transaction and all receipts.
    pub fn total_gas_burnt(&self) -> Gas {
        let tx = self
            .transaction_outcome
            .as_ref()
            .map(|o| o.outcome.gas_burnt.as_gas())
            .unwrap_or(0);
        let receipts: u64 = self
            .receipts_outcome
            .iter()
            .map(|o| o.outcome.gas_burnt.as_gas())
            .sum();
        Gas::from_gas(tx + receipts)
    }
}

/// Execution status of a transaction or receipt.
#[derive(Debug, Clone, Deserialize)]
pub enum ExecutionStatus {
    Unknown,
    Pending,
    Failure(TxExecutionError),
    /// Success with a base64-encoded return value.
    SuccessValue(String),
    /// Success deferring to another receipt.
    SuccessReceiptId(CryptoHash),
}

/// The transaction as echoed in an outcome. Only `hash`, `signer_id`,
/// `receiver_id` and `nonce` are guaranteed; the remaining fields are
/// absent on client-synthesized minimal views.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionView {
    pub hash: CryptoHash,
    pub signer_id: AccountId,
    pub receiver_id: AccountId,
    pub nonce: u64,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionView>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub priority_fee: Option<u64>,
}

impl TransactionView {
    /// The minimal view the client injects for `NONE`/`INCLUDED`/
    /// `INCLUDED_FINAL` responses.
    pub fn minimal(
        hash: CryptoHash,
        signer_id: AccountId,
        receiver_id: AccountId,
        nonce: u64,
    ) -> Self {
        Self {
            hash,
            signer_id,
            receiver_id,
            nonce,
            public_key: None,
            actions: Vec::new(),
            signature: None,
            priority_fee: None,
        }
    }
}

/// Action as rendered in RPC JSON.
///
/// Nullary variants arrive either as a bare string (`"CreateAccount"`) or
/// as an object with an empty payload (`{"CreateAccount":{}}`); both are
/// accepted.
#[derive(Debug, Clone)]
pub enum ActionView {
    CreateAccount,
    DeployContract {
        code: String,
    },
    FunctionCall {
        method_name: String,
        args: String,
        gas: Gas,
        deposit: NearToken,
    },
    Transfer {
        deposit: NearToken,
    },
    Stake {
        stake: NearToken,
        public_key: String,
    },
    AddKey {
        public_key: String,
        access_key: serde_json::Value,
    },
    DeleteKey {
        public_key: String,
    },
    DeleteAccount {
        beneficiary_id: AccountId,
    },
    Delegate {
        delegate_action: serde_json::Value,
        signature: String,
    },
    DeployGlobalContract {
        code: String,
    },
    DeployGlobalContractByAccountId {
        code: String,
    },
    UseGlobalContract {
        code_hash: String,
    },
    UseGlobalContractByAccountId {
        account_id: String,
    },
    DeterministicStateInit {
        deposit: NearToken,
    },
    /// Anything this client does not model; kept raw.
    Other(serde_json::Value),
}

// Object forms decode through this mirror enum; the manual impl below adds
// the bare-string form for nullary variants.
#[derive(Debug, Clone, Deserialize)]
enum ActionViewRepr {
    CreateAccount,
    DeployContract {
        code: String,
    },
    FunctionCall {
        method_name: String,
        args: String,
        gas: Gas,
        deposit: NearToken,
    },
    Transfer {
        deposit: NearToken,
    },
    Stake {
        stake: NearToken,
        public_key: String,
    },
    AddKey {
        public_key: String,
        access_key: serde_json::Value,
    },
    DeleteKey {
        public_key: String,
    },
    DeleteAccount {
        beneficiary_id: AccountId,
    },
    Delegate {
        delegate_action: serde_json::Value,
        signature: String,
    },
    DeployGlobalContract {
        code: String,
    },
    DeployGlobalContractByAccountId {
        code: String,
    },
    UseGlobalContract {
        code_hash: String,
    },
    UseGlobalContractByAccountId {
        account_id: String,
    },
    DeterministicStateInit {
        deposit: NearToken,
    },
}

impl From<ActionViewRepr> for ActionView {
    fn from(repr: ActionViewRepr) -> Self {
        match repr {
            ActionViewRepr::CreateAccount => ActionView::CreateAccount,
            ActionViewRepr::DeployContract { code } => ActionView::DeployContract { code },
            ActionViewRepr::FunctionCall {
                method_name,
                args,
                gas,
                deposit,
            } => ActionView::FunctionCall {
                method_name,
                args,
                gas,
                deposit,
            },
            ActionViewRepr::Transfer { deposit } => ActionView::Transfer { deposit },
            ActionViewRepr::Stake { stake, public_key } => ActionView::Stake { stake, public_key },
            ActionViewRepr::AddKey {
                public_key,
                access_key,
            } => ActionView::AddKey {
                public_key,
                access_key,
            },
            ActionViewRepr::DeleteKey { public_key } => ActionView::DeleteKey { public_key },
            ActionViewRepr::DeleteAccount { beneficiary_id } => {
                ActionView::DeleteAccount { beneficiary_id }
            }
            ActionViewRepr::Delegate {
                delegate_action,
                signature,
            } => ActionView::Delegate {
                delegate_action,
                signature,
            },
            ActionViewRepr::DeployGlobalContract { code } => {
                ActionView::DeployGlobalContract { code }
            }
            ActionViewRepr::DeployGlobalContractByAccountId { code } => {
                ActionView::DeployGlobalContractByAccountId { code }
            }
            ActionViewRepr::UseGlobalContract { code_hash } => {
                ActionView::UseGlobalContract { code_hash }
            }
            ActionViewRepr::UseGlobalContractByAccountId { account_id } => {
                ActionView::UseGlobalContractByAccountId { account_id }
            }
            ActionViewRepr::DeterministicStateInit { deposit } => {
                ActionView::DeterministicStateInit { deposit }
            }
        }
    }
}

impl<'de> Deserialize<'de> for ActionView {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        match &value {
            serde_json::Value::String(s) => match s.as_str() {
                "CreateAccount" => Ok(ActionView::CreateAccount),
                _ => Ok(ActionView::Other(value)),
            },
            // Nullary variants also appear as `{"CreateAccount": {}}` (or
            // with a null payload); external tagging alone rejects those.
            serde_json::Value::Object(map)
                if map.len() == 1
                    && map
                        .get("CreateAccount")
                        .is_some_and(|v| v.is_null() || v == &serde_json::json!({})) =>
            {
                Ok(ActionView::CreateAccount)
            }
            _ => match serde_json::from_value::<ActionViewRepr>(value.clone()) {
                Ok(repr) => Ok(repr.into()),
                Err(_) => Ok(ActionView::Other(value)),
            },
        }
    }
}

/// A transaction or receipt outcome with its ID.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionOutcomeWithId {
    pub id: CryptoHash,
    pub outcome: ExecutionOutcome,
    #[serde(default)]
    pub proof: Vec<MerklePathItem>,
    #[serde(default)]
    pub block_hash: Option<CryptoHash>,
}

/// A single execution outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionOutcome {
    pub executor_id: AccountId,
    pub gas_burnt: Gas,
    pub tokens_burnt: NearToken,
    pub logs: Vec<String>,
    pub receipt_ids: Vec<CryptoHash>,
    pub status: ExecutionStatus,
}

/// One step of a Merkle inclusion proof.
#[derive(Debug, Clone, Deserialize)]
pub struct MerklePathItem {
    pub hash: CryptoHash,
    pub direction: MerkleDirection,
}

#[derive(Debug, Clone, Deserialize)]
pub enum MerkleDirection {
    Left,
    Right,
}

// ============================================================================
// View function results
// ============================================================================

/// Result of a `call_function` query.
#[derive(Debug, Clone)]
pub struct ViewFunctionResult {
    /// Raw result bytes, often JSON.
    pub result: Vec<u8>,
    pub logs: Vec<String>,
    pub block_height: u64,
    pub block_hash: CryptoHash,
}

impl ViewFunctionResult {
    pub fn bytes(&self) -> &[u8] {
        &self.result
    }

    /// Deserialize the result as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.result)
    }

    /// Deserialize the result as Borsh.
    pub fn borsh<T: borsh::BorshDeserialize>(&self) -> Result<T, borsh::io::Error> {
        borsh::from_slice(&self.result)
    }
}

// ============================================================================
// Node status
// ============================================================================

/// Response of the `status` RPC.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub chain_id: String,
    pub protocol_version: u32,
    pub latest_protocol_version: u32,
    pub genesis_hash: CryptoHash,
    pub sync_info: SyncInfo,
    pub version: NodeVersion,
    #[serde(default)]
    pub validator_account_id: Option<String>,
    #[serde(default)]
    pub uptime_sec: Option<u64>,
}

/// Chain-head information inside a status response.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncInfo {
    pub latest_block_hash: CryptoHash,
    pub latest_block_height: u64,
    pub latest_block_time: String,
    pub syncing: bool,
    #[serde(default)]
    pub earliest_block_hash: Option<CryptoHash>,
    #[serde(default)]
    pub earliest_block_height: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeVersion {
    pub version: String,
    pub build: String,
    #[serde(default)]
    pub commit: Option<String>,
}

/// Response of the `gas_price` RPC.
#[derive(Debug, Clone, Deserialize)]
pub struct GasPrice {
    /// Gas price in yoctoNEAR, as a decimal string.
    pub gas_price: String,
}

impl GasPrice {
    pub fn as_u128(&self) -> u128 {
        self.gas_price.parse().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_view_accepts_string_and_object_forms() {
        let from_string: ActionView = serde_json::from_value(serde_json::json!("CreateAccount")).unwrap();
        assert!(matches!(from_string, ActionView::CreateAccount));

        let from_object: ActionView =
            serde_json::from_value(serde_json::json!({ "CreateAccount": {} })).unwrap();
        assert!(matches!(from_object, ActionView::CreateAccount));
    }

    #[test]
    fn action_view_decodes_snake_case_fields() {
        let json = serde_json::json!({
            "FunctionCall": {
                "method_name": "increment",
                "args": "eyJieSI6MX0=",
                "gas": 30000000000000u64,
                "deposit": "1"
            }
        });
        let view: ActionView = serde_json::from_value(json).unwrap();
        match view {
            ActionView::FunctionCall {
                method_name,
                gas,
                deposit,
                ..
            } => {
                assert_eq!(method_name, "increment");
                assert_eq!(gas, Gas::tgas(30));
                assert_eq!(deposit, NearToken::ONE_YOCTO);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn action_view_transfer_deposit_is_string() {
        let json = serde_json::json!({ "Transfer": { "deposit": "1000000000000000000000000" } });
        let view: ActionView = serde_json::from_value(json).unwrap();
        assert!(matches!(
            view,
            ActionView::Transfer { deposit } if deposit == NearToken::near(1)
        ));
    }

    #[test]
    fn unknown_action_form_is_preserved() {
        let json = serde_json::json!({ "SomethingNew": { "field": 1 } });
        let view: ActionView = serde_json::from_value(json.clone()).unwrap();
        assert!(matches!(view, ActionView::Other(v) if v == json));
    }

    fn full_outcome_json(status: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "final_execution_status": "EXECUTED_OPTIMISTIC",
            "status": status,
            "transaction": {
                "hash": CryptoHash::hash(b"tx").to_string(),
                "signer_id": "alice.near",
                "receiver_id": "bob.near",
                "nonce": 101,
                "actions": ["CreateAccount", { "Transfer": { "deposit": "1" } }]
            },
            "transaction_outcome": {
                "id": CryptoHash::hash(b"tx").to_string(),
                "outcome": {
                    "executor_id": "alice.near",
                    "gas_burnt": 2427979134284u64,
                    "tokens_burnt": "242797913428400000000",
                    "logs": [],
                    "receipt_ids": [CryptoHash::hash(b"r1").to_string()],
                    "status": { "SuccessReceiptId": CryptoHash::hash(b"r1").to_string() }
                }
            },
            "receipts_outcome": [{
                "id": CryptoHash::hash(b"r1").to_string(),
                "outcome": {
                    "executor_id": "bob.near",
                    "gas_burnt": 223182562500u64,
                    "tokens_burnt": "22318256250000000000",
                    "logs": ["log line"],
                    "receipt_ids": [],
                    "status": { "SuccessValue": "" }
                }
            }]
        })
    }

    #[test]
    fn full_outcome_decodes() {
        let json = full_outcome_json(serde_json::json!({ "SuccessValue": "dHJ1ZQ==" }));
        let outcome: FinalExecutionOutcome = serde_json::from_value(json).unwrap();
        assert!(outcome.is_success());
        assert!(!outcome.is_pending());
        assert_eq!(outcome.success_value().unwrap(), b"true");
        assert_eq!(outcome.success_value_json::<bool>(), Some(true));
        assert_eq!(outcome.transaction.as_ref().unwrap().nonce, 101);
        assert_eq!(
            outcome.total_gas_burnt().as_gas(),
            2427979134284 + 223182562500
        );
    }

    #[test]
    fn minimal_outcome_decodes_and_gets_synthesized_view() {
        let json = serde_json::json!({ "final_execution_status": "NONE" });
        let mut outcome: FinalExecutionOutcome = serde_json::from_value(json).unwrap();
        assert!(outcome.is_pending());
        assert!(outcome.transaction.is_none());

        let hash = CryptoHash::hash(b"local");
        outcome.transaction = Some(TransactionView::minimal(
            hash,
            "alice.near".parse().unwrap(),
            "bob.near".parse().unwrap(),
            7,
        ));
        assert_eq!(outcome.transaction_hash(), Some(&hash));
    }

    #[test]
    fn function_call_failure_found_in_receipts() {
        let mut json = full_outcome_json(serde_json::json!({ "SuccessValue": "" }));
        json["receipts_outcome"][0]["outcome"]["status"] = serde_json::json!({
            "Failure": {
                "ActionError": {
                    "index": 0,
                    "kind": { "FunctionCallError": { "ExecutionError": "panicked" } }
                }
            }
        });
        let outcome: FinalExecutionOutcome = serde_json::from_value(json).unwrap();
        let (fce, exec) = outcome.find_function_call_failure().unwrap();
        assert_eq!(fce.panic_message().unwrap(), "panicked");
        assert_eq!(exec.executor_id.as_str(), "bob.near");
        assert_eq!(exec.logs, vec!["log line"]);
    }

    #[test]
    fn account_view_available_balance() {
        let view: AccountView = serde_json::from_value(serde_json::json!({
            "amount": "1000000000000000000000000",
            "locked": "0",
            "code_hash": "11111111111111111111111111111111",
            "storage_usage": 1000,
            "block_height": 1,
            "block_hash": CryptoHash::hash(b"b").to_string()
        }))
        .unwrap();
        // 1000 bytes costs 10^22 yocto
        assert_eq!(
            view.available().as_yoctonear(),
            1_000_000_000_000_000_000_000_000 - 10_000_000_000_000_000_000_000
        );
        assert!(!view.has_contract());
    }

    #[test]
    fn access_key_view_decodes_both_permissions() {
        let full: AccessKeyView = serde_json::from_value(serde_json::json!({
            "nonce": 100,
            "permission": "FullAccess",
            "block_height": 1,
            "block_hash": CryptoHash::hash(b"b").to_string()
        }))
        .unwrap();
        assert!(matches!(full.permission, AccessKeyPermissionView::FullAccess));

        let restricted: AccessKeyView = serde_json::from_value(serde_json::json!({
            "nonce": 5,
            "permission": {
                "FunctionCall": {
                    "allowance": "250000000000000000000000",
                    "receiver_id": "c.near",
                    "method_names": ["get"]
                }
            },
            "block_height": 1,
            "block_hash": CryptoHash::hash(b"b").to_string()
        }))
        .unwrap();
        assert!(matches!(
            restricted.permission,
            AccessKeyPermissionView::FunctionCall { .. }
        ));
    }
}
