//! Wallet adapter layer.
//!
//! External wallets (browser extensions, embedded signers, remote signing
//! services) expose wildly different protocols. The [`Wallet`] trait is
//! the narrow capability surface the client consumes; protocol-specific
//! converters implement it and use the JSON helpers below to translate
//! actions into the typed JSON form web wallets expect.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::BoxFuture;
use serde_json::json;

use crate::error::WalletError;
use crate::types::nep413::{SignMessageParams, SignedMessage};
use crate::types::{
    AccessKeyPermission, AccountId, Action, DelegateAction, FinalExecutionOutcome, PublicKey,
    Signature, SignedDelegateAction,
};

/// An account the wallet can sign for.
#[derive(Debug, Clone)]
pub struct WalletAccount {
    pub account_id: AccountId,
    /// The signing key, when the wallet discloses it.
    pub public_key: Option<PublicKey>,
}

/// A transaction handed to the wallet for signing and submission.
#[derive(Debug, Clone)]
pub struct WalletTransaction {
    /// The signing account; the wallet's active account when absent.
    pub signer_id: Option<AccountId>,
    pub receiver_id: AccountId,
    pub actions: Vec<Action>,
}

/// A batch request for delegate-action signatures.
#[derive(Debug, Clone)]
pub struct SignDelegateRequest {
    /// The signing account; the wallet's active account when absent.
    pub signer_id: Option<AccountId>,
    pub delegate_actions: Vec<DelegateActionRequest>,
}

/// One delegate action to sign.
#[derive(Debug, Clone)]
pub struct DelegateActionRequest {
    pub receiver_id: AccountId,
    pub actions: Vec<Action>,
    /// Explicit nonce; the wallet resolves one when absent.
    pub nonce: Option<u64>,
    /// Explicit expiry height; the wallet resolves one when absent.
    pub max_block_height: Option<u64>,
}

/// A wallet's answer to a delegate-action signing request.
///
/// Wallet protocols disagree on the response shape: some return the flat
/// `{delegateAction, signature}` pair, others the already-wrapped signed
/// delegate. Both normalize to the same [`SignedDelegateAction`].
#[derive(Debug, Clone)]
pub enum WalletSignedDelegate {
    /// The flat pair shape.
    Flat {
        delegate_action: DelegateAction,
        signature: Signature,
    },
    /// The pre-wrapped shape.
    Wrapped(SignedDelegateAction),
}

impl WalletSignedDelegate {
    /// Collapse either shape into the signed delegate action.
    pub fn normalize(self) -> SignedDelegateAction {
        match self {
            WalletSignedDelegate::Flat {
                delegate_action,
                signature,
            } => SignedDelegateAction {
                delegate_action,
                signature,
            },
            WalletSignedDelegate::Wrapped(signed) => signed,
        }
    }
}

/// The capability interface wallets are normalized into.
///
/// `get_accounts` and `sign_and_send_transaction` are required. The
/// optional capabilities default to "absent": the capability probe
/// returns false and invocation fails with a `does not support` error,
/// which is also the contract for wallets whose manifest explicitly
/// disables a capability.
pub trait Wallet: Send + Sync {
    /// Accounts this wallet can sign for.
    fn get_accounts(&self) -> BoxFuture<'_, Result<Vec<WalletAccount>, WalletError>>;

    /// Sign a transaction and submit it through the wallet's own
    /// connection, returning the execution outcome.
    fn sign_and_send_transaction(
        &self,
        transaction: WalletTransaction,
    ) -> BoxFuture<'_, Result<FinalExecutionOutcome, WalletError>>;

    /// Whether NEP-413 message signing is available.
    fn supports_sign_message(&self) -> bool {
        false
    }

    /// Sign a NEP-413 off-chain message.
    fn sign_message(
        &self,
        _params: SignMessageParams,
    ) -> BoxFuture<'_, Result<SignedMessage, WalletError>> {
        Box::pin(async { Err(WalletError::Unsupported("signMessage".to_string())) })
    }

    /// Whether delegate-action (meta-transaction) signing is available.
    fn supports_sign_delegate_actions(&self) -> bool {
        false
    }

    /// Sign a batch of delegate actions.
    fn sign_delegate_actions(
        &self,
        _request: SignDelegateRequest,
    ) -> BoxFuture<'_, Result<Vec<WalletSignedDelegate>, WalletError>> {
        Box::pin(async { Err(WalletError::Unsupported("signDelegateActions".to_string())) })
    }
}

// ============================================================================
// JSON translation for web-wallet protocols
// ============================================================================

/// Render a [`WalletTransaction`] in the JSON shape web wallets consume.
pub fn wallet_transaction_to_json(transaction: &WalletTransaction) -> serde_json::Value {
    let mut value = json!({
        "receiverId": transaction.receiver_id,
        "actions": transaction
            .actions
            .iter()
            .map(action_to_wallet_json)
            .collect::<Vec<_>>(),
    });
    if let Some(signer_id) = &transaction.signer_id {
        value["signerId"] = json!(signer_id);
    }
    value
}

/// Render one action in the typed JSON form used on wallet protocols:
/// variant-name tag, snake_case fields, amounts as decimal strings, gas
/// as a number. Function-call argument bytes that parse as UTF-8 JSON are
/// embedded as the parsed value; anything else is base64.
pub fn action_to_wallet_json(action: &Action) -> serde_json::Value {
    match action {
        Action::CreateAccount(_) => json!({ "CreateAccount": {} }),
        Action::DeployContract(a) => json!({
            "DeployContract": { "code": STANDARD.encode(&a.code) }
        }),
        Action::FunctionCall(a) => {
            let args: serde_json::Value = std::str::from_utf8(&a.args)
                .ok()
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or_else(|| json!(STANDARD.encode(&a.args)));
            json!({
                "FunctionCall": {
                    "method_name": a.method_name,
                    "args": args,
                    "gas": a.gas.as_gas(),
                    "deposit": a.deposit.as_yoctonear().to_string(),
                }
            })
        }
        Action::Transfer(a) => json!({
            "Transfer": { "deposit": a.deposit.as_yoctonear().to_string() }
        }),
        Action::Stake(a) => json!({
            "Stake": {
                "stake": a.stake.as_yoctonear().to_string(),
                "public_key": a.public_key.to_string(),
            }
        }),
        Action::AddKey(a) => {
            let permission = match &a.access_key.permission {
                AccessKeyPermission::FullAccess => json!("FullAccess"),
                AccessKeyPermission::FunctionCall(p) => json!({
                    "FunctionCall": {
                        "allowance": p.allowance.map(|v| v.as_yoctonear().to_string()),
                        "receiver_id": p.receiver_id,
                        "method_names": p.method_names,
                    }
                }),
            };
            json!({
                "AddKey": {
                    "public_key": a.public_key.to_string(),
                    "access_key": {
                        "nonce": a.access_key.nonce,
                        "permission": permission,
                    }
                }
            })
        }
        Action::DeleteKey(a) => json!({
            "DeleteKey": { "public_key": a.public_key.to_string() }
        }),
        Action::DeleteAccount(a) => json!({
            "DeleteAccount": { "beneficiary_id": a.beneficiary_id }
        }),
        Action::Delegate(signed) => json!({
            "Delegate": { "signed_delegate_base64": signed.to_base64() }
        }),
        Action::DeployGlobalContract(a) => json!({
            "DeployGlobalContract": {
                "code": STANDARD.encode(&a.code),
                "deploy_mode": match a.deploy_mode {
                    crate::types::GlobalContractDeployMode::CodeHash => "CodeHash",
                    crate::types::GlobalContractDeployMode::AccountId => "AccountId",
                },
            }
        }),
        Action::UseGlobalContract(a) => match &a.contract_identifier {
            crate::types::GlobalContractIdentifier::CodeHash(hash) => json!({
                "UseGlobalContract": { "code_hash": hash.to_string() }
            }),
            crate::types::GlobalContractIdentifier::AccountId(account_id) => json!({
                "UseGlobalContract": { "account_id": account_id }
            }),
        },
        Action::DeterministicStateInit(a) => json!({
            "DeterministicStateInit": {
                "deposit": a.deposit.as_yoctonear().to_string(),
                "derived_account_id": a.derive_account_id(),
            }
        }),
    }
}
