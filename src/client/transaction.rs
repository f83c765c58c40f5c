//! Transaction builder: action accumulation, signing, submission.
//!
//! The builder accumulates actions against one receiver, signs through the
//! configured key path (explicit signer, low-level signing function, or
//! key store) or hands the whole transaction to a wallet, and drives the
//! nonce-collision retry on submission. Signed bytes are cached until the
//! builder is mutated.

use std::collections::BTreeMap;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, RpcError, WalletError};
use crate::types::{
    AccountId, Action, CryptoHash, DelegateAction, FinalExecutionOutcome, Gas, IntoGas,
    IntoNearToken, NearToken, NonDelegateAction, PublicKey, SignedDelegateAction, SignedTransaction,
    Transaction, TransactionView, TxExecutionStatus,
};

use super::keystore::KeyStore;
use super::nonce_manager::NonceManager;
use super::rpc::RpcClient;
use super::signer::Signer;
use super::wallet::{DelegateActionRequest, SignDelegateRequest, Wallet, WalletTransaction};

/// Default expiry window for delegate actions, in blocks past the current
/// height.
const DEFAULT_DELEGATE_HEIGHT_OFFSET: u64 = 200;

/// Total submission attempts when the node reports a nonce collision.
const MAX_NONCE_ATTEMPTS: u32 = 3;

/// Options for building a delegate action (meta-transaction).
#[derive(Clone, Debug, Default)]
pub struct DelegateOptions {
    /// Explicit receiver, overriding the builder's receiver.
    pub receiver_id: Option<AccountId>,
    /// Explicit nonce; fetched from the access key (+1) when absent.
    pub nonce: Option<u64>,
    /// Explicit expiry height.
    pub max_block_height: Option<u64>,
    /// Blocks past the current height when `max_block_height` is absent.
    /// Defaults to 200.
    pub block_height_offset: Option<u64>,
}

/// A signed delegate action plus its transport encoding.
#[derive(Clone, Debug)]
pub struct DelegateResult {
    pub signed_delegate_action: SignedDelegateAction,
    /// Base64 of the Borsh-encoded signed delegate, ready for a relayer's
    /// HTTP surface.
    pub payload: String,
    /// Encoding of `payload`; always `"base64"`.
    pub format: &'static str,
}

impl DelegateResult {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.signed_delegate_action.to_bytes()
    }

    pub fn sender_id(&self) -> &AccountId {
        self.signed_delegate_action.sender_id()
    }

    pub fn receiver_id(&self) -> &AccountId {
        self.signed_delegate_action.receiver_id()
    }
}

// Shared client state handed to every builder.
pub(crate) struct BuilderContext {
    pub rpc: Arc<RpcClient>,
    pub key_store: Arc<dyn KeyStore>,
    pub nonce_manager: Arc<NonceManager>,
    pub wallet: Option<Arc<dyn Wallet>>,
    pub signer: Option<Arc<dyn Signer>>,
    pub default_signer_id: Option<AccountId>,
    pub default_wait_until: TxExecutionStatus,
}

/// Builder for multi-action transactions.
///
/// Created via [`Client::transaction`](crate::Client::transaction). The
/// receiver is fixed at creation; all accumulated actions execute against
/// it (a `Delegate` action re-pins it to the delegate's sender, the one
/// case the protocol requires).
pub struct TransactionBuilder {
    ctx: Arc<BuilderContext>,
    receiver_id: AccountId,
    actions: Vec<Action>,
    signer_id: Option<AccountId>,
    signer_override: Option<Arc<dyn Signer>>,
    wait_until: TxExecutionStatus,
    cached: Option<(SignedTransaction, CryptoHash)>,
}

impl TransactionBuilder {
    pub(crate) fn new(ctx: Arc<BuilderContext>, receiver_id: AccountId) -> Self {
        let wait_until = ctx.default_wait_until;
        Self {
            ctx,
            receiver_id,
            actions: Vec::new(),
            signer_id: None,
            signer_override: None,
            wait_until,
            cached: None,
        }
    }

    // Any mutation invalidates the signed-bytes cache.
    fn touch(&mut self) {
        self.cached = None;
    }

    fn push(mut self, action: Action) -> Self {
        self.touch();
        self.actions.push(action);
        self
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Create the receiver account (as a sub-account of the signer).
    pub fn create_account(self) -> Self {
        self.push(Action::create_account())
    }

    /// Transfer tokens to the receiver.
    pub fn transfer(self, amount: impl IntoNearToken) -> Self {
        let amount = amount.into_near_token().unwrap_or(NearToken::ZERO);
        self.push(Action::transfer(amount))
    }

    /// Deploy WASM code to the receiver.
    pub fn deploy(self, code: impl Into<Vec<u8>>) -> Self {
        self.push(Action::deploy_contract(code.into()))
    }

    /// Add a function call; returns a [`CallBuilder`] for args, gas and
    /// deposit.
    pub fn call(self, method: &str) -> CallBuilder {
        CallBuilder::new(self, method.to_string())
    }

    /// Stake tokens with the given validator key.
    pub fn stake(self, amount: impl IntoNearToken, public_key: PublicKey) -> Self {
        let amount = amount.into_near_token().unwrap_or(NearToken::ZERO);
        self.push(Action::stake(amount, public_key))
    }

    /// Add a full-access key to the receiver account.
    pub fn add_full_access_key(self, public_key: PublicKey) -> Self {
        self.push(Action::add_full_access_key(public_key))
    }

    /// Add a function-call access key to the receiver account.
    pub fn add_function_call_key(
        self,
        public_key: PublicKey,
        contract_id: impl AsRef<str>,
        method_names: Vec<String>,
        allowance: Option<NearToken>,
    ) -> Self {
        let contract_id = AccountId::parse_lenient(contract_id);
        self.push(Action::add_function_call_key(
            public_key,
            contract_id,
            method_names,
            allowance,
        ))
    }

    /// Delete an access key from the receiver account.
    pub fn delete_key(self, public_key: PublicKey) -> Self {
        self.push(Action::delete_key(public_key))
    }

    /// Delete the receiver account, sending its balance to `beneficiary`.
    pub fn delete_account(self, beneficiary: impl AsRef<str>) -> Self {
        let beneficiary = AccountId::parse_lenient(beneficiary);
        self.push(Action::delete_account(beneficiary))
    }

    /// Publish a contract to the global registry.
    pub fn publish_contract(self, code: impl Into<Vec<u8>>, by_hash: bool) -> Self {
        self.push(Action::publish_contract(code.into(), by_hash))
    }

    /// Deploy from a published global contract by code hash.
    pub fn deploy_from_hash(self, code_hash: CryptoHash) -> Self {
        self.push(Action::deploy_from_hash(code_hash))
    }

    /// Deploy from a published global contract by publisher account.
    pub fn deploy_from_publisher(self, publisher: impl AsRef<str>) -> Self {
        let publisher = AccountId::parse_lenient(publisher);
        self.push(Action::deploy_from_account(publisher))
    }

    /// Deterministic state init referencing a published code hash.
    pub fn state_init_by_hash(
        self,
        code_hash: CryptoHash,
        data: BTreeMap<Vec<u8>, Vec<u8>>,
        deposit: impl IntoNearToken,
    ) -> Self {
        use crate::types::{
            DeterministicAccountStateInit, DeterministicAccountStateInitV1,
            GlobalContractIdentifier,
        };
        let deposit = deposit.into_near_token().unwrap_or(NearToken::ZERO);
        self.push(Action::state_init(
            DeterministicAccountStateInit::V1(DeterministicAccountStateInitV1 {
                code: GlobalContractIdentifier::CodeHash(code_hash),
                data,
            }),
            deposit,
        ))
    }

    /// Deterministic state init referencing a publisher account.
    pub fn state_init_by_publisher(
        self,
        publisher: impl AsRef<str>,
        data: BTreeMap<Vec<u8>, Vec<u8>>,
        deposit: impl IntoNearToken,
    ) -> Self {
        use crate::types::{
            DeterministicAccountStateInit, DeterministicAccountStateInitV1,
            GlobalContractIdentifier,
        };
        let publisher = AccountId::parse_lenient(publisher);
        let deposit = deposit.into_near_token().unwrap_or(NearToken::ZERO);
        self.push(Action::state_init(
            DeterministicAccountStateInit::V1(DeterministicAccountStateInitV1 {
                code: GlobalContractIdentifier::AccountId(publisher),
                data,
            }),
            deposit,
        ))
    }

    /// Embed a user's signed delegate action (relayer side).
    ///
    /// The protocol requires the wrapping transaction's receiver to equal
    /// the delegate's sender, so the builder re-pins the receiver here.
    pub fn signed_delegate_action(mut self, signed_delegate: SignedDelegateAction) -> Self {
        self.touch();
        self.receiver_id = signed_delegate.sender_id().clone();
        self.actions.push(Action::delegate(signed_delegate));
        self
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Sign as a specific account (overrides the client default).
    pub fn signer_id(mut self, signer_id: impl AsRef<str>) -> Self {
        self.touch();
        self.signer_id = Some(AccountId::parse_lenient(signer_id));
        self
    }

    /// Sign with an explicit signer, bypassing wallet and key store.
    pub fn sign_with(mut self, signer: impl Signer + 'static) -> Self {
        self.touch();
        self.signer_override = Some(Arc::new(signer));
        self
    }

    /// The execution level `send` waits for.
    pub fn wait_until(mut self, status: TxExecutionStatus) -> Self {
        self.wait_until = status;
        self
    }

    // ========================================================================
    // Signing
    // ========================================================================

    fn resolve_signer_id(&self) -> Result<AccountId, Error> {
        self.signer_id
            .clone()
            .or_else(|| self.ctx.default_signer_id.clone())
            .ok_or(Error::NoSignerAccount)
    }

    /// Local key resolution order: per-transaction override, the client's
    /// low-level signing function, then the key store.
    fn resolve_signer(&self, signer_id: &AccountId) -> Result<Arc<dyn Signer>, Error> {
        if let Some(signer) = &self.signer_override {
            return Ok(signer.clone());
        }
        if let Some(signer) = &self.ctx.signer {
            return Ok(signer.clone());
        }
        self.ctx
            .key_store
            .get(signer_id)
            .map(|pair| Arc::new(pair) as Arc<dyn Signer>)
            .ok_or(Error::NoSigner)
    }

    fn validate_actions(&self) -> Result<(), Error> {
        if self.actions.is_empty() {
            return Err(Error::InvalidTransaction(
                "Transaction requires at least one action".to_string(),
            ));
        }
        Ok(())
    }

    /// Sign against live chain state: fetches the latest block hash and
    /// takes the next nonce from the nonce manager (which itself fetches
    /// the access key only on a cold cache). The signed transaction and
    /// its hash are cached until the builder is mutated.
    pub async fn sign(&mut self) -> Result<&SignedTransaction, Error> {
        if self.cached.is_some() {
            return Ok(&self.cached.as_ref().unwrap().0);
        }

        self.validate_actions()?;
        let signer_id = self.resolve_signer_id()?;
        let signer = self.resolve_signer(&signer_id)?;
        let public_key = signer.public_key();

        let status = self.ctx.rpc.status().await.map_err(Error::Rpc)?;
        let block_hash = status.sync_info.latest_block_hash;

        let rpc = self.ctx.rpc.clone();
        let fetch_account = signer_id.clone();
        let fetch_key = public_key.clone();
        let nonce = self
            .ctx
            .nonce_manager
            .get_next_nonce(signer_id.as_str(), &public_key.to_string(), move || async move {
                let view = rpc.view_access_key(&fetch_account, &fetch_key, None).await?;
                Ok(view.nonce)
            })
            .await?;

        self.sign_prepared(signer_id, signer, public_key, nonce, block_hash)
            .await
    }

    /// Sign with an explicit nonce and block hash, touching no network.
    /// Useful for offline signing and for relayers with their own nonce
    /// management.
    pub async fn sign_offline(
        &mut self,
        nonce: u64,
        block_hash: CryptoHash,
    ) -> Result<&SignedTransaction, Error> {
        self.validate_actions()?;
        let signer_id = self.resolve_signer_id()?;
        let signer = self.resolve_signer(&signer_id)?;
        let public_key = signer.public_key();
        self.sign_prepared(signer_id, signer, public_key, nonce, block_hash)
            .await
    }

    async fn sign_prepared(
        &mut self,
        signer_id: AccountId,
        signer: Arc<dyn Signer>,
        public_key: PublicKey,
        nonce: u64,
        block_hash: CryptoHash,
    ) -> Result<&SignedTransaction, Error> {
        let tx = Transaction::new(
            signer_id,
            public_key,
            nonce,
            self.receiver_id.clone(),
            block_hash,
            self.actions.clone(),
        );
        tx.validate().map_err(Error::InvalidTransaction)?;

        let hash = tx.hash();
        let signature = signer.sign(hash.as_bytes()).await?;
        self.cached = Some((
            SignedTransaction {
                transaction: tx,
                signature,
            },
            hash,
        ));
        Ok(&self.cached.as_ref().unwrap().0)
    }

    /// The cached signed bytes. Fails if the builder was mutated since the
    /// last `sign` (or was never signed).
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        self.cached
            .as_ref()
            .map(|(signed, _)| signed.to_bytes())
            .ok_or(Error::NotSigned)
    }

    /// The hash of the cached signed transaction, if fresh.
    pub fn hash(&self) -> Option<&CryptoHash> {
        self.cached.as_ref().map(|(_, hash)| hash)
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Send the transaction; equivalent to awaiting the builder.
    pub fn send(self) -> TransactionSend {
        TransactionSend { builder: self }
    }

    async fn send_inner(mut self) -> Result<FinalExecutionOutcome, Error> {
        self.validate_actions()?;

        // Wallet path: the wallet signs and submits itself; local key
        // material is never consulted.
        if self.signer_override.is_none() && self.ctx.signer.is_none() {
            if let Some(wallet) = self.ctx.wallet.clone() {
                let transaction = WalletTransaction {
                    signer_id: self.signer_id.or_else(|| self.ctx.default_signer_id.clone()),
                    receiver_id: self.receiver_id,
                    actions: self.actions,
                };
                return wallet
                    .sign_and_send_transaction(transaction)
                    .await
                    .map_err(Error::Wallet);
            }
        }

        let signer_id = self.resolve_signer_id()?;

        let mut last_err: Option<Error> = None;
        for attempt in 0..MAX_NONCE_ATTEMPTS {
            if attempt > 0 {
                // A collision means our cached sequence is stale: drop it
                // along with the signature and rebuild from chain state.
                if let Some((signed, _)) = &self.cached {
                    self.ctx.nonce_manager.invalidate(
                        signer_id.as_str(),
                        &signed.transaction.public_key.to_string(),
                    );
                }
                self.cached = None;
                debug!(attempt, signer_id = %signer_id, "retrying send after nonce collision");
            }

            let signed = self.sign().await?.clone();
            let hash = signed.hash();
            let nonce = signed.transaction.nonce;

            match self.ctx.rpc.send_tx(&signed, self.wait_until).await {
                Ok(mut outcome) => {
                    if outcome.is_pending() && outcome.transaction.is_none() {
                        outcome.transaction = Some(TransactionView::minimal(
                            hash,
                            signed.transaction.signer_id.clone(),
                            signed.transaction.receiver_id.clone(),
                            nonce,
                        ));
                    }
                    return Ok(outcome);
                }
                Err(RpcError::InvalidNonce { tx_nonce, ak_nonce })
                    if attempt < MAX_NONCE_ATTEMPTS - 1 =>
                {
                    last_err = Some(Error::Rpc(RpcError::InvalidNonce { tx_nonce, ak_nonce }));
                }
                Err(e) => return Err(Error::Rpc(e)),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            Error::InvalidTransaction("transaction submission failed".to_string())
        }))
    }

    // ========================================================================
    // Delegate actions (meta-transactions)
    // ========================================================================

    /// Wrap the accumulated actions into a signed delegate action.
    ///
    /// A wallet advertising delegate-action signing is preferred; its
    /// response shape is normalized. Otherwise the delegate action is
    /// signed locally over the NEP-461-prefixed hash.
    pub async fn delegate(self, options: DelegateOptions) -> Result<DelegateResult, Error> {
        if self.actions.is_empty() {
            return Err(Error::InvalidTransaction(
                "Delegate action requires at least one action".to_string(),
            ));
        }
        if self.actions.iter().any(Action::is_delegate) {
            return Err(Error::InvalidTransaction(
                "Delegate actions cannot contain nested signed delegate actions".to_string(),
            ));
        }

        let receiver_id = options
            .receiver_id
            .clone()
            .unwrap_or_else(|| self.receiver_id.clone());

        // Wallet path.
        if self.signer_override.is_none() && self.ctx.signer.is_none() {
            if let Some(wallet) = self.ctx.wallet.clone() {
                if wallet.supports_sign_delegate_actions() {
                    let request = SignDelegateRequest {
                        signer_id: self
                            .signer_id
                            .clone()
                            .or_else(|| self.ctx.default_signer_id.clone()),
                        delegate_actions: vec![DelegateActionRequest {
                            receiver_id,
                            actions: self.actions.clone(),
                            nonce: options.nonce,
                            max_block_height: options.max_block_height,
                        }],
                    };
                    let mut items = wallet.sign_delegate_actions(request).await?;
                    if items.is_empty() {
                        return Err(Error::Wallet(WalletError::Failed(
                            "wallet returned no signed delegate actions".to_string(),
                        )));
                    }
                    let signed_delegate_action = items.remove(0).normalize();
                    let payload = signed_delegate_action.to_base64();
                    return Ok(DelegateResult {
                        signed_delegate_action,
                        payload,
                        format: "base64",
                    });
                }
            }
        }

        // Local path.
        let signer_id = self.resolve_signer_id()?;
        let signer = self.resolve_signer(&signer_id)?;
        let public_key = signer.public_key();

        let nonce = match options.nonce {
            Some(n) => n,
            None => {
                let view = self
                    .ctx
                    .rpc
                    .view_access_key(&signer_id, &public_key, None)
                    .await
                    .map_err(Error::Rpc)?;
                view.nonce + 1
            }
        };

        let max_block_height = match options.max_block_height {
            Some(h) => h,
            None => {
                let status = self.ctx.rpc.status().await.map_err(Error::Rpc)?;
                let offset = options
                    .block_height_offset
                    .unwrap_or(DEFAULT_DELEGATE_HEIGHT_OFFSET);
                status.sync_info.latest_block_height + offset
            }
        };

        let actions: Vec<NonDelegateAction> = self
            .actions
            .into_iter()
            .map(|a| NonDelegateAction::from_action(a).expect("nested delegates rejected above"))
            .collect();

        let delegate_action = DelegateAction {
            sender_id: signer_id,
            receiver_id,
            actions,
            nonce,
            max_block_height,
            public_key,
        };

        let hash = delegate_action.signing_hash();
        let signature = signer.sign(hash.as_bytes()).await?;
        let signed_delegate_action = delegate_action.into_signed(signature);
        let payload = signed_delegate_action.to_base64();

        Ok(DelegateResult {
            signed_delegate_action,
            payload,
            format: "base64",
        })
    }

    #[cfg(test)]
    pub(crate) fn actions(&self) -> &[Action] {
        &self.actions
    }

    #[cfg(test)]
    pub(crate) fn receiver(&self) -> &AccountId {
        &self.receiver_id
    }
}

impl IntoFuture for TransactionBuilder {
    type Output = Result<FinalExecutionOutcome, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        self.send().into_future()
    }
}

// ============================================================================
// CallBuilder
// ============================================================================

/// Configures one function call inside a transaction.
pub struct CallBuilder {
    builder: TransactionBuilder,
    method: String,
    args: Vec<u8>,
    gas: Gas,
    deposit: NearToken,
}

impl CallBuilder {
    fn new(builder: TransactionBuilder, method: String) -> Self {
        Self {
            builder,
            method,
            args: Vec::new(),
            gas: Gas::DEFAULT,
            deposit: NearToken::ZERO,
        }
    }

    /// JSON-serialized arguments.
    pub fn args<A: serde::Serialize>(mut self, args: A) -> Self {
        self.args = serde_json::to_vec(&args).unwrap_or_default();
        self
    }

    /// Raw argument bytes.
    pub fn args_raw(mut self, args: Vec<u8>) -> Self {
        self.args = args;
        self
    }

    /// Borsh-serialized arguments.
    pub fn args_borsh<A: borsh::BorshSerialize>(mut self, args: A) -> Self {
        self.args = borsh::to_vec(&args).unwrap_or_default();
        self
    }

    /// Attached gas.
    pub fn gas(mut self, gas: impl IntoGas) -> Self {
        if let Ok(gas) = gas.into_gas() {
            self.gas = gas;
        }
        self
    }

    /// Attached deposit.
    pub fn deposit(mut self, amount: impl IntoNearToken) -> Self {
        if let Ok(amount) = amount.into_near_token() {
            self.deposit = amount;
        }
        self
    }

    fn finish(self) -> TransactionBuilder {
        self.builder.push(Action::function_call(
            self.method,
            self.args,
            self.gas,
            self.deposit,
        ))
    }

    // Chaining: each method closes the current call and continues on the
    // transaction builder.

    pub fn call(self, method: &str) -> CallBuilder {
        self.finish().call(method)
    }

    pub fn create_account(self) -> TransactionBuilder {
        self.finish().create_account()
    }

    pub fn transfer(self, amount: impl IntoNearToken) -> TransactionBuilder {
        self.finish().transfer(amount)
    }

    pub fn deploy(self, code: impl Into<Vec<u8>>) -> TransactionBuilder {
        self.finish().deploy(code)
    }

    pub fn add_full_access_key(self, public_key: PublicKey) -> TransactionBuilder {
        self.finish().add_full_access_key(public_key)
    }

    pub fn delete_key(self, public_key: PublicKey) -> TransactionBuilder {
        self.finish().delete_key(public_key)
    }

    pub fn signer_id(self, signer_id: impl AsRef<str>) -> TransactionBuilder {
        self.finish().signer_id(signer_id)
    }

    pub fn sign_with(self, signer: impl Signer + 'static) -> TransactionBuilder {
        self.finish().sign_with(signer)
    }

    pub fn wait_until(self, status: TxExecutionStatus) -> TransactionBuilder {
        self.finish().wait_until(status)
    }

    /// Close the call and build a delegate action from the accumulated
    /// actions.
    pub async fn delegate(self, options: DelegateOptions) -> Result<DelegateResult, Error> {
        self.finish().delegate(options).await
    }

    /// Close the call and send the transaction.
    pub fn send(self) -> TransactionSend {
        self.finish().send()
    }

    /// Close the call, returning the transaction builder.
    pub fn done(self) -> TransactionBuilder {
        self.finish()
    }
}

impl IntoFuture for CallBuilder {
    type Output = Result<FinalExecutionOutcome, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        self.send().into_future()
    }
}

// ============================================================================
// TransactionSend
// ============================================================================

/// Pending submission; configure and await.
pub struct TransactionSend {
    builder: TransactionBuilder,
}

impl TransactionSend {
    /// The execution level to wait for.
    pub fn wait_until(mut self, status: TxExecutionStatus) -> Self {
        self.builder.wait_until = status;
        self
    }
}

impl IntoFuture for TransactionSend {
    type Output = Result<FinalExecutionOutcome, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.builder.send_inner())
    }
}
