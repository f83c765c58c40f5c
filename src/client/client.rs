//! The top-level client: configuration plus the operation surface.

use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::types::nep413::{SignMessageParams, SignedMessage};
use crate::types::{
    AccountId, CryptoHash, FinalExecutionOutcome, IntoNearToken, KeyPair, Network,
    SignedTransaction, TransactionView, TxExecutionStatus,
};

use super::keystore::{InMemoryKeyStore, KeyStore};
use super::nonce_manager::NonceManager;
use super::query::{AccessKeysQuery, AccountExistsQuery, AccountQuery, BalanceQuery, ViewCall};
use super::rpc::{RetryConfig, RpcClient, LOCALNET, MAINNET, TESTNET};
use super::signer::Signer;
use super::transaction::{BuilderContext, CallBuilder, TransactionBuilder};
use super::wallet::Wallet;

/// The composition point: holds the RPC connection, key store, optional
/// wallet and defaults, and hands out query and transaction builders.
#[derive(Clone)]
pub struct Client {
    ctx: Arc<BuilderContext>,
    network: Network,
}

impl Client {
    /// Builder preset for mainnet.
    pub fn mainnet() -> ClientBuilder {
        ClientBuilder::new(MAINNET.rpc_url, Network::Mainnet)
    }

    /// Builder preset for testnet.
    pub fn testnet() -> ClientBuilder {
        ClientBuilder::new(TESTNET.rpc_url, Network::Testnet)
    }

    /// Builder preset for a local node.
    pub fn localnet() -> ClientBuilder {
        ClientBuilder::new(LOCALNET.rpc_url, Network::Localnet)
    }

    /// Builder for a custom endpoint.
    pub fn custom(rpc_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(rpc_url, Network::Custom)
    }

    /// The underlying RPC client.
    pub fn rpc(&self) -> &RpcClient {
        &self.ctx.rpc
    }

    /// The endpoint URL.
    pub fn rpc_url(&self) -> &str {
        self.ctx.rpc.url()
    }

    /// The network this client targets.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The default signing account, if configured.
    pub fn default_signer_id(&self) -> Option<&AccountId> {
        self.ctx.default_signer_id.as_ref()
    }

    /// The key store.
    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.ctx.key_store
    }

    /// The nonce manager shared by every builder of this client. Exposed
    /// so tests can [`clear`](NonceManager::clear) it between cases.
    pub fn nonce_manager(&self) -> &NonceManager {
        &self.ctx.nonce_manager
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Call a view function. Resolves to `None` when the contract returns
    /// empty bytes, otherwise parses the result as JSON.
    pub fn view<T>(&self, contract_id: impl AsRef<str>, method: &str) -> ViewCall<T> {
        let contract_id = AccountId::parse_lenient(contract_id);
        ViewCall::new(self.ctx.rpc.clone(), contract_id, method.to_string())
    }

    /// Full account state.
    pub fn account(&self, account_id: impl AsRef<str>) -> AccountQuery {
        AccountQuery::new(self.ctx.rpc.clone(), AccountId::parse_lenient(account_id))
    }

    /// Balance summary.
    pub fn balance(&self, account_id: impl AsRef<str>) -> BalanceQuery {
        BalanceQuery::new(self.ctx.rpc.clone(), AccountId::parse_lenient(account_id))
    }

    /// All access keys of an account.
    pub fn access_keys(&self, account_id: impl AsRef<str>) -> AccessKeysQuery {
        AccessKeysQuery::new(self.ctx.rpc.clone(), AccountId::parse_lenient(account_id))
    }

    /// Whether an account exists.
    pub fn account_exists(&self, account_id: impl AsRef<str>) -> AccountExistsQuery {
        AccountExistsQuery::new(self.ctx.rpc.clone(), AccountId::parse_lenient(account_id))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Start a multi-action transaction against `receiver_id`.
    pub fn transaction(&self, receiver_id: impl AsRef<str>) -> TransactionBuilder {
        TransactionBuilder::new(self.ctx.clone(), AccountId::parse_lenient(receiver_id))
    }

    /// Transfer tokens.
    pub fn transfer(
        &self,
        receiver_id: impl AsRef<str>,
        amount: impl IntoNearToken,
    ) -> TransactionBuilder {
        self.transaction(receiver_id).transfer(amount)
    }

    /// Call a contract method.
    pub fn call(&self, contract_id: impl AsRef<str>, method: &str) -> CallBuilder {
        self.transaction(contract_id).call(method)
    }

    /// Submit a pre-signed transaction at the client's default wait level.
    pub async fn send(
        &self,
        signed_tx: &SignedTransaction,
    ) -> Result<FinalExecutionOutcome, Error> {
        self.send_with_options(signed_tx, self.ctx.default_wait_until)
            .await
    }

    /// Submit a pre-signed transaction, waiting until `wait_until`.
    pub async fn send_with_options(
        &self,
        signed_tx: &SignedTransaction,
        wait_until: TxExecutionStatus,
    ) -> Result<FinalExecutionOutcome, Error> {
        let mut outcome = self.ctx.rpc.send_tx(signed_tx, wait_until).await?;
        if outcome.is_pending() && outcome.transaction.is_none() {
            outcome.transaction = Some(TransactionView::minimal(
                signed_tx.hash(),
                signed_tx.transaction.signer_id.clone(),
                signed_tx.transaction.receiver_id.clone(),
                signed_tx.transaction.nonce,
            ));
        }
        Ok(outcome)
    }

    /// Fetch the status of a previously submitted transaction.
    pub async fn transaction_status(
        &self,
        tx_hash: &CryptoHash,
        sender_id: impl AsRef<str>,
        wait_until: TxExecutionStatus,
    ) -> Result<FinalExecutionOutcome, Error> {
        let sender_id = AccountId::parse_lenient(sender_id);
        self.ctx
            .rpc
            .tx_status(tx_hash, &sender_id, wait_until)
            .await
            .map_err(Error::Rpc)
    }

    // ========================================================================
    // Off-chain signing (NEP-413)
    // ========================================================================

    /// Sign an off-chain message.
    ///
    /// A wallet advertising the capability is tried first; on wallet
    /// failure the key store signs instead.
    pub async fn sign_message(&self, params: SignMessageParams) -> Result<SignedMessage, Error> {
        if let Some(wallet) = &self.ctx.wallet {
            if wallet.supports_sign_message() {
                match wallet.sign_message(params.clone()).await {
                    Ok(signed) => return Ok(signed),
                    Err(e) => {
                        debug!(error = %e, "wallet signMessage failed, falling back to key store");
                    }
                }
            }
        }

        let signer_id = self
            .ctx
            .default_signer_id
            .clone()
            .ok_or(Error::NoSignerAccount)?;
        let signer: Arc<dyn Signer> = match &self.ctx.signer {
            Some(signer) => signer.clone(),
            None => self
                .ctx
                .key_store
                .get(&signer_id)
                .map(|pair| Arc::new(pair) as Arc<dyn Signer>)
                .ok_or(Error::NoSigner)?,
        };
        signer
            .sign_nep413(&signer_id, &params)
            .await
            .map_err(Error::Signing)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("rpc_url", &self.rpc_url())
            .field("network", &self.network)
            .field("default_signer_id", &self.ctx.default_signer_id)
            .finish()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    rpc_url: String,
    network: Network,
    headers: Vec<(String, String)>,
    retry_config: RetryConfig,
    key_store: Option<Arc<dyn KeyStore>>,
    pending_keys: Vec<(AccountId, KeyPair)>,
    pending_default_key: Option<KeyPair>,
    signer: Option<Arc<dyn Signer>>,
    wallet: Option<Arc<dyn Wallet>>,
    default_signer_id: Option<AccountId>,
    default_wait_until: TxExecutionStatus,
}

impl ClientBuilder {
    fn new(rpc_url: impl Into<String>, network: Network) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            network,
            headers: Vec::new(),
            retry_config: RetryConfig::default(),
            key_store: None,
            pending_keys: Vec::new(),
            pending_default_key: None,
            signer: None,
            wallet: None,
            default_signer_id: None,
            default_wait_until: TxExecutionStatus::ExecutedOptimistic,
        }
    }

    /// Override the resolved endpoint.
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    /// Extra HTTP headers on every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Retry behavior for the RPC transport.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Use an existing key store.
    pub fn key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    /// Register `account_id → secret_key` pairs into the key store.
    pub fn keys<A: AsRef<str>, K: AsRef<str>>(mut self, keys: &[(A, K)]) -> Result<Self, Error> {
        for (account_id, secret_key) in keys {
            let account_id: AccountId = account_id.as_ref().parse()?;
            let pair: KeyPair = secret_key.as_ref().parse()?;
            self.pending_keys.push((account_id, pair));
        }
        Ok(self)
    }

    /// Register a secret key under the default signer ID.
    pub fn private_key(mut self, secret_key: impl AsRef<str>) -> Result<Self, Error> {
        self.pending_default_key = Some(secret_key.as_ref().parse::<KeyPair>()?);
        Ok(self)
    }

    /// Register a key and make its account the default signer.
    pub fn credentials(
        mut self,
        secret_key: impl AsRef<str>,
        account_id: impl AsRef<str>,
    ) -> Result<Self, Error> {
        let account_id: AccountId = account_id.as_ref().parse()?;
        let pair: KeyPair = secret_key.as_ref().parse()?;
        self.pending_keys.push((account_id.clone(), pair));
        self.default_signer_id = Some(account_id);
        Ok(self)
    }

    /// Low-level signing override: every transaction is signed through
    /// this signer instead of the key store.
    pub fn signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Attach a wallet adapter.
    pub fn wallet(mut self, wallet: impl Wallet + 'static) -> Self {
        self.wallet = Some(Arc::new(wallet));
        self
    }

    /// The account to sign as when none is supplied per call.
    pub fn default_signer_id(mut self, account_id: impl AsRef<str>) -> Result<Self, Error> {
        self.default_signer_id = Some(account_id.as_ref().parse()?);
        Ok(self)
    }

    /// The execution level sends wait for by default.
    pub fn default_wait_until(mut self, status: TxExecutionStatus) -> Self {
        self.default_wait_until = status;
        self
    }

    /// Build the client.
    ///
    /// Fails when a bare `private_key` was supplied without a
    /// `default_signer_id` to register it under.
    pub fn build(self) -> Result<Client, Error> {
        let key_store = self
            .key_store
            .unwrap_or_else(|| Arc::new(InMemoryKeyStore::new()));

        for (account_id, pair) in &self.pending_keys {
            key_store.add(account_id, pair.clone());
        }

        if let Some(pair) = self.pending_default_key {
            let account_id = self.default_signer_id.clone().ok_or_else(|| {
                Error::Config(
                    "private_key requires default_signer_id to register under".to_string(),
                )
            })?;
            key_store.add(&account_id, pair);
        }

        let rpc = Arc::new(RpcClient::with_config(
            self.rpc_url,
            self.retry_config,
            &self.headers,
        ));

        Ok(Client {
            ctx: Arc::new(BuilderContext {
                rpc,
                key_store,
                nonce_manager: Arc::new(NonceManager::new()),
                wallet: self.wallet,
                signer: self.signer,
                default_signer_id: self.default_signer_id,
                default_wait_until: self.default_wait_until,
            }),
            network: self.network,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::wallet::{
        SignDelegateRequest, WalletAccount, WalletSignedDelegate, WalletTransaction,
    };
    use crate::error::WalletError;
    use crate::types::{
        Action, DelegateAction, Gas, NearToken, NonDelegateAction, SecretKey, Signature,
    };
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    fn minimal_outcome() -> FinalExecutionOutcome {
        serde_json::from_value(serde_json::json!({ "final_execution_status": "NONE" })).unwrap()
    }

    #[test]
    fn builder_defaults() {
        let client = Client::testnet().build().unwrap();
        assert_eq!(client.network(), Network::Testnet);
        assert!(client.default_signer_id().is_none());
        assert!(client.rpc_url().contains("fastnear") || client.rpc_url().contains("test"));
    }

    #[test]
    fn builder_custom_url_and_headers() {
        let client = Client::custom("https://rpc.example.com")
            .header("x-api-key", "secret")
            .build()
            .unwrap();
        assert_eq!(client.rpc_url(), "https://rpc.example.com");
        assert_eq!(client.network(), Network::Custom);
    }

    #[test]
    fn credentials_register_key_and_default_signer() {
        let pair = KeyPair::random();
        let client = Client::testnet()
            .credentials(pair.secret_key.to_string(), "alice.testnet")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(client.default_signer_id().unwrap().as_str(), "alice.testnet");
        let stored = client
            .key_store()
            .get(&"alice.testnet".parse().unwrap())
            .unwrap();
        assert_eq!(stored.public_key, pair.public_key);
    }

    #[test]
    fn private_key_without_default_signer_is_a_config_error() {
        let pair = KeyPair::random();
        let result = Client::testnet()
            .private_key(pair.secret_key.to_string())
            .unwrap()
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn keys_map_registers_multiple_accounts() {
        let alice = KeyPair::random();
        let bob = KeyPair::random();
        let client = Client::testnet()
            .keys(&[
                ("alice.testnet", alice.secret_key.to_string().as_str()),
                ("bob.testnet", bob.secret_key.to_string().as_str()),
            ])
            .unwrap()
            .build()
            .unwrap();

        assert!(client.key_store().contains(&"alice.testnet".parse().unwrap()));
        assert!(client.key_store().contains(&"bob.testnet".parse().unwrap()));
    }

    // ========================================================================
    // Wallet path
    // ========================================================================

    /// Spy wallet: records submitted transactions, optionally signs
    /// delegate actions with a fixed shape.
    struct SpyWallet {
        sent: Arc<Mutex<Vec<WalletTransaction>>>,
        delegate_shape: Option<DelegateShape>,
    }

    #[derive(Clone, Copy)]
    enum DelegateShape {
        Flat,
        Wrapped,
    }

    impl SpyWallet {
        fn signed_delegate(&self) -> (DelegateAction, Signature) {
            let secret = SecretKey::generate_ed25519();
            let delegate_action = DelegateAction {
                sender_id: "user.near".parse().unwrap(),
                receiver_id: "contract.near".parse().unwrap(),
                actions: vec![NonDelegateAction::from_action(Action::transfer(
                    NearToken::near(1),
                ))
                .unwrap()],
                nonce: 42,
                max_block_height: 1000,
                public_key: secret.public_key(),
            };
            let signature = secret.sign(delegate_action.signing_hash().as_bytes());
            (delegate_action, signature)
        }
    }

    impl Wallet for SpyWallet {
        fn get_accounts(&self) -> BoxFuture<'_, Result<Vec<WalletAccount>, WalletError>> {
            Box::pin(async {
                Ok(vec![WalletAccount {
                    account_id: "wallet-user.near".parse().unwrap(),
                    public_key: None,
                }])
            })
        }

        fn sign_and_send_transaction(
            &self,
            transaction: WalletTransaction,
        ) -> BoxFuture<'_, Result<FinalExecutionOutcome, WalletError>> {
            self.sent.lock().unwrap().push(transaction);
            Box::pin(async { Ok(minimal_outcome()) })
        }

        fn supports_sign_delegate_actions(&self) -> bool {
            self.delegate_shape.is_some()
        }

        fn sign_delegate_actions(
            &self,
            _request: SignDelegateRequest,
        ) -> BoxFuture<'_, Result<Vec<WalletSignedDelegate>, WalletError>> {
            let (delegate_action, signature) = self.signed_delegate();
            let shape = self.delegate_shape.expect("capability checked");
            Box::pin(async move {
                Ok(vec![match shape {
                    DelegateShape::Flat => WalletSignedDelegate::Flat {
                        delegate_action,
                        signature,
                    },
                    DelegateShape::Wrapped => {
                        WalletSignedDelegate::Wrapped(delegate_action.into_signed(signature))
                    }
                }])
            })
        }
    }

    #[tokio::test]
    async fn call_through_wallet_translates_action_and_skips_key_store() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let client = Client::custom("http://unreachable.invalid")
            .wallet(SpyWallet {
                sent: sent.clone(),
                delegate_shape: None,
            })
            .build()
            .unwrap();
        // The key store stays empty: the wallet path must not consult it.
        assert!(client.key_store().list().is_empty());

        client
            .call("counter.near", "increment")
            .args(serde_json::json!({ "by": 1 }))
            .gas("30 Tgas")
            .deposit("1 yocto")
            .send()
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].receiver_id.as_str(), "counter.near");
        assert_eq!(sent[0].actions.len(), 1);
        match &sent[0].actions[0] {
            Action::FunctionCall(fc) => {
                assert_eq!(fc.method_name, "increment");
                assert_eq!(fc.args, b"{\"by\":1}");
                assert_eq!(fc.gas, Gas::tgas(30));
                assert_eq!(fc.deposit, NearToken::ONE_YOCTO);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wallet_delegate_shapes_normalize_identically() {
        let mut results = Vec::new();
        for shape in [DelegateShape::Flat, DelegateShape::Wrapped] {
            let client = Client::custom("http://unreachable.invalid")
                .wallet(SpyWallet {
                    sent: Arc::new(Mutex::new(Vec::new())),
                    delegate_shape: Some(shape),
                })
                .build()
                .unwrap();

            let result = client
                .transaction("contract.near")
                .transfer(NearToken::near(1))
                .delegate(Default::default())
                .await
                .unwrap();
            assert_eq!(result.format, "base64");
            results.push(result);
        }

        // Same structural fields regardless of the wallet's response shape.
        assert_eq!(results[0].sender_id(), results[1].sender_id());
        assert_eq!(results[0].receiver_id(), results[1].receiver_id());
        assert_eq!(
            results[0].signed_delegate_action.delegate_action.nonce,
            results[1].signed_delegate_action.delegate_action.nonce
        );
    }

    // ========================================================================
    // Builder validation (no network needed)
    // ========================================================================

    #[tokio::test]
    async fn delegate_requires_actions() {
        let pair = KeyPair::random();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let err = client
            .transaction("contract.near")
            .delegate(Default::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("requires at least one action"));
    }

    #[tokio::test]
    async fn delegate_rejects_nested_delegates() {
        let pair = KeyPair::random();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let secret = SecretKey::generate_ed25519();
        let inner = DelegateAction {
            sender_id: "user.near".parse().unwrap(),
            receiver_id: "contract.near".parse().unwrap(),
            actions: vec![NonDelegateAction::from_action(Action::transfer(
                NearToken::near(1),
            ))
            .unwrap()],
            nonce: 1,
            max_block_height: 10,
            public_key: secret.public_key(),
        };
        let signed = inner.clone().into_signed(secret.sign(inner.signing_hash().as_bytes()));

        let err = client
            .transaction("user.near")
            .signed_delegate_action(signed)
            .delegate(Default::default())
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("cannot contain nested signed delegate actions"));
    }

    #[tokio::test]
    async fn delegate_signs_locally_with_explicit_options() {
        let pair = KeyPair::random();
        let public_key = pair.public_key.clone();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let result = client
            .transaction("contract.near")
            .transfer(NearToken::near(1))
            .delegate(crate::client::DelegateOptions {
                nonce: Some(100),
                max_block_height: Some(5000),
                ..Default::default()
            })
            .await
            .unwrap();

        let da = &result.signed_delegate_action.delegate_action;
        assert_eq!(da.sender_id.as_str(), "alice.near");
        assert_eq!(da.receiver_id.as_str(), "contract.near");
        assert_eq!(da.nonce, 100);
        assert_eq!(da.max_block_height, 5000);
        assert_eq!(da.public_key, public_key);
        assert!(result.signed_delegate_action.verify());

        // The payload is the base64 of the Borsh-encoded signed delegate.
        assert_eq!(result.payload, result.signed_delegate_action.to_base64());
    }

    #[tokio::test]
    async fn delegate_receiver_override() {
        let pair = KeyPair::random();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let result = client
            .transaction("inferred.near")
            .transfer(NearToken::near(1))
            .delegate(crate::client::DelegateOptions {
                receiver_id: Some("explicit.near".parse().unwrap()),
                nonce: Some(1),
                max_block_height: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.receiver_id().as_str(), "explicit.near");
    }

    #[tokio::test]
    async fn offline_sign_caches_and_mutation_invalidates() {
        let pair = KeyPair::random();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let block_hash = CryptoHash::hash(b"block");
        let mut builder = client.transaction("bob.near").transfer(NearToken::near(1));
        assert!(builder.serialize().is_err(), "no signature yet");

        builder.sign_offline(101, block_hash).await.unwrap();
        let first_hash = *builder.hash().unwrap();
        let first_bytes = builder.serialize().unwrap();
        assert!(!first_bytes.is_empty());

        // Mutation drops the cache; re-signing yields a different hash.
        let mut builder = builder.transfer(NearToken::near(2));
        assert!(builder.hash().is_none());
        assert!(matches!(builder.serialize(), Err(Error::NotSigned)));

        builder.sign_offline(101, block_hash).await.unwrap();
        assert_ne!(*builder.hash().unwrap(), first_hash);
    }

    #[tokio::test]
    async fn offline_sign_verifies_and_hash_matches_wire_bytes() {
        let pair = KeyPair::random();
        let public_key = pair.public_key.clone();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let mut builder = client.transaction("bob.near").transfer(NearToken::near(1));
        let signed = builder
            .sign_offline(7, CryptoHash::hash(b"recent"))
            .await
            .unwrap()
            .clone();

        assert_eq!(signed.transaction.nonce, 7);
        assert!(signed
            .signature
            .verify(signed.hash().as_bytes(), &public_key));
    }

    #[tokio::test]
    async fn send_without_actions_fails() {
        let pair = KeyPair::random();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let err = client.transaction("bob.near").send().await.unwrap_err();
        assert!(err.to_string().contains("at least one action"));
    }

    #[tokio::test]
    async fn missing_signer_account_is_reported() {
        let client = Client::custom("http://unreachable.invalid").build().unwrap();
        let mut builder = client.transaction("bob.near").transfer(NearToken::near(1));
        let err = builder
            .sign_offline(1, CryptoHash::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSignerAccount));
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let client = Client::custom("http://unreachable.invalid")
            .default_signer_id("alice.near")
            .unwrap()
            .build()
            .unwrap();
        let mut builder = client.transaction("bob.near").transfer(NearToken::near(1));
        let err = builder
            .sign_offline(1, CryptoHash::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSigner));
    }

    #[tokio::test]
    async fn sign_message_uses_key_store() {
        let pair = KeyPair::random();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let params = SignMessageParams {
            message: "Log in".to_string(),
            recipient: "app.example".to_string(),
            nonce: crate::types::nep413::generate_nonce(),
            callback_url: None,
            state: None,
        };
        let signed = client.sign_message(params.clone()).await.unwrap();
        assert_eq!(signed.account_id.as_str(), "alice.near");
        assert!(crate::types::nep413::verify_signature(
            &signed,
            &params,
            crate::types::nep413::DEFAULT_MAX_AGE
        ));
    }

    #[tokio::test]
    async fn sign_message_rejects_secp256k1_keys() {
        let pair = KeyPair::from_secret_key(SecretKey::generate_secp256k1());
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "alice.near")
            .unwrap()
            .build()
            .unwrap();

        let params = SignMessageParams {
            message: "Log in".to_string(),
            recipient: "app.example".to_string(),
            nonce: crate::types::nep413::generate_nonce(),
            callback_url: None,
            state: None,
        };
        let err = client.sign_message(params).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Signing(crate::error::SignerError::UnsupportedOperation(_))
        ));
    }

    #[tokio::test]
    async fn relayer_builder_pins_receiver_to_delegate_sender() {
        let pair = KeyPair::random();
        let client = Client::custom("http://unreachable.invalid")
            .credentials(pair.secret_key.to_string(), "relayer.near")
            .unwrap()
            .build()
            .unwrap();

        let secret = SecretKey::generate_ed25519();
        let da = DelegateAction {
            sender_id: "user.near".parse().unwrap(),
            receiver_id: "contract.near".parse().unwrap(),
            actions: vec![NonDelegateAction::from_action(Action::transfer(
                NearToken::near(1),
            ))
            .unwrap()],
            nonce: 1,
            max_block_height: 10,
            public_key: secret.public_key(),
        };
        let signed = da.clone().into_signed(secret.sign(da.signing_hash().as_bytes()));

        let mut builder = client
            .transaction("anything.near")
            .signed_delegate_action(signed);
        assert_eq!(builder.receiver().as_str(), "user.near");
        assert_eq!(builder.actions().len(), 1);

        // The wrapping transaction passes structural validation.
        builder
            .sign_offline(1, CryptoHash::hash(b"b"))
            .await
            .unwrap();
    }
}
