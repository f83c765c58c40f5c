//! Query builders for read operations.
//!
//! Each builder implements `IntoFuture` and is awaited directly; block
//! reference and finality can be adjusted before awaiting.

use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{Error, RpcError};
use crate::types::{
    AccessKeyListView, AccountBalance, AccountId, AccountView, BlockReference, CryptoHash,
    Finality, ViewFunctionResult,
};

use super::rpc::RpcClient;

/// View-function call against a contract.
///
/// Resolves to `Option<T>`: a contract returning empty bytes yields
/// `None`, anything else is parsed as JSON.
pub struct ViewCall<T> {
    rpc: Arc<RpcClient>,
    contract_id: AccountId,
    method: String,
    args: Vec<u8>,
    block_ref: Option<BlockReference>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ViewCall<T> {
    pub(crate) fn new(rpc: Arc<RpcClient>, contract_id: AccountId, method: String) -> Self {
        Self {
            rpc,
            contract_id,
            method,
            args: Vec::new(),
            block_ref: None,
            _marker: PhantomData,
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

    /// Query at a specific block height.
    pub fn at_block(mut self, height: u64) -> Self {
        self.block_ref = Some(BlockReference::Height(height));
        self
    }

    /// Query at a specific block hash.
    pub fn at_block_hash(mut self, hash: CryptoHash) -> Self {
        self.block_ref = Some(BlockReference::Hash(hash));
        self
    }

    /// Query with a specific finality.
    pub fn finality(mut self, finality: Finality) -> Self {
        self.block_ref = Some(BlockReference::Finality(finality));
        self
    }

    /// Fetch the raw result (bytes, logs, block info) without JSON
    /// decoding.
    pub async fn fetch_raw(self) -> Result<ViewFunctionResult, Error> {
        self.rpc
            .view_function(
                &self.contract_id,
                &self.method,
                &self.args,
                self.block_ref.as_ref(),
            )
            .await
            .map_err(Error::Rpc)
    }
}

impl<T: DeserializeOwned + Send + 'static> IntoFuture for ViewCall<T> {
    type Output = Result<Option<T>, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let result = self.fetch_raw().await?;
            if result.result.is_empty() {
                return Ok(None);
            }
            result.json::<T>().map(Some).map_err(Error::Json)
        })
    }
}

macro_rules! block_ref_setters {
    () => {
        /// Query at a specific block height.
        pub fn at_block(mut self, height: u64) -> Self {
            self.block_ref = Some(BlockReference::Height(height));
            self
        }

        /// Query at a specific block hash.
        pub fn at_block_hash(mut self, hash: CryptoHash) -> Self {
            self.block_ref = Some(BlockReference::Hash(hash));
            self
        }

        /// Query with a specific finality.
        pub fn finality(mut self, finality: Finality) -> Self {
            self.block_ref = Some(BlockReference::Finality(finality));
            self
        }
    };
}

/// Full account state query.
pub struct AccountQuery {
    rpc: Arc<RpcClient>,
    account_id: AccountId,
    block_ref: Option<BlockReference>,
}

impl AccountQuery {
    pub(crate) fn new(rpc: Arc<RpcClient>, account_id: AccountId) -> Self {
        Self {
            rpc,
            account_id,
            block_ref: None,
        }
    }

    block_ref_setters!();
}

impl IntoFuture for AccountQuery {
    type Output = Result<AccountView, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            self.rpc
                .view_account(&self.account_id, self.block_ref.as_ref())
                .await
                .map_err(Error::Rpc)
        })
    }
}

/// Balance summary query.
pub struct BalanceQuery {
    rpc: Arc<RpcClient>,
    account_id: AccountId,
    block_ref: Option<BlockReference>,
}

impl BalanceQuery {
    pub(crate) fn new(rpc: Arc<RpcClient>, account_id: AccountId) -> Self {
        Self {
            rpc,
            account_id,
            block_ref: None,
        }
    }

    block_ref_setters!();
}

impl IntoFuture for BalanceQuery {
    type Output = Result<AccountBalance, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let view = self
                .rpc
                .view_account(&self.account_id, self.block_ref.as_ref())
                .await?;
            Ok(AccountBalance::from(view))
        })
    }
}

/// Access-key list query.
pub struct AccessKeysQuery {
    rpc: Arc<RpcClient>,
    account_id: AccountId,
    block_ref: Option<BlockReference>,
}

impl AccessKeysQuery {
    pub(crate) fn new(rpc: Arc<RpcClient>, account_id: AccountId) -> Self {
        Self {
            rpc,
            account_id,
            block_ref: None,
        }
    }

    block_ref_setters!();
}

impl IntoFuture for AccessKeysQuery {
    type Output = Result<AccessKeyListView, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            self.rpc
                .view_access_key_list(&self.account_id, self.block_ref.as_ref())
                .await
                .map_err(Error::Rpc)
        })
    }
}

/// Existence probe: resolves to `false` on the account-not-found error
/// instead of failing.
pub struct AccountExistsQuery {
    rpc: Arc<RpcClient>,
    account_id: AccountId,
    block_ref: Option<BlockReference>,
}

impl AccountExistsQuery {
    pub(crate) fn new(rpc: Arc<RpcClient>, account_id: AccountId) -> Self {
        Self {
            rpc,
            account_id,
            block_ref: None,
        }
    }

    block_ref_setters!();
}

impl IntoFuture for AccountExistsQuery {
    type Output = Result<bool, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            match self
                .rpc
                .view_account(&self.account_id, self.block_ref.as_ref())
                .await
            {
                Ok(_) => Ok(true),
                Err(RpcError::AccountNotFound(_)) => Ok(false),
                Err(e) => Err(Error::Rpc(e)),
            }
        })
    }
}
