//! JSON-RPC client for NEAR nodes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::error::RpcError;
use crate::types::{
    AccessKeyListView, AccessKeyView, AccountId, AccountView, ActionView, BlockReference,
    CryptoHash, FinalExecutionOutcome, GasPrice, PublicKey, SignedTransaction, StatusResponse,
    TxExecutionStatus, ViewFunctionResult,
};

/// Network endpoint preset.
pub struct NetworkConfig {
    pub rpc_url: &'static str,
    pub network_id: &'static str,
}

/// Mainnet preset.
pub const MAINNET: NetworkConfig = NetworkConfig {
    rpc_url: "https://free.rpc.fastnear.com",
    network_id: "mainnet",
};

/// Testnet preset.
pub const TESTNET: NetworkConfig = NetworkConfig {
    rpc_url: "https://test.rpc.fastnear.com",
    network_id: "testnet",
};

/// Local node preset.
pub const LOCALNET: NetworkConfig = NetworkConfig {
    rpc_url: "http://127.0.0.1:3030",
    network_id: "localnet",
};

/// Retry behavior for transport-level failures.
///
/// Total attempts are `1 + max_retries`; the delay before retry N
/// (0-indexed) is `initial_delay_ms * 2^N`.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry `attempt` (0-indexed).
    pub fn delay_before_retry(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.initial_delay_ms.saturating_mul(1u64 << attempt.min(32)))
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    id: Option<serde_json::Value>,
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// NEAR nodes attach a structured `cause` (and sometimes a legacy
/// top-level `name`) to RPC errors; classification prefers the cause.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    cause: Option<ErrorCause>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorCause {
    name: String,
    #[serde(default)]
    info: Option<serde_json::Value>,
}

// Query responses put failures in an in-result `error` string instead of
// the JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Option<Vec<u8>>,
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    block_height: u64,
    #[serde(default)]
    block_hash: Option<CryptoHash>,
    #[serde(default)]
    error: Option<String>,
}

/// JSON-RPC 2.0 client with retry and error classification.
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    headers: HeaderMap,
    retry_config: RetryConfig,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create a client with default retry behavior.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_config(url, RetryConfig::default(), &[])
    }

    /// Create a client with explicit retry behavior and extra headers
    /// applied to every request.
    pub fn with_config(
        url: impl Into<String>,
        retry_config: RetryConfig,
        headers: &[(String, String)],
    ) -> Self {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                header_map.insert(name, value);
            }
        }
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            headers: header_map,
            retry_config,
            request_id: AtomicU64::new(0),
        }
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a raw RPC call, retrying retryable failures with exponential
    /// backoff.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcError> {
        let total_attempts = self.retry_config.max_retries + 1;

        let mut last_err = None;
        for attempt in 0..total_attempts {
            if attempt > 0 {
                let delay = self.retry_config.delay_before_retry(attempt - 1);
                debug!(method, attempt, ?delay, "retrying rpc call");
                tokio::time::sleep(delay).await;
            }

            let request = JsonRpcRequest {
                jsonrpc: "2.0",
                id: self.request_id.fetch_add(1, Ordering::Relaxed),
                method,
                params: &params,
            };

            match self.try_call::<R>(&request).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < total_attempts - 1 => {
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(RpcError::RetriesExhausted(total_attempts)))
    }

    async fn try_call<R: DeserializeOwned>(
        &self,
        request: &JsonRpcRequest<'_, impl Serialize>,
    ) -> Result<R, RpcError> {
        let response = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RpcError::network(
                format!("HTTP {status}: {body}"),
                Some(status.as_u16()),
                is_retryable_status(status.as_u16()),
            ));
        }

        let rpc_response: JsonRpcResponse<R> = serde_json::from_str(&body)?;

        if let Some(error) = rpc_response.error {
            return Err(parse_rpc_error(&error));
        }

        rpc_response
            .result
            .ok_or_else(|| RpcError::InvalidResponse("missing result in response".to_string()))
    }

    // ========================================================================
    // Query surface
    // ========================================================================

    /// Run a `query` request. A block reference is merged into the params;
    /// when none is given the query runs at `finality: "final"`.
    pub async fn query<R: DeserializeOwned>(
        &self,
        mut params: serde_json::Value,
        block: Option<&BlockReference>,
    ) -> Result<R, RpcError> {
        let block_params = block
            .map(BlockReference::to_rpc_params)
            .unwrap_or_else(|| BlockReference::final_().to_rpc_params());
        if let (Some(map), serde_json::Value::Object(extra)) =
            (params.as_object_mut(), block_params)
        {
            map.extend(extra);
        }
        self.call("query", params).await
    }

    /// View account state.
    pub async fn view_account(
        &self,
        account_id: &AccountId,
        block: Option<&BlockReference>,
    ) -> Result<AccountView, RpcError> {
        let params = serde_json::json!({
            "request_type": "view_account",
            "account_id": account_id,
        });
        let value: serde_json::Value = self.query(params, block).await?;
        if let Some(error) = in_result_error(&value) {
            if error.contains("does not exist") {
                return Err(RpcError::AccountNotFound(account_id.clone()));
            }
            return Err(RpcError::InvalidResponse(error.to_string()));
        }
        serde_json::from_value(value).map_err(RpcError::Json)
    }

    /// View one access key.
    pub async fn view_access_key(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
        block: Option<&BlockReference>,
    ) -> Result<AccessKeyView, RpcError> {
        let params = serde_json::json!({
            "request_type": "view_access_key",
            "account_id": account_id,
            "public_key": public_key.to_string(),
        });
        let value: serde_json::Value = self.query(params, block).await?;
        if let Some(error) = in_result_error(&value) {
            if error.contains("does not exist") {
                return Err(RpcError::AccessKeyNotFound {
                    account_id: account_id.clone(),
                    public_key: public_key.clone(),
                });
            }
            return Err(RpcError::InvalidResponse(error.to_string()));
        }
        serde_json::from_value(value).map_err(RpcError::Json)
    }

    /// View all access keys of an account.
    pub async fn view_access_key_list(
        &self,
        account_id: &AccountId,
        block: Option<&BlockReference>,
    ) -> Result<AccessKeyListView, RpcError> {
        let params = serde_json::json!({
            "request_type": "view_access_key_list",
            "account_id": account_id,
        });
        self.query(params, block).await
    }

    /// Call a view function on a contract.
    pub async fn view_function(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: &[u8],
        block: Option<&BlockReference>,
    ) -> Result<ViewFunctionResult, RpcError> {
        let params = serde_json::json!({
            "request_type": "call_function",
            "account_id": contract_id,
            "method_name": method_name,
            "args_base64": STANDARD.encode(args),
        });
        let response: QueryResponse = self.query(params, block).await?;

        if let Some(error) = response.error {
            if error.contains("CodeDoesNotExist") || error.contains("no contract code") {
                return Err(RpcError::ContractNotDeployed(contract_id.clone()));
            }
            if error.contains("does not exist") {
                return Err(RpcError::AccountNotFound(contract_id.clone()));
            }
            return Err(RpcError::ContractExecution {
                contract_id: contract_id.clone(),
                method_name: Some(method_name.to_string()),
                message: error,
            });
        }

        Ok(ViewFunctionResult {
            result: response.result.unwrap_or_default(),
            logs: response.logs,
            block_height: response.block_height,
            block_hash: response.block_hash.unwrap_or_default(),
        })
    }

    // ========================================================================
    // Node info
    // ========================================================================

    /// Node status (chain head, sync state, version).
    pub async fn status(&self) -> Result<StatusResponse, RpcError> {
        self.call("status", serde_json::json!([])).await
    }

    /// Current gas price, optionally at a specific block hash.
    pub async fn gas_price(&self, block_hash: Option<&CryptoHash>) -> Result<GasPrice, RpcError> {
        let params = match block_hash {
            Some(hash) => serde_json::json!([hash.to_string()]),
            None => serde_json::json!([serde_json::Value::Null]),
        };
        self.call("gas_price", params).await
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Submit a signed transaction, waiting until `wait_until`.
    ///
    /// For levels that carry execution detail the outcome is scanned for
    /// failures: a function-call failure in the transaction outcome or any
    /// receipt outcome raises [`RpcError::FunctionCall`]; any other failure
    /// raises [`RpcError::InvalidTransaction`] with the extracted message.
    pub async fn send_tx(
        &self,
        signed_tx: &SignedTransaction,
        wait_until: TxExecutionStatus,
    ) -> Result<FinalExecutionOutcome, RpcError> {
        let params = serde_json::json!({
            "signed_tx_base64": signed_tx.to_base64(),
            "wait_until": wait_until.as_str(),
        });
        let outcome: FinalExecutionOutcome = self.call("send_tx", params).await?;
        check_outcome(outcome)
    }

    /// Fetch transaction status (with receipts) by hash and sender.
    pub async fn tx_status(
        &self,
        tx_hash: &CryptoHash,
        sender_id: &AccountId,
        wait_until: TxExecutionStatus,
    ) -> Result<FinalExecutionOutcome, RpcError> {
        let params = serde_json::json!({
            "tx_hash": tx_hash.to_string(),
            "sender_account_id": sender_id,
            "wait_until": wait_until.as_str(),
        });
        let outcome: FinalExecutionOutcome = self.call("EXPERIMENTAL_tx_status", params).await?;
        check_outcome(outcome)
    }
}

impl Clone for RpcClient {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            http: self.http.clone(),
            headers: self.headers.clone(),
            retry_config: self.retry_config.clone(),
            request_id: AtomicU64::new(0),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Whether an HTTP status warrants a retry: 408, 429, or any 5xx.
pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

fn in_result_error(value: &serde_json::Value) -> Option<&str> {
    value.get("error").and_then(|e| e.as_str())
}

/// Raise typed errors for failures recorded inside an otherwise
/// successful outcome.
fn check_outcome(outcome: FinalExecutionOutcome) -> Result<FinalExecutionOutcome, RpcError> {
    if !outcome.final_execution_status.has_execution_detail() {
        return Ok(outcome);
    }

    if let Some((fce, exec)) = outcome.find_function_call_failure() {
        // The method name is not part of the outcome status; recover it
        // from the echoed transaction when possible.
        let method_name = outcome.transaction.as_ref().and_then(|t| {
            t.actions.iter().find_map(|a| match a {
                ActionView::FunctionCall { method_name, .. } => Some(method_name.clone()),
                _ => None,
            })
        });
        return Err(RpcError::FunctionCall {
            contract_id: exec.executor_id.clone(),
            method_name,
            panic: fce.panic_message(),
            logs: exec.logs.clone(),
        });
    }

    if let Some(failure) = outcome.find_failure() {
        if let Some((tx_nonce, ak_nonce)) = failure.invalid_nonce() {
            return Err(RpcError::InvalidNonce { tx_nonce, ak_nonce });
        }
        return Err(RpcError::invalid_transaction(failure.to_string(), None));
    }

    Ok(outcome)
}

fn parse_rpc_error(error: &JsonRpcError) -> RpcError {
    // Classification key: the structured cause name when present, the
    // legacy top-level name otherwise.
    let cause_name = error
        .cause
        .as_ref()
        .map(|c| c.name.as_str())
        .or(error.name.as_deref());
    let info = error.cause.as_ref().and_then(|c| c.info.as_ref());
    let data = error.data.as_ref();

    if let Some(name) = cause_name {
        match name {
            "UNKNOWN_ACCOUNT" => {
                if let Some(account_id) = info
                    .and_then(|i| i.get("requested_account_id"))
                    .and_then(|a| a.as_str())
                    .and_then(|a| a.parse().ok())
                {
                    return RpcError::AccountNotFound(account_id);
                }
            }
            "INVALID_ACCOUNT" => {
                let account_id = info
                    .and_then(|i| i.get("requested_account_id"))
                    .and_then(|a| a.as_str())
                    .unwrap_or("unknown");
                return RpcError::InvalidAccount(account_id.to_string());
            }
            "UNKNOWN_ACCESS_KEY" => {
                let parsed = info.and_then(|i| {
                    let account_id: AccountId = i
                        .get("requested_account_id")?
                        .as_str()?
                        .parse()
                        .ok()?;
                    let public_key: PublicKey = i.get("public_key")?.as_str()?.parse().ok()?;
                    Some((account_id, public_key))
                });
                if let Some((account_id, public_key)) = parsed {
                    return RpcError::AccessKeyNotFound {
                        account_id,
                        public_key,
                    };
                }
            }
            // Both block- and epoch-style lookups carry the reference as a
            // bare string in `data`; the message is the fallback for both.
            "UNKNOWN_BLOCK" => {
                let block_ref = data.and_then(|d| d.as_str()).unwrap_or(&error.message);
                return RpcError::UnknownBlock(block_ref.to_string());
            }
            "UNKNOWN_EPOCH" => {
                let block_ref = data.and_then(|d| d.as_str()).unwrap_or(&error.message);
                return RpcError::UnknownEpoch(block_ref.to_string());
            }
            "UNKNOWN_CHUNK" => {
                let chunk = info
                    .and_then(|i| i.get("chunk_hash"))
                    .and_then(|c| c.as_str())
                    .unwrap_or(&error.message);
                return RpcError::UnknownChunk(chunk.to_string());
            }
            "UNKNOWN_RECEIPT" => {
                let receipt = info
                    .and_then(|i| i.get("receipt_id"))
                    .and_then(|r| r.as_str())
                    .unwrap_or("unknown");
                return RpcError::UnknownReceipt(receipt.to_string());
            }
            "INVALID_SHARD_ID" => {
                let shard = info
                    .and_then(|i| i.get("shard_id"))
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                return RpcError::InvalidShardId(shard);
            }
            "NO_CONTRACT_CODE" => {
                let account_id = info
                    .and_then(|i| {
                        i.get("contract_account_id")
                            .or_else(|| i.get("account_id"))
                            .or_else(|| i.get("contract_id"))
                    })
                    .and_then(|a| a.as_str())
                    .and_then(|a| a.parse().ok());
                if let Some(account_id) = account_id {
                    return RpcError::ContractNotDeployed(account_id);
                }
            }
            "TOO_LARGE_CONTRACT_STATE" => {
                let account_id = info
                    .and_then(|i| i.get("account_id").or_else(|| i.get("contract_id")))
                    .and_then(|a| a.as_str())
                    .and_then(|a| a.parse().ok());
                if let Some(account_id) = account_id {
                    return RpcError::ContractStateTooLarge(account_id);
                }
            }
            "CONTRACT_EXECUTION_ERROR" => {
                let contract_id = info
                    .and_then(|i| i.get("contract_id"))
                    .and_then(|c| c.as_str())
                    .and_then(|c| c.parse().ok());
                if let Some(contract_id) = contract_id {
                    return RpcError::ContractExecution {
                        contract_id,
                        method_name: info
                            .and_then(|i| i.get("method_name"))
                            .and_then(|m| m.as_str())
                            .map(String::from),
                        message: error.message.clone(),
                    };
                }
            }
            "UNAVAILABLE_SHARD" => return RpcError::ShardUnavailable(error.message.clone()),
            "NO_SYNCED_BLOCKS" | "NOT_SYNCED_YET" => {
                return RpcError::NodeNotSynced(error.message.clone());
            }
            "INVALID_TRANSACTION" => {
                if let Some(mapped) = data.and_then(classify_invalid_tx_data) {
                    return mapped;
                }
                return RpcError::invalid_transaction(&error.message, error.data.clone());
            }
            "TIMEOUT_ERROR" => {
                return RpcError::RequestTimeout {
                    message: error.message.clone(),
                    transaction_hash: info
                        .and_then(|i| i.get("transaction_hash"))
                        .and_then(|h| h.as_str())
                        .map(String::from),
                };
            }
            "PARSE_ERROR" | "REQUEST_VALIDATION_ERROR" => {
                return RpcError::ParseError(error.message.clone());
            }
            "INTERNAL_ERROR" => return RpcError::InternalError(error.message.clone()),
            _ => {}
        }
    }

    // Legacy string-form errors in `data`.
    if let Some(error_str) = data.and_then(|d| d.as_str()) {
        if error_str.contains("does not exist") {
            if let Some(account_str) = error_str
                .strip_prefix("account ")
                .and_then(|rest| rest.split_whitespace().next())
            {
                if let Ok(account_id) = account_str.parse() {
                    return RpcError::AccountNotFound(account_id);
                }
            }
        }
    }

    RpcError::Rpc {
        code: error.code,
        message: error.message.clone(),
        data: error.data.clone(),
    }
}

/// Pull the structured validation failures this client reacts to out of an
/// `INVALID_TRANSACTION` error payload.
fn classify_invalid_tx_data(data: &serde_json::Value) -> Option<RpcError> {
    let invalid_tx = data
        .get("TxExecutionError")
        .and_then(|e| e.get("InvalidTxError"))
        .or_else(|| data.get("InvalidTxError"))?;

    if let Some(invalid_nonce) = invalid_tx.get("InvalidNonce") {
        let tx_nonce = invalid_nonce.get("tx_nonce")?.as_u64()?;
        let ak_nonce = invalid_nonce.get("ak_nonce")?.as_u64()?;
        return Some(RpcError::InvalidNonce { tx_nonce, ak_nonce });
    }

    if let Some(not_enough) = invalid_tx.get("NotEnoughBalance") {
        let required = not_enough.get("cost")?.as_str()?.to_string();
        let available = not_enough.get("balance")?.as_str()?.to_string();
        return Some(RpcError::InsufficientBalance {
            required,
            available,
        });
    }

    None
}
