//! Signing seam between the transaction builder and key material.
//!
//! A [`Signer`] produces signatures for arbitrary payloads without
//! revealing where the key lives. [`KeyPair`] is the in-process
//! implementation; [`FnSigner`] adapts an async callback (remote signers,
//! HSMs) into the same seam.

use std::future::Future;
use std::pin::Pin;

use crate::error::SignerError;
use crate::types::nep413::{self, SignMessageParams, SignedMessage};
use crate::types::{AccountId, KeyPair, KeyType, PublicKey, Signature};

/// Future returned by [`Signer::sign`].
pub type SignFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Signature, SignerError>> + Send + 'a>>;

/// Low-level signing capability.
///
/// Signing is async so remote backends (hardware wallets, KMS) fit behind
/// the same trait; in-process keys resolve immediately.
pub trait Signer: Send + Sync {
    /// The public key signatures will verify against.
    fn public_key(&self) -> PublicKey;

    /// Sign a payload.
    fn sign(&self, message: &[u8]) -> SignFuture<'_>;

    /// Sign a NEP-413 off-chain message for `account_id`.
    ///
    /// The default implementation hashes the tagged payload and signs it.
    /// Only ed25519 keys can produce NEP-413 signatures; other key kinds
    /// fail with an unsupported-operation error.
    fn sign_nep413<'a>(
        &'a self,
        account_id: &'a AccountId,
        params: &'a SignMessageParams,
    ) -> Pin<Box<dyn Future<Output = Result<SignedMessage, SignerError>> + Send + 'a>> {
        Box::pin(async move {
            let public_key = self.public_key();
            if public_key.key_type() != KeyType::Ed25519 {
                return Err(SignerError::nep413_unsupported(public_key.key_type()));
            }
            let hash = nep413::signing_hash(params);
            let signature = self.sign(hash.as_bytes()).await?;
            Ok(SignedMessage {
                account_id: account_id.clone(),
                public_key,
                signature,
                state: params.state.clone(),
            })
        })
    }
}

impl Signer for KeyPair {
    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    fn sign(&self, message: &[u8]) -> SignFuture<'_> {
        let signature = KeyPair::sign(self, message);
        Box::pin(async move { Ok(signature) })
    }
}

type BoxedSignFn =
    Box<dyn Fn(Vec<u8>) -> Pin<Box<dyn Future<Output = Result<Signature, SignerError>> + Send>> + Send + Sync>;

/// A signer backed by an async callback.
///
/// The callback receives the payload bytes and returns the signature; the
/// public key must be supplied up front so transactions can be built
/// before the first signature exists.
pub struct FnSigner {
    public_key: PublicKey,
    sign_fn: BoxedSignFn,
}

impl FnSigner {
    pub fn new<F, Fut>(public_key: PublicKey, sign_fn: F) -> Self
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Signature, SignerError>> + Send + 'static,
    {
        Self {
            public_key,
            sign_fn: Box::new(move |message| Box::pin(sign_fn(message))),
        }
    }
}

impl Signer for FnSigner {
    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    fn sign(&self, message: &[u8]) -> SignFuture<'_> {
        (self.sign_fn)(message.to_vec())
    }
}

impl std::fmt::Debug for FnSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSigner")
            .field("public_key", &self.public_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecretKey;

    #[tokio::test]
    async fn keypair_signs() {
        let pair = KeyPair::random();
        let signature = Signer::sign(&pair, b"payload").await.unwrap();
        assert!(signature.verify(b"payload", &Signer::public_key(&pair)));
    }

    #[tokio::test]
    async fn fn_signer_delegates_to_callback() {
        let pair = KeyPair::random();
        let secret = pair.secret_key.clone();
        let signer = FnSigner::new(pair.public_key.clone(), move |message| {
            let secret = secret.clone();
            async move { Ok(secret.sign(&message)) }
        });

        let signature = signer.sign(b"payload").await.unwrap();
        assert!(signature.verify(b"payload", &signer.public_key()));
    }

    #[tokio::test]
    async fn nep413_signing_and_verification() {
        let pair = KeyPair::random();
        let account: AccountId = "alice.near".parse().unwrap();
        let params = SignMessageParams {
            message: "Log in".to_string(),
            recipient: "app.example".to_string(),
            nonce: nep413::generate_nonce(),
            callback_url: None,
            state: Some("csrf".to_string()),
        };

        let signed = pair.sign_nep413(&account, &params).await.unwrap();
        assert_eq!(signed.account_id, account);
        assert_eq!(signed.state.as_deref(), Some("csrf"));
        assert!(nep413::verify_signature(
            &signed,
            &params,
            nep413::DEFAULT_MAX_AGE
        ));
    }

    #[tokio::test]
    async fn nep413_rejects_secp256k1() {
        let pair = KeyPair::from_secret_key(SecretKey::generate_secp256k1());
        let account: AccountId = "alice.near".parse().unwrap();
        let params = SignMessageParams {
            message: "Log in".to_string(),
            recipient: "app.example".to_string(),
            nonce: nep413::generate_nonce(),
            callback_url: None,
            state: None,
        };

        let err = pair.sign_nep413(&account, &params).await.unwrap_err();
        assert!(matches!(err, SignerError::UnsupportedOperation(_)));
    }
}
