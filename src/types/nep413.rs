//! NEP-413 off-chain message signing.
//!
//! Lets an account prove ownership by signing a `{message, recipient,
//! nonce}` triple without a transaction. The payload is domain-separated
//! from transactions and from NEP-461 delegate actions by its own tag.

use std::time::Duration;

use borsh::BorshSerialize;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{hex::Hex, serde_as};

use crate::types::{AccountId, CryptoHash, PublicKey, Signature};

/// NEP-413 tag: 2^31 + 413 = 2147484061.
///
/// Prepended (little-endian) to the Borsh payload before hashing. The tag
/// is outside the range of valid Borsh string lengths for an account ID,
/// so a signed message can never collide with a signed transaction.
pub const NEP413_TAG: u32 = (1 << 31) + 413;

/// Default maximum age for signature validity (5 minutes).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Parameters of a message signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignMessageParams {
    /// The human-readable message.
    pub message: String,
    /// The intended recipient (an account ID or an app origin).
    pub recipient: String,
    /// 32-byte replay nonce; see [`generate_nonce`].
    pub nonce: [u8; 32],
    /// Callback URL for web wallets.
    pub callback_url: Option<String>,
    /// Opaque state echoed back in the signed message.
    pub state: Option<String>,
}

// Borsh shape fixed by the NEP; field order matters.
#[derive(BorshSerialize)]
struct Nep413Payload {
    message: String,
    nonce: [u8; 32],
    recipient: String,
    callback_url: Option<String>,
}

/// A signed NEP-413 message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedMessage {
    /// The account that signed.
    pub account_id: AccountId,
    /// The key used to sign.
    pub public_key: PublicKey,
    /// The signature, base64-encoded in JSON (the wallet-standard form).
    #[serde(
        serialize_with = "serialize_signature_base64",
        deserialize_with = "deserialize_signature_flexible"
    )]
    pub signature: Signature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

fn serialize_signature_base64<S: Serializer>(
    signature: &Signature,
    s: S,
) -> Result<S::Ok, S::Error> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    s.serialize_str(&STANDARD.encode(signature.as_bytes()))
}

// Wallets emit either bare base64 of the 64 signature bytes or the
// "ed25519:<base58>" typed form; accept both.
fn deserialize_signature_flexible<'de, D: Deserializer<'de>>(d: D) -> Result<Signature, D::Error> {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    let s: String = Deserialize::deserialize(d)?;
    if s.contains(':') {
        return s.parse().map_err(serde::de::Error::custom);
    }
    let bytes = STANDARD.decode(&s).map_err(serde::de::Error::custom)?;
    let arr: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| serde::de::Error::custom("expected a 64-byte ed25519 signature"))?;
    Ok(Signature::ed25519_from_bytes(arr))
}

/// HTTP payload shape a frontend posts to a backend for authentication.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub signed_message: SignedMessage,
    /// The nonce, hex-encoded (64 characters).
    #[serde_as(as = "Hex")]
    pub nonce: [u8; 32],
    pub message: String,
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl AuthPayload {
    /// Reconstruct the parameters the client claims to have signed.
    pub fn to_params(&self) -> SignMessageParams {
        SignMessageParams {
            message: self.message.clone(),
            recipient: self.recipient.clone(),
            nonce: self.nonce,
            callback_url: self.callback_url.clone(),
            state: self.signed_message.state.clone(),
        }
    }

    pub fn from_signed(signed_message: SignedMessage, params: &SignMessageParams) -> Self {
        Self {
            signed_message,
            nonce: params.nonce,
            message: params.message.clone(),
            recipient: params.recipient.clone(),
            callback_url: params.callback_url.clone(),
        }
    }
}

/// Generate a 32-byte nonce with an embedded timestamp.
///
/// First 8 bytes: milliseconds since epoch, big-endian. Remaining 24
/// bytes: CSPRNG output. The timestamp lets verifiers expire signatures.
pub fn generate_nonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the epoch")
        .as_millis() as u64;
    nonce[..8].copy_from_slice(&timestamp.to_be_bytes());
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut nonce[8..]);
    nonce
}

/// The timestamp embedded in a nonce (milliseconds since epoch).
pub fn extract_timestamp_from_nonce(nonce: &[u8; 32]) -> u64 {
    u64::from_be_bytes(nonce[..8].try_into().unwrap())
}

/// The hash a NEP-413 signer signs: `sha256(tag_le || borsh(payload))`.
pub fn signing_hash(params: &SignMessageParams) -> CryptoHash {
    let payload = Nep413Payload {
        message: params.message.clone(),
        nonce: params.nonce,
        recipient: params.recipient.clone(),
        callback_url: params.callback_url.clone(),
    };
    let payload_bytes = borsh::to_vec(&payload).expect("payload serialization cannot fail");

    let mut combined = Vec::with_capacity(4 + payload_bytes.len());
    combined.extend_from_slice(&NEP413_TAG.to_le_bytes());
    combined.extend_from_slice(&payload_bytes);
    CryptoHash::hash(&combined)
}

/// Cryptographically verify a signed message.
///
/// Checks the signature over the reconstructed hash and, unless `max_age`
/// is `Duration::MAX`, that the nonce timestamp is neither expired nor in
/// the future. Does not check key ownership on chain.
pub fn verify_signature(
    signed: &SignedMessage,
    params: &SignMessageParams,
    max_age: Duration,
) -> bool {
    if max_age != Duration::MAX {
        let timestamp_ms = extract_timestamp_from_nonce(&params.nonce);
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock is before the epoch")
            .as_millis() as u64;
        let age_ms = now_ms.saturating_sub(timestamp_ms);
        if age_ms > max_age.as_millis() as u64 || timestamp_ms > now_ms {
            return false;
        }
    }

    let hash = signing_hash(params);
    signed.signature.verify(hash.as_bytes(), &signed.public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecretKey;

    fn sample_params() -> SignMessageParams {
        SignMessageParams {
            message: "Log in to example.com".to_string(),
            recipient: "example.com".to_string(),
            nonce: generate_nonce(),
            callback_url: None,
            state: None,
        }
    }

    fn sign(params: &SignMessageParams, secret: &SecretKey) -> SignedMessage {
        SignedMessage {
            account_id: "alice.near".parse().unwrap(),
            public_key: secret.public_key(),
            signature: secret.sign(signing_hash(params).as_bytes()),
            state: params.state.clone(),
        }
    }

    #[test]
    fn tag_value() {
        assert_eq!(NEP413_TAG, 2_147_484_061);
    }

    #[test]
    fn nonce_embeds_timestamp() {
        let nonce = generate_nonce();
        let ts = extract_timestamp_from_nonce(&nonce);
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        assert!(now - ts < 5_000);
    }

    #[test]
    fn sign_and_verify() {
        let secret = SecretKey::generate_ed25519();
        let params = sample_params();
        let signed = sign(&params, &secret);
        assert!(verify_signature(&signed, &params, DEFAULT_MAX_AGE));
    }

    #[test]
    fn tampered_message_fails() {
        let secret = SecretKey::generate_ed25519();
        let params = sample_params();
        let signed = sign(&params, &secret);

        let mut tampered = params.clone();
        tampered.message = "Log in to evil.com".to_string();
        assert!(!verify_signature(&signed, &tampered, DEFAULT_MAX_AGE));
    }

    #[test]
    fn expired_nonce_fails() {
        let secret = SecretKey::generate_ed25519();
        let mut params = sample_params();
        // Timestamp from an hour ago
        let old = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64
            - 3_600_000;
        params.nonce[..8].copy_from_slice(&old.to_be_bytes());

        let signed = sign(&params, &secret);
        assert!(!verify_signature(&signed, &params, DEFAULT_MAX_AGE));
        // With expiry disabled the signature itself is still good.
        assert!(verify_signature(&signed, &params, Duration::MAX));
    }

    #[test]
    fn hash_differs_from_raw_payload_hash() {
        // The tag must participate in the hash.
        let params = sample_params();
        let tagged = signing_hash(&params);
        let raw = CryptoHash::hash(
            &borsh::to_vec(&Nep413Payload {
                message: params.message.clone(),
                nonce: params.nonce,
                recipient: params.recipient.clone(),
                callback_url: None,
            })
            .unwrap(),
        );
        assert_ne!(tagged, raw);
    }

    #[test]
    fn signed_message_json_uses_base64_signature() {
        let secret = SecretKey::generate_ed25519();
        let params = sample_params();
        let signed = sign(&params, &secret);

        let json = serde_json::to_value(&signed).unwrap();
        assert!(json["signature"].as_str().unwrap().len() > 64);
        assert!(!json["signature"].as_str().unwrap().contains(':'));

        let parsed: SignedMessage = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, signed);
    }

    #[test]
    fn signed_message_accepts_typed_signature_form() {
        let secret = SecretKey::generate_ed25519();
        let params = sample_params();
        let signed = sign(&params, &secret);

        let json = serde_json::json!({
            "accountId": "alice.near",
            "publicKey": secret.public_key().to_string(),
            "signature": signed.signature.to_string(),
        });
        let parsed: SignedMessage = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.signature, signed.signature);
    }

    #[test]
    fn auth_payload_roundtrip() {
        let secret = SecretKey::generate_ed25519();
        let params = sample_params();
        let signed = sign(&params, &secret);
        let payload = AuthPayload::from_signed(signed, &params);

        let json = serde_json::to_string(&payload).unwrap();
        let parsed: AuthPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.to_params(), params);
        assert!(verify_signature(
            &parsed.signed_message,
            &parsed.to_params(),
            DEFAULT_MAX_AGE
        ));
    }
}
