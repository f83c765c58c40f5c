//! Cryptographic key types: ed25519 and secp256k1.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{
    RecoveryId, Signature as EcdsaSignature, SigningKey as EcdsaSigningKey,
    VerifyingKey as EcdsaVerifyingKey,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{ParseKeyError, SignerError};

/// Key type identifier. The discriminant doubles as the wire curve tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyType {
    Ed25519 = 0,
    Secp256k1 = 1,
}

impl KeyType {
    /// String prefix used in the `"<type>:<base58>"` form.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::Secp256k1 => "secp256k1",
        }
    }

    /// Public key length in bytes. Secp256k1 keys are the uncompressed
    /// X||Y coordinates without the SEC1 0x04 prefix.
    pub fn public_key_len(&self) -> usize {
        match self {
            KeyType::Ed25519 => 32,
            KeyType::Secp256k1 => 64,
        }
    }

    /// Secret key length in bytes.
    pub fn secret_key_len(&self) -> usize {
        32
    }

    /// Signature length in bytes. Secp256k1 signatures are `r||s||v`.
    pub fn signature_len(&self) -> usize {
        match self {
            KeyType::Ed25519 => 64,
            KeyType::Secp256k1 => 65,
        }
    }

    fn from_prefix(s: &str) -> Result<Self, ParseKeyError> {
        match s {
            "ed25519" => Ok(KeyType::Ed25519),
            "secp256k1" => Ok(KeyType::Secp256k1),
            other => Err(ParseKeyError::UnknownKeyType(other.to_string())),
        }
    }
}

impl TryFrom<u8> for KeyType {
    type Error = ParseKeyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyType::Ed25519),
            1 => Ok(KeyType::Secp256k1),
            _ => Err(ParseKeyError::UnknownKeyType(value.to_string())),
        }
    }
}

fn split_typed(s: &str) -> Result<(KeyType, Vec<u8>), ParseKeyError> {
    let (prefix, data_str) = s.split_once(':').ok_or(ParseKeyError::InvalidFormat)?;
    let key_type = KeyType::from_prefix(prefix)?;
    let data = bs58::decode(data_str)
        .into_vec()
        .map_err(|e| ParseKeyError::InvalidBase58(e.to_string()))?;
    Ok((key_type, data))
}

// ============================================================================
// PublicKey
// ============================================================================

/// Ed25519 or secp256k1 public key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key_type: KeyType,
    data: Vec<u8>,
}

impl PublicKey {
    /// Create an ed25519 public key from raw 32 bytes.
    pub fn ed25519_from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            key_type: KeyType::Ed25519,
            data: bytes.to_vec(),
        }
    }

    /// Create a secp256k1 public key from the raw 64 uncompressed X||Y bytes.
    pub fn secp256k1_from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            key_type: KeyType::Secp256k1,
            data: bytes.to_vec(),
        }
    }

    /// Get the key type.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Get the raw key bytes (curve tag not included).
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn validate_curve_point(key_type: KeyType, data: &[u8]) -> Result<(), ParseKeyError> {
        match key_type {
            KeyType::Ed25519 => {
                let bytes: [u8; 32] = data
                    .try_into()
                    .map_err(|_| ParseKeyError::InvalidCurvePoint)?;
                VerifyingKey::from_bytes(&bytes).map_err(|_| ParseKeyError::InvalidCurvePoint)?;
            }
            KeyType::Secp256k1 => {
                let mut sec1 = Vec::with_capacity(65);
                sec1.push(0x04);
                sec1.extend_from_slice(data);
                EcdsaVerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| ParseKeyError::InvalidCurvePoint)?;
            }
        }
        Ok(())
    }

    fn from_parts(key_type: KeyType, data: Vec<u8>) -> Result<Self, ParseKeyError> {
        if data.len() != key_type.public_key_len() {
            return Err(ParseKeyError::InvalidLength {
                expected: key_type.public_key_len(),
                actual: data.len(),
            });
        }
        Self::validate_curve_point(key_type, &data)?;
        Ok(Self { key_type, data })
    }
}

impl FromStr for PublicKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, data) = split_typed(s)?;
        Self::from_parts(key_type, data)
    }
}

impl TryFrom<&str> for PublicKey {
    type Error = ParseKeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.key_type.as_str(),
            bs58::encode(&self.data).into_string()
        )
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// Wire form: u8 curve tag followed by the raw key bytes.
impl BorshSerialize for PublicKey {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&(self.key_type as u8), writer)?;
        writer.write_all(&self.data)
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let tag = u8::deserialize_reader(reader)?;
        let key_type = KeyType::try_from(tag)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut data = vec![0u8; key_type.public_key_len()];
        reader.read_exact(&mut data)?;
        Self::from_parts(key_type, data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

// ============================================================================
// SecretKey
// ============================================================================

/// Ed25519 or secp256k1 secret key.
#[derive(Clone)]
pub struct SecretKey {
    key_type: KeyType,
    data: Vec<u8>,
}

impl SecretKey {
    /// Generate a new random key of the given type (CSPRNG).
    pub fn generate(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Ed25519 => Self::generate_ed25519(),
            KeyType::Secp256k1 => Self::generate_secp256k1(),
        }
    }

    /// Generate a new random ed25519 key.
    pub fn generate_ed25519() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            key_type: KeyType::Ed25519,
            data: signing_key.to_bytes().to_vec(),
        }
    }

    /// Generate a new random secp256k1 key.
    pub fn generate_secp256k1() -> Self {
        let signing_key = EcdsaSigningKey::random(&mut OsRng);
        Self {
            key_type: KeyType::Secp256k1,
            data: signing_key.to_bytes().to_vec(),
        }
    }

    /// Create an ed25519 secret key from raw 32 bytes.
    pub fn ed25519_from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            key_type: KeyType::Ed25519,
            data: bytes.to_vec(),
        }
    }

    /// Get the key type.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Get the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn ed25519_signing_key(&self) -> SigningKey {
        let bytes: [u8; 32] = self.data.as_slice().try_into().expect("validated length");
        SigningKey::from_bytes(&bytes)
    }

    fn secp256k1_signing_key(&self) -> EcdsaSigningKey {
        EcdsaSigningKey::from_slice(&self.data).expect("validated scalar")
    }

    /// Derive the public key.
    pub fn public_key(&self) -> PublicKey {
        match self.key_type {
            KeyType::Ed25519 => {
                PublicKey::ed25519_from_bytes(self.ed25519_signing_key().verifying_key().to_bytes())
            }
            KeyType::Secp256k1 => {
                let point = self
                    .secp256k1_signing_key()
                    .verifying_key()
                    .to_encoded_point(false);
                // Skip the SEC1 0x04 prefix
                let xy: [u8; 64] = point.as_bytes()[1..].try_into().expect("uncompressed point");
                PublicKey::secp256k1_from_bytes(xy)
            }
        }
    }

    /// Sign a message.
    ///
    /// Ed25519 signs `message` directly. Secp256k1 signs `sha256(message)`
    /// and serializes the signature as `r || s || v` where `v` is the
    /// recovery id.
    pub fn sign(&self, message: &[u8]) -> Signature {
        match self.key_type {
            KeyType::Ed25519 => {
                let signature = self.ed25519_signing_key().sign(message);
                Signature {
                    key_type: KeyType::Ed25519,
                    data: signature.to_bytes().to_vec(),
                }
            }
            KeyType::Secp256k1 => {
                let digest = Sha256::digest(message);
                let (signature, recovery_id): (EcdsaSignature, RecoveryId) = self
                    .secp256k1_signing_key()
                    .sign_prehash_recoverable(&digest)
                    .expect("signing over a 32-byte prehash cannot fail");
                let mut data = signature.to_bytes().to_vec();
                data.push(recovery_id.to_byte());
                Signature {
                    key_type: KeyType::Secp256k1,
                    data,
                }
            }
        }
    }
}

impl FromStr for SecretKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, data) = split_typed(s)?;

        // Ed25519 secret keys circulate either as the 32-byte seed or as the
        // 64-byte expanded form (seed || public key); the seed is the secret.
        let data = match (key_type, data.len()) {
            (KeyType::Ed25519, 64) => data[..32].to_vec(),
            (_, n) if n == key_type.secret_key_len() => data,
            (_, n) => {
                return Err(ParseKeyError::InvalidLength {
                    expected: key_type.secret_key_len(),
                    actual: n,
                });
            }
        };

        if key_type == KeyType::Secp256k1 {
            // Reject out-of-range scalars up front.
            EcdsaSigningKey::from_slice(&data).map_err(|_| ParseKeyError::InvalidCurvePoint)?;
        }

        Ok(Self { key_type, data })
    }
}

impl TryFrom<&str> for SecretKey {
    type Error = ParseKeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.key_type.as_str(),
            bs58::encode(&self.data).into_string()
        )
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({}:***)", self.key_type.as_str())
    }
}

// ============================================================================
// Signature
// ============================================================================

/// Cryptographic signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    key_type: KeyType,
    data: Vec<u8>,
}

impl Signature {
    /// Create an ed25519 signature from raw 64 bytes.
    pub fn ed25519_from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            key_type: KeyType::Ed25519,
            data: bytes.to_vec(),
        }
    }

    /// Create a secp256k1 signature from raw `r||s||v` 65 bytes.
    pub fn secp256k1_from_bytes(bytes: [u8; 65]) -> Self {
        Self {
            key_type: KeyType::Secp256k1,
            data: bytes.to_vec(),
        }
    }

    /// Get the key type.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Get the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Verify this signature against a message and public key.
    ///
    /// The inverse of [`SecretKey::sign`]: ed25519 verifies over `message`
    /// itself, secp256k1 over `sha256(message)`.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> bool {
        if self.key_type != public_key.key_type() {
            return false;
        }

        match self.key_type {
            KeyType::Ed25519 => {
                let pk_bytes: [u8; 32] = match public_key.as_bytes().try_into() {
                    Ok(b) => b,
                    Err(_) => return false,
                };
                let Ok(verifying_key) = VerifyingKey::from_bytes(&pk_bytes) else {
                    return false;
                };
                let sig_bytes: [u8; 64] = match self.data.as_slice().try_into() {
                    Ok(b) => b,
                    Err(_) => return false,
                };
                let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
                verifying_key.verify_strict(message, &signature).is_ok()
            }
            KeyType::Secp256k1 => {
                let mut sec1 = Vec::with_capacity(65);
                sec1.push(0x04);
                sec1.extend_from_slice(public_key.as_bytes());
                let Ok(verifying_key) = EcdsaVerifyingKey::from_sec1_bytes(&sec1) else {
                    return false;
                };
                let Ok(signature) = EcdsaSignature::from_slice(&self.data[..64]) else {
                    return false;
                };
                let digest = Sha256::digest(message);
                verifying_key.verify_prehash(&digest, &signature).is_ok()
            }
        }
    }
}

impl FromStr for Signature {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, data) = split_typed(s)?;
        if data.len() != key_type.signature_len() {
            return Err(ParseKeyError::InvalidLength {
                expected: key_type.signature_len(),
                actual: data.len(),
            });
        }
        Ok(Self { key_type, data })
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.key_type.as_str(),
            bs58::encode(&self.data).into_string()
        )
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl BorshSerialize for Signature {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&(self.key_type as u8), writer)?;
        writer.write_all(&self.data)
    }
}

impl BorshDeserialize for Signature {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let tag = u8::deserialize_reader(reader)?;
        let key_type = KeyType::try_from(tag)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut data = vec![0u8; key_type.signature_len()];
        reader.read_exact(&mut data)?;
        Ok(Self { key_type, data })
    }
}

// ============================================================================
// KeyPair
// ============================================================================

/// A secret key bundled with its derived public key.
///
/// This is the unit the [`KeyStore`](crate::client::KeyStore) hands out:
/// the store owns the pair, the transaction builder borrows it for the
/// duration of one signing operation.
#[derive(Clone)]
pub struct KeyPair {
    /// The secret key.
    pub secret_key: SecretKey,
    /// The public key derived from the secret key.
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a random key pair of the given type.
    pub fn generate(key_type: KeyType) -> Self {
        Self::from_secret_key(SecretKey::generate(key_type))
    }

    /// Generate a random ed25519 key pair.
    pub fn random() -> Self {
        Self::generate(KeyType::Ed25519)
    }

    /// Create a key pair from an existing secret key.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            secret_key,
            public_key,
        }
    }

    /// Parse from the `"<kind>:<base58>"` secret key string form.
    pub fn from_secret_key_str(s: &str) -> Result<Self, ParseKeyError> {
        Ok(Self::from_secret_key(s.parse()?))
    }

    /// Sign a message with the secret key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.secret_key.sign(message)
    }

    /// The key type of this pair.
    pub fn key_type(&self) -> KeyType {
        self.secret_key.key_type()
    }
}

impl FromStr for KeyPair {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_secret_key_str(s)
    }
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"***")
            .finish()
    }
}

// Kept distinct from KeyPair signing so hardware-backed keys can implement
// it later without owning raw secret bytes.
impl SignerError {
    pub(crate) fn nep413_unsupported(key_type: KeyType) -> Self {
        SignerError::UnsupportedOperation(format!(
            "{} keys cannot produce NEP-413 signatures",
            key_type.as_str()
        ))
    }
}
