//! Transaction action types and the delegate (meta-transaction) payloads.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use super::{AccountId, CryptoHash, Gas, NearToken, PublicKey, Signature};

/// NEP-461 prefix for delegate actions: 2^30 + 366 = 1073742190.
///
/// Prepended (little-endian) to the Borsh-encoded delegate action before
/// hashing, so a delegate-action signature can never be replayed as a
/// transaction signature: no serialized transaction starts with these
/// four bytes.
pub const DELEGATE_ACTION_PREFIX: u32 = 1_073_742_190;

/// Access key permission.
///
/// Variant order is the frozen wire tag order: 0 = FunctionCall,
/// 1 = FullAccess.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum AccessKeyPermission {
    /// Function call access with restrictions. (tag = 0)
    FunctionCall(FunctionCallPermission),
    /// Full access to the account. (tag = 1)
    FullAccess,
}

impl AccessKeyPermission {
    pub fn function_call(
        receiver_id: AccountId,
        method_names: Vec<String>,
        allowance: Option<NearToken>,
    ) -> Self {
        Self::FunctionCall(FunctionCallPermission {
            allowance,
            receiver_id,
            method_names,
        })
    }

    pub fn full_access() -> Self {
        Self::FullAccess
    }
}

/// Restrictions of a function-call access key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct FunctionCallPermission {
    /// Maximum amount this key can spend on gas (None = unlimited).
    pub allowance: Option<NearToken>,
    /// Contract this key can call.
    pub receiver_id: AccountId,
    /// Methods this key can call (empty = all methods).
    pub method_names: Vec<String>,
}

/// Access key attached to an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccessKey {
    /// Nonce for replay protection.
    pub nonce: u64,
    /// Permission level.
    pub permission: AccessKeyPermission,
}

impl AccessKey {
    pub fn full_access() -> Self {
        Self {
            nonce: 0,
            permission: AccessKeyPermission::FullAccess,
        }
    }

    pub fn function_call(
        receiver_id: AccountId,
        method_names: Vec<String>,
        allowance: Option<NearToken>,
    ) -> Self {
        Self {
            nonce: 0,
            permission: AccessKeyPermission::function_call(receiver_id, method_names, allowance),
        }
    }
}

/// A transaction action.
///
/// Variant order is the frozen wire tag order and must match the on-chain
/// enum: 0 = CreateAccount, 1 = DeployContract, 2 = FunctionCall,
/// 3 = Transfer, 4 = Stake, 5 = AddKey, 6 = DeleteKey, 7 = DeleteAccount,
/// 8 = Delegate, 9 = DeployGlobalContract, 10 = UseGlobalContract,
/// 11 = DeterministicStateInit.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Action {
    CreateAccount(CreateAccountAction),
    DeployContract(DeployContractAction),
    FunctionCall(FunctionCallAction),
    Transfer(TransferAction),
    Stake(StakeAction),
    AddKey(AddKeyAction),
    DeleteKey(DeleteKeyAction),
    DeleteAccount(DeleteAccountAction),
    Delegate(Box<SignedDelegateAction>),
    DeployGlobalContract(DeployGlobalContractAction),
    UseGlobalContract(UseGlobalContractAction),
    DeterministicStateInit(DeterministicStateInitAction),
}

/// Create a new account.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateAccountAction;

/// Deploy contract code.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeployContractAction {
    /// WASM code to deploy.
    pub code: Vec<u8>,
}

/// Call a contract function.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    /// Arguments, usually JSON or Borsh encoded.
    pub args: Vec<u8>,
    pub gas: Gas,
    pub deposit: NearToken,
}

/// Transfer NEAR tokens.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferAction {
    pub deposit: NearToken,
}

/// Stake NEAR for validation.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StakeAction {
    pub stake: NearToken,
    /// Validator public key.
    pub public_key: PublicKey,
}

/// Add an access key.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AddKeyAction {
    pub public_key: PublicKey,
    pub access_key: AccessKey,
}

/// Delete an access key.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeleteKeyAction {
    pub public_key: PublicKey,
}

/// Delete the account, sending the remaining balance to the beneficiary.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeleteAccountAction {
    pub beneficiary_id: AccountId,
}

// ============================================================================
// Global contract actions
// ============================================================================

/// How a published global contract is referenced.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum GlobalContractIdentifier {
    /// By code hash: immutable reference. (tag = 0)
    CodeHash(CryptoHash),
    /// By publishing account: the publisher can ship updates. (tag = 1)
    AccountId(AccountId),
}

/// How a global contract is identified when published.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum GlobalContractDeployMode {
    /// Identified by its code hash (immutable). (tag = 0)
    CodeHash,
    /// Identified by the publishing account (updatable). (tag = 1)
    AccountId,
}

/// Publish a contract to the global registry.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeployGlobalContractAction {
    pub code: Vec<u8>,
    pub deploy_mode: GlobalContractDeployMode,
}

/// Deploy from a previously published global contract, referencing it
/// instead of re-uploading the code.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UseGlobalContractAction {
    pub contract_identifier: GlobalContractIdentifier,
}

// ============================================================================
// Deterministic account state init (NEP-616)
// ============================================================================

/// Versioned state-init bundle for deterministic accounts.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum DeterministicAccountStateInit {
    V1(DeterministicAccountStateInitV1),
}

/// Version 1: a global-contract reference plus initial storage entries.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeterministicAccountStateInitV1 {
    pub code: GlobalContractIdentifier,
    pub data: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// Deploy a contract onto an account whose ID is derived from the state
/// init bundle.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DeterministicStateInitAction {
    pub state_init: DeterministicAccountStateInit,
    /// Attached deposit covering storage.
    pub deposit: NearToken,
}

impl DeterministicAccountStateInit {
    /// Derive the deterministic account ID:
    /// `"0s" + hex(keccak256(borsh(state_init))[12..32])`.
    pub fn derive_account_id(&self) -> AccountId {
        let serialized = borsh::to_vec(self).expect("state init serialization cannot fail");
        let hash = Keccak256::digest(&serialized);
        AccountId::new_unchecked(format!("0s{}", hex::encode(&hash[12..32])))
    }
}

impl DeterministicStateInitAction {
    /// Derive the deterministic account ID for this action.
    pub fn derive_account_id(&self) -> AccountId {
        self.state_init.derive_account_id()
    }
}

// ============================================================================
// Delegate actions (NEP-366)
// ============================================================================

/// A meta-transaction payload: actions the sender authorizes a relayer to
/// submit on their behalf.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DelegateAction {
    /// The account authorizing the actions.
    pub sender_id: AccountId,
    /// The account the inner actions execute against.
    pub receiver_id: AccountId,
    /// Actions to execute. Nested delegates are rejected.
    pub actions: Vec<NonDelegateAction>,
    /// Access key nonce for replay protection.
    pub nonce: u64,
    /// Block height after which the delegate action is invalid.
    pub max_block_height: u64,
    /// The sender's key authorizing the delegation.
    pub public_key: PublicKey,
}

impl DelegateAction {
    /// Serialize for signing: NEP-461 prefix (LE u32) followed by the
    /// Borsh-encoded delegate action.
    pub fn serialize_for_signing(&self) -> Vec<u8> {
        let body = borsh::to_vec(self).expect("delegate action serialization cannot fail");
        let mut out = Vec::with_capacity(4 + body.len());
        out.extend_from_slice(&DELEGATE_ACTION_PREFIX.to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// The hash a signer signs: `sha256(prefix || borsh(self))`.
    pub fn signing_hash(&self) -> CryptoHash {
        CryptoHash::hash(&self.serialize_for_signing())
    }

    /// Attach a signature.
    pub fn into_signed(self, signature: Signature) -> SignedDelegateAction {
        SignedDelegateAction {
            delegate_action: self,
            signature,
        }
    }
}

/// A delegate action with the sender's signature.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedDelegateAction {
    pub delegate_action: DelegateAction,
    pub signature: Signature,
}

impl SignedDelegateAction {
    /// Borsh-encode for transport.
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("signed delegate serialization cannot fail")
    }

    /// Base64 form, the usual shape on a relayer's HTTP surface.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Decode from Borsh bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, borsh::io::Error> {
        borsh::from_slice(bytes)
    }

    /// Decode from base64.
    pub fn from_base64(s: &str) -> Result<Self, DecodeError> {
        let bytes = STANDARD.decode(s).map_err(DecodeError::Base64)?;
        Self::from_bytes(&bytes).map_err(DecodeError::Borsh)
    }

    /// Verify the signature over the NEP-461-prefixed hash.
    pub fn verify(&self) -> bool {
        self.signature.verify(
            self.delegate_action.signing_hash().as_bytes(),
            &self.delegate_action.public_key,
        )
    }

    pub fn sender_id(&self) -> &AccountId {
        &self.delegate_action.sender_id
    }

    pub fn receiver_id(&self) -> &AccountId {
        &self.delegate_action.receiver_id
    }
}

/// Error decoding a signed delegate action.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("borsh decode error: {0}")]
    Borsh(#[from] borsh::io::Error),
}

/// An action that is statically known not to be a `Delegate`.
///
/// Delegate actions cannot nest; the wrapper enforces that at construction
/// and again when decoding received bytes. It serializes identically to the
/// inner [`Action`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize)]
pub struct NonDelegateAction(Action);

impl NonDelegateAction {
    /// Wrap an action, refusing `Delegate`.
    pub fn from_action(action: Action) -> Option<Self> {
        if matches!(action, Action::Delegate(_)) {
            None
        } else {
            Some(Self(action))
        }
    }

    pub fn inner(&self) -> &Action {
        &self.0
    }

    pub fn into_inner(self) -> Action {
        self.0
    }
}

impl BorshDeserialize for NonDelegateAction {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let action = Action::deserialize_reader(reader)?;
        Self::from_action(action).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "delegate actions cannot contain nested delegate actions",
            )
        })
    }
}

impl From<NonDelegateAction> for Action {
    fn from(action: NonDelegateAction) -> Self {
        action.0
    }
}

impl TryFrom<Action> for NonDelegateAction {
    type Error = ();

    fn try_from(action: Action) -> Result<Self, Self::Error> {
        Self::from_action(action).ok_or(())
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Action {
    pub fn create_account() -> Self {
        Self::CreateAccount(CreateAccountAction)
    }

    pub fn deploy_contract(code: Vec<u8>) -> Self {
        Self::DeployContract(DeployContractAction { code })
    }

    pub fn function_call(
        method_name: impl Into<String>,
        args: Vec<u8>,
        gas: Gas,
        deposit: NearToken,
    ) -> Self {
        Self::FunctionCall(FunctionCallAction {
            method_name: method_name.into(),
            args,
            gas,
            deposit,
        })
    }

    pub fn transfer(deposit: NearToken) -> Self {
        Self::Transfer(TransferAction { deposit })
    }

    pub fn stake(stake: NearToken, public_key: PublicKey) -> Self {
        Self::Stake(StakeAction { stake, public_key })
    }

    pub fn add_full_access_key(public_key: PublicKey) -> Self {
        Self::AddKey(AddKeyAction {
            public_key,
            access_key: AccessKey::full_access(),
        })
    }

    pub fn add_function_call_key(
        public_key: PublicKey,
        receiver_id: AccountId,
        method_names: Vec<String>,
        allowance: Option<NearToken>,
    ) -> Self {
        Self::AddKey(AddKeyAction {
            public_key,
            access_key: AccessKey::function_call(receiver_id, method_names, allowance),
        })
    }

    pub fn delete_key(public_key: PublicKey) -> Self {
        Self::DeleteKey(DeleteKeyAction { public_key })
    }

    pub fn delete_account(beneficiary_id: AccountId) -> Self {
        Self::DeleteAccount(DeleteAccountAction { beneficiary_id })
    }

    pub fn delegate(signed_delegate: SignedDelegateAction) -> Self {
        Self::Delegate(Box::new(signed_delegate))
    }

    /// Publish a contract to the global registry, identified by code hash
    /// (`by_hash = true`, immutable) or by the signer account (updatable).
    pub fn publish_contract(code: Vec<u8>, by_hash: bool) -> Self {
        Self::DeployGlobalContract(DeployGlobalContractAction {
            code,
            deploy_mode: if by_hash {
                GlobalContractDeployMode::CodeHash
            } else {
                GlobalContractDeployMode::AccountId
            },
        })
    }

    /// Deploy from a published global contract referenced by code hash.
    pub fn deploy_from_hash(code_hash: CryptoHash) -> Self {
        Self::UseGlobalContract(UseGlobalContractAction {
            contract_identifier: GlobalContractIdentifier::CodeHash(code_hash),
        })
    }

    /// Deploy from a published global contract referenced by publisher.
    pub fn deploy_from_account(account_id: AccountId) -> Self {
        Self::UseGlobalContract(UseGlobalContractAction {
            contract_identifier: GlobalContractIdentifier::AccountId(account_id),
        })
    }

    pub fn state_init(state_init: DeterministicAccountStateInit, deposit: NearToken) -> Self {
        Self::DeterministicStateInit(DeterministicStateInitAction { state_init, deposit })
    }

    /// Whether this action fixes the transaction receiver by itself
    /// (a `Delegate` action pins the receiver to the delegate's sender).
    pub fn is_delegate(&self) -> bool {
        matches!(self, Action::Delegate(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecretKey;

    fn sample_delegate_action() -> DelegateAction {
        DelegateAction {
            sender_id: "user.near".parse().unwrap(),
            receiver_id: "contract.near".parse().unwrap(),
            actions: vec![NonDelegateAction::from_action(Action::transfer(NearToken::near(1)))
                .unwrap()],
            nonce: 123,
            max_block_height: 1000,
            public_key: SecretKey::generate_ed25519().public_key(),
        }
    }

    #[test]
    fn nep461_prefix_value() {
        assert_eq!(DELEGATE_ACTION_PREFIX, (1 << 30) + 366);
        assert_eq!(DELEGATE_ACTION_PREFIX.to_le_bytes(), [0x6E, 0x01, 0x00, 0x40]);
    }

    #[test]
    fn serialize_for_signing_starts_with_prefix() {
        let da = sample_delegate_action();
        let bytes = da.serialize_for_signing();
        assert_eq!(&bytes[..4], &[0x6E, 0x01, 0x00, 0x40]);
        assert_eq!(&bytes[4..], borsh::to_vec(&da).unwrap().as_slice());
    }

    #[test]
    fn delegate_signature_requires_prefix() {
        let secret = SecretKey::generate_ed25519();
        let mut da = sample_delegate_action();
        da.public_key = secret.public_key();

        let signature = secret.sign(da.signing_hash().as_bytes());
        let signed = da.clone().into_signed(signature);
        assert!(signed.verify());

        // A signature over the unprefixed bytes must not verify.
        let unprefixed = CryptoHash::hash(&borsh::to_vec(&da).unwrap());
        let bad = secret.sign(unprefixed.as_bytes());
        assert!(!da.into_signed(bad).verify());
    }

    #[test]
    fn action_wire_tags_are_frozen() {
        let pk = SecretKey::generate_ed25519().public_key();
        let hash = CryptoHash::hash(&[1, 2, 3]);
        let cases: Vec<(Action, u8)> = vec![
            (Action::create_account(), 0),
            (Action::deploy_contract(vec![0]), 1),
            (
                Action::function_call("m", vec![], Gas::DEFAULT, NearToken::ZERO),
                2,
            ),
            (Action::transfer(NearToken::near(1)), 3),
            (Action::stake(NearToken::near(1), pk.clone()), 4),
            (Action::add_full_access_key(pk.clone()), 5),
            (Action::delete_key(pk.clone()), 6),
            (Action::delete_account("bob.near".parse().unwrap()), 7),
            (Action::publish_contract(vec![0], true), 9),
            (Action::deploy_from_hash(hash), 10),
            (
                Action::state_init(
                    DeterministicAccountStateInit::V1(DeterministicAccountStateInitV1 {
                        code: GlobalContractIdentifier::CodeHash(hash),
                        data: BTreeMap::new(),
                    }),
                    NearToken::near(1),
                ),
                11,
            ),
        ];
        for (action, tag) in cases {
            let bytes = borsh::to_vec(&action).unwrap();
            assert_eq!(bytes[0], tag, "wrong tag for {action:?}");
        }

        let secret = SecretKey::generate_ed25519();
        let da = sample_delegate_action();
        let signature = secret.sign(da.signing_hash().as_bytes());
        let delegate = Action::delegate(da.into_signed(signature));
        assert_eq!(borsh::to_vec(&delegate).unwrap()[0], 8);
    }

    #[test]
    fn access_key_permission_tags() {
        let fc = AccessKeyPermission::function_call("c.near".parse().unwrap(), vec![], None);
        assert_eq!(borsh::to_vec(&fc).unwrap()[0], 0);
        assert_eq!(borsh::to_vec(&AccessKeyPermission::FullAccess).unwrap(), vec![1]);
    }

    #[test]
    fn global_contract_tags() {
        assert_eq!(
            borsh::to_vec(&GlobalContractDeployMode::CodeHash).unwrap(),
            vec![0]
        );
        assert_eq!(
            borsh::to_vec(&GlobalContractDeployMode::AccountId).unwrap(),
            vec![1]
        );

        let hash = CryptoHash::hash(b"wasm");
        let by_hash = GlobalContractIdentifier::CodeHash(hash);
        let bytes = borsh::to_vec(&by_hash).unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes.len(), 33);
    }

    #[test]
    fn action_borsh_roundtrip() {
        let pk = SecretKey::generate_secp256k1().public_key();
        let actions = vec![
            Action::create_account(),
            Action::function_call("mint", b"{\"id\":1}".to_vec(), Gas::tgas(30), NearToken::ONE_YOCTO),
            Action::add_function_call_key(
                pk,
                "c.near".parse().unwrap(),
                vec!["get".into()],
                Some(NearToken::near(1)),
            ),
        ];
        for action in actions {
            let bytes = borsh::to_vec(&action).unwrap();
            assert_eq!(borsh::from_slice::<Action>(&bytes).unwrap(), action);
        }
    }

    #[test]
    fn trailing_bytes_fail_decode() {
        let mut bytes = borsh::to_vec(&Action::transfer(NearToken::near(1))).unwrap();
        bytes.push(0);
        assert!(borsh::from_slice::<Action>(&bytes).is_err());
    }

    #[test]
    fn non_delegate_action_rejects_nesting() {
        let secret = SecretKey::generate_ed25519();
        let da = sample_delegate_action();
        let signature = secret.sign(da.signing_hash().as_bytes());
        let delegate = Action::delegate(da.into_signed(signature));

        assert!(NonDelegateAction::from_action(delegate.clone()).is_none());
        assert!(NonDelegateAction::from_action(Action::create_account()).is_some());

        // The same rejection applies when decoding received bytes.
        let bytes = borsh::to_vec(&delegate).unwrap();
        assert!(borsh::from_slice::<NonDelegateAction>(&bytes).is_err());
    }

    #[test]
    fn signed_delegate_base64_roundtrip() {
        let secret = SecretKey::generate_ed25519();
        let mut da = sample_delegate_action();
        da.public_key = secret.public_key();
        let signed = da.clone().into_signed(secret.sign(da.signing_hash().as_bytes()));

        let decoded = SignedDelegateAction::from_base64(&signed.to_base64()).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.sender_id().as_str(), "user.near");
        assert_eq!(decoded.receiver_id().as_str(), "contract.near");
    }

    #[test]
    fn derive_account_id_shape() {
        let state_init = DeterministicAccountStateInit::V1(DeterministicAccountStateInitV1 {
            code: GlobalContractIdentifier::CodeHash(CryptoHash::default()),
            data: BTreeMap::new(),
        });
        let id = state_init.derive_account_id();
        assert!(id.as_str().starts_with("0s"));
        assert_eq!(id.as_str().len(), 42);
        // Deterministic
        assert_eq!(id, state_init.derive_account_id());
    }

    #[test]
    fn derive_account_id_depends_on_data() {
        let code = GlobalContractIdentifier::AccountId("publisher.near".parse().unwrap());
        let empty = DeterministicAccountStateInit::V1(DeterministicAccountStateInitV1 {
            code: code.clone(),
            data: BTreeMap::new(),
        });
        let mut data = BTreeMap::new();
        data.insert(b"k".to_vec(), b"v".to_vec());
        let with_data =
            DeterministicAccountStateInit::V1(DeterministicAccountStateInitV1 { code, data });
        assert_ne!(empty.derive_account_id(), with_data.derive_account_id());
    }
}
