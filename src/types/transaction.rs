//! Transaction types.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{AccountId, Action, CryptoHash, PublicKey, SecretKey, Signature};

/// An unsigned transaction. Field order is the wire order.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    /// The account that signs and pays for the transaction.
    pub signer_id: AccountId,
    /// The access key the signature will be checked against.
    pub public_key: PublicKey,
    /// Access key nonce; must exceed the nonce recorded on chain.
    pub nonce: u64,
    /// The account the actions execute against.
    pub receiver_id: AccountId,
    /// A recent block hash anchoring the transaction's validity window.
    pub block_hash: CryptoHash,
    /// The actions to execute, in order.
    pub actions: Vec<Action>,
}

impl Transaction {
    pub fn new(
        signer_id: AccountId,
        public_key: PublicKey,
        nonce: u64,
        receiver_id: AccountId,
        block_hash: CryptoHash,
        actions: Vec<Action>,
    ) -> Self {
        Self {
            signer_id,
            public_key,
            nonce,
            receiver_id,
            block_hash,
            actions,
        }
    }

    /// Check the structural invariants a transaction must satisfy before
    /// signing: at least one action, at most one `Delegate` action, and a
    /// delegate-carrying transaction addressed to the delegate's sender.
    pub fn validate(&self) -> Result<(), String> {
        if self.actions.is_empty() {
            return Err("transaction requires at least one action".to_string());
        }

        let delegates: Vec<_> = self
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Delegate(sd) => Some(sd),
                _ => None,
            })
            .collect();

        if delegates.len() > 1 {
            return Err("transaction may contain at most one delegate action".to_string());
        }

        if let Some(sd) = delegates.first() {
            if self.receiver_id != *sd.sender_id() {
                return Err(format!(
                    "delegate transaction receiver '{}' must equal the delegate sender '{}'",
                    self.receiver_id,
                    sd.sender_id()
                ));
            }
        }

        Ok(())
    }

    /// The transaction hash: `sha256(borsh(self))`. This is both the
    /// signing payload and the transaction's identity on chain.
    pub fn hash(&self) -> CryptoHash {
        CryptoHash::hash(&borsh::to_vec(self).expect("transaction serialization cannot fail"))
    }

    /// Sign with a secret key.
    pub fn sign(self, secret: &SecretKey) -> SignedTransaction {
        let signature = secret.sign(self.hash().as_bytes());
        SignedTransaction {
            transaction: self,
            signature,
        }
    }
}

/// A signed transaction ready for submission.
///
/// The wire form is `borsh(transaction) || borsh(signature)` — exactly
/// what the derived struct encoding produces.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl SignedTransaction {
    /// The hash identity, `sha256(borsh(transaction))` — the signature is
    /// not part of it.
    pub fn hash(&self) -> CryptoHash {
        self.transaction.hash()
    }

    /// Serialize for RPC submission.
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("signed transaction serialization cannot fail")
    }

    /// Base64 form for the `send_tx` parameter.
    pub fn to_base64(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        STANDARD.encode(self.to_bytes())
    }

    /// Reconstruct from bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::error::Error> {
        borsh::from_slice(bytes).map_err(|e| {
            crate::error::Error::InvalidTransaction(format!(
                "failed to deserialize signed transaction: {e}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DelegateAction, NearToken, NonDelegateAction};

    fn keyed_tx(actions: Vec<Action>) -> (Transaction, SecretKey) {
        let secret = SecretKey::generate_ed25519();
        let tx = Transaction::new(
            "alice.near".parse().unwrap(),
            secret.public_key(),
            1,
            "bob.near".parse().unwrap(),
            CryptoHash::ZERO,
            actions,
        );
        (tx, secret)
    }

    fn signed_delegate(sender: &str) -> crate::types::SignedDelegateAction {
        let secret = SecretKey::generate_ed25519();
        let da = DelegateAction {
            sender_id: sender.parse().unwrap(),
            receiver_id: "contract.near".parse().unwrap(),
            actions: vec![
                NonDelegateAction::from_action(Action::transfer(NearToken::near(1))).unwrap(),
            ],
            nonce: 1,
            max_block_height: 100,
            public_key: secret.public_key(),
        };
        let signature = secret.sign(da.signing_hash().as_bytes());
        da.into_signed(signature)
    }

    #[test]
    fn hash_is_sha256_of_borsh() {
        let (tx, _) = keyed_tx(vec![Action::transfer(NearToken::near(1))]);
        let expected = CryptoHash::hash(&borsh::to_vec(&tx).unwrap());
        assert_eq!(tx.hash(), expected);
    }

    #[test]
    fn signature_verifies_over_hash() {
        let (tx, secret) = keyed_tx(vec![Action::transfer(NearToken::near(1))]);
        let hash = tx.hash();
        let signed = tx.sign(&secret);
        assert!(signed
            .signature
            .verify(hash.as_bytes(), &secret.public_key()));
        assert_eq!(signed.hash(), hash);
    }

    #[test]
    fn wire_form_is_tx_then_signature() {
        let (tx, secret) = keyed_tx(vec![Action::transfer(NearToken::near(1))]);
        let tx_bytes = borsh::to_vec(&tx).unwrap();
        let signed = tx.sign(&secret);
        let wire = signed.to_bytes();
        assert_eq!(&wire[..tx_bytes.len()], tx_bytes.as_slice());
        assert_eq!(
            &wire[tx_bytes.len()..],
            borsh::to_vec(&signed.signature).unwrap().as_slice()
        );
    }

    #[test]
    fn bytes_roundtrip() {
        let (tx, secret) = keyed_tx(vec![Action::create_account()]);
        let signed = tx.sign(&secret);
        let decoded = SignedTransaction::from_bytes(&signed.to_bytes()).unwrap();
        assert_eq!(decoded, signed);
    }

    #[test]
    fn validate_rejects_empty_actions() {
        let (tx, _) = keyed_tx(vec![]);
        assert!(tx.validate().unwrap_err().contains("at least one action"));
    }

    #[test]
    fn validate_rejects_two_delegates() {
        let (mut tx, _) = keyed_tx(vec![
            Action::delegate(signed_delegate("bob.near")),
            Action::delegate(signed_delegate("bob.near")),
        ]);
        tx.receiver_id = "bob.near".parse().unwrap();
        assert!(tx.validate().unwrap_err().contains("at most one"));
    }

    #[test]
    fn validate_checks_delegate_receiver() {
        let (tx, _) = keyed_tx(vec![Action::delegate(signed_delegate("carol.near"))]);
        // receiver is bob.near but the delegate's sender is carol.near
        assert!(tx.validate().is_err());

        let (mut tx, _) = keyed_tx(vec![Action::delegate(signed_delegate("carol.near"))]);
        tx.receiver_id = "carol.near".parse().unwrap();
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn encoding_is_deterministic() {
        let (tx, _) = keyed_tx(vec![Action::transfer(NearToken::near(2))]);
        assert_eq!(borsh::to_vec(&tx).unwrap(), borsh::to_vec(&tx.clone()).unwrap());
    }
}
