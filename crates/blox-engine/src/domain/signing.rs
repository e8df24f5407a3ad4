//! # Signature & Replay-Protection Engine
//!
//! Meta-transactions are authorized by an ECDSA (secp256k1) signature over a
//! structured, domain-separated Keccak-256 digest. The domain separator binds
//! engine name, protocol version, chain id, and the engine instance's own
//! address, so a signature can never replay across instances, versions, or
//! networks.
//!
//! ## Security Notes
//!
//! - **Malleability**: S must be strictly below the half curve order; the
//!   comparison is constant-time (`subtle`).
//! - **Scalar range**: R and S must be in [1, n-1].
//! - **Strict nonces**: the presented nonce must equal the signer's stored
//!   nonce exactly — not merely be fresh — and is consumed exactly once,
//!   before the downstream invocation is attempted.

use crate::domain::entities::{EngineState, MetaTransaction, MetaTxParams, TxParams, TxRecord};
use crate::domain::errors::EngineError;
use crate::{ENGINE_NAME, ENGINE_VERSION};
use blox_types::{hashing::keccak256_concat, keccak256, Address, Hash, TxAction};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// secp256k1 curve order n.
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Half of the secp256k1 curve order, for the malleability check.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Domain-separation prefix for structured digests.
const STRUCTURED_PREFIX: [u8; 2] = [0x19, 0x01];

// =============================================================================
// SIGNATURE
// =============================================================================

/// A recoverable ECDSA signature (r, s, v).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaSignature {
    /// R component.
    pub r: [u8; 32],
    /// S component. Must be in the lower half of the curve order.
    pub s: [u8; 32],
    /// Recovery id: 0, 1, 27, or 28.
    pub v: u8,
}

impl EcdsaSignature {
    /// An all-zero placeholder used by the unsigned meta-tx builders.
    pub const UNSIGNED: Self = Self {
        r: [0u8; 32],
        s: [0u8; 32],
        v: 0,
    };

    /// Returns true if this is the unsigned placeholder.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        *self == Self::UNSIGNED
    }
}

// =============================================================================
// CANONICALIZATION
// =============================================================================

/// Constant-time strict less-than over 32-byte big-endian values.
fn ct_less_than(value: &[u8; 32], bound: &[u8; 32]) -> bool {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);
    for i in 0..32 {
        let undecided = !(less | greater);
        less |= undecided & Choice::from((value[i] < bound[i]) as u8);
        greater |= undecided & Choice::from((value[i] > bound[i]) as u8);
    }
    less.into()
}

/// Scalar range check: value in [1, n-1].
fn is_valid_scalar(value: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for byte in value {
        is_zero &= byte.ct_eq(&0u8);
    }
    let nonzero: bool = (!is_zero).into();
    nonzero && ct_less_than(value, &SECP256K1_ORDER)
}

/// Low-s check: s strictly below the half order.
fn is_low_s(s: &[u8; 32]) -> bool {
    ct_less_than(s, &SECP256K1_HALF_ORDER)
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, EngineError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(EngineError::InvalidSignatureFormat),
    };
    RecoveryId::try_from(id).map_err(|_| EngineError::InvalidSignatureFormat)
}

/// Validates signature shape and canonical form.
///
/// Rejects out-of-range scalars and bad recovery ids as
/// `InvalidSignatureFormat` and the malleable high-s form as
/// `InvalidSignatureValue`.
pub fn check_signature_canonical(signature: &EcdsaSignature) -> Result<(), EngineError> {
    if !is_valid_scalar(&signature.r) || !is_valid_scalar(&signature.s) {
        return Err(EngineError::InvalidSignatureFormat);
    }
    parse_recovery_id(signature.v)?;
    if !is_low_s(&signature.s) {
        return Err(EngineError::InvalidSignatureValue);
    }
    Ok(())
}

/// Recovers the signer address from a prehashed digest.
pub fn recover_signer(digest: &Hash, signature: &EcdsaSignature) -> Result<Address, EngineError> {
    let recovery_id = parse_recovery_id(signature.v)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);
    let parsed = Signature::from_slice(&sig_bytes);
    sig_bytes.zeroize();
    let sig = parsed.map_err(|_| EngineError::InvalidSignatureFormat)?;

    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
        .map_err(|_| EngineError::InvalidSignatureValue)?;

    Ok(address_from_pubkey(&key))
}

/// Derives the account address from a public key: last 20 bytes of the
/// Keccak-256 hash of the uncompressed key without its 0x04 prefix.
#[must_use]
pub fn address_from_pubkey(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let digest = keccak256(&encoded.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest.as_bytes()[12..]);
    Address::new(address)
}

// =============================================================================
// STRUCTURED DIGEST
// =============================================================================

/// Domain separator for one engine instance.
///
/// Binds engine name, protocol version, chain id, and the instance address.
#[must_use]
pub fn domain_separator(chain_id: u64, self_address: Address) -> Hash {
    keccak256_concat(&[
        keccak256(ENGINE_NAME.as_bytes()).as_bytes(),
        keccak256(ENGINE_VERSION.as_bytes()).as_bytes(),
        &chain_id.to_be_bytes(),
        self_address.as_bytes(),
    ])
}

/// Digest of the record fields a meta-transaction signature covers.
///
/// Field order is fixed: id, requester, target, value, budget, operation
/// type, handler, keccak256(params). All integers big-endian.
#[must_use]
pub fn hash_tx_content(id: u64, params: &TxParams) -> Hash {
    let params_hash = keccak256(&params.params);
    keccak256_concat(&[
        &id.to_be_bytes(),
        params.requester.as_bytes(),
        params.target.as_bytes(),
        &params.value.to_be_bytes(),
        &params.budget.to_be_bytes(),
        params.operation_type.as_bytes(),
        params.handler.as_bytes(),
        params_hash.as_bytes(),
    ])
}

/// Digest of the meta-transaction constraint fields, in fixed order.
#[must_use]
pub fn hash_meta_params(meta: &MetaTxParams) -> Hash {
    keccak256_concat(&[
        &meta.chain_id.to_be_bytes(),
        &meta.nonce.to_be_bytes(),
        meta.handler_contract.as_bytes(),
        meta.handler.as_bytes(),
        &meta.action.bit().to_be_bytes(),
        &meta.deadline.to_be_bytes(),
        &meta.max_resource_price.to_be_bytes(),
        meta.signer.as_bytes(),
    ])
}

/// The full signed digest: 0x1901 ‖ domain separator ‖ message hash.
#[must_use]
pub fn message_digest(state: &EngineState, record: &TxRecord, meta: &MetaTxParams) -> Hash {
    let separator = domain_separator(state.chain_id, state.self_address);
    let message = keccak256_concat(&[
        hash_tx_content(record.id, &record.params).as_bytes(),
        hash_meta_params(meta).as_bytes(),
    ]);
    keccak256_concat(&[&STRUCTURED_PREFIX, separator.as_bytes(), message.as_bytes()])
}

// =============================================================================
// META-TX VERIFICATION
// =============================================================================

/// How the signed record relates to the transaction store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaTxKind {
    /// Approve or cancel an existing PENDING record.
    Existing,
    /// Request-and-approve: the record must not exist yet (id = counter + 1).
    New,
}

impl EngineState {
    /// Verifies every constraint of a meta-transaction, in order, and
    /// returns the recovered signer on success.
    ///
    /// All checks must pass or the call aborts: canonical signature; record
    /// PENDING (or not-yet-created for [`MetaTxKind::New`]); requester
    /// non-zero; chain id match; handler contract/handler match the record's
    /// target/handler; action matches the entry point; deadline not elapsed;
    /// max resource price non-zero; nonce strictly equal; recovered signer
    /// equals the declared signer and holds the sign permission.
    pub fn verify_meta_tx(
        &self,
        meta: &MetaTransaction,
        kind: MetaTxKind,
        required_action: TxAction,
        now: u64,
    ) -> Result<Address, EngineError> {
        check_signature_canonical(&meta.signature)?;

        match kind {
            MetaTxKind::Existing => {
                let stored = self.pending_transaction(meta.record.id)?;
                if stored.params.target != meta.params.handler_contract
                    || stored.params.handler != meta.params.handler
                {
                    return Err(EngineError::DomainMismatch {
                        context: "handler binding",
                    });
                }
            }
            MetaTxKind::New => {
                if meta.record.id != self.next_tx_id() {
                    return Err(EngineError::TransactionNotFound(meta.record.id));
                }
                if meta.record.params.target != meta.params.handler_contract
                    || meta.record.params.handler != meta.params.handler
                {
                    return Err(EngineError::DomainMismatch {
                        context: "handler binding",
                    });
                }
            }
        }

        if meta.record.params.requester.is_zero() {
            return Err(EngineError::InvalidAddress {
                context: "requester",
            });
        }
        if meta.params.chain_id != self.chain_id {
            return Err(EngineError::DomainMismatch {
                context: "chain id",
            });
        }
        if meta.params.action != required_action {
            return Err(EngineError::DomainMismatch { context: "action" });
        }
        if now > meta.params.deadline {
            return Err(EngineError::DeadlineExpired {
                deadline: meta.params.deadline,
                now,
            });
        }
        if meta.params.max_resource_price == 0 {
            return Err(EngineError::InvalidResourcePrice);
        }

        let expected_nonce = self.nonce_of(meta.params.signer);
        if meta.params.nonce != expected_nonce {
            return Err(EngineError::NonceMismatch {
                expected: expected_nonce,
                actual: meta.params.nonce,
            });
        }

        let digest = message_digest(self, &meta.record, &meta.params);
        if digest != meta.digest {
            return Err(EngineError::InvalidSignatureValue);
        }

        let recovered = recover_signer(&digest, &meta.signature)?;
        if recovered != meta.params.signer {
            return Err(EngineError::InvalidRecoveredSigner {
                recovered,
                declared: meta.params.signer,
            });
        }
        if !self.has_action_permission(recovered, meta.params.handler, required_action) {
            return Err(EngineError::SignerNotAuthorized {
                signer: recovered,
                action: required_action,
                handler: meta.params.handler,
            });
        }

        Ok(recovered)
    }

    /// Consumes the signer's nonce. Called exactly once per verified
    /// meta-transaction, before the downstream invocation is attempted, so a
    /// failed invocation never returns the nonce for reuse.
    pub fn consume_nonce(&mut self, signer: Address) {
        *self.nonces.entry(signer).or_insert(0) += 1;
    }

    // =========================================================================
    // UNSIGNED BUILDERS (off-chain signer tooling)
    // =========================================================================

    /// Builds an unsigned meta-transaction over an existing record, with the
    /// digest precomputed. The caller fills in the signature off-line.
    pub fn build_meta_tx_for_existing(
        &self,
        tx_id: u64,
        mut meta_params: MetaTxParams,
    ) -> Result<MetaTransaction, EngineError> {
        let record = self.transaction(tx_id)?.clone();
        meta_params.chain_id = self.chain_id;
        meta_params.handler_contract = record.params.target;
        meta_params.handler = record.params.handler;
        meta_params.nonce = self.nonce_of(meta_params.signer);
        let digest = message_digest(self, &record, &meta_params);
        Ok(MetaTransaction {
            record,
            params: meta_params,
            digest,
            signature: EcdsaSignature::UNSIGNED,
            data: Vec::new(),
        })
    }

    /// Builds an unsigned request-and-approve meta-transaction for a
    /// not-yet-created record (id = counter + 1).
    pub fn build_meta_tx_for_new(
        &self,
        tx_params: TxParams,
        mut meta_params: MetaTxParams,
    ) -> Result<MetaTransaction, EngineError> {
        if tx_params.target.is_zero() {
            return Err(EngineError::InvalidAddress { context: "target" });
        }
        let record = TxRecord {
            id: self.next_tx_id(),
            release_time: 0,
            status: blox_types::TxStatus::Pending,
            params: tx_params,
            result: Vec::new(),
            payment: crate::domain::entities::PaymentDetails::default(),
        };
        meta_params.chain_id = self.chain_id;
        meta_params.handler_contract = record.params.target;
        meta_params.handler = record.params.handler;
        meta_params.nonce = self.nonce_of(meta_params.signer);
        let digest = message_digest(self, &record, &meta_params);
        Ok(MetaTransaction {
            record,
            params: meta_params,
            digest,
            signature: EcdsaSignature::UNSIGNED,
            data: Vec::new(),
        })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


// =============================================================================
// UNIT TESTS
// =============================================================================
