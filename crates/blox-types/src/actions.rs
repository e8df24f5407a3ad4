//! # Lifecycle Actions
//!
//! The ten fine-grained actions a permission grant can carry, packed into a
//! 16-bit bitmap. The bit assignments are fixed; grants are validated with
//! typed subset checks rather than inline shifts.
//!
//! ## Bit Table
//!
//! | Bit | Action |
//! |-----|--------|
//! | 0 | `TimeDelayRequest` |
//! | 1 | `TimeDelayApprove` |
//! | 2 | `TimeDelayCancel` |
//! | 3 | `SignMetaRequestAndApprove` |
//! | 4 | `SignMetaApprove` |
//! | 5 | `SignMetaCancel` |
//! | 6 | `ExecuteMetaRequestAndApprove` |
//! | 7 | `ExecuteMetaApprove` |
//! | 8 | `ExecuteMetaCancel` |
//! | 9 | `UpdatePayment` |
//!
//! Each `SignMeta*` action is paired with its `ExecuteMeta*` counterpart; a
//! single grant must never hold both halves of a pair (privilege separation
//! between authorizing a delegated action and executing it).

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// ACTION
// =============================================================================

/// A single lifecycle action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TxAction {
    /// Request an operation on the time-delay path.
    TimeDelayRequest,
    /// Approve a pending operation after its release time.
    TimeDelayApprove,
    /// Cancel a pending operation on the time-delay path.
    TimeDelayCancel,
    /// Sign a meta-transaction that requests and approves in one call.
    SignMetaRequestAndApprove,
    /// Sign a meta-transaction approving an existing pending operation.
    SignMetaApprove,
    /// Sign a meta-transaction cancelling an existing pending operation.
    SignMetaCancel,
    /// Present (relay) a signed request-and-approve meta-transaction.
    ExecuteMetaRequestAndApprove,
    /// Present (relay) a signed approval meta-transaction.
    ExecuteMetaApprove,
    /// Present (relay) a signed cancellation meta-transaction.
    ExecuteMetaCancel,
    /// Attach or replace the payment on a pending operation.
    UpdatePayment,
}

impl TxAction {
    /// All ten actions, in bit order.
    pub const ALL: [TxAction; 10] = [
        TxAction::TimeDelayRequest,
        TxAction::TimeDelayApprove,
        TxAction::TimeDelayCancel,
        TxAction::SignMetaRequestAndApprove,
        TxAction::SignMetaApprove,
        TxAction::SignMetaCancel,
        TxAction::ExecuteMetaRequestAndApprove,
        TxAction::ExecuteMetaApprove,
        TxAction::ExecuteMetaCancel,
        TxAction::UpdatePayment,
    ];

    /// The bit index assigned to this action.
    #[must_use]
    pub const fn bit(self) -> u16 {
        match self {
            TxAction::TimeDelayRequest => 0,
            TxAction::TimeDelayApprove => 1,
            TxAction::TimeDelayCancel => 2,
            TxAction::SignMetaRequestAndApprove => 3,
            TxAction::SignMetaApprove => 4,
            TxAction::SignMetaCancel => 5,
            TxAction::ExecuteMetaRequestAndApprove => 6,
            TxAction::ExecuteMetaApprove => 7,
            TxAction::ExecuteMetaCancel => 8,
            TxAction::UpdatePayment => 9,
        }
    }

    /// The mask with only this action's bit set.
    #[must_use]
    pub const fn mask(self) -> u16 {
        1 << self.bit()
    }

    /// For a `SignMeta*` action, the paired `ExecuteMeta*` action (and vice
    /// versa). Actions outside the meta pairs have no counterpart.
    #[must_use]
    pub const fn meta_counterpart(self) -> Option<TxAction> {
        match self {
            TxAction::SignMetaRequestAndApprove => Some(TxAction::ExecuteMetaRequestAndApprove),
            TxAction::SignMetaApprove => Some(TxAction::ExecuteMetaApprove),
            TxAction::SignMetaCancel => Some(TxAction::ExecuteMetaCancel),
            TxAction::ExecuteMetaRequestAndApprove => Some(TxAction::SignMetaRequestAndApprove),
            TxAction::ExecuteMetaApprove => Some(TxAction::SignMetaApprove),
            TxAction::ExecuteMetaCancel => Some(TxAction::SignMetaCancel),
            _ => None,
        }
    }
}

impl fmt::Display for TxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// =============================================================================
// ACTION SET (16-bit bitmap, 10 bits used)
// =============================================================================

/// A set of lifecycle actions, packed into 16 bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ActionSet(pub u16);

/// The three (sign, execute) meta-action pairs.
const META_PAIRS: [(TxAction, TxAction); 3] = [
    (
        TxAction::SignMetaRequestAndApprove,
        TxAction::ExecuteMetaRequestAndApprove,
    ),
    (TxAction::SignMetaApprove, TxAction::ExecuteMetaApprove),
    (TxAction::SignMetaCancel, TxAction::ExecuteMetaCancel),
];

impl ActionSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Mask covering every defined action bit.
    pub const VALID_MASK: u16 = (1 << 10) - 1;

    /// Builds a set from a list of actions.
    #[must_use]
    pub fn of(actions: &[TxAction]) -> Self {
        let mut set = Self::EMPTY;
        for action in actions {
            set = set.with(*action);
        }
        set
    }

    /// Returns the set with `action` added.
    #[must_use]
    pub const fn with(self, action: TxAction) -> Self {
        Self(self.0 | action.mask())
    }

    /// Returns true if the set contains `action`.
    #[must_use]
    pub const fn contains(self, action: TxAction) -> bool {
        self.0 & action.mask() != 0
    }

    /// Returns true if every action in `self` is also in `other`.
    #[must_use]
    pub const fn is_subset_of(self, other: ActionSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if any bit outside the ten defined actions is set.
    #[must_use]
    pub const fn has_undefined_bits(self) -> bool {
        self.0 & !Self::VALID_MASK != 0
    }

    /// Returns the first (sign, execute) meta pair where the set holds both
    /// halves, if any. Such a grant is a privilege-separation violation.
    #[must_use]
    pub fn meta_conflict(self) -> Option<(TxAction, TxAction)> {
        META_PAIRS
            .into_iter()
            .find(|(sign, execute)| self.contains(*sign) && self.contains(*execute))
    }

    /// Iterates the actions present in the set, in bit order.
    pub fn iter(self) -> impl Iterator<Item = TxAction> {
        TxAction::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionSet({:#012b})", self.0)
    }
}

impl FromIterator<TxAction> for ActionSet {
    fn from_iter<I: IntoIterator<Item = TxAction>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for action in iter {
            set = set.with(action);
        }
        set
    }
}

// =============================================================================
// TESTS
// =============================================================================
