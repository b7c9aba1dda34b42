//! Training items.
use crate::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Auxiliary tensors attached to a step, such as recurrent state or the
/// log-probability of the behaviour policy.
pub type Extras = BTreeMap<String, Tensor>;

/// An n-step transition `(o_t, a_t, R, D, o_{t+k})`.
///
/// `reward` is the discounted sum of the `k <= n` rewards in the window and
/// `discount` the product of the discounts that bootstraps from
/// `next_observation`. Transitions are created by the adder and never mutated
/// afterwards; the fields are public for reading only by convention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition<O, A> {
    /// Observation at the start of the window.
    pub observation: O,

    /// Action taken on `observation`.
    pub action: A,

    /// Discounted sum of rewards in the window.
    pub reward: f32,

    /// Bootstrap discount, zero if the window ends in a terminal state.
    pub discount: f32,

    /// Observation at the end of the window.
    pub next_observation: O,

    /// Extras of the first step of the window.
    pub extras: Extras,
}

impl<O, A> Transition<O, A> {
    /// Returns `true` if the window ends in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.discount == 0.0
    }
}
