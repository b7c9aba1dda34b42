//! Item encoder.
//!
//! Turns raw environment steps into [`StepRecord`]s, checking shapes against
//! the [`Signature`] of the destination table, and composes a window of
//! consecutive steps into one n-step [`Transition`].
use crate::{EnvironmentSpec, Extras, FerryError, Shaped, Transition};
use serde::{Deserialize, Serialize};

/// Shapes every item of a table must have.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Shape of observations and next observations.
    pub observation: Vec<usize>,

    /// Shape of actions.
    pub action: Vec<usize>,
}

impl Signature {
    /// Derives the signature of transition items from an environment spec.
    pub fn from_spec(spec: &EnvironmentSpec) -> Self {
        Self {
            observation: spec.observations.shape.clone(),
            action: spec.actions.shape.clone(),
        }
    }

    fn check(&self, field: &str, expected: &[usize], actual: Vec<usize>) -> Result<(), FerryError> {
        if expected != actual.as_slice() {
            return Err(FerryError::SignatureMismatch {
                field: field.to_string(),
                expected: expected.to_vec(),
                actual,
            });
        }
        Ok(())
    }

    /// Checks the shape of an observation.
    pub fn check_observation<O: Shaped>(&self, obs: &O) -> Result<(), FerryError> {
        self.check("observation", &self.observation, obs.shape())
    }

    /// Checks the shape of an action.
    pub fn check_action<A: Shaped>(&self, act: &A) -> Result<(), FerryError> {
        self.check("action", &self.action, act.shape())
    }
}

/// One encoded step `(o_t, a_t, r_{t+1}, d_{t+1}, extras_t)`.
#[derive(Clone, Debug, PartialEq)]
pub struct StepRecord<O, A> {
    /// Observation the action was taken on.
    pub observation: O,

    /// Action.
    pub action: A,

    /// Reward received after the action.
    pub reward: f32,

    /// Discount received after the action.
    pub discount: f32,

    /// Auxiliary tensors.
    pub extras: Extras,
}

/// Encodes steps and composes n-step transitions.
#[derive(Clone, Debug)]
pub struct ItemEncoder {
    signature: Option<Signature>,
    discount: f32,
}

impl ItemEncoder {
    /// Creates an encoder with the additional discount `discount` applied
    /// between steps of a window. Without a signature no shape is checked.
    pub fn new(signature: Option<Signature>, discount: f32) -> Self {
        Self {
            signature,
            discount,
        }
    }

    /// Signature checked by this encoder.
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Checks an observation against the signature.
    pub fn check_observation<O: Shaped>(&self, obs: &O) -> Result<(), FerryError> {
        match &self.signature {
            Some(sig) => sig.check_observation(obs),
            None => Ok(()),
        }
    }

    /// Encodes one step.
    pub fn encode<O: Shaped, A: Shaped>(
        &self,
        observation: O,
        action: A,
        reward: f32,
        discount: f32,
        extras: Extras,
    ) -> Result<StepRecord<O, A>, FerryError> {
        if let Some(sig) = &self.signature {
            sig.check_observation(&observation)?;
            sig.check_action(&action)?;
        }
        if !(0.0..=1.0).contains(&discount) {
            return Err(FerryError::InvalidTrajectoryState(format!(
                "discount {} is outside [0, 1]",
                discount
            )));
        }
        Ok(StepRecord {
            observation,
            action,
            reward,
            discount,
            extras,
        })
    }

    /// Composes a window of consecutive steps into one transition.
    ///
    /// With `c_0 = 1` and `c_i = prod_{j<i} (gamma * d_j)`, the reward is
    /// `sum_i c_i r_i` and the discount is `d_0 * prod_{i>=1} (gamma * d_i)`.
    /// Observation, action and extras come from the first step.
    ///
    /// Returns `None` for an empty window.
    pub fn compose<'a, O, A, I>(&self, window: I, next_observation: &O) -> Option<Transition<O, A>>
    where
        O: Clone + 'a,
        A: Clone + 'a,
        I: IntoIterator<Item = &'a StepRecord<O, A>>,
    {
        let mut steps = window.into_iter();
        let first = steps.next()?;
        let mut reward = first.reward;
        let mut discount = first.discount;
        for step in steps {
            discount *= self.discount;
            reward += discount * step.reward;
            discount *= step.discount;
        }
        Some(Transition {
            observation: first.observation.clone(),
            action: first.action.clone(),
            reward,
            discount,
            next_observation: next_observation.clone(),
            extras: first.extras.clone(),
        })
    }
}
