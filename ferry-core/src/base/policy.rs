//! Model collaborators.
use crate::record::Record;
use anyhow::Result;
use rand::rngs::StdRng;

/// Behaviour policy: `policy(params, observations, rng) -> actions`.
///
/// The function is batched and must not keep state between calls; all
/// randomness comes from `rng`, which the actor seeds at construction.
/// Closures of the matching signature implement this trait.
pub trait PolicyFn<P, O, A>: Send {
    /// Computes one action per observation.
    fn call(&self, params: &P, observations: &[O], rng: &mut StdRng) -> Vec<A>;
}

impl<P, O, A, F> PolicyFn<P, O, A> for F
where
    F: Fn(&P, &[O], &mut StdRng) -> Vec<A> + Send,
{
    fn call(&self, params: &P, observations: &[O], rng: &mut StdRng) -> Vec<A> {
        self(params, observations, rng)
    }
}

/// Update rule: `update(params, target, batch) -> (new_params, record)`.
///
/// Called once per learner step. `target` is the slow-moving copy of the
/// parameters; rules without a target network ignore it. The returned record
/// is merged into the learner's own record for the step.
pub trait UpdateFn<P, B>: Send {
    /// Computes new parameters from one batch.
    fn call(&mut self, params: &P, target: &P, batch: B) -> Result<(P, Record)>;
}

impl<P, B, F> UpdateFn<P, B> for F
where
    F: FnMut(&P, &P, B) -> Result<(P, Record)> + Send,
{
    fn call(&mut self, params: &P, target: &P, batch: B) -> Result<(P, Record)> {
        self(params, target, batch)
    }
}
