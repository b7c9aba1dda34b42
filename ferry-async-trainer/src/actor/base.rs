use ferry_core::{
    Adder, Extras, FerryError, PolicyFn, Shaped, TimeStep, VariableClient,
};
use rand::{rngs::StdRng, SeedableRng};

/// Acts in an environment with the latest parameters of the learner.
///
/// The actor holds a behaviour policy, a [`VariableClient`] caching the
/// parameters and, optionally, an [`Adder`] that receives every
/// `observe_first`/`observe` call unchanged. The random stream handed to the
/// policy is seeded at construction, so an actor with fixed parameters is
/// deterministic.
pub struct Actor<P, O, A> {
    policy: Box<dyn PolicyFn<P, O, A>>,
    client: VariableClient<P>,
    adder: Option<Adder<O, A>>,
    rng: StdRng,
}

impl<P, O, A> Actor<P, O, A>
where
    O: Clone + Shaped,
    A: Clone + Shaped,
{
    /// Creates an actor.
    pub fn new(
        policy: Box<dyn PolicyFn<P, O, A>>,
        client: VariableClient<P>,
        adder: Option<Adder<O, A>>,
        seed: u64,
    ) -> Self {
        Self {
            policy,
            client,
            adder,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Computes an action with the cached parameters.
    ///
    /// Fails with [`FerryError::ParamsNotSynced`] before the first
    /// [`Actor::update`].
    pub fn select_action(&mut self, observation: &O) -> Result<A, FerryError> {
        let params = self.client.params()?;
        let mut actions = self
            .policy
            .call(params, std::slice::from_ref(observation), &mut self.rng);
        if actions.len() != 1 {
            return Err(FerryError::PolicyOutput(actions.len()));
        }
        Ok(actions.remove(0))
    }

    /// Starts an episode in the adder.
    pub fn observe_first(&mut self, observation: &O) -> Result<(), FerryError> {
        match self.adder.as_mut() {
            Some(adder) => adder.observe_first(observation),
            None => Ok(()),
        }
    }

    /// Passes a step to the adder.
    pub fn observe(&mut self, action: &A, next: &TimeStep<O>) -> Result<(), FerryError> {
        self.observe_with_extras(action, next, Extras::new())
    }

    /// Passes a step with auxiliary tensors to the adder.
    pub fn observe_with_extras(
        &mut self,
        action: &A,
        next: &TimeStep<O>,
        extras: Extras,
    ) -> Result<(), FerryError> {
        match self.adder.as_mut() {
            Some(adder) => adder.observe_with_extras(action, next, extras),
            None => Ok(()),
        }
    }

    /// Drops the open trajectory of the adder.
    pub fn reset(&mut self) {
        if let Some(adder) = self.adder.as_mut() {
            adder.reset();
        }
    }

    /// Pulls parameters.
    ///
    /// With `wait`, and always on the first call, blocks until the learner has
    /// published. Returns `true` if newer parameters were fetched.
    pub fn update(&mut self, wait: bool) -> Result<bool, FerryError> {
        self.client.update(wait)
    }

    /// Version of the cached parameters, 0 before the first update.
    pub fn version(&self) -> u64 {
        self.client.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{AdderConfig, ReplayTable, TableConfig, VariableSource};
    use rand::Rng;
    use std::sync::Arc;

    fn noisy_policy() -> Box<dyn PolicyFn<f32, f32, f32>> {
        Box::new(|w: &f32, obs: &[f32], rng: &mut StdRng| {
            obs.iter().map(|o| w * o + rng.gen::<f32>()).collect::<Vec<_>>()
        })
    }

    #[test]
    fn test_act_requires_params() {
        let source = VariableSource::new();
        let mut actor = Actor::new(noisy_policy(), source.client(1), None, 0);
        assert_eq!(actor.select_action(&1.0), Err(FerryError::ParamsNotSynced));

        source.publish(2.0);
        actor.update(true).unwrap();
        assert_eq!(actor.version(), 1);
        let a = actor.select_action(&1.0).unwrap();
        assert!((2.0..3.0).contains(&a));
    }

    #[test]
    fn test_seeded_actors_agree() {
        let source = VariableSource::new();
        source.publish(1.0);
        let mut a1 = Actor::new(noisy_policy(), source.client(1), None, 7);
        let mut a2 = Actor::new(noisy_policy(), source.client(1), None, 7);
        a1.update(true).unwrap();
        a2.update(true).unwrap();
        for _ in 0..10 {
            assert_eq!(a1.select_action(&0.5), a2.select_action(&0.5));
        }
    }

    #[test]
    fn test_bad_policy_output() {
        let source = VariableSource::new();
        source.publish(0.0);
        let policy: Box<dyn PolicyFn<f32, f32, f32>> =
            Box::new(|_: &f32, _: &[f32], _: &mut StdRng| Vec::<f32>::new());
        let mut actor = Actor::new(policy, source.client(1), None, 0);
        actor.update(true).unwrap();
        assert_eq!(actor.select_action(&0.0), Err(FerryError::PolicyOutput(0)));
    }

    #[test]
    fn test_observe_reaches_adder() {
        let table = Arc::new(ReplayTable::build(&TableConfig::default()).unwrap());
        let adder = Adder::build(&AdderConfig::default(), table.clone()).unwrap();
        let source = VariableSource::new();
        let mut actor = Actor::new(noisy_policy(), source.client(1), Some(adder), 0);
        actor.observe_first(&0.0).unwrap();
        actor.observe(&1.0, &TimeStep::mid(1.0, 1.0)).unwrap();
        actor
            .observe(&1.0, &TimeStep::termination(2.0, 1.0))
            .unwrap();
        assert_eq!(table.size(), 2);
    }
}
