//! Small environment used in tests and demos.
use crate::{ArraySpec, Env, EnvironmentSpec, TimeStep};
use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of [`ChainEnv`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of states.
    pub n_states: usize,

    /// Episodes are truncated after this many steps.
    pub max_steps: usize,

    /// Probability that an action moves in a random direction.
    pub slip: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            n_states: 5,
            max_steps: 50,
            slip: 0.0,
        }
    }
}

/// Walk on a chain of states.
///
/// Episodes start in state 0. Action 1 moves right, action 0 moves left. The
/// episode terminates with reward 1 on reaching the last state. Observations
/// are one-hot vectors.
pub struct ChainEnv {
    config: ChainConfig,
    state: usize,
    steps: usize,
    rng: StdRng,
}

impl ChainEnv {
    fn obs(&self) -> Vec<f32> {
        let mut obs = vec![0.0; self.config.n_states];
        obs[self.state] = 1.0;
        obs
    }

    /// Current state.
    pub fn state(&self) -> usize {
        self.state
    }
}

impl Env for ChainEnv {
    type Config = ChainConfig;
    type Obs = Vec<f32>;
    type Act = i64;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        if config.n_states < 2 {
            bail!("a chain needs at least 2 states, got {}", config.n_states);
        }
        Ok(Self {
            config: config.clone(),
            state: 0,
            steps: 0,
            rng: StdRng::seed_from_u64(seed as u64),
        })
    }

    fn spec(config: &Self::Config) -> EnvironmentSpec {
        EnvironmentSpec {
            observations: ArraySpec::new([config.n_states], "one_hot"),
            actions: ArraySpec::new(Vec::new(), "direction"),
        }
    }

    fn reset(&mut self) -> Result<TimeStep<Self::Obs>> {
        self.state = 0;
        self.steps = 0;
        Ok(TimeStep::first(self.obs()))
    }

    fn step(&mut self, act: &Self::Act) -> Result<TimeStep<Self::Obs>> {
        let right = match act {
            0 => false,
            1 => true,
            _ => bail!("invalid action {}", act),
        };
        let right = if self.rng.gen::<f32>() < self.config.slip {
            self.rng.gen::<bool>()
        } else {
            right
        };
        self.state = if right {
            self.state + 1
        } else {
            self.state.saturating_sub(1)
        };
        self.steps += 1;

        let obs = self.obs();
        Ok(if self.state == self.config.n_states - 1 {
            TimeStep::termination(obs, 1.0)
        } else if self.steps >= self.config.max_steps {
            TimeStep::truncation(obs, 0.0)
        } else {
            TimeStep::mid(obs, 0.0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_right_terminates() {
        let config = ChainConfig::default();
        let mut env = ChainEnv::build(&config, 0).unwrap();
        assert!(env.reset().unwrap().is_first());
        for _ in 0..3 {
            assert!(!env.step(&1).unwrap().is_last());
        }
        let ts = env.step(&1).unwrap();
        assert!(ts.is_last());
        assert_eq!(ts.discount, 0.0);
        assert_eq!(ts.reward, 1.0);
    }

    #[test]
    fn test_truncation() {
        let config = ChainConfig {
            max_steps: 2,
            ..ChainConfig::default()
        };
        let mut env = ChainEnv::build(&config, 0).unwrap();
        env.reset().unwrap();
        env.step(&0).unwrap();
        let ts = env.step(&0).unwrap();
        assert!(ts.is_last());
        assert_eq!(ts.discount, 1.0);
        assert_eq!(env.state(), 0);
    }
}
