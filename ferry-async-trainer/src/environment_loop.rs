//! Episode runner connecting an environment to an actor.
use crate::{Actor, ActorStat};
use anyhow::Result;
use ferry_core::{
    record::{Record, RecordValue::Scalar},
    Env, FerryError, Shaped, TimeStep,
};
use log::{debug, trace};
use parking_lot::Mutex;
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

/// Runs episodes of an [`Env`] with an [`Actor`].
///
/// Each step selects an action, advances the environment, passes the step to
/// the actor's adder and lets the actor refresh its parameters. The loop is
/// stopped cooperatively through a shared flag; calls blocked on a closed
/// table or variable source end the loop as well.
pub struct EnvironmentLoop<E: Env, P> {
    env: E,
    actor: Actor<P, E::Obs, E::Act>,
    stop: Arc<Mutex<bool>>,
    retry_interval: Duration,
    env_steps: usize,
    episodes: usize,
}

impl<E, P> EnvironmentLoop<E, P>
where
    E: Env,
    E::Obs: Shaped,
    E::Act: Shaped,
{
    /// Creates a loop.
    ///
    /// `retry_interval` is the pause before an insert refused with
    /// [`FerryError::AdderBackpressure`] is retried.
    pub fn new(
        env: E,
        actor: Actor<P, E::Obs, E::Act>,
        stop: Arc<Mutex<bool>>,
        retry_interval: Duration,
    ) -> Self {
        Self {
            env,
            actor,
            stop,
            retry_interval,
            env_steps: 0,
            episodes: 0,
        }
    }

    fn stopped(&self) -> bool {
        *self.stop.lock()
    }

    fn observe(&mut self, act: &E::Act, next: &TimeStep<E::Obs>) -> Result<(), FerryError> {
        loop {
            match self.actor.observe(act, next) {
                Err(FerryError::AdderBackpressure { table }) => {
                    if self.stopped() {
                        return Err(FerryError::Cancelled("environment loop".into()));
                    }
                    trace!("Table `{}` refused the step, retry", table);
                    thread::sleep(self.retry_interval);
                }
                res => return res,
            }
        }
    }

    /// Runs one episode and returns `episode_length` and `episode_return`.
    ///
    /// If the stop flag is raised mid-episode the open trajectory is dropped
    /// and [`FerryError::Cancelled`] is returned.
    pub fn run_episode(&mut self) -> Result<Record> {
        let mut ts = self.env.reset()?;
        self.actor.observe_first(&ts.observation)?;
        let mut episode_length = 0;
        let mut episode_return = 0.0;

        while !ts.is_last() {
            if self.stopped() {
                self.actor.reset();
                return Err(FerryError::Cancelled("environment loop".into()).into());
            }
            let act = self.actor.select_action(&ts.observation)?;
            let next = self.env.step(&act)?;
            self.observe(&act, &next)?;
            self.actor.update(false)?;

            episode_length += 1;
            episode_return += next.reward;
            self.env_steps += 1;
            ts = next;
        }
        self.episodes += 1;

        Ok(Record::from_slice(&[
            ("episode_length", Scalar(episode_length as _)),
            ("episode_return", Scalar(episode_return)),
        ]))
    }

    /// Runs episodes until the stop flag is raised, `max_episodes` episodes
    /// are done, or the table or variable source is closed.
    pub fn run(&mut self, max_episodes: Option<usize>) -> Result<ActorStat> {
        let time = Instant::now();
        let res = self.run_inner(max_episodes);
        let stat = ActorStat {
            env_steps: self.env_steps,
            episodes: self.episodes,
            version: self.actor.version(),
            duration: time.elapsed(),
        };
        match res {
            Ok(()) => Ok(stat),
            Err(e) => match e.downcast_ref::<FerryError>() {
                Some(err) if err.is_cancelled() => {
                    debug!("Environment loop stops: {}", err);
                    Ok(stat)
                }
                _ => Err(e),
            },
        }
    }

    fn run_inner(&mut self, max_episodes: Option<usize>) -> Result<()> {
        // Never act on unset parameters.
        self.actor.update(true)?;
        while !self.stopped() {
            if max_episodes.map_or(false, |n| self.episodes >= n) {
                break;
            }
            let record = self.run_episode()?;
            trace!("Episode {} done: {:?}", self.episodes, record);
        }
        Ok(())
    }

    /// The actor driven by this loop.
    pub fn actor(&self) -> &Actor<P, E::Obs, E::Act> {
        &self.actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{
        dummy::{ChainConfig, ChainEnv},
        Adder, AdderConfig, Backpressure, RateLimiterConfig, ReplayTable, TableConfig,
        VariableSource,
    };
    use rand::rngs::StdRng;

    type Obs = Vec<f32>;

    fn go_right(
        source: &VariableSource<()>,
        adder: Option<Adder<Obs, i64>>,
    ) -> Actor<(), Obs, i64> {
        let policy = Box::new(|_: &(), obs: &[Obs], _: &mut StdRng| vec![1i64; obs.len()]);
        Actor::new(policy, source.client(1), adder, 0)
    }

    #[test]
    fn test_run_episode() {
        let config = ChainConfig::default();
        let env = ChainEnv::build(&config, 0).unwrap();
        let table = Arc::new(ReplayTable::build(&TableConfig::default()).unwrap());
        let adder = Adder::build(&AdderConfig::default().n_step(2), table.clone()).unwrap();
        let source = VariableSource::new();
        source.publish(());
        let stop = Arc::new(Mutex::new(false));
        let mut lp = EnvironmentLoop::new(
            env,
            go_right(&source, Some(adder)),
            stop,
            Duration::from_millis(1),
        );
        let stat = lp.run(Some(3)).unwrap();
        assert_eq!(stat.episodes, 3);
        assert_eq!(stat.env_steps, 12);
        // 4 steps per episode, 2 steps per transition
        assert_eq!(table.size(), 6);
        assert!(table.contents().iter().all(|t| t.observation.len() == 5));

        let record = lp.run_episode().unwrap();
        assert_eq!(record.get_scalar("episode_return").unwrap(), 1.0);
        assert_eq!(record.get_scalar("episode_length").unwrap(), 4.0);
    }

    #[test]
    fn test_stops_when_blocked_adder_is_cancelled() {
        let env = ChainEnv::build(&ChainConfig::default(), 0).unwrap();
        let config = TableConfig::default().rate_limiter(RateLimiterConfig::SampleToInsertRatio {
            samples_per_insert: 1.0,
            min_size: 1,
            error_buffer: 1.0,
        });
        let table = Arc::new(ReplayTable::build(&config).unwrap());
        let adder = Adder::build(
            &AdderConfig::default().backpressure(Backpressure::Block),
            table.clone(),
        )
        .unwrap();
        let source = VariableSource::new();
        source.publish(());
        let stop = Arc::new(Mutex::new(false));
        let mut lp = EnvironmentLoop::new(
            env,
            go_right(&source, Some(adder)),
            stop,
            Duration::from_millis(1),
        );

        let handle = thread::spawn(move || lp.run(None));
        thread::sleep(Duration::from_millis(20));
        // The actor is blocked on the rate limiter after two inserts.
        assert_eq!(table.size(), 2);
        table.close();
        let stat = handle.join().unwrap().unwrap();
        assert_eq!(stat.env_steps, 2);
    }
}
