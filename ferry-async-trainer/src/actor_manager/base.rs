use crate::{ActorManagerConfig, ActorStat, Builder, EnvironmentLoop};
use anyhow::{anyhow, Result};
use ferry_core::{Env, PolicyFn, ReplayClient, Shaped, Transition, VariableSource};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::{sync::Arc, thread::JoinHandle, time::Duration};

/// Manages [`Actor`](crate::Actor)s.
///
/// Each actor runs an [`EnvironmentLoop`] on its own thread with its own
/// environment, adder and variable client. Actors share nothing but the
/// replay tables behind `client` and the variable source, and they block on
/// their first parameter update until the learner has published.
///
/// An actor that fails raises the stop flag and closes the tables and the
/// variable source, so the learner and the other actors return and the
/// error surfaces from [`ActorManager::join`].
pub struct ActorManager<E, P, F>
where
    E: Env,
{
    config: ActorManagerConfig,
    builder: Builder,
    env_config: E::Config,
    policy: F,
    client: ReplayClient<Transition<E::Obs, E::Act>>,
    source: VariableSource<P>,

    /// Flag to stop the actors.
    stop: Arc<Mutex<bool>>,

    /// Thread handles.
    threads: Vec<JoinHandle<Result<ActorStat>>>,
}

impl<E, P, F> ActorManager<E, P, F>
where
    E: Env + 'static,
    E::Config: Send + 'static,
    E::Obs: Shaped + Send + Sync + 'static,
    E::Act: Shaped + Send + Sync + 'static,
    P: Send + Sync + 'static,
    F: PolicyFn<P, E::Obs, E::Act> + Clone + 'static,
{
    /// Builds an [`ActorManager`].
    pub fn build(
        config: &ActorManagerConfig,
        builder: &Builder,
        env_config: &E::Config,
        policy: F,
        client: ReplayClient<Transition<E::Obs, E::Act>>,
        source: VariableSource<P>,
        stop: Arc<Mutex<bool>>,
    ) -> Self {
        Self {
            config: config.clone(),
            builder: builder.clone(),
            env_config: env_config.clone(),
            policy,
            client,
            source,
            stop,
            threads: vec![],
        }
    }

    /// Spawns the actor threads.
    pub fn run(&mut self) -> Result<()> {
        // Prevents simultaneous initialization of envs
        let guard_init_env = Arc::new(Mutex::new(true));

        for id in 0..self.config.n_actors {
            let seed = self.config.seed + id as u64;
            let adder = self.builder.make_adder(&self.client)?;
            let actor = self.builder.make_actor(
                Box::new(self.policy.clone()),
                &self.source,
                Some(adder),
                seed,
            );
            let env_config = self.env_config.clone();
            let stop = self.stop.clone();
            let guard = guard_init_env.clone();
            let retry_interval = Duration::from_millis(self.config.retry_interval_ms);
            let client = self.client.clone();
            let source = self.source.clone();

            let handle = std::thread::spawn(move || -> Result<ActorStat> {
                let res = (|| -> Result<ActorStat> {
                    let env = {
                        let _guard = guard.lock();
                        E::build(&env_config, seed as i64)?
                    };
                    info!("Start actor {}", id);
                    EnvironmentLoop::new(env, actor, stop.clone(), retry_interval).run(None)
                })();
                match res {
                    Ok(stat) => {
                        info!("Stopped actor {}", id);
                        Ok(stat)
                    }
                    Err(e) => {
                        error!("Actor {} failed, shutting down: {}", id, e);
                        *stop.lock() = true;
                        client.close();
                        source.close();
                        Err(e)
                    }
                }
            });
            self.threads.push(handle);
        }
        Ok(())
    }

    /// Stops actor threads.
    pub fn stop(&self) {
        let mut stop = self.stop.lock();
        *stop = true;
    }

    /// Waits until all actors finish.
    ///
    /// Actors blocked on a table or on the variable source only return after
    /// these have been closed. Every thread is joined; the first failure is
    /// returned.
    pub fn join(self) -> Result<Vec<ActorStat>> {
        let mut stats = vec![];
        let mut first_err = None;
        for (id, h) in self.threads.into_iter().enumerate() {
            let err = match h.join() {
                Ok(Ok(stat)) => {
                    stats.push(stat);
                    continue;
                }
                Ok(Err(e)) => {
                    warn!("Actor {} failed: {}", id, e);
                    e
                }
                Err(_) => anyhow!("actor {} panicked", id),
            };
            first_err.get_or_insert(err);
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// Stops and joins actors.
    pub fn stop_and_join(self) -> Result<Vec<ActorStat>> {
        self.stop();
        self.join()
    }
}
