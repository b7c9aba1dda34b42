//! Utility function.
use crate::{
    actor_stats_fmt, ActorManager, ActorManagerConfig, ActorStat, AsyncTrainStat, AsyncTrainer,
    AsyncTrainerConfig, Builder, TrackFn,
};
use anyhow::Result;
use ferry_core::{
    record::Recorder, Batch, Env, FerryConfig, PolicyFn, Shaped, Transition, UpdateFn,
    VariableSource,
};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;

/// Runs asynchronous training.
///
/// This function builds the replay table, the learner and
/// `actor_man_config.n_actors` actors from `config`, then runs the actors on
/// threads and the learner loop on the calling thread. Actors and learner
/// communicate only through the replay table and the variable source.
///
/// When the learner loop ends, the pipeline is shut down in order: the stop
/// flag is raised, the tables and the variable source are closed, which
/// releases every blocked actor, and the actor threads are joined.
///
/// * `config` - Configuration of the replay pipeline.
/// * `actor_man_config` - Configuration of [`ActorManager`].
/// * `async_trainer_config` - Configuration of [`AsyncTrainer`].
/// * `env_config` - Configuration of the environment of each actor.
/// * `params` - Initial parameters, published before any actor starts.
/// * `policy` - Behaviour policy, cloned into every actor.
/// * `update_fn` - Update rule of the learner.
/// * `track_fn` - Soft target update, needed if `config.tau < 1`.
/// * `recorder` - Sink of the learner records.
#[allow(clippy::too_many_arguments)]
pub fn train_async<E, P, F>(
    config: &FerryConfig,
    actor_man_config: &ActorManagerConfig,
    async_trainer_config: &AsyncTrainerConfig,
    env_config: &E::Config,
    params: P,
    policy: F,
    update_fn: Box<dyn UpdateFn<P, Batch<Transition<E::Obs, E::Act>>>>,
    track_fn: Option<TrackFn<P>>,
    recorder: &mut impl Recorder,
) -> Result<(AsyncTrainStat, Vec<ActorStat>, P)>
where
    E: Env + 'static,
    E::Config: Send + 'static,
    E::Obs: Shaped + Send + Sync + 'static,
    E::Act: Shaped + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
    F: PolicyFn<P, E::Obs, E::Act> + Clone + 'static,
{
    let builder = Builder::new(config.clone(), E::spec(env_config))?;
    let server = builder.make_replay_server::<E::Obs, E::Act>()?;
    let client = server.client();
    let source = VariableSource::new();

    // The learner publishes its initial parameters here.
    let dataset = builder.make_dataset_iterator(&client)?;
    let mut learner = builder.make_learner(params, update_fn, track_fn, dataset, &source)?;
    let mut trainer = AsyncTrainer::build(async_trainer_config)?;

    // Shared flag to stop actor threads
    let stop = Arc::new(Mutex::new(false));

    let mut actors = ActorManager::<E, P, F>::build(
        actor_man_config,
        &builder,
        env_config,
        policy,
        client.clone(),
        source.clone(),
        stop.clone(),
    );

    // Starts sampling and training
    actors.run()?;
    let res = trainer.train(&mut learner, recorder, stop.clone());

    // Shutdown, also when training failed
    *stop.lock() = true;
    client.close();
    source.close();
    let actor_stats = actors.join();

    let stats = res?;
    info!("Stats of async trainer");
    info!("{}", stats.fmt());

    let actor_stats = actor_stats?;
    info!("Stats of generated samples in actors");
    info!("{}", actor_stats_fmt(&actor_stats));

    Ok((stats, actor_stats, learner.params().clone()))
}
