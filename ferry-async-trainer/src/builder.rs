//! Factories wiring a replay pipeline together.
use crate::{Actor, Learner, LearnerConfig, TrackFn};
use ferry_core::{
    Adder, Batch, DatasetIterator, EnvironmentSpec, FerryConfig, FerryError, PolicyFn,
    ReplayClient, ReplayServer, ReplayTable, Shaped, Signature, Transition, UpdateFn,
    VariableSource,
};

/// Builds the components of a pipeline from a [`FerryConfig`] and the
/// [`EnvironmentSpec`] of the environment.
///
/// The builder holds no runtime state. Its factories have to be called in
/// dependency order, because adders and datasets take table handles:
///
/// 1. [`Builder::make_replay_tables`] or [`Builder::make_replay_server`],
/// 2. [`Builder::make_adder`] and [`Builder::make_dataset_iterator`],
/// 3. [`Builder::make_actor`] and [`Builder::make_learner`].
#[derive(Clone, Debug)]
pub struct Builder {
    config: FerryConfig,
    spec: EnvironmentSpec,
}

impl Builder {
    /// Creates a builder, validating the configuration.
    pub fn new(config: FerryConfig, spec: EnvironmentSpec) -> Result<Self, FerryError> {
        config.validate()?;
        Ok(Self { config, spec })
    }

    /// Configuration of the pipeline.
    pub fn config(&self) -> &FerryConfig {
        &self.config
    }

    /// Creates the replay table, with the signature of the environment.
    pub fn make_replay_tables<O, A>(&self) -> Result<Vec<ReplayTable<Transition<O, A>>>, FerryError>
    where
        O: Clone,
        A: Clone,
    {
        let signature = Signature::from_spec(&self.spec);
        let table = ReplayTable::build(&self.config.table_config(Some(signature)))?;
        Ok(vec![table])
    }

    /// Creates a server owning the tables of [`Builder::make_replay_tables`].
    pub fn make_replay_server<O, A>(&self) -> Result<ReplayServer<Transition<O, A>>, FerryError>
    where
        O: Clone,
        A: Clone,
    {
        ReplayServer::new(self.make_replay_tables()?)
    }

    /// Creates an adder writing to the replay table.
    pub fn make_adder<O, A>(
        &self,
        client: &ReplayClient<Transition<O, A>>,
    ) -> Result<Adder<O, A>, FerryError>
    where
        O: Clone + Shaped,
        A: Clone + Shaped,
    {
        let table = client.table(&self.config.replay_table_name)?;
        Adder::build(&self.config.adder_config(), table)
    }

    /// Creates a dataset reading batches from the replay table.
    pub fn make_dataset_iterator<O, A>(
        &self,
        client: &ReplayClient<Transition<O, A>>,
    ) -> Result<DatasetIterator<Transition<O, A>>, FerryError>
    where
        O: Clone,
        A: Clone,
    {
        let table = client.table(&self.config.replay_table_name)?;
        DatasetIterator::new(table, self.config.batch_size)
    }

    /// Creates an actor pulling parameters from `source`.
    ///
    /// Actors used only for evaluation get no adder.
    pub fn make_actor<P, O, A>(
        &self,
        policy: Box<dyn PolicyFn<P, O, A>>,
        source: &VariableSource<P>,
        adder: Option<Adder<O, A>>,
        seed: u64,
    ) -> Actor<P, O, A>
    where
        O: Clone + Shaped,
        A: Clone + Shaped,
    {
        let client = source.client(self.config.variable_update_period);
        Actor::new(policy, client, adder, seed)
    }

    /// Creates a learner publishing to `source`.
    pub fn make_learner<P, O, A>(
        &self,
        params: P,
        update_fn: Box<dyn UpdateFn<P, Batch<Transition<O, A>>>>,
        track_fn: Option<TrackFn<P>>,
        dataset: DatasetIterator<Transition<O, A>>,
        source: &VariableSource<P>,
    ) -> Result<Learner<P, Transition<O, A>>, FerryError>
    where
        P: Clone,
        O: Clone,
        A: Clone,
    {
        let config = LearnerConfig::from(&self.config);
        Learner::build(&config, params, update_fn, track_fn, dataset, source.clone())
    }
}
