use super::LearnerConfig;
use anyhow::Result;
use ferry_core::{
    record::{Record, RecordValue::Scalar},
    Batch, DatasetIterator, FerryError, ReplayTable, UpdateFn, VariableSource,
};
use log::{debug, info};
use std::{sync::Arc, time::Duration};

/// Moves target parameters towards the online ones:
/// `track(target, online, tau)` should compute `target <- tau * online + (1 - tau) * target`.
pub type TrackFn<P> = Box<dyn Fn(&mut P, &P, f64) + Send>;

/// Consumes batches and updates parameters.
///
/// Each [`Learner::step`] takes exactly one batch from the dataset, blocking
/// until the table can serve it, and applies the update function. Every
/// `target_update_period` steps the target copy is refreshed, and every
/// `publish_period` steps the online parameters are published to the
/// [`VariableSource`]. The initial parameters are published on construction,
/// so actors waiting for their first snapshot are released as soon as the
/// learner exists.
pub struct Learner<P, T> {
    params: P,
    target: P,
    update_fn: Box<dyn UpdateFn<P, Batch<T>>>,
    track_fn: Option<TrackFn<P>>,
    dataset: DatasetIterator<T>,
    source: VariableSource<P>,
    target_update_period: usize,
    tau: f64,
    publish_period: usize,
    steps: usize,
    target_syncs: usize,
    version: u64,
}

impl<P, T> Learner<P, T>
where
    P: Clone,
    T: Clone,
{
    /// Creates a learner and publishes `params` as version 1.
    ///
    /// A soft target update (`tau < 1`) needs `track_fn`.
    pub fn build(
        config: &LearnerConfig,
        params: P,
        update_fn: Box<dyn UpdateFn<P, Batch<T>>>,
        track_fn: Option<TrackFn<P>>,
        dataset: DatasetIterator<T>,
        source: VariableSource<P>,
    ) -> Result<Self, FerryError> {
        config.validate()?;
        if config.tau < 1.0 && track_fn.is_none() {
            return Err(FerryError::InvalidConfig(
                "soft target updates (tau < 1) need a track function".into(),
            ));
        }
        let version = source.publish(params.clone());
        info!("Learner publishes its initial parameters");

        Ok(Self {
            target: params.clone(),
            params,
            update_fn,
            track_fn,
            dataset,
            source,
            target_update_period: config.target_update_period,
            tau: config.tau,
            publish_period: config.publish_period,
            steps: 0,
            target_syncs: 0,
            version,
        })
    }

    /// Performs one update, blocking until a batch is available.
    ///
    /// Returns an error wrapping [`FerryError::Cancelled`] once the table is
    /// closed.
    pub fn step(&mut self) -> Result<Record> {
        let batch = self.dataset.fetch()?;
        self.update(batch)
    }

    /// Performs one update if a batch arrives within `timeout`.
    pub fn step_timeout(&mut self, timeout: Duration) -> Result<Option<Record>> {
        match self.dataset.next_timeout(timeout)? {
            Some(batch) => Ok(Some(self.update(batch)?)),
            None => Ok(None),
        }
    }

    fn update(&mut self, batch: Batch<T>) -> Result<Record> {
        let (params, record) = self.update_fn.call(&self.params, &self.target, batch)?;
        self.params = params;
        self.steps += 1;

        if self.steps % self.target_update_period == 0 {
            self.sync_target();
        }
        if self.steps % self.publish_period == 0 {
            self.version = self.source.publish(self.params.clone());
        }

        let mut record = record;
        record.insert("learner_steps", Scalar(self.steps as _));
        record.insert("version", Scalar(self.version as _));
        record.insert("target_syncs", Scalar(self.target_syncs as _));
        Ok(record)
    }

    fn sync_target(&mut self) {
        match &self.track_fn {
            Some(track) if self.tau < 1.0 => track(&mut self.target, &self.params, self.tau),
            _ => self.target = self.params.clone(),
        }
        self.target_syncs += 1;
        debug!("Update target parameters at step {}", self.steps);
    }

    /// Online parameters.
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Target parameters.
    pub fn target(&self) -> &P {
        &self.target
    }

    /// Number of completed steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Version of the last published parameters.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Table the learner reads from.
    pub fn table(&self) -> &Arc<ReplayTable<T>> {
        self.dataset.table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{RateLimiterConfig, TableConfig};

    type Params = Vec<f32>;

    // Adds the mean of the batch to every parameter.
    fn mean_update() -> Box<dyn UpdateFn<Params, Batch<f32>>> {
        Box::new(|p: &Params, _: &Params, b: Batch<f32>| {
            let mean = b.iter().sum::<f32>() / b.len() as f32;
            let p = p.iter().map(|x| x + mean).collect::<Vec<_>>();
            Ok::<_, anyhow::Error>((p, Record::from_scalar("mean", mean)))
        })
    }

    fn dataset() -> DatasetIterator<f32> {
        let config = TableConfig::default()
            .max_size(10)
            .rate_limiter(RateLimiterConfig::MinSize(1));
        let table = Arc::new(ReplayTable::build(&config).unwrap());
        table.insert(1.0).unwrap();
        DatasetIterator::new(table, 4).unwrap()
    }

    #[test]
    fn test_hard_target_update_and_publish() {
        let source = VariableSource::new();
        let config = LearnerConfig::default()
            .target_update_period(3)
            .publish_period(2);
        let mut learner =
            Learner::build(&config, vec![0.0], mean_update(), None, dataset(), source.clone())
                .unwrap();
        assert_eq!(source.version(), 1);

        for step in 1..=6 {
            let record = learner.step().unwrap();
            assert_eq!(record.get_scalar("learner_steps").unwrap(), step as f32);
            assert_eq!(record.get_scalar("mean").unwrap(), 1.0);
        }
        assert_eq!(learner.params(), &vec![6.0]);
        assert_eq!(learner.target(), &vec![6.0]);
        // Versions 2, 3 and 4 were published at steps 2, 4 and 6.
        assert_eq!(source.version(), 4);
        assert_eq!(*source.latest().unwrap().params, vec![6.0]);

        learner.step().unwrap();
        assert_eq!(learner.target(), &vec![6.0]);
    }

    #[test]
    fn test_soft_target_update() {
        let config = LearnerConfig::default().target_update_period(1).tau(0.5);
        let source = VariableSource::new();
        assert!(Learner::build(
            &config,
            vec![0.0],
            mean_update(),
            None,
            dataset(),
            source.clone()
        )
        .is_err());

        let track: TrackFn<Params> = Box::new(|target: &mut Params, online: &Params, tau: f64| {
            for (t, o) in target.iter_mut().zip(online) {
                *t = tau as f32 * o + (1.0 - tau as f32) * *t;
            }
        });
        let mut learner =
            Learner::build(&config, vec![0.0], mean_update(), Some(track), dataset(), source)
                .unwrap();
        learner.step().unwrap();
        assert_eq!(learner.target(), &vec![0.5]);
        learner.step().unwrap();
        assert_eq!(learner.target(), &vec![1.25]);
    }

    #[test]
    fn test_step_cancelled_by_close() {
        let source = VariableSource::new();
        let dataset = dataset();
        let table = dataset.table().clone();
        let mut learner = Learner::build(
            &LearnerConfig::default(),
            vec![0.0],
            mean_update(),
            None,
            dataset,
            source,
        )
        .unwrap();
        table.close();
        let err = learner.step().unwrap_err();
        assert!(err
            .downcast_ref::<FerryError>()
            .map_or(false, |e| e.is_cancelled()));
    }
}
