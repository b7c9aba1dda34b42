use crate::{AsyncTrainStat, AsyncTrainerConfig, Learner};
use anyhow::Result;
use ferry_core::{
    record::{Record, RecordValue::Scalar, Recorder},
    FerryError,
};
use log::info;
use parking_lot::Mutex;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs the learner loop while actors fill the replay table.
///
/// # Training loop
///
/// 1. Wait at most `poll_interval_ms` for a batch and do a learner step
///    ([`Learner::step_timeout`]). If no batch arrived, check the stop flag
///    and wait again.
/// 2. If `learner_steps % record_compute_cost_interval == 0`, add
///    `"learner_steps_per_sec"` and the counters of the table to the record.
/// 3. If `learner_steps % flush_record_interval == 0`, write the record to
///    the recorder.
/// 4. Finish when `learner_steps == max_learner_steps`, when the stop flag is
///    raised, or when the table is closed.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[ActorManager]-->|Transition|B[ReplayTable]
///     B -->|Batch|C[Learner]
///     C -->|params|D[VariableSource]
///     D -->|VariableSnapshot|A
/// ```
pub struct AsyncTrainer {
    /// The maximum number of learner steps.
    max_learner_steps: usize,

    /// Interval of flushing records in learner steps.
    flush_record_interval: usize,

    /// Interval of recording compute cost in learner steps.
    record_compute_cost_interval: usize,

    /// Timeout of a single wait for a batch.
    poll_interval: Duration,
}

impl AsyncTrainer {
    /// Creates [`AsyncTrainer`].
    pub fn build(config: &AsyncTrainerConfig) -> Result<Self, FerryError> {
        if config.flush_record_interval == 0 || config.record_compute_cost_interval == 0 {
            return Err(FerryError::InvalidConfig(
                "record intervals must be positive".into(),
            ));
        }
        Ok(Self {
            max_learner_steps: config.max_learner_steps,
            flush_record_interval: config.flush_record_interval,
            record_compute_cost_interval: config.record_compute_cost_interval,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    /// Record compute cost.
    fn record_compute_cost<P, T>(
        &self,
        learner: &Learner<P, T>,
        record: &mut Record,
        steps_: &mut usize,
        time: &mut Instant,
    ) where
        P: Clone,
        T: Clone,
    {
        let duration = time.elapsed().as_secs_f32();
        if duration > 0.0 {
            record.insert("learner_steps_per_sec", Scalar(*steps_ as f32 / duration));
        }
        let info = learner.table().info();
        record.insert("table_size", Scalar(info.size as _));
        record.insert("table_inserts", Scalar(info.inserts as _));
        record.insert("table_samples", Scalar(info.samples as _));

        // Reset counter
        *steps_ = 0;
        *time = Instant::now();
    }

    /// Runs the training loop.
    pub fn train<P, T>(
        &mut self,
        learner: &mut Learner<P, T>,
        recorder: &mut impl Recorder,
        stop: Arc<Mutex<bool>>,
    ) -> Result<AsyncTrainStat>
    where
        P: Clone,
        T: Clone,
    {
        let time_total = Instant::now();
        let inserts_0 = learner.table().info().inserts;
        let steps_0 = learner.steps();
        let mut steps_ = 0;
        let mut time = Instant::now();

        info!("Start training loop");
        while learner.steps() - steps_0 < self.max_learner_steps {
            if *stop.lock() {
                info!("Training loop stopped by flag");
                break;
            }
            let mut record = match learner.step_timeout(self.poll_interval) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => match e.downcast_ref::<FerryError>() {
                    Some(err) if err.is_cancelled() => {
                        info!("Training loop stopped: {}", err);
                        break;
                    }
                    _ => return Err(e),
                },
            };
            steps_ += 1;

            let steps = learner.steps();
            if steps % self.record_compute_cost_interval == 0 {
                self.record_compute_cost(learner, &mut record, &mut steps_, &mut time);
            }
            if steps % self.flush_record_interval == 0 {
                recorder.write(record);
            }
        }
        recorder.flush();

        let duration = time_total.elapsed();
        let secs = duration.as_secs_f32().max(f32::EPSILON);
        let learner_steps = learner.steps() - steps_0;
        let inserts = learner.table().info().inserts - inserts_0;
        Ok(AsyncTrainStat {
            learner_steps,
            inserts_per_sec: inserts as f32 / secs,
            duration,
            steps_per_sec: learner_steps as f32 / secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LearnerConfig;
    use ferry_core::{
        record::{BufferedRecorder, NullRecorder},
        Batch, DatasetIterator, RateLimiterConfig, ReplayTable, TableConfig, VariableSource,
    };

    fn learner(min_size: usize) -> Learner<u32, u32> {
        let config = TableConfig::default()
            .max_size(10)
            .rate_limiter(RateLimiterConfig::MinSize(min_size));
        let table = Arc::new(ReplayTable::build(&config).unwrap());
        table.insert(1).unwrap();
        let dataset = DatasetIterator::new(table, 2).unwrap();
        let update = Box::new(|p: &u32, _: &u32, _: Batch<u32>| {
            Ok::<_, anyhow::Error>((p + 1, Record::empty()))
        });
        Learner::build(
            &LearnerConfig::default(),
            0,
            update,
            None,
            dataset,
            VariableSource::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_train_until_max_steps() {
        let config = AsyncTrainerConfig::default()
            .max_learner_steps(10)
            .flush_record_interval(5)
            .record_compute_cost_interval(5);
        let mut trainer = AsyncTrainer::build(&config).unwrap();
        let mut learner = learner(1);
        let mut recorder = BufferedRecorder::new();
        let stat = trainer
            .train(&mut learner, &mut recorder, Arc::new(Mutex::new(false)))
            .unwrap();
        assert_eq!(stat.learner_steps, 10);
        assert_eq!(*learner.params(), 10);
        assert_eq!(recorder.len(), 2);
        let last = recorder.iter().last().unwrap();
        assert_eq!(last.get_scalar("learner_steps").unwrap(), 10.0);
        assert_eq!(last.get_scalar("table_size").unwrap(), 1.0);
    }

    #[test]
    fn test_stop_flag_releases_starved_learner() {
        let config = AsyncTrainerConfig::default().poll_interval_ms(5);
        let mut trainer = AsyncTrainer::build(&config).unwrap();
        // min_size is never reached
        let mut learner = learner(5);
        let stop = Arc::new(Mutex::new(false));
        let handle = {
            let stop = stop.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                *stop.lock() = true;
            })
        };
        let stat = trainer
            .train(&mut learner, &mut NullRecorder {}, stop)
            .unwrap();
        handle.join().unwrap();
        assert_eq!(stat.learner_steps, 0);
    }
}
