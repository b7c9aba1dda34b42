//! N-step transition adder.
use super::{AdderConfig, Backpressure, Ring};
use crate::{
    Extras, FerryError, ItemEncoder, ReplayTable, Shaped, StepRecord, TimeStep, Transition,
};
use log::{debug, trace};
use std::sync::Arc;

/// Writes the n-step transitions of one actor's trajectories to a table.
///
/// The adder keeps at most `n_step` encoded steps plus the pending
/// observation, so memory per actor is constant. Items are written to the
/// table with [`ReplayTable::insert_many`], all of one call or none of them,
/// and the internal state only advances once the table has accepted them.
/// With [`Backpressure::Fail`] a refused call therefore leaves the adder
/// unchanged and can be repeated with the same arguments.
pub struct Adder<O, A> {
    table: Arc<ReplayTable<Transition<O, A>>>,
    encoder: ItemEncoder,
    n_step: usize,
    period: usize,
    backpressure: Backpressure,
    steps: Ring<StepRecord<O, A>>,
    current: Option<O>,
}

impl<O, A> Adder<O, A>
where
    O: Clone + Shaped,
    A: Clone + Shaped,
{
    /// Creates an adder writing to `table`.
    ///
    /// Shapes are checked against the signature of the table, if it has one.
    pub fn build(
        config: &AdderConfig,
        table: Arc<ReplayTable<Transition<O, A>>>,
    ) -> Result<Self, FerryError> {
        config.validate()?;
        table.check_widths(config.max_insert_width(), 1)?;
        let encoder = ItemEncoder::new(table.signature().cloned(), config.discount);
        Ok(Self {
            table,
            encoder,
            n_step: config.n_step,
            period: config.effective_period(),
            backpressure: config.backpressure,
            steps: Ring::new(config.n_step),
            current: None,
        })
    }

    /// Returns `true` between `observe_first` and the last step of an episode.
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Table the adder writes to.
    pub fn table(&self) -> &Arc<ReplayTable<Transition<O, A>>> {
        &self.table
    }

    /// Starts a trajectory.
    pub fn observe_first(&mut self, observation: &O) -> Result<(), FerryError> {
        if self.current.is_some() {
            return Err(FerryError::InvalidTrajectoryState(
                "observe_first called while a trajectory is open".into(),
            ));
        }
        self.encoder.check_observation(observation)?;
        self.current = Some(observation.clone());
        Ok(())
    }

    /// Records `action` and the time step it led to.
    pub fn observe(&mut self, action: &A, next: &TimeStep<O>) -> Result<(), FerryError> {
        self.observe_with_extras(action, next, Extras::new())
    }

    /// Records `action`, the time step it led to and auxiliary tensors
    /// belonging to the step on which the action was taken.
    ///
    /// Emits a transition whenever `n_step` steps are buffered. When `next`
    /// is the last step of the episode all buffered steps are flushed as
    /// possibly shorter windows and the trajectory is closed.
    pub fn observe_with_extras(
        &mut self,
        action: &A,
        next: &TimeStep<O>,
        extras: Extras,
    ) -> Result<(), FerryError> {
        let current = match &self.current {
            Some(obs) => obs.clone(),
            None => {
                return Err(FerryError::InvalidTrajectoryState(
                    "observe called before observe_first".into(),
                ))
            }
        };
        if next.is_first() {
            return Err(FerryError::InvalidTrajectoryState(
                "observe called with the first step of an episode".into(),
            ));
        }
        self.encoder.check_observation(&next.observation)?;
        let step = self.encoder.encode(
            current,
            action.clone(),
            next.reward,
            next.discount,
            extras,
        )?;

        let items = self.plan(&step, next);
        if !items.is_empty() {
            trace!("Write {} items to `{}`", items.len(), self.table.name());
            self.write(items)?;
        }

        // Commit
        if next.is_last() {
            self.steps.clear();
            self.current = None;
        } else {
            if self.steps.push(step).is_err() {
                // A full ring is always drained right after it fills up.
                return Err(FerryError::InvalidTrajectoryState(
                    "step buffer overflow".into(),
                ));
            }
            if self.steps.len() == self.n_step {
                self.steps.drop_front(self.period);
            }
            self.current = Some(next.observation.clone());
        }
        Ok(())
    }

    /// Drops the open trajectory, if any, without writing it.
    pub fn reset(&mut self) {
        if self.current.is_some() {
            debug!("Drop {} buffered steps on reset", self.steps.len());
        }
        self.steps.clear();
        self.current = None;
    }

    // Items emitted if `step` were appended, without changing any state.
    fn plan(&self, step: &StepRecord<O, A>, next: &TimeStep<O>) -> Vec<Transition<O, A>> {
        let window: Vec<&StepRecord<O, A>> =
            self.steps.iter().chain(std::iter::once(step)).collect();
        let len = window.len();
        let mut items = vec![];

        if !next.is_last() {
            if len == self.n_step {
                items.extend(self.encoder.compose(window, &next.observation));
            }
            return items;
        }

        let mut start = 0;
        while start < len {
            let end = (start + self.n_step).min(len);
            let next_obs = match window.get(end) {
                Some(s) => &s.observation,
                None => &next.observation,
            };
            items.extend(
                self.encoder
                    .compose(window[start..end].iter().copied(), next_obs),
            );
            start += self.period;
        }
        items
    }

    fn write(&self, items: Vec<Transition<O, A>>) -> Result<(), FerryError> {
        match self.backpressure {
            Backpressure::Block => self.table.insert_many_blocking(items),
            Backpressure::Fail => match self.table.insert_many(items) {
                Err(FerryError::CapacityRateLimited { table }) => {
                    Err(FerryError::AdderBackpressure { table })
                }
                res => res,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RateLimiterConfig, TableConfig, Tensor};

    fn table(max_size: usize) -> Arc<ReplayTable<Transition<f32, i64>>> {
        let config = TableConfig::default().max_size(max_size);
        Arc::new(ReplayTable::build(&config).unwrap())
    }

    fn adder(n_step: usize, period: Option<usize>) -> Adder<f32, i64> {
        let config = AdderConfig::default()
            .n_step(n_step)
            .discount(0.9)
            .period(period);
        Adder::build(&config, table(100)).unwrap()
    }

    // Rewards 1, 2, ... and a terminal last step.
    fn run_episode(adder: &mut Adder<f32, i64>, len: usize) {
        adder.observe_first(&0.0).unwrap();
        for t in 1..=len {
            let ts = if t == len {
                TimeStep::termination(t as f32, t as f32)
            } else {
                TimeStep::mid(t as f32, t as f32)
            };
            adder.observe(&(t as i64), &ts).unwrap();
        }
    }

    #[test]
    fn test_n_step_episode_gives_one_transition() {
        let mut adder = adder(3, None);
        run_episode(&mut adder, 3);
        let items = adder.table().contents();
        assert_eq!(items.len(), 1);
        let t = &items[0];
        assert!((t.reward - (1.0 + 0.9 * 2.0 + 0.81 * 3.0)).abs() < 1e-5);
        assert_eq!(t.discount, 0.0);
        assert_eq!(t.observation, 0.0);
        assert_eq!(t.action, 1);
        assert_eq!(t.next_observation, 3.0);
        assert!(!adder.is_open());
    }

    #[test]
    fn test_short_episode_is_flushed() {
        let mut adder = adder(5, None);
        run_episode(&mut adder, 2);
        let items = adder.table().contents();
        assert_eq!(items.len(), 1);
        assert!((items[0].reward - 2.8).abs() < 1e-5);
        assert_eq!(items[0].next_observation, 2.0);
    }

    #[test]
    fn test_non_overlapping_windows() {
        let mut adder = adder(2, None);
        run_episode(&mut adder, 5);
        let items = adder.table().contents();
        let starts: Vec<f32> = items.iter().map(|t| t.observation).collect();
        let ends: Vec<f32> = items.iter().map(|t| t.next_observation).collect();
        assert_eq!(starts, vec![0.0, 2.0, 4.0]);
        assert_eq!(ends, vec![2.0, 4.0, 5.0]);
        // Every reward counted exactly once.
        let undiscounted: f32 = items.iter().map(|t| t.reward).sum();
        assert!((undiscounted - (1.0 + 0.9 * 2.0 + 3.0 + 0.9 * 4.0 + 5.0)).abs() < 1e-5);
        assert_eq!(items[0].discount, 0.9);
        assert_eq!(items[2].discount, 0.0);
    }

    #[test]
    fn test_overlapping_windows_flush_tail() {
        let mut adder = adder(3, Some(1));
        run_episode(&mut adder, 5);
        let items = adder.table().contents();
        assert_eq!(items.len(), 5);
        let starts: Vec<f32> = items.iter().map(|t| t.observation).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let ends: Vec<f32> = items.iter().map(|t| t.next_observation).collect();
        assert_eq!(ends, vec![3.0, 4.0, 5.0, 5.0, 5.0]);
        assert_eq!(items[4].reward, 5.0);
    }

    #[test]
    fn test_truncation_keeps_bootstrap_discount() {
        let mut adder = adder(2, None);
        adder.observe_first(&0.0).unwrap();
        adder
            .observe(&0, &TimeStep::truncation(1.0, 1.0))
            .unwrap();
        let items = adder.table().contents();
        assert_eq!(items[0].discount, 1.0);
    }

    #[test]
    fn test_protocol_violations() {
        let mut adder = adder(2, None);
        assert!(matches!(
            adder.observe(&0, &TimeStep::mid(1.0, 0.0)),
            Err(FerryError::InvalidTrajectoryState(_))
        ));
        adder.observe_first(&0.0).unwrap();
        assert!(matches!(
            adder.observe_first(&0.0),
            Err(FerryError::InvalidTrajectoryState(_))
        ));
        assert!(matches!(
            adder.observe(&0, &TimeStep::first(1.0)),
            Err(FerryError::InvalidTrajectoryState(_))
        ));
        adder.reset();
        assert!(adder.observe_first(&0.0).is_ok());
    }

    #[test]
    fn test_fail_mode_is_retryable() {
        let config = TableConfig::default()
            .max_size(100)
            .rate_limiter(RateLimiterConfig::SampleToInsertRatio {
                samples_per_insert: 1.0,
                min_size: 1,
                error_buffer: 1.0,
            });
        // max_diff = 2: two inserts before a sample is needed
        let table = Arc::new(ReplayTable::build(&config).unwrap());
        let config = AdderConfig::default()
            .n_step(1)
            .backpressure(Backpressure::Fail);
        let mut adder: Adder<f32, i64> = Adder::build(&config, table.clone()).unwrap();

        adder.observe_first(&0.0).unwrap();
        adder.observe(&0, &TimeStep::mid(1.0, 1.0)).unwrap();
        adder.observe(&1, &TimeStep::mid(2.0, 1.0)).unwrap();
        let ts = TimeStep::mid(3.0, 1.0);
        assert_eq!(
            adder.observe(&2, &ts),
            Err(FerryError::AdderBackpressure {
                table: "replay".into()
            })
        );
        assert_eq!(table.size(), 2);

        table.sample(1).unwrap();
        adder.observe(&2, &ts).unwrap();
        let items = table.contents();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].observation, 2.0);
        assert_eq!(items[2].next_observation, 3.0);
    }

    #[test]
    fn test_extras_of_first_step() {
        let mut adder = adder(2, None);
        adder.observe_first(&0.0).unwrap();
        let mut extras = Extras::new();
        extras.insert("logp".into(), Tensor::zeros([1]));
        adder
            .observe_with_extras(&0, &TimeStep::mid(1.0, 0.0), extras.clone())
            .unwrap();
        adder
            .observe(&1, &TimeStep::termination(2.0, 0.0))
            .unwrap();
        assert_eq!(adder.table().contents()[0].extras, extras);
    }
}
