//! Batch of sampled items.
use crate::{SampleInfo, Sampled, Transition};

/// Items of one sample call, in draw order.
///
/// Ownership of the batch moves to the learner for one update.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch<T> {
    items: Vec<T>,
    info: Vec<SampleInfo>,
}

impl<T> Batch<T> {
    /// Builds a batch from the output of a table.
    pub fn from_sampled(sampled: Vec<Sampled<T>>) -> Self {
        let (items, info) = sampled.into_iter().map(|s| (s.item, s.info)).unzip();
        Self { items, info }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the batch has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items of the batch.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// How each item was drawn.
    pub fn info(&self) -> &[SampleInfo] {
        &self.info
    }

    /// Keys of the items.
    pub fn keys(&self) -> Vec<u64> {
        self.info.iter().map(|i| i.key).collect()
    }

    /// Consumes the batch, returning the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Iterates over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<O, A> Batch<Transition<O, A>> {
    /// Unpacks the batch into
    /// `(observations, actions, rewards, discounts, next_observations)`.
    #[allow(clippy::type_complexity)]
    pub fn unpack(self) -> (Vec<O>, Vec<A>, Vec<f32>, Vec<f32>, Vec<O>) {
        let n = self.items.len();
        let mut obs = Vec::with_capacity(n);
        let mut act = Vec::with_capacity(n);
        let mut reward = Vec::with_capacity(n);
        let mut discount = Vec::with_capacity(n);
        let mut next_obs = Vec::with_capacity(n);
        for t in self.items {
            obs.push(t.observation);
            act.push(t.action);
            reward.push(t.reward);
            discount.push(t.discount);
            next_obs.push(t.next_observation);
        }
        (obs, act, reward, discount, next_obs)
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
