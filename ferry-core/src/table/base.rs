//! Replay table.
use super::{RateLimiter, Selector, TableConfig};
use crate::{FerryError, Signature};
use log::{debug, info};
use parking_lot::{Condvar, Mutex};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Information attached to a sampled item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleInfo {
    /// Key of the item, unique within its table and increasing in insertion
    /// order.
    pub key: u64,

    /// Probability with which the item was selected.
    pub probability: f64,

    /// Size of the table when the item was drawn.
    pub table_size: usize,

    /// Number of times the item has been sampled, this draw included.
    pub times_sampled: usize,
}

/// A sampled item.
#[derive(Clone, Debug, PartialEq)]
pub struct Sampled<T> {
    /// The item.
    pub item: T,

    /// How it was drawn.
    pub info: SampleInfo,
}

/// Counters of a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    /// Name of the table.
    pub name: String,

    /// Current number of items.
    pub size: usize,

    /// Capacity.
    pub max_size: usize,

    /// Minimum number of items before sampling.
    pub min_size: usize,

    /// Number of items inserted so far.
    pub inserts: u64,

    /// Number of items sampled so far.
    pub samples: u64,

    /// Number of items removed so far, by eviction or by sampling.
    pub deletes: u64,

    /// Whether [`ReplayTable::close`] has been called.
    pub closed: bool,
}

struct Entry<T> {
    key: u64,
    item: T,
    times_sampled: usize,
}

struct TableState<T> {
    entries: VecDeque<Entry<T>>,
    rate_limiter: RateLimiter,
    rng: StdRng,
    next_key: u64,
    deletes: u64,
    closed: bool,
}

/// A capacity-bounded, rate-limited collection of items.
///
/// All methods take `&self`; share the table between threads with an
/// [`Arc`](std::sync::Arc), usually through a
/// [`ReplayClient`](super::ReplayClient).
///
/// Non-blocking calls report admission-control refusals as
/// [`FerryError::CapacityRateLimited`] or [`FerryError::InsufficientData`].
/// Blocking calls wait until the rate limiter admits them and return
/// [`FerryError::Cancelled`] once the table is closed.
pub struct ReplayTable<T> {
    name: String,
    max_size: usize,
    sampler: Selector,
    remover: Selector,
    max_times_sampled: Option<usize>,
    signature: Option<Signature>,
    state: Mutex<TableState<T>>,
    cond: Condvar,
}

impl<T: Clone> ReplayTable<T> {
    /// Builds an empty table.
    pub fn build(config: &TableConfig) -> Result<Self, FerryError> {
        config.validate()?;
        let rate_limiter = RateLimiter::build(&config.rate_limiter)?;
        info!(
            "Create table `{}` (max_size={}, min_size={}, sampler={:?}, remover={:?})",
            config.name,
            config.max_size,
            rate_limiter.min_size(),
            config.sampler,
            config.remover
        );

        Ok(Self {
            name: config.name.clone(),
            max_size: config.max_size,
            sampler: config.sampler,
            remover: config.remover,
            max_times_sampled: config.max_times_sampled,
            signature: config.signature.clone(),
            state: Mutex::new(TableState {
                entries: VecDeque::with_capacity(config.max_size),
                rate_limiter,
                rng: StdRng::seed_from_u64(config.seed),
                next_key: 0,
                deletes: 0,
                closed: false,
            }),
            cond: Condvar::new(),
        })
    }

    /// Name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity of the table.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Shapes of the items, if the table was built with a signature.
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Current number of items.
    pub fn size(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if one item can be inserted without waiting.
    pub fn can_insert(&self) -> bool {
        self.can_insert_many(1)
    }

    /// Returns `true` if `n` items can be inserted without waiting.
    pub fn can_insert_many(&self, n: usize) -> bool {
        let state = self.state.lock();
        !state.closed && state.rate_limiter.can_insert(state.entries.len(), n)
    }

    /// Returns `true` if `n` items can be sampled without waiting.
    pub fn can_sample(&self, n: usize) -> bool {
        let state = self.state.lock();
        !state.closed && self.sample_admitted(&state, n)
    }

    /// Checks that writers inserting up to `insert_width` items per call and
    /// readers sampling up to `sample_width` items per call cannot block each
    /// other through the rate limiter.
    pub fn check_widths(&self, insert_width: usize, sample_width: usize) -> Result<(), FerryError> {
        self.state
            .lock()
            .rate_limiter
            .check_widths(insert_width, sample_width)
    }

    /// Inserts one item, evicting one item first if the table is full.
    pub fn insert(&self, item: T) -> Result<(), FerryError> {
        self.insert_many(vec![item])
    }

    /// Inserts all items or none of them.
    ///
    /// The rate limiter is asked once for the whole group. Each item that
    /// arrives at a full table evicts exactly one item chosen by the remover.
    pub fn insert_many(&self, items: Vec<T>) -> Result<(), FerryError> {
        let mut state = self.state.lock();
        self.check_open(&state)?;
        if !state.rate_limiter.can_insert(state.entries.len(), items.len()) {
            return Err(FerryError::CapacityRateLimited {
                table: self.name.clone(),
            });
        }
        self.insert_locked(&mut state, items);
        drop(state);
        self.cond.notify_all();
        Ok(())
    }

    /// Inserts one item, waiting for the rate limiter.
    pub fn insert_blocking(&self, item: T) -> Result<(), FerryError> {
        self.insert_many_blocking(vec![item])
    }

    /// Inserts all items atomically, waiting for the rate limiter.
    pub fn insert_many_blocking(&self, items: Vec<T>) -> Result<(), FerryError> {
        let mut state = self.state.lock();
        loop {
            self.check_open(&state)?;
            if state.rate_limiter.can_insert(state.entries.len(), items.len()) {
                break;
            }
            self.cond.wait(&mut state);
        }
        self.insert_locked(&mut state, items);
        drop(state);
        self.cond.notify_all();
        Ok(())
    }

    /// Draws `n` items.
    ///
    /// Fails with [`FerryError::InsufficientData`] while the table holds fewer
    /// than `min_size` items or the rate limiter refuses the samples.
    pub fn sample(&self, n: usize) -> Result<Vec<Sampled<T>>, FerryError> {
        let mut state = self.state.lock();
        self.check_open(&state)?;
        if !self.sample_admitted(&state, n) {
            return Err(self.insufficient(&state));
        }
        let sampled = self.sample_locked(&mut state, n);
        drop(state);
        self.cond.notify_all();
        Ok(sampled)
    }

    /// Draws `n` items, waiting until the table can serve them.
    pub fn sample_blocking(&self, n: usize) -> Result<Vec<Sampled<T>>, FerryError> {
        self.sample_deadline(n, None)?
            .ok_or_else(|| FerryError::Cancelled(format!("table `{}`", self.name)))
    }

    /// Draws `n` items, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` if the table could not serve the samples in time.
    pub fn sample_timeout(
        &self,
        n: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<Sampled<T>>>, FerryError> {
        self.sample_deadline(n, Some(Instant::now() + timeout))
    }

    fn sample_deadline(
        &self,
        n: usize,
        deadline: Option<Instant>,
    ) -> Result<Option<Vec<Sampled<T>>>, FerryError> {
        let mut state = self.state.lock();
        loop {
            self.check_open(&state)?;
            if self.sample_admitted(&state, n) {
                break;
            }
            match deadline {
                None => self.cond.wait(&mut state),
                Some(deadline) => {
                    if self.cond.wait_until(&mut state, deadline).timed_out() {
                        self.check_open(&state)?;
                        if !self.sample_admitted(&state, n) {
                            return Ok(None);
                        }
                        break;
                    }
                }
            }
        }
        let sampled = self.sample_locked(&mut state, n);
        drop(state);
        self.cond.notify_all();
        Ok(Some(sampled))
    }

    /// Closes the table.
    ///
    /// Every blocked and every subsequent insert or sample returns
    /// [`FerryError::Cancelled`]. The items stay readable through
    /// [`ReplayTable::contents`].
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            info!("Close table `{}` with {} items", self.name, state.entries.len());
        }
        drop(state);
        self.cond.notify_all();
    }

    /// Returns `true` once the table is closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Counters of the table.
    pub fn info(&self) -> TableInfo {
        let state = self.state.lock();
        TableInfo {
            name: self.name.clone(),
            size: state.entries.len(),
            max_size: self.max_size,
            min_size: state.rate_limiter.min_size(),
            inserts: state.rate_limiter.inserts(),
            samples: state.rate_limiter.samples(),
            deletes: state.deletes,
            closed: state.closed,
        }
    }

    /// Copies of the items in insertion order.
    pub fn contents(&self) -> Vec<T> {
        let state = self.state.lock();
        state.entries.iter().map(|e| e.item.clone()).collect()
    }

    fn check_open(&self, state: &TableState<T>) -> Result<(), FerryError> {
        if state.closed {
            return Err(FerryError::Cancelled(format!("table `{}`", self.name)));
        }
        Ok(())
    }

    fn sample_admitted(&self, state: &TableState<T>, n: usize) -> bool {
        let size = state.entries.len();
        // Removal on sample shrinks the table between draws.
        if self.max_times_sampled.is_some() && size < n {
            return false;
        }
        state.rate_limiter.can_sample(size, n)
    }

    fn insufficient(&self, state: &TableState<T>) -> FerryError {
        FerryError::InsufficientData {
            table: self.name.clone(),
            size: state.entries.len(),
            min_size: state.rate_limiter.min_size(),
        }
    }

    fn insert_locked(&self, state: &mut TableState<T>, items: Vec<T>) {
        let n = items.len();
        for item in items {
            if state.entries.len() == self.max_size {
                let (ix, _) = self.remover.select(state.entries.len(), &mut state.rng);
                if let Some(evicted) = state.entries.remove(ix) {
                    debug!("Evict item {} from table `{}`", evicted.key, self.name);
                }
                state.deletes += 1;
            }
            let key = state.next_key;
            state.next_key += 1;
            state.entries.push_back(Entry {
                key,
                item,
                times_sampled: 0,
            });
        }
        state.rate_limiter.insert(n);
        debug_assert!(state.entries.len() <= self.max_size);
    }

    fn sample_locked(&self, state: &mut TableState<T>, n: usize) -> Vec<Sampled<T>> {
        let mut sampled = Vec::with_capacity(n);
        for _ in 0..n {
            let table_size = state.entries.len();
            let (ix, probability) = self.sampler.select(table_size, &mut state.rng);
            let entry = &mut state.entries[ix];
            entry.times_sampled += 1;
            let info = SampleInfo {
                key: entry.key,
                probability,
                table_size,
                times_sampled: entry.times_sampled,
            };
            sampled.push(Sampled {
                item: entry.item.clone(),
                info,
            });
            if Some(entry.times_sampled) == self.max_times_sampled {
                state.entries.remove(ix);
                state.deletes += 1;
            }
        }
        state.rate_limiter.sample(n);
        sampled
    }
}
