//! Blocking and prefetching readers of a table.
use super::Batch;
use crate::{FerryError, ReplayTable};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

// How long the prefetching thread waits on the table between checks of its
// stop flag.
const PREFETCH_POLL: Duration = Duration::from_millis(10);

/// Reads batches of `batch_size` items from a table.
///
/// [`DatasetIterator::fetch`] is the explicit pull API: it blocks until the
/// table can serve a batch and returns [`FerryError::Cancelled`] once the
/// table is closed. [`DatasetIterator::try_next`] and
/// [`DatasetIterator::next_timeout`] never block indefinitely. As an
/// [`Iterator`] the dataset ends when the table is closed.
pub struct DatasetIterator<T> {
    table: Arc<ReplayTable<T>>,
    batch_size: usize,
}

impl<T: Clone> DatasetIterator<T> {
    /// Creates a dataset over `table`.
    pub fn new(table: Arc<ReplayTable<T>>, batch_size: usize) -> Result<Self, FerryError> {
        if batch_size == 0 {
            return Err(FerryError::InvalidConfig("batch_size must be positive".into()));
        }
        table.check_widths(1, batch_size)?;
        Ok(Self { table, batch_size })
    }

    /// Number of items per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Table the dataset reads from.
    pub fn table(&self) -> &Arc<ReplayTable<T>> {
        &self.table
    }

    /// Blocks until a batch is available.
    pub fn fetch(&mut self) -> Result<Batch<T>, FerryError> {
        let sampled = self.table.sample_blocking(self.batch_size)?;
        Ok(Batch::from_sampled(sampled))
    }

    /// Returns a batch if one is available right now.
    pub fn try_next(&mut self) -> Result<Option<Batch<T>>, FerryError> {
        match self.table.sample(self.batch_size) {
            Ok(sampled) => Ok(Some(Batch::from_sampled(sampled))),
            Err(FerryError::InsufficientData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Waits at most `timeout` for a batch.
    pub fn next_timeout(&mut self, timeout: Duration) -> Result<Option<Batch<T>>, FerryError> {
        Ok(self
            .table
            .sample_timeout(self.batch_size, timeout)?
            .map(Batch::from_sampled))
    }
}

impl<T: Clone + Send + Sync + 'static> DatasetIterator<T> {
    /// Moves sampling to a dedicated thread.
    ///
    /// The thread hands batches over a zero-capacity channel, so at most one
    /// batch is drawn ahead of the consumer. It exits once the table is
    /// closed, or shortly after the returned [`Prefetched`] is joined or
    /// dropped, even while the table stays open.
    pub fn prefetch(mut self) -> Prefetched<T> {
        let (tx, rx) = bounded(0);
        let name = self.table.name().to_string();
        let stop = Arc::new(Mutex::new(false));
        let stop_ = stop.clone();
        let handle = thread::spawn(move || {
            info!("Start prefetching from `{}`", self.table.name());
            loop {
                if *stop_.lock() {
                    debug!("Stop prefetching: stopped by the consumer");
                    break;
                }
                let batch = match self.next_timeout(PREFETCH_POLL) {
                    Ok(Some(batch)) => batch,
                    Ok(None) => continue,
                    Err(e) => {
                        debug!("Stop prefetching: {}", e);
                        break;
                    }
                };
                if tx.send(batch).is_err() {
                    debug!("Stop prefetching: receiver dropped");
                    break;
                }
            }
        });
        Prefetched {
            name,
            rx,
            stop,
            handle: Some(handle),
        }
    }
}

impl<T: Clone> Iterator for DatasetIterator<T> {
    type Item = Batch<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.fetch() {
            Ok(batch) => Some(batch),
            Err(e) => {
                debug!("Dataset on `{}` ends: {}", self.table.name(), e);
                None
            }
        }
    }
}

/// Batches produced by a prefetching thread.
pub struct Prefetched<T> {
    name: String,
    rx: Receiver<Batch<T>>,
    stop: Arc<Mutex<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl<T> Prefetched<T> {
    /// Blocks until the next batch. Fails once the table is closed.
    pub fn fetch(&mut self) -> Result<Batch<T>, FerryError> {
        self.rx
            .recv()
            .map_err(|_| FerryError::Cancelled(format!("table `{}`", self.name)))
    }

    /// Waits at most `timeout` for the next batch.
    pub fn next_timeout(&mut self, timeout: Duration) -> Result<Option<Batch<T>>, FerryError> {
        match self.rx.recv_timeout(timeout) {
            Ok(batch) => Ok(Some(batch)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(FerryError::Cancelled(format!("table `{}`", self.name)))
            }
        }
    }

    /// Stops the sampling thread and waits for it. The table may stay open.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            *self.stop.lock() = true;
            drop(std::mem::replace(&mut self.rx, crossbeam_channel::never()));
            if handle.join().is_err() {
                warn!("Prefetching thread of `{}` panicked", self.name);
            }
        }
    }
}

impl<T> Drop for Prefetched<T> {
    fn drop(&mut self) {
        *self.stop.lock() = true;
    }
}

impl<T> Iterator for Prefetched<T> {
    type Item = Batch<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RateLimiterConfig, TableConfig};

    fn table(min_size: usize) -> Arc<ReplayTable<u32>> {
        let config = TableConfig::default()
            .max_size(10)
            .rate_limiter(RateLimiterConfig::MinSize(min_size));
        Arc::new(ReplayTable::build(&config).unwrap())
    }

    #[test]
    fn test_try_next_waits_for_min_size() {
        let table = table(3);
        let mut dataset = DatasetIterator::new(table.clone(), 2).unwrap();
        table.insert_many(vec![0, 1]).unwrap();
        assert!(dataset.try_next().unwrap().is_none());
        assert!(dataset
            .next_timeout(Duration::from_millis(5))
            .unwrap()
            .is_none());
        table.insert(2).unwrap();
        let batch = dataset.try_next().unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|x| *x < 3));
    }

    #[test]
    fn test_iterator_ends_on_close() {
        let table = table(2);
        table.insert(7).unwrap();
        let dataset = DatasetIterator::new(table.clone(), 4).unwrap();
        let reader = thread::spawn(move || dataset.count());
        thread::sleep(Duration::from_millis(10));
        table.close();
        assert_eq!(reader.join().unwrap(), 0);
    }

    #[test]
    fn test_prefetch_rendezvous() {
        let table = table(2);
        let mut batches = DatasetIterator::new(table.clone(), 3).unwrap().prefetch();
        assert!(batches
            .next_timeout(Duration::from_millis(10))
            .unwrap()
            .is_none());
        table.insert_many(vec![4, 5]).unwrap();
        let batch = batches.fetch().unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.info().len(), 3);

        table.close();
        // At most one batch was drawn ahead before the table closed.
        let rest: Vec<_> = batches.by_ref().collect();
        assert!(rest.len() <= 1);
        assert!(batches.fetch().unwrap_err().is_cancelled());
        batches.join();
    }

    #[test]
    fn test_join_leaves_table_open() {
        // Nothing to sample: the thread is waiting on the table.
        let table = table(2);
        let batches = DatasetIterator::new(table.clone(), 2).unwrap().prefetch();
        thread::sleep(Duration::from_millis(20));
        batches.join();
        assert!(!table.is_closed());

        // One batch drawn ahead: the thread is waiting on the hand-over.
        table.insert_many(vec![1, 2]).unwrap();
        let batches = DatasetIterator::new(table.clone(), 2).unwrap().prefetch();
        thread::sleep(Duration::from_millis(20));
        batches.join();
        assert!(!table.is_closed());
        assert!(table.insert(3).is_ok());
    }

    #[test]
    fn test_dropped_prefetch_stops_sampling() {
        let table = table(1);
        let batches = DatasetIterator::new(table.clone(), 1).unwrap().prefetch();
        drop(batches);
        thread::sleep(Duration::from_millis(50));
        let samples = table.info().samples;
        table.insert(0).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(table.info().samples, samples);
    }

    #[test]
    fn test_zero_batch_size() {
        assert!(DatasetIterator::new(table(1), 0).is_err());
    }
}
