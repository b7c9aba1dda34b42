//! Parameter snapshots shared between a learner and its actors.
//!
//! The learner publishes its parameters to a [`VariableSource`]; every actor
//! pulls them through its own [`VariableClient`]. Versions start at 1 and
//! increase with every publication, and a client never replaces its cached
//! snapshot with an older one.
use crate::FerryError;
use log::{debug, info};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// A versioned copy of parameters.
#[derive(Debug)]
pub struct VariableSnapshot<P> {
    /// Version, starting at 1.
    pub version: u64,

    /// Parameters.
    pub params: Arc<P>,
}

impl<P> Clone for VariableSnapshot<P> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            params: self.params.clone(),
        }
    }
}

struct SourceState<P> {
    latest: Option<VariableSnapshot<P>>,
    closed: bool,
}

struct Shared<P> {
    state: Mutex<SourceState<P>>,
    cond: Condvar,
}

/// Single-slot holder of the latest published parameters.
///
/// Publishing overwrites the previous snapshot, so at most one snapshot is
/// held regardless of how far actors lag behind. The handle is cheap to
/// clone; all clones share the slot.
pub struct VariableSource<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for VariableSource<P> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<P> Default for VariableSource<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> VariableSource<P> {
    /// Creates a source with nothing published.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SourceState {
                    latest: None,
                    closed: false,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Publishes parameters and returns their version.
    pub fn publish(&self, params: P) -> u64 {
        let mut state = self.shared.state.lock();
        let version = state.latest.as_ref().map_or(0, |s| s.version) + 1;
        state.latest = Some(VariableSnapshot {
            version,
            params: Arc::new(params),
        });
        drop(state);
        self.shared.cond.notify_all();
        debug!("Publish parameters, version {}", version);
        version
    }

    /// The latest snapshot, if any.
    pub fn latest(&self) -> Option<VariableSnapshot<P>> {
        self.shared.state.lock().latest.clone()
    }

    /// Version of the latest snapshot, 0 if nothing was published.
    pub fn version(&self) -> u64 {
        self.shared
            .state
            .lock()
            .latest
            .as_ref()
            .map_or(0, |s| s.version)
    }

    /// Blocks until a snapshot newer than `version` is published.
    ///
    /// Returns [`FerryError::Cancelled`] once the source is closed.
    pub fn wait_for(&self, version: u64) -> Result<VariableSnapshot<P>, FerryError> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(latest) = &state.latest {
                if latest.version > version {
                    return Ok(latest.clone());
                }
            }
            if state.closed {
                return Err(FerryError::Cancelled("variable source".into()));
            }
            self.shared.cond.wait(&mut state);
        }
    }

    /// Closes the source, releasing every caller blocked in
    /// [`VariableSource::wait_for`]. The latest snapshot stays readable.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if !state.closed {
            state.closed = true;
            info!("Close variable source");
        }
        drop(state);
        self.shared.cond.notify_all();
    }

    /// Returns `true` once the source is closed.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Creates a client refetching every `update_period` calls of
    /// [`VariableClient::update`].
    pub fn client(&self, update_period: usize) -> VariableClient<P> {
        VariableClient {
            source: self.clone(),
            update_period: update_period.max(1),
            calls: 0,
            cached: None,
        }
    }
}

/// Actor-side cache of the parameters.
pub struct VariableClient<P> {
    source: VariableSource<P>,
    update_period: usize,
    calls: usize,
    cached: Option<VariableSnapshot<P>>,
}

impl<P> VariableClient<P> {
    /// Refreshes the cached snapshot.
    ///
    /// With `wait`, or while nothing is cached, blocks until the learner has
    /// published at least once. Otherwise fetches only on every
    /// `update_period`-th call. Returns `true` if the cached version changed.
    pub fn update(&mut self, wait: bool) -> Result<bool, FerryError> {
        let fetched = if wait || self.cached.is_none() {
            self.calls = 0;
            Some(self.source.wait_for(0)?)
        } else {
            self.calls += 1;
            if self.calls >= self.update_period {
                self.calls = 0;
                self.source.latest()
            } else {
                None
            }
        };
        Ok(match fetched {
            Some(snapshot) if snapshot.version > self.version() => {
                self.cached = Some(snapshot);
                true
            }
            _ => false,
        })
    }

    /// Blocks until parameters are available and refreshes the cache.
    pub fn update_and_wait(&mut self) -> Result<bool, FerryError> {
        self.update(true)
    }

    /// Cached parameters.
    pub fn params(&self) -> Result<&P, FerryError> {
        self.cached
            .as_ref()
            .map(|s| s.params.as_ref())
            .ok_or(FerryError::ParamsNotSynced)
    }

    /// Version of the cached parameters, 0 before the first update.
    pub fn version(&self) -> u64 {
        self.cached.as_ref().map_or(0, |s| s.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn test_first_update_blocks_until_publish() {
        let source = VariableSource::new();
        let mut client = source.client(1);
        assert_eq!(client.params(), Err(FerryError::ParamsNotSynced));

        let publisher = {
            let source = source.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                source.publish(vec![1.0f32])
            })
        };
        assert!(client.update(false).unwrap());
        assert_eq!(client.version(), 1);
        assert_eq!(client.params().unwrap(), &vec![1.0]);
        assert_eq!(publisher.join().unwrap(), 1);
    }

    #[test]
    fn test_update_period() {
        let source = VariableSource::new();
        source.publish(0u32);
        let mut client = source.client(3);
        client.update(true).unwrap();
        source.publish(1);
        assert!(!client.update(false).unwrap());
        assert!(!client.update(false).unwrap());
        assert!(client.update(false).unwrap());
        assert_eq!(*client.params().unwrap(), 1);
    }

    #[test]
    fn test_versions_never_rewind() {
        let source = VariableSource::new();
        let publisher = {
            let source = source.clone();
            thread::spawn(move || {
                for i in 0..500u32 {
                    source.publish(i);
                }
            })
        };
        let mut client = source.client(1);
        let mut last = 0;
        for _ in 0..500 {
            client.update(false).unwrap();
            let v = client.version();
            assert!(v >= last);
            // Params and version come from the same snapshot.
            assert_eq!(*client.params().unwrap() as u64 + 1, v);
            last = v;
        }
        publisher.join().unwrap();
    }

    #[test]
    fn test_close_releases_waiters() {
        let source = VariableSource::<u8>::new();
        let waiter = {
            let mut client = source.client(1);
            thread::spawn(move || client.update_and_wait())
        };
        thread::sleep(Duration::from_millis(10));
        source.close();
        assert!(waiter.join().unwrap().unwrap_err().is_cancelled());
        assert!(source.is_closed());
    }
}
