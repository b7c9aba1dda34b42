//! Key-value records of metrics.
use crate::error::FerryError;
use std::collections::{hash_map::Keys, HashMap};

/// Value stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically a metric.
    Scalar(f32),

    /// A text value.
    String(String),
}

/// Metrics of one learner step or one episode, keyed by name.
///
/// # Examples
///
/// ```rust
/// use ferry_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("loss", 0.5);
/// record.insert("version", RecordValue::Scalar(3.0));
/// assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record holding one scalar.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Keys of the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a value, replacing any previous value under `k`.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Value under `k`, if any.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Scalar under `k`.
    pub fn get_scalar(&self, k: &str) -> Result<f32, FerryError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(FerryError::RecordValueTypeError("Scalar".to_string())),
            None => Err(FerryError::RecordKeyError(k.to_string())),
        }
    }

    /// String under `k`.
    pub fn get_string(&self, k: &str) -> Result<String, FerryError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(FerryError::RecordValueTypeError("String".to_string())),
            None => Err(FerryError::RecordKeyError(k.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites() {
        let mut r = Record::from_slice(&[
            ("x", RecordValue::Scalar(1.0)),
            ("y", RecordValue::Scalar(2.0)),
        ]);
        r.insert("y", RecordValue::Scalar(3.0));
        assert_eq!(r.get_scalar("x").unwrap(), 1.0);
        assert_eq!(r.get_scalar("y").unwrap(), 3.0);
        assert_eq!(r.keys().count(), 2);
    }

    #[test]
    fn test_typed_getters() {
        let mut r = Record::empty();
        r.insert("name", RecordValue::String("replay".into()));
        assert_eq!(
            r.get_scalar("name"),
            Err(FerryError::RecordValueTypeError("Scalar".into()))
        );
        assert_eq!(
            r.get_scalar("missing"),
            Err(FerryError::RecordKeyError("missing".into()))
        );
        assert_eq!(r.get_string("name").unwrap(), "replay");
    }
}
