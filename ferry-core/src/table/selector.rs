//! Item selection policies.
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

/// Picks one item out of the items of a table in insertion order.
///
/// The same type serves as sampler (which item a read returns) and as remover
/// (which item is evicted when the table is full).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// Every item is equally likely, independently per draw.
    Uniform,

    /// The oldest item.
    Fifo,

    /// The newest item.
    Lifo,
}

impl Selector {
    /// Returns the position of the selected item among `len > 0` items in
    /// insertion order, together with its selection probability.
    pub(super) fn select(&self, len: usize, rng: &mut StdRng) -> (usize, f64) {
        debug_assert!(len > 0);
        match self {
            Self::Uniform => (rng.gen_range(0..len), 1.0 / len as f64),
            Self::Fifo => (0, 1.0),
            Self::Lifo => (len - 1, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_deterministic_selectors() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(Selector::Fifo.select(5, &mut rng), (0, 1.0));
        assert_eq!(Selector::Lifo.select(5, &mut rng), (4, 1.0));
    }

    #[test]
    fn test_uniform_covers_all_items() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = [0usize; 4];
        for _ in 0..4000 {
            let (ix, p) = Selector::Uniform.select(4, &mut rng);
            assert_eq!(p, 0.25);
            hits[ix] += 1;
        }
        assert!(hits.iter().all(|&h| h > 800));
    }
}
