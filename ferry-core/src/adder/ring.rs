//! Fixed-capacity ring buffer.

/// Ring buffer holding at most `capacity` elements, indexed from the oldest.
#[derive(Debug)]
pub(crate) struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Appends an element. Returns it back if the ring is full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.len == self.capacity() {
            return Err(value);
        }
        let ix = (self.head + self.len) % self.capacity();
        self.slots[ix] = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Drops the `k` oldest elements.
    pub fn drop_front(&mut self, k: usize) {
        for _ in 0..k.min(self.len) {
            self.slots[self.head] = None;
            self.head = (self.head + 1) % self.capacity();
            self.len -= 1;
        }
    }

    pub fn clear(&mut self) {
        self.drop_front(self.len);
        self.head = 0;
    }

    /// Elements from the oldest to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % self.capacity()].as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::Ring;

    #[test]
    fn test_wraps_around() {
        let mut ring = Ring::new(3);
        for i in 0..3 {
            ring.push(i).unwrap();
        }
        assert_eq!(ring.push(3), Err(3));
        ring.drop_front(2);
        ring.push(3).unwrap();
        ring.push(4).unwrap();
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        ring.clear();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 3);
    }
}
