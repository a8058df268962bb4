//! Two-slot arena with source/destination roles that swap each tick.

/// Double-buffered cell: read the source, write the destination, then swap.
///
/// The slot currently playing each role is only reachable through the
/// accessors; callers never see which physical slot that is.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
    source: usize,
}

impl<T> PingPong<T> {
    /// `source` starts as the readable slot, `destination` as the writable one
    pub fn new(source: T, destination: T) -> Self {
        Self {
            slots: [source, destination],
            source: 0,
        }
    }

    pub fn source(&self) -> &T {
        &self.slots[self.source]
    }

    pub fn destination(&self) -> &T {
        &self.slots[1 - self.source]
    }

    pub fn destination_mut(&mut self) -> &mut T {
        &mut self.slots[1 - self.source]
    }

    /// Borrow the source for reading and the destination for writing at once
    pub fn split(&mut self) -> (&T, &mut T) {
        let (first, second) = self.slots.split_at_mut(1);
        if self.source == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Exchange roles; the freshly written destination becomes the source
    pub fn swap(&mut self) {
        self.source = 1 - self.source;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_exchanges_roles() {
        let mut pair = PingPong::new("a", "b");
        assert_eq!((*pair.source(), *pair.destination()), ("a", "b"));

        pair.swap();
        assert_eq!((*pair.source(), *pair.destination()), ("b", "a"));

        pair.swap();
        assert_eq!((*pair.source(), *pair.destination()), ("a", "b"));
    }

    #[test]
    fn test_split_reads_source_writes_destination() {
        let mut pair = PingPong::new(vec![1, 2, 3], vec![0; 3]);
        for _ in 0..3 {
            let (src, dst) = pair.split();
            for (out, value) in dst.iter_mut().zip(src.iter()) {
                *out = value * 2;
            }
            pair.swap();
        }
        assert_eq!(pair.source(), &vec![8, 16, 24]);
    }

    #[test]
    fn test_destination_mut_targets_inactive_slot() {
        let mut pair = PingPong::new(1, 2);
        *pair.destination_mut() = 5;
        assert_eq!(*pair.source(), 1);
        pair.swap();
        assert_eq!(*pair.source(), 5);
    }
}
