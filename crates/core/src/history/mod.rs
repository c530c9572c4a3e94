use serde::{Deserialize, Serialize};

/// How a beat ended up in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeatKind {
    /// Trigger received from the onset detector and accepted.
    Real,
    /// Synthesized to fill a gap of whole missed beats.
    Guessed,
    /// Trigger received after a gap that could not be explained. The interval
    /// leading into it is not a beat period and is left out of the statistics.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatEvent {
    pub timestamp_ms: u64,
    pub kind: BeatKind,
    /// Number of beats that were missed when this event was synthesized.
    pub offset: i32,
}

/// Fixed-capacity ring of the most recent beats, oldest overwritten first.
#[derive(Debug, Clone)]
pub struct BeatHistory {
    slots: Vec<Option<BeatEvent>>,
    head: usize,
    filled: usize,
    insertions: u64,
}

impl BeatHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            slots: vec![None; capacity],
            head: 0,
            filled: 0,
            insertions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Total number of events ever inserted since the last clear.
    pub fn insertion_count(&self) -> u64 {
        self.insertions
    }

    pub fn insert(&mut self, timestamp_ms: u64, kind: BeatKind, offset: i32) {
        self.slots[self.head] = Some(BeatEvent {
            timestamp_ms,
            kind,
            offset,
        });
        self.head = (self.head + 1) % self.slots.len();
        self.filled = (self.filled + 1).min(self.slots.len());
        self.insertions = self.insertions.saturating_add(1);
    }

    /// True once every slot holds a beat.
    pub fn ready_to_learn(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// True once the buffer has been cycled through twice, so the estimate
    /// no longer depends on the bootstrap beats alone.
    pub fn ready_to_guess(&self) -> bool {
        self.insertions >= 2 * self.slots.len() as u64
    }

    /// Iterates the stored beats from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BeatEvent> + '_ {
        let capacity = self.slots.len();
        let start = (self.head + capacity - self.filled) % capacity;
        (0..self.filled).filter_map(move |i| self.slots[(start + i) % capacity].as_ref())
    }

    pub fn newest(&self) -> Option<&BeatEvent> {
        if self.filled == 0 {
            return None;
        }
        let index = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots[index].as_ref()
    }

    /// Intervals between consecutive beats, oldest first. Intervals ending in a
    /// [`BeatKind::Skipped`] beat are left out.
    pub fn intervals(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter()
            .zip(self.iter().skip(1))
            .filter(|(_, later)| later.kind != BeatKind::Skipped)
            .map(|(earlier, later)| later.timestamp_ms.saturating_sub(earlier.timestamp_ms))
    }

    pub fn count_kind(&self, kind: BeatKind) -> usize {
        self.iter().filter(|event| event.kind == kind).count()
    }

    /// Rescales every interval by `numerator / denominator`, keeping the
    /// newest beat in place.
    pub fn rescale(&mut self, numerator: u64, denominator: u64) {
        let Some(anchor) = self.newest().map(|event| event.timestamp_ms) else {
            return;
        };
        let denominator = denominator.max(1);

        for event in self.slots.iter_mut().flatten() {
            let distance = anchor.saturating_sub(event.timestamp_ms);
            let scaled = distance.saturating_mul(numerator) / denominator;
            event.timestamp_ms = anchor.saturating_sub(scaled);
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.filled = 0;
        self.insertions = 0;
    }
}
