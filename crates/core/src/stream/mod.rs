use serde::{Deserialize, Serialize};

/// Ordered list of onset timestamps in milliseconds, used to drive an
/// [`crate::Engine`] deterministically from tests and the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u64>", into = "Vec<u64>")]
pub struct OnsetStream {
    onsets: Vec<u64>,
}

impl From<Vec<u64>> for OnsetStream {
    fn from(onsets: Vec<u64>) -> Self {
        Self::from_onsets(onsets)
    }
}

impl From<OnsetStream> for Vec<u64> {
    fn from(stream: OnsetStream) -> Self {
        stream.onsets
    }
}

impl OnsetStream {
    /// Wraps recorded onsets. They are sorted and deduplicated.
    pub fn from_onsets(mut onsets: Vec<u64>) -> Self {
        onsets.sort_unstable();
        onsets.dedup();
        Self { onsets }
    }

    /// `beats` onsets spaced `period_ms` apart starting at `start_ms`.
    pub fn periodic(start_ms: u64, period_ms: u64, beats: usize) -> Self {
        if beats == 0 {
            return Self::default();
        }
        Self::from_intervals(start_ms, std::iter::repeat(period_ms).take(beats.saturating_sub(1)))
    }

    /// Onsets for a tempo in BPM, rounded to the millisecond.
    pub fn at_bpm(start_ms: u64, bpm: f64, beats: usize) -> Self {
        let period = if bpm > 0.0 { 60_000.0 / bpm } else { 0.0 };
        let onsets = (0..beats)
            .map(|i| start_ms.saturating_add((period * i as f64).round() as u64))
            .collect();
        Self::from_onsets(onsets)
    }

    /// One onset at `start_ms`, then one after each interval.
    pub fn from_intervals(start_ms: u64, intervals: impl IntoIterator<Item = u64>) -> Self {
        let mut now = start_ms;
        let mut onsets = vec![now];
        for interval in intervals {
            now = now.saturating_add(interval);
            onsets.push(now);
        }
        Self::from_onsets(onsets)
    }

    pub fn onsets(&self) -> &[u64] {
        &self.onsets
    }

    pub fn len(&self) -> usize {
        self.onsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }

    pub fn last(&self) -> Option<u64> {
        self.onsets.last().copied()
    }

    /// Appends `beats` onsets continuing one `period_ms` after the last one.
    pub fn then_periodic(mut self, period_ms: u64, beats: usize) -> Self {
        let start = self.last().map_or(0, |last| last.saturating_add(period_ms));
        self.onsets
            .extend(Self::periodic(start, period_ms, beats).onsets);
        self
    }

    /// Removes every `every`-th onset (the 2nd, 4th, ... for `every == 2`).
    pub fn drop_every(mut self, every: usize) -> Self {
        if every >= 2 {
            let mut index = 0;
            self.onsets.retain(|_| {
                index += 1;
                index % every != 0
            });
        }
        self
    }

    /// Shifts every onset by a pseudo-random amount in `-max_ms..=max_ms`.
    /// The same seed always yields the same stream.
    pub fn jitter(self, max_ms: u64, seed: u64) -> Self {
        if max_ms == 0 {
            return self;
        }

        let mut rng = XorShift::new(seed);
        let span = max_ms.saturating_mul(2).saturating_add(1);
        let onsets = self
            .onsets
            .iter()
            .map(|&onset| onset.saturating_add(max_ms).saturating_sub(rng.next() % span))
            .collect();
        Self::from_onsets(onsets)
    }

    /// `(timestamp, trigger)` pairs, one per onset.
    pub fn triggers(&self) -> impl Iterator<Item = (u64, bool)> + '_ {
        self.onsets.iter().map(|&onset| (onset, true))
    }

    /// Steps a frame clock from the first to the last onset. A frame triggers
    /// when at least one onset fell since the previous frame.
    pub fn frames(&self, frame_ms: u64) -> Frames<'_> {
        Frames {
            onsets: &self.onsets,
            next: 0,
            now: self.onsets.first().copied().unwrap_or(0),
            frame_ms: frame_ms.max(1),
        }
    }
}

/// Iterator returned by [`OnsetStream::frames`].
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    onsets: &'a [u64],
    next: usize,
    now: u64,
    frame_ms: u64,
}

impl Iterator for Frames<'_> {
    type Item = (u64, bool);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.onsets.len() {
            return None;
        }

        let mut trigger = false;
        while self.next < self.onsets.len() && self.onsets[self.next] <= self.now {
            trigger = true;
            self.next += 1;
        }

        let frame = (self.now, trigger);
        self.now = self.now.saturating_add(self.frame_ms);
        Some(frame)
    }
}

/// Minimal xorshift64 generator for reproducible jitter.
#[derive(Debug, Clone)]
struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}
