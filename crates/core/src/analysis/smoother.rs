/// Circular buffer averaging the most recent BPM guesses.
#[derive(Debug, Clone)]
pub struct Smoother {
    samples: Vec<i32>,
    cursor: usize,
    filled: usize,
}

impl Smoother {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0; capacity.max(1)],
            cursor: 0,
            filled: 0,
        }
    }

    pub fn push(&mut self, bpm: i32) {
        self.samples[self.cursor] = bpm;
        self.cursor = (self.cursor + 1) % self.samples.len();
        self.filled = (self.filled + 1).min(self.samples.len());
    }

    /// Integer mean of the non-zero samples, 0 when there are none.
    pub fn average(&self) -> i32 {
        let (count, sum) = self
            .samples
            .iter()
            .filter(|&&sample| sample != 0)
            .fold((0i64, 0i64), |(count, sum), &sample| (count + 1, sum + i64::from(sample)));

        if count == 0 {
            0
        } else {
            (sum / count) as i32
        }
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Multiplies every sample by `numerator / denominator`.
    pub fn rescale(&mut self, numerator: i32, denominator: i32) {
        let denominator = denominator.max(1);
        for sample in &mut self.samples {
            *sample = *sample * numerator / denominator;
        }
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|sample| *sample = 0);
        self.cursor = 0;
        self.filled = 0;
    }
}
