use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Engine, EngineSnapshot, Result, TempoError};

/// Owns an [`Engine`] on the analysis side and publishes a copy of every
/// snapshot for readers on other threads.
///
/// Only the copy-out of the latest snapshot happens under the lock, so a
/// renderer polling [`SnapshotReader::latest`] never waits for an update to
/// finish.
#[derive(Debug)]
pub struct SnapshotPublisher {
    engine: Engine,
    latest: Arc<Mutex<EngineSnapshot>>,
}

impl SnapshotPublisher {
    pub fn new(engine: Engine) -> Self {
        let latest = Arc::new(Mutex::new(engine.snapshot()));
        Self { engine, latest }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns a handle that can be sent to the rendering side.
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: self.latest.clone(),
        }
    }

    /// Feeds the engine and publishes the resulting snapshot.
    pub fn update(&mut self, timestamp_ms: u64, is_beat_trigger: bool) -> Result<EngineSnapshot> {
        let snapshot = self.engine.update(timestamp_ms, is_beat_trigger);
        self.publish(snapshot)?;
        Ok(snapshot)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.engine.reset();
        self.publish(self.engine.snapshot())
    }

    /// Forwards a track change and republishes when it caused a reset.
    pub fn on_track_changed(&mut self, name: &str) -> Result<bool> {
        let reset = self.engine.on_track_changed(name);
        if reset {
            self.publish(self.engine.snapshot())?;
        }
        Ok(reset)
    }

    fn publish(&self, snapshot: EngineSnapshot) -> Result<()> {
        *lock(&self.latest)? = snapshot;
        Ok(())
    }
}

/// Cloneable, thread-safe view over the snapshots of a [`SnapshotPublisher`].
#[derive(Clone)]
pub struct SnapshotReader {
    shared: Arc<Mutex<EngineSnapshot>>,
}

impl SnapshotReader {
    /// Copies out the most recently published snapshot.
    pub fn latest(&self) -> Result<EngineSnapshot> {
        Ok(*lock(&self.shared)?)
    }
}

impl std::fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotReader").finish()
    }
}

fn lock(shared: &Mutex<EngineSnapshot>) -> Result<MutexGuard<'_, EngineSnapshot>> {
    shared
        .lock()
        .map_err(|_| TempoError::msg("snapshot channel has been poisoned"))
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::Phase;

    #[test]
    fn readers_see_published_snapshots() {
        let mut publisher = SnapshotPublisher::new(Engine::default());
        let reader = publisher.reader();
        assert_eq!(reader.latest().unwrap().phase, Phase::Learning);

        for i in 0..20 {
            publisher.update(1_000 + i * 500, true).unwrap();
        }

        let snapshot = reader.latest().unwrap();
        assert_eq!(snapshot.bpm, 120);
        assert!(snapshot.beat);
        assert_eq!(
            snapshot.predicted_next_beat_ms,
            publisher.engine().predict_next_beat()
        );
    }

    #[test]
    fn analysis_can_run_on_another_thread() {
        let mut publisher = SnapshotPublisher::new(Engine::default());
        let reader = publisher.reader();

        let analysis = thread::spawn(move || {
            for i in 0..24 {
                publisher.update(1_000 + i * 500, true).unwrap();
            }
            publisher
        });
        let mut publisher = analysis.join().expect("analysis thread panicked");

        assert_eq!(reader.latest().unwrap().bpm, 120);

        publisher.reset().unwrap();
        assert_eq!(reader.latest().unwrap(), EngineSnapshot::default());
    }

    #[test]
    fn track_change_resets_are_published() {
        let mut publisher = SnapshotPublisher::new(Engine::default());
        let reader = publisher.reader();
        publisher.on_track_changed("first").unwrap();
        for i in 0..20 {
            publisher.update(1_000 + i * 500, true).unwrap();
        }

        assert!(!publisher.on_track_changed("first").unwrap());
        assert_eq!(reader.latest().unwrap().bpm, 120);
        assert!(publisher.on_track_changed("second").unwrap());
        assert_eq!(reader.latest().unwrap().bpm, 0);
    }
}
