//! Metronome playback engine
//!
//! Plays a rhythm pattern as audible clicks at a chosen tempo. Two states,
//! stopped and playing. The click sink is created lazily on the first start,
//! reused across stop/start cycles, and released once when the engine is
//! dropped.
//!
//! Known limitation: a tempo change while playing does not reschedule the
//! running tick interval; the new tempo takes effect on the next `start()`.

use crate::error::Result;
use crate::preview::click::{ClickSink, CpalClickSink};
use inshad_common::rhythm::{beat_interval, BeatClass, RhythmPattern};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Builds the click sink on first use; swapped out in tests
pub type SinkFactory = dyn Fn() -> Result<Arc<dyn ClickSink>> + Send + Sync;

/// Rhythm playback engine, states {stopped, playing}
pub struct PreviewEngine {
    pattern: RhythmPattern,
    tempo_bpm: u32,
    sink: Mutex<Option<Arc<dyn ClickSink>>>,
    factory: Arc<SinkFactory>,
    /// Some(token) while playing; the token cancels the tick task
    playing: Mutex<Option<CancellationToken>>,
}

impl PreviewEngine {
    /// Engine clicking through the default audio output device
    pub fn new(pattern: RhythmPattern, tempo_bpm: u32) -> Self {
        Self::with_sink_factory(
            pattern,
            tempo_bpm,
            Arc::new(|| -> Result<Arc<dyn ClickSink>> {
                Ok(Arc::new(CpalClickSink::new()?))
            }),
        )
    }

    /// Engine with a custom click sink factory (used by tests)
    pub fn with_sink_factory(
        pattern: RhythmPattern,
        tempo_bpm: u32,
        factory: Arc<SinkFactory>,
    ) -> Self {
        Self {
            pattern,
            tempo_bpm,
            sink: Mutex::new(None),
            factory,
            playing: Mutex::new(None),
        }
    }

    pub fn pattern(&self) -> &RhythmPattern {
        &self.pattern
    }

    pub fn tempo_bpm(&self) -> u32 {
        self.tempo_bpm
    }

    /// Swap the pattern wholesale; the running tick task (if any) keeps the
    /// old pattern until the next `start()`.
    pub fn set_pattern(&mut self, pattern: RhythmPattern) {
        self.pattern = pattern;
    }

    /// Change the tempo; takes effect on the next `start()` only (known
    /// limitation, see module docs).
    pub fn set_tempo(&mut self, tempo_bpm: u32) {
        self.tempo_bpm = tempo_bpm;
    }

    pub fn is_playing(&self) -> bool {
        self.playing.lock().unwrap().is_some()
    }

    /// Start playback from beat 0.
    ///
    /// A no-op when already playing (no duplicate tick timers). The click
    /// sink is created on the first start; creation runs on a blocking
    /// thread and playback begins only after it completes.
    pub async fn start(&self) -> Result<()> {
        let token = CancellationToken::new();
        {
            let mut playing = self.playing.lock().unwrap();
            if playing.is_some() {
                debug!("Preview already playing, start is a no-op");
                return Ok(());
            }
            *playing = Some(token.clone());
        }

        let sink = match self.ensure_sink().await {
            Ok(sink) => sink,
            Err(e) => {
                // Roll the claim back so a later start can retry
                self.playing.lock().unwrap().take();
                return Err(e);
            }
        };

        let interval = beat_interval(self.tempo_bpm);
        info!(
            tempo_bpm = self.tempo_bpm,
            interval_ms = interval.as_millis() as u64,
            beats = self.pattern.beats(),
            "Preview playback started"
        );
        tokio::spawn(run_ticks(self.pattern.clone(), interval, sink, token));
        Ok(())
    }

    /// Stop playback; idempotent, valid from any state.
    ///
    /// The click sink is retained for a quick restart.
    pub fn stop(&self) {
        let mut playing = self.playing.lock().unwrap();
        if let Some(token) = playing.take() {
            token.cancel();
            debug!("Preview playback stopped");
        }
    }

    async fn ensure_sink(&self) -> Result<Arc<dyn ClickSink>> {
        let existing = self.sink.lock().unwrap().clone();
        if let Some(sink) = existing {
            return Ok(sink);
        }

        // Device/stream setup does blocking I/O
        let factory = Arc::clone(&self.factory);
        let created = tokio::task::spawn_blocking(move || factory())
            .await
            .map_err(|e| crate::error::Error::Internal(format!("audio init task failed: {}", e)))??;

        *self.sink.lock().unwrap() = Some(Arc::clone(&created));
        Ok(created)
    }
}

impl Drop for PreviewEngine {
    fn drop(&mut self) {
        // Cleanup on every exit path: the tick task stops, and the sink
        // (with its audio stream) is released with the engine
        self.stop();
    }
}

/// Tick loop: one beat per interval, strictly sequential cursor advance
async fn run_ticks(
    pattern: RhythmPattern,
    interval: Duration,
    sink: Arc<dyn ClickSink>,
    token: CancellationToken,
) {
    // First beat sounds one full interval after start
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    // A late tick is dropped, not bursted; the cursor advances one beat per
    // fire regardless
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut cursor: usize = 0;
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        if pattern.is_empty() {
            // Free-meter pattern: the engine runs silent
            continue;
        }

        let idx = cursor % pattern.beats();
        match pattern.class_at(idx) {
            BeatClass::Accent => sink.click(true),
            BeatClass::Hit => sink.click(false),
            BeatClass::Rest => {}
        }
        cursor = cursor.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records clicks instead of sounding them
    #[derive(Default)]
    struct RecordingSink {
        clicks: Mutex<Vec<bool>>,
    }

    impl RecordingSink {
        fn clicks(&self) -> Vec<bool> {
            self.clicks.lock().unwrap().clone()
        }
    }

    impl ClickSink for RecordingSink {
        fn click(&self, accented: bool) {
            self.clicks.lock().unwrap().push(accented);
        }
    }

    fn pattern(hits: Vec<u8>, accent: Vec<u8>) -> RhythmPattern {
        RhythmPattern {
            time_signature: "4/4".to_string(),
            phrase_beats: hits.len() as u32,
            hits,
            accent,
        }
    }

    /// Engine wired to a recording sink; returns the sink and a counter of
    /// factory invocations
    fn recording_engine(
        p: RhythmPattern,
        tempo: u32,
    ) -> (PreviewEngine, Arc<RecordingSink>, Arc<AtomicUsize>) {
        let sink = Arc::new(RecordingSink::default());
        let creations = Arc::new(AtomicUsize::new(0));
        let factory_sink = Arc::clone(&sink);
        let factory_creations = Arc::clone(&creations);
        let engine = PreviewEngine::with_sink_factory(
            p,
            tempo,
            Arc::new(move || {
                factory_creations.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::clone(&factory_sink) as Arc<dyn ClickSink>)
            }),
        );
        (engine, sink, creations)
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_scenario() {
        // hits=[1,0,1,1], accent=[1,0,0,0] at 120 BPM (500 ms interval):
        // loud at tick 0, silence at tick 1, soft at ticks 2 and 3
        let (engine, sink, _) =
            recording_engine(pattern(vec![1, 0, 1, 1], vec![1, 0, 0, 0]), 120);
        engine.start().await.unwrap();
        assert!(engine.is_playing());

        // Through tick 3 (ticks at 500/1000/1500/2000 ms)
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(sink.clicks(), vec![true, false, false]);

        // The pattern repeats every 4 ticks
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(sink.clicks(), vec![true, false, false, true, false, false]);

        engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_ticks() {
        let (engine, sink, _) = recording_engine(pattern(vec![1], vec![1]), 120);
        engine.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let heard = sink.clicks().len();
        assert_eq!(heard, 2);

        engine.stop();
        assert!(!engine.is_playing());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.clicks().len(), heard, "no ticks after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_is_noop() {
        let (engine, sink, creations) = recording_engine(pattern(vec![1], vec![1]), 120);
        engine.start().await.unwrap();
        engine.start().await.unwrap();
        assert!(engine.is_playing());
        assert_eq!(creations.load(Ordering::SeqCst), 1);

        // A duplicate timer would double the click count
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(sink.clicks().len(), 2);
        engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_is_noop() {
        let (engine, _, creations) = recording_engine(pattern(vec![1], vec![1]), 120);
        engine.stop();
        engine.stop();
        assert!(!engine.is_playing());
        assert_eq!(creations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_reused_across_restarts() {
        let (engine, _, creations) = recording_engine(pattern(vec![1], vec![1]), 120);
        engine.start().await.unwrap();
        engine.stop();
        engine.start().await.unwrap();
        engine.stop();
        assert_eq!(creations.load(Ordering::SeqCst), 1, "sink created lazily, once");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tempo_change_applies_on_restart() {
        let (mut engine, sink, _) = recording_engine(pattern(vec![1], vec![1]), 120);
        engine.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.clicks().len(), 1);
        engine.stop();

        // 60 BPM -> 1000 ms interval, effective from this start
        engine.set_tempo(60);
        engine.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.clicks().len(), 1, "no tick yet at the slower tempo");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sink.clicks().len(), 2);
        engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_pattern_runs_silent() {
        let (engine, sink, _) = recording_engine(pattern(vec![], vec![]), 120);
        engine.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(sink.clicks().is_empty());
        engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_while_playing_stops_ticks() {
        let (engine, sink, _) = recording_engine(pattern(vec![1], vec![1]), 120);
        engine.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let heard = sink.clicks().len();

        drop(engine);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.clicks().len(), heard, "teardown stops the tick task");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sink_creation_leaves_engine_stopped() {
        let engine = PreviewEngine::with_sink_factory(
            pattern(vec![1], vec![1]),
            120,
            Arc::new(|| Err(Error::AudioOutput("no device".to_string()))),
        );
        assert!(engine.start().await.is_err());
        assert!(!engine.is_playing());
        // A later start may retry cleanly
        assert!(engine.start().await.is_err());
    }
}
