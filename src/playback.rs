//! Playback state machine.
//!
//! `PlaybackEngine` owns the single `PlaybackSession` and the media
//! backend. Transport commands mutate the session and issue fire-and-forget
//! requests to the backend; backend completions arrive later as
//! [`MediaEvent`]s tagged with the load generation they belong to, so a
//! `play_track` issued while a previous load is in flight supersedes it and
//! stale callbacks are silently discarded.
//!
//! The natural-end policy (repeat/advance) needs the queue, which the
//! engine does not own — `on_media_event` reports `NaturalEnd` back to the
//! caller and `AppCore` applies the policy.

use crate::error::EngineError;
use crate::events::{Event, EventQueue};
use crate::track::Track;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VOLUME: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    None,
    One,
    All,
}

impl RepeatMode {
    /// none -> one -> all -> none, matching the transport button.
    pub fn cycled(self) -> RepeatMode {
        match self {
            RepeatMode::None => RepeatMode::One,
            RepeatMode::One => RepeatMode::All,
            RepeatMode::All => RepeatMode::None,
        }
    }
}

/// The process-wide playback session. Mutated only by `PlaybackEngine`.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub position_secs: f64,
    /// 0.0 until the backend reports metadata for the current load.
    pub duration_secs: f64,
    pub volume: f32,
    pub repeat_mode: RepeatMode,
    pub shuffle_enabled: bool,
}

impl PlaybackSession {
    fn new(volume: f32) -> Self {
        PlaybackSession {
            current_track: None,
            is_playing: false,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume,
            repeat_mode: RepeatMode::None,
            shuffle_enabled: false,
        }
    }

    pub fn current_track_id(&self) -> Option<u32> {
        self.current_track.as_ref().map(|t| t.id)
    }
}

// ── Media backend contract ──────────────────────────────────────────────────

/// Asynchronous completion from the media backend, tagged with the load
/// generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub generation: u64,
    pub kind: MediaEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    TimeAdvance(f64),
    MetadataReady(f64),
    NaturalEnd,
    Error(String),
}

/// Host platform's media playback facility. Decoding and DSP live behind
/// this seam; the engine only issues transport requests and consumes the
/// events polled back out.
pub trait MediaBackend {
    /// Load `media_ref` and start playing. Subsequent events for this load
    /// must carry `generation`.
    fn load(&mut self, media_ref: &str, generation: u64) -> Result<(), EngineError>;
    fn play(&mut self) -> Result<(), EngineError>;
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64) -> Result<(), EngineError>;
    fn set_volume(&mut self, volume: f32);
    /// Drain whatever completions have accumulated since the last poll.
    fn poll(&mut self) -> Vec<MediaEvent>;
}

// ── Engine ──────────────────────────────────────────────────────────────────

/// Signal returned by `on_media_event` when the current track finished on
/// its own. The caller resolves what plays next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalEnd;

pub struct PlaybackEngine {
    pub session: PlaybackSession,
    backend: Box<dyn MediaBackend>,
    /// Restored on unmute. Zero volume is a real state, so the last
    /// non-zero value the user picked is tracked separately.
    last_nonzero_volume: f32,
    generation: u64,
}

impl PlaybackEngine {
    pub fn new(backend: Box<dyn MediaBackend>, volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        let mut engine = PlaybackEngine {
            session: PlaybackSession::new(volume),
            backend,
            last_nonzero_volume: if volume > 0.0 { volume } else { DEFAULT_VOLUME },
            generation: 0,
        };
        engine.backend.set_volume(volume);
        engine
    }

    /// Select and start a track. The caller has already checked catalog
    /// membership. On backend failure the track stays selected (so the UI
    /// can show it) but the session is left paused and a `PlaybackFailed`
    /// event is emitted.
    pub fn play_track(&mut self, track: Track, events: &mut EventQueue) {
        self.generation += 1;
        let track_id = track.id;
        let media_ref = track.media_ref.clone();
        self.session.current_track = Some(track);
        self.session.position_secs = 0.0;
        self.session.duration_secs = 0.0;
        events.push(Event::TrackChanged {
            track_id: Some(track_id),
        });

        match self.backend.load(&media_ref, self.generation) {
            Ok(()) => {
                self.session.is_playing = true;
                events.push(Event::PlayStateChanged { is_playing: true });
            }
            Err(e) => {
                log::warn!("track {} failed to start: {}", track_id, e);
                self.session.is_playing = false;
                events.push(Event::PlayStateChanged { is_playing: false });
                events.push(Event::PlaybackFailed {
                    track_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// No-op when nothing is selected.
    pub fn pause(&mut self, events: &mut EventQueue) {
        if self.session.current_track.is_none() || !self.session.is_playing {
            return;
        }
        self.backend.pause();
        self.session.is_playing = false;
        events.push(Event::PlayStateChanged { is_playing: false });
    }

    /// No-op when nothing is selected.
    pub fn resume(&mut self, events: &mut EventQueue) {
        let Some(track_id) = self.session.current_track_id() else {
            return;
        };
        if self.session.is_playing {
            return;
        }
        match self.backend.play() {
            Ok(()) => {
                self.session.is_playing = true;
                events.push(Event::PlayStateChanged { is_playing: true });
            }
            Err(e) => {
                log::warn!("resume failed: {}", e);
                events.push(Event::PlaybackFailed {
                    track_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Clamp into `[0, duration]`. Rejected (no-op) until the backend has
    /// reported a duration for the current load.
    pub fn seek(&mut self, seconds: f64, events: &mut EventQueue) {
        if self.session.current_track.is_none() || self.session.duration_secs <= 0.0 {
            return;
        }
        let target = seconds.clamp(0.0, self.session.duration_secs);
        if let Err(e) = self.backend.seek(target) {
            log::warn!("seek to {:.1}s failed: {}", target, e);
            return;
        }
        self.session.position_secs = target;
        events.push(Event::ProgressChanged {
            position_secs: target,
            duration_secs: self.session.duration_secs,
        });
    }

    /// Clamp into `[0, 1]`. Always succeeds. Non-zero values are remembered
    /// for unmute.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        if volume > 0.0 {
            self.last_nonzero_volume = volume;
        }
        self.session.volume = volume;
        self.backend.set_volume(volume);
    }

    /// Zero volume toggles back to the last non-zero volume the user set.
    pub fn toggle_mute(&mut self) {
        if self.session.volume > 0.0 {
            let remembered = self.session.volume;
            self.session.volume = 0.0;
            self.backend.set_volume(0.0);
            self.last_nonzero_volume = remembered;
        } else {
            self.set_volume(self.last_nonzero_volume);
        }
    }

    /// Restart the current track from position 0 (repeat-one).
    pub fn restart_current(&mut self, events: &mut EventQueue) {
        let Some(track) = self.session.current_track.clone() else {
            return;
        };
        // A plain seek keeps the decoded source alive; fall back to a full
        // reload when the backend cannot rewind.
        if self.session.duration_secs > 0.0 && self.backend.seek(0.0).is_ok() {
            self.session.position_secs = 0.0;
            if self.backend.play().is_ok() {
                self.session.is_playing = true;
                events.push(Event::PlayStateChanged { is_playing: true });
                events.push(Event::ProgressChanged {
                    position_secs: 0.0,
                    duration_secs: self.session.duration_secs,
                });
                return;
            }
        }
        self.play_track(track, events);
    }

    /// Natural end with nothing to advance to: stop, keep the selection.
    pub fn stop_at_end(&mut self, events: &mut EventQueue) {
        self.session.is_playing = false;
        self.session.position_secs = 0.0;
        events.push(Event::PlayStateChanged { is_playing: false });
    }

    /// Drain pending backend completions.
    pub fn poll_backend(&mut self) -> Vec<MediaEvent> {
        self.backend.poll()
    }

    /// Apply one backend completion. Events from superseded loads are
    /// silently discarded. Returns `Some(NaturalEnd)` when the caller must
    /// resolve the repeat/advance policy.
    pub fn on_media_event(
        &mut self,
        event: MediaEvent,
        events: &mut EventQueue,
    ) -> Option<NaturalEnd> {
        if event.generation != self.generation {
            log::debug!(
                "discarding stale media event (generation {} != {})",
                event.generation,
                self.generation
            );
            return None;
        }
        match event.kind {
            MediaEventKind::TimeAdvance(t) => {
                self.session.position_secs = t;
                events.push(Event::ProgressChanged {
                    position_secs: t,
                    duration_secs: self.session.duration_secs,
                });
                None
            }
            MediaEventKind::MetadataReady(duration) => {
                self.session.duration_secs = duration;
                events.push(Event::ProgressChanged {
                    position_secs: self.session.position_secs,
                    duration_secs: duration,
                });
                None
            }
            MediaEventKind::NaturalEnd => Some(NaturalEnd),
            MediaEventKind::Error(reason) => {
                log::warn!("media backend error: {}", reason);
                self.session.is_playing = false;
                events.push(Event::PlayStateChanged { is_playing: false });
                if let Some(track_id) = self.session.current_track_id() {
                    events.push(Event::PlaybackFailed { track_id, reason });
                }
                None
            }
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }
}

// ── Scripted backend ────────────────────────────────────────────────────────

use std::cell::RefCell;
use std::rc::Rc;

/// Backend command log entry, for assertions in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Load { media_ref: String, generation: u64 },
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
}

#[derive(Debug, Default)]
pub struct ScriptedState {
    pub calls: Vec<BackendCall>,
    pub pending: Vec<MediaEvent>,
    pub fail_next_load: bool,
    pub fail_next_play: bool,
}

/// A scriptable `MediaBackend` for headless hosts and tests: records every
/// command and plays back whatever events the script queues up. The engine
/// is single-threaded, so the shared handle is a plain `Rc<RefCell<_>>`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    state: Rc<RefCell<ScriptedState>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        ScriptedBackend::default()
    }

    /// Second handle to the shared state, kept by the test.
    pub fn handle(&self) -> ScriptedBackend {
        self.clone()
    }

    pub fn push_event(&self, generation: u64, kind: MediaEventKind) {
        self.state.borrow_mut().pending.push(MediaEvent { generation, kind });
    }

    pub fn fail_next_load(&self) {
        self.state.borrow_mut().fail_next_load = true;
    }

    pub fn fail_next_play(&self) {
        self.state.borrow_mut().fail_next_play = true;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.borrow().calls.clone()
    }

    pub fn last_loaded(&self) -> Option<(String, u64)> {
        self.state.borrow().calls.iter().rev().find_map(|c| match c {
            BackendCall::Load {
                media_ref,
                generation,
            } => Some((media_ref.clone(), *generation)),
            _ => None,
        })
    }
}

impl MediaBackend for ScriptedBackend {
    fn load(&mut self, media_ref: &str, generation: u64) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::Load {
            media_ref: media_ref.to_string(),
            generation,
        });
        if state.fail_next_load {
            state.fail_next_load = false;
            return Err(EngineError::PlaybackFailed(format!(
                "cannot open '{}'",
                media_ref
            )));
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::Play);
        if state.fail_next_play {
            state.fail_next_play = false;
            return Err(EngineError::PlaybackFailed("device unavailable".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().calls.push(BackendCall::Pause);
    }

    fn seek(&mut self, seconds: f64) -> Result<(), EngineError> {
        self.state.borrow_mut().calls.push(BackendCall::Seek(seconds));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.state
            .borrow_mut()
            .calls
            .push(BackendCall::SetVolume(volume));
    }

    fn poll(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_track(id: u32) -> Track {
        Track {
            id,
            number: id.to_string(),
            title: format!("Hymn {}", id),
            media_ref: format!("audio/{}.mp3", id),
            duration_secs: 60.0,
            lyrics: None,
        }
    }

    fn make_engine() -> (PlaybackEngine, ScriptedBackend, EventQueue) {
        let backend = ScriptedBackend::new();
        let handle = backend.handle();
        let engine = PlaybackEngine::new(Box::new(backend), DEFAULT_VOLUME);
        (engine, handle, EventQueue::new())
    }

    #[test]
    fn play_track_loads_and_marks_playing() {
        let (mut engine, backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        assert!(engine.session.is_playing);
        assert_eq!(engine.session.position_secs, 0.0);
        assert_eq!(engine.session.current_track_id(), Some(1));
        let (media_ref, generation) = backend.last_loaded().unwrap();
        assert_eq!(media_ref, "audio/1.mp3");
        assert_eq!(generation, 1);
        assert!(events
            .pending()
            .contains(&Event::TrackChanged { track_id: Some(1) }));
    }

    #[test]
    fn failed_load_keeps_selection_but_stops() {
        let (mut engine, backend, mut events) = make_engine();
        backend.fail_next_load();
        engine.play_track(make_track(2), &mut events);
        assert!(!engine.session.is_playing);
        assert_eq!(engine.session.current_track_id(), Some(2));
        assert!(events
            .pending()
            .iter()
            .any(|e| matches!(e, Event::PlaybackFailed { track_id: 2, .. })));
    }

    #[test]
    fn pause_and_resume_are_noops_without_track() {
        let (mut engine, backend, mut events) = make_engine();
        engine.pause(&mut events);
        engine.resume(&mut events);
        assert!(events.is_empty());
        // Only the constructor's volume call reached the backend.
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn pause_then_resume_round_trips() {
        let (mut engine, _backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        engine.pause(&mut events);
        assert!(!engine.session.is_playing);
        engine.resume(&mut events);
        assert!(engine.session.is_playing);
    }

    #[test]
    fn seek_rejected_until_metadata_arrives() {
        let (mut engine, backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        engine.seek(30.0, &mut events);
        assert_eq!(engine.session.position_secs, 0.0);
        assert!(!backend.calls().iter().any(|c| matches!(c, BackendCall::Seek(_))));

        let generation = engine.current_generation();
        engine.on_media_event(
            MediaEvent {
                generation,
                kind: MediaEventKind::MetadataReady(60.0),
            },
            &mut events,
        );
        engine.seek(30.0, &mut events);
        assert_eq!(engine.session.position_secs, 30.0);
    }

    #[test]
    fn seek_clamps_into_duration() {
        let (mut engine, _backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        let generation = engine.current_generation();
        engine.on_media_event(
            MediaEvent {
                generation,
                kind: MediaEventKind::MetadataReady(60.0),
            },
            &mut events,
        );
        engine.seek(500.0, &mut events);
        assert_eq!(engine.session.position_secs, 60.0);
        engine.seek(-5.0, &mut events);
        assert_eq!(engine.session.position_secs, 0.0);
    }

    #[test]
    fn volume_clamps_and_mute_restores_last_nonzero() {
        let (mut engine, _backend, _events) = make_engine();
        engine.set_volume(1.5);
        assert_eq!(engine.session.volume, 1.0);
        engine.set_volume(0.35);
        engine.toggle_mute();
        assert_eq!(engine.session.volume, 0.0);
        engine.toggle_mute();
        assert_eq!(engine.session.volume, 0.35);
    }

    #[test]
    fn explicit_zero_volume_unmutes_to_last_nonzero() {
        let (mut engine, _backend, _events) = make_engine();
        engine.set_volume(0.6);
        engine.set_volume(0.0);
        assert_eq!(engine.session.volume, 0.0);
        engine.toggle_mute();
        assert_eq!(engine.session.volume, 0.6);
    }

    #[test]
    fn stale_generation_events_are_discarded() {
        let (mut engine, _backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        let old_generation = engine.current_generation();
        engine.play_track(make_track(2), &mut events);
        events.drain();

        // Late callback from the superseded load of track 1.
        let signal = engine.on_media_event(
            MediaEvent {
                generation: old_generation,
                kind: MediaEventKind::NaturalEnd,
            },
            &mut events,
        );
        assert_eq!(signal, None);
        assert!(events.is_empty());
        assert_eq!(engine.session.current_track_id(), Some(2));
    }

    #[test]
    fn time_advance_updates_position() {
        let (mut engine, _backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        let generation = engine.current_generation();
        engine.on_media_event(
            MediaEvent {
                generation,
                kind: MediaEventKind::TimeAdvance(12.5),
            },
            &mut events,
        );
        assert_eq!(engine.session.position_secs, 12.5);
    }

    #[test]
    fn backend_error_stops_but_keeps_selection() {
        let (mut engine, _backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        let generation = engine.current_generation();
        events.drain();
        engine.on_media_event(
            MediaEvent {
                generation,
                kind: MediaEventKind::Error("decode failure".to_string()),
            },
            &mut events,
        );
        assert!(!engine.session.is_playing);
        assert_eq!(engine.session.current_track_id(), Some(1));
        assert!(events
            .pending()
            .iter()
            .any(|e| matches!(e, Event::PlaybackFailed { track_id: 1, .. })));
    }

    #[test]
    fn natural_end_returns_signal_to_caller() {
        let (mut engine, _backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        let generation = engine.current_generation();
        let signal = engine.on_media_event(
            MediaEvent {
                generation,
                kind: MediaEventKind::NaturalEnd,
            },
            &mut events,
        );
        assert_eq!(signal, Some(NaturalEnd));
    }

    #[test]
    fn restart_current_rewinds_and_plays() {
        let (mut engine, backend, mut events) = make_engine();
        engine.play_track(make_track(1), &mut events);
        let generation = engine.current_generation();
        engine.on_media_event(
            MediaEvent {
                generation,
                kind: MediaEventKind::MetadataReady(60.0),
            },
            &mut events,
        );
        engine.restart_current(&mut events);
        assert!(engine.session.is_playing);
        assert_eq!(engine.session.position_secs, 0.0);
        assert!(backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::Seek(s) if *s == 0.0)));
    }

    #[test]
    fn repeat_mode_cycles() {
        assert_eq!(RepeatMode::None.cycled(), RepeatMode::One);
        assert_eq!(RepeatMode::One.cycled(), RepeatMode::All);
        assert_eq!(RepeatMode::All.cycled(), RepeatMode::None);
    }
}
