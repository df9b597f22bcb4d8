//! Rodio media backend. Not serializable — created fresh per session.
//!
//! Decoding and output live here, behind the [`MediaBackend`] seam. The
//! engine polls once per tick; completions come back as generation-tagged
//! [`MediaEvent`]s so late callbacks from a superseded load are ignored
//! upstream.

use crate::error::EngineError;
use crate::playback::{MediaBackend, MediaEvent, MediaEventKind};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub struct RodioBackend {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Sink,
    media_root: PathBuf,
    volume: f32,
    generation: u64,
    /// A load is active and has not yet reached its natural end.
    active: bool,
    /// Duration reported by the decoder, not yet delivered via poll.
    pending_duration: Option<f64>,
    last_seek: Option<Instant>,
}

impl RodioBackend {
    /// Initialize audio output and create a playback sink. Media references
    /// are resolved relative to `media_root`.
    pub fn new(media_root: PathBuf) -> Result<Self, EngineError> {
        let (stream, handle) = OutputStream::try_default().map_err(|e| {
            EngineError::PlaybackFailed(format!("failed to open audio output: {}", e))
        })?;
        let sink = Sink::try_new(&handle).map_err(|e| {
            EngineError::PlaybackFailed(format!("failed to create audio sink: {}", e))
        })?;
        Ok(RodioBackend {
            _stream: stream,
            stream_handle: handle,
            sink,
            media_root,
            volume: 1.0,
            generation: 0,
            active: false,
            pending_duration: None,
            last_seek: None,
        })
    }

    /// rodio's try_seek flushes the buffer, making the sink transiently
    /// empty. Natural-end detection is suppressed briefly after a seek.
    fn in_seek_cooldown(&self) -> bool {
        self.last_seek
            .map(|t| t.elapsed() < Duration::from_millis(500))
            .unwrap_or(false)
    }
}

impl MediaBackend for RodioBackend {
    fn load(&mut self, media_ref: &str, generation: u64) -> Result<(), EngineError> {
        let path = self.media_root.join(media_ref);
        let file = File::open(&path).map_err(|e| {
            EngineError::PlaybackFailed(format!("cannot open '{}': {}", path.display(), e))
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| {
            EngineError::PlaybackFailed(format!("cannot decode '{}': {}", path.display(), e))
        })?;

        let duration = source.total_duration().map(|d| d.as_secs_f64());

        // Replace the sink rather than appending: a fresh sink drops any
        // queued source from the superseded load.
        self.sink.stop();
        self.sink = Sink::try_new(&self.stream_handle).map_err(|e| {
            EngineError::PlaybackFailed(format!("failed to create audio sink: {}", e))
        })?;
        self.sink.set_volume(self.volume);
        self.sink.append(source);
        self.sink.play();

        self.generation = generation;
        self.active = true;
        self.pending_duration = duration;
        self.last_seek = None;
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, seconds: f64) -> Result<(), EngineError> {
        self.sink
            .try_seek(Duration::from_secs_f64(seconds.max(0.0)))
            .map_err(|e| EngineError::PlaybackFailed(format!("seek failed: {}", e)))?;
        self.last_seek = Some(Instant::now());
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.sink.set_volume(volume);
    }

    fn poll(&mut self) -> Vec<MediaEvent> {
        let mut events = Vec::new();
        if let Some(duration) = self.pending_duration.take() {
            events.push(MediaEvent {
                generation: self.generation,
                kind: MediaEventKind::MetadataReady(duration),
            });
        }
        if self.active {
            if self.sink.empty() && !self.in_seek_cooldown() {
                self.active = false;
                events.push(MediaEvent {
                    generation: self.generation,
                    kind: MediaEventKind::NaturalEnd,
                });
            } else if !self.sink.is_paused() {
                events.push(MediaEvent {
                    generation: self.generation,
                    kind: MediaEventKind::TimeAdvance(self.sink.get_pos().as_secs_f64()),
                });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Audio hardware may be absent on build machines; creation must fail
    // with a clean error rather than panic.
    #[test]
    fn backend_creation_succeeds_or_fails_gracefully() {
        match RodioBackend::new(PathBuf::from(".")) {
            Ok(mut backend) => {
                assert!(backend.poll().is_empty());
            }
            Err(e) => {
                assert!(matches!(e, EngineError::PlaybackFailed(_)));
            }
        }
    }

    #[test]
    fn load_rejects_missing_file() {
        if let Ok(mut backend) = RodioBackend::new(PathBuf::from(".")) {
            let result = backend.load("no_such_hymn.mp3", 1);
            assert!(matches!(result, Err(EngineError::PlaybackFailed(_))));
        }
    }
}
