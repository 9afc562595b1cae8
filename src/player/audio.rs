use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// The single audio resource owned by the playback controller.
///
/// Mirrors a media element: commands never fail at the call site and
/// implementations log whatever goes wrong while loading or decoding.
pub trait AudioOutput {
    /// Replace the current source with the resource at `url`, stopping the previous one
    fn load(&mut self, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    /// Relocate playback to `secs` seconds from the start
    fn seek(&mut self, secs: f64);
    /// Current position in seconds
    fn position(&self) -> f64;
    /// Total length in seconds, `None` until the source is loaded
    fn duration(&self) -> Option<f64>;
}

enum AudioCommand {
    Append { generation: u64, bytes: Vec<u8> },
    Play,
    Pause,
    Seek(Duration),
    Stop,
}

#[derive(Default)]
struct Clock {
    generation: u64,
    position: f64,
    duration: Option<f64>,
}

/// Audio output playing through the default device with rodio.
///
/// The rodio stream is not `Send`, so it lives on a dedicated thread that
/// receives commands over a channel. Track bytes are downloaded on the tokio
/// runtime and handed to that thread once complete.
pub struct RodioOutput {
    commands: Sender<AudioCommand>,
    clock: Arc<Mutex<Clock>>,
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
    generation: u64,
}

impl RodioOutput {
    /// Open the default output device. Must be called from within a tokio runtime.
    pub fn new() -> Result<Self> {
        let runtime =
            tokio::runtime::Handle::try_current().context("Audio output needs a tokio runtime")?;
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let clock = Arc::new(Mutex::new(Clock::default()));

        let thread_clock = Arc::clone(&clock);
        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                run_audio_thread(&handle, receiver, thread_clock);
            })
            .context("Failed to spawn audio thread")?;

        ready_rx
            .recv()
            .context("Audio thread exited during startup")?
            .map_err(anyhow::Error::msg)
            .context("Failed to initialize audio output")?;

        Ok(Self {
            commands,
            clock,
            client: reqwest::Client::new(),
            runtime,
            generation: 0,
        })
    }

    fn send(&self, command: AudioCommand) {
        if self.commands.send(command).is_err() {
            tracing::error!("Audio thread is gone, command dropped");
        }
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, url: &str) {
        self.generation += 1;
        let generation = self.generation;
        {
            let mut clock = lock(&self.clock);
            *clock = Clock {
                generation,
                ..Clock::default()
            };
        }
        self.send(AudioCommand::Stop);

        let commands = self.commands.clone();
        let client = self.client.clone();
        let url = url.to_string();
        self.runtime.spawn(async move {
            tracing::debug!("Downloading {}", url);
            let bytes = match fetch_bytes(&client, &url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!("Failed to load {}: {:#}", url, e);
                    return;
                }
            };
            tracing::debug!("Downloaded {} bytes from {}", bytes.len(), url);
            let _ = commands.send(AudioCommand::Append { generation, bytes });
        });
    }

    fn play(&mut self) {
        self.send(AudioCommand::Play);
    }

    fn pause(&mut self) {
        self.send(AudioCommand::Pause);
    }

    fn seek(&mut self, secs: f64) {
        if secs.is_finite() && secs >= 0.0 {
            lock(&self.clock).position = secs;
            self.send(AudioCommand::Seek(Duration::from_secs_f64(secs)));
        }
    }

    fn position(&self) -> f64 {
        lock(&self.clock).position
    }

    fn duration(&self) -> Option<f64> {
        lock(&self.clock).duration
    }
}

async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to stream audio")?
        .error_for_status()
        .context("Server refused audio stream")?;
    let bytes = response
        .bytes()
        .await
        .context("Failed to download audio data")?;
    Ok(bytes.to_vec())
}

fn run_audio_thread(
    handle: &rodio::OutputStreamHandle,
    receiver: Receiver<AudioCommand>,
    clock: Arc<Mutex<Clock>>,
) {
    let mut sink: Option<Sink> = None;
    let mut wants_playing = false;

    loop {
        match receiver.recv_timeout(Duration::from_millis(200)) {
            Ok(AudioCommand::Append { generation, bytes }) => {
                if lock(&clock).generation != generation {
                    tracing::debug!("Dropping stale audio for load #{}", generation);
                    continue;
                }

                let source = match Decoder::new(Cursor::new(bytes)) {
                    Ok(source) => source,
                    Err(e) => {
                        tracing::error!("Failed to decode audio: {}", e);
                        continue;
                    }
                };
                let new_sink = match Sink::try_new(handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        tracing::error!("Failed to create audio sink: {}", e);
                        continue;
                    }
                };

                let duration = source.total_duration().map(|d| d.as_secs_f64());
                if !wants_playing {
                    new_sink.pause();
                }
                new_sink.append(source);
                sink = Some(new_sink);
                lock(&clock).duration = duration;
            }
            Ok(AudioCommand::Play) => {
                wants_playing = true;
                if let Some(sink) = &sink {
                    sink.play();
                }
            }
            Ok(AudioCommand::Pause) => {
                wants_playing = false;
                if let Some(sink) = &sink {
                    sink.pause();
                }
            }
            Ok(AudioCommand::Seek(position)) => {
                if let Some(sink) = &sink {
                    if let Err(e) = sink.try_seek(position) {
                        tracing::warn!("Seek failed: {}", e);
                    }
                }
            }
            Ok(AudioCommand::Stop) => {
                // Dropping a sink stops its source
                sink = None;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(sink) = &sink {
            lock(&clock).position = sink.get_pos().as_secs_f64();
        }
    }

    tracing::debug!("Audio thread stopped");
}

fn lock(clock: &Mutex<Clock>) -> MutexGuard<'_, Clock> {
    clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
