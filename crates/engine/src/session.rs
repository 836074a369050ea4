//! Drives a [`PlaybackCoordinator`] in real time: applies operator commands,
//! advances the transport on a fixed resolution and runs asset loads in the
//! background, feeding their results back in.

use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use lehra_audio::AssetLoader;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::coordinator::PlaybackCoordinator;
use crate::selector::{fetch, LoadCompletion};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Stop,
    Toggle,
    Tempo(f64),
    Pitch(i32),
    Meter(String),
    Mode(String),
    Instrument(String),
    Practice(bool),
    Step(u32),
    Interval(u32),
    Accompaniment(bool),
    Volume(f32),
    Quit,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    BadArgument {
        command: String,
        expected: &'static str,
    },
}

fn argument<T: FromStr>(
    command: &str,
    value: Option<&str>,
    expected: &'static str,
) -> Result<T, CommandError> {
    value
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| CommandError::BadArgument {
            command: command.to_string(),
            expected,
        })
}

fn switch(command: &str, value: Option<&str>) -> Result<bool, CommandError> {
    match value {
        Some("on") | Some("true") | Some("1") => Ok(true),
        Some("off") | Some("false") | Some("0") => Ok(false),
        _ => Err(CommandError::BadArgument {
            command: command.to_string(),
            expected: "on or off",
        }),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();
        let value = words.next();
        let command = match name.as_str() {
            "play" => Command::Play,
            "stop" => Command::Stop,
            "toggle" | "space" => Command::Toggle,
            "tempo" | "bpm" => Command::Tempo(argument(&name, value, "a tempo in bpm")?),
            "pitch" | "key" => Command::Pitch(argument(&name, value, "a semitone offset")?),
            "taal" | "meter" => Command::Meter(argument(&name, value, "a taal id")?),
            "raag" | "mode" => Command::Mode(argument(&name, value, "a raag id")?),
            "instrument" => Command::Instrument(argument(&name, value, "an instrument id")?),
            "practice" | "riyaz" => Command::Practice(switch(&name, value)?),
            "step" => Command::Step(argument(&name, value, "a bpm step")?),
            "interval" => Command::Interval(argument(&name, value, "minutes")?),
            "tanpura" | "drone" => Command::Accompaniment(switch(&name, value)?),
            "volume" => Command::Volume(argument(&name, value, "a level in dB")?),
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(name)),
        };
        Ok(command)
    }
}

pub struct Session {
    coordinator: PlaybackCoordinator,
    loader: Arc<dyn AssetLoader>,
    resolution: Duration,
}

impl Session {
    pub fn new(
        coordinator: PlaybackCoordinator,
        loader: Arc<dyn AssetLoader>,
        resolution: Duration,
    ) -> Self {
        Self {
            coordinator,
            loader,
            resolution: resolution.max(Duration::from_millis(1)),
        }
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut PlaybackCoordinator {
        &mut self.coordinator
    }

    pub fn into_coordinator(self) -> PlaybackCoordinator {
        self.coordinator
    }

    /// Applies one command. Rejected commands are logged and the session
    /// carries on; only `Quit` breaks.
    pub fn apply(&mut self, command: Command) -> ControlFlow<()> {
        debug!(?command, "applying command");
        let result = match command {
            Command::Play => self.coordinator.play(),
            Command::Stop => {
                self.coordinator.stop();
                Ok(())
            }
            Command::Toggle => self.coordinator.toggle(),
            Command::Tempo(bpm) => {
                self.coordinator.set_tempo(bpm);
                Ok(())
            }
            Command::Pitch(semitones) => {
                self.coordinator.set_pitch_shift(semitones);
                Ok(())
            }
            Command::Meter(id) => self.coordinator.set_meter(&id),
            Command::Mode(id) => {
                self.coordinator.set_mode(&id);
                Ok(())
            }
            Command::Instrument(id) => {
                self.coordinator.set_instrument(&id);
                Ok(())
            }
            Command::Practice(enabled) => {
                self.coordinator.set_practice_enabled(enabled);
                Ok(())
            }
            Command::Step(bpm) => {
                self.coordinator.set_practice_step(bpm);
                Ok(())
            }
            Command::Interval(minutes) => {
                self.coordinator.set_practice_interval(minutes);
                Ok(())
            }
            Command::Accompaniment(enabled) => {
                self.coordinator.set_accompaniment_enabled(enabled);
                Ok(())
            }
            Command::Volume(db) => {
                self.coordinator.set_accompaniment_volume(db);
                Ok(())
            }
            Command::Quit => return ControlFlow::Break(()),
        };
        if let Err(err) = result {
            warn!(%err, "command rejected");
        }
        ControlFlow::Continue(())
    }

    /// Runs until `Quit` arrives or every command sender is dropped, then
    /// stops playback.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<LoadCompletion>();
        let mut ticker = tokio::time::interval(self.resolution);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();
        info!(resolution = ?self.resolution, "session running");

        self.dispatch_loads(&done_tx);
        loop {
            tokio::select! {
                biased;
                Some(completion) = done_rx.recv() => {
                    self.coordinator.on_load_complete(completion);
                }
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.apply(command).is_break() {
                            break;
                        }
                    }
                    None => break,
                },
                now = ticker.tick() => {
                    self.coordinator.advance(now.saturating_duration_since(last));
                    last = now;
                }
            }
            self.dispatch_loads(&done_tx);
        }

        self.coordinator.stop();
        info!("session ended");
    }

    fn dispatch_loads(&mut self, done: &mpsc::UnboundedSender<LoadCompletion>) {
        for request in self.coordinator.drain_load_requests() {
            let loader = Arc::clone(&self.loader);
            let done = done.clone();
            tokio::spawn(async move {
                let completion = fetch(loader.as_ref(), request).await;
                if done.send(completion).is_err() {
                    debug!("session ended before load finished");
                }
            });
        }
    }
}
