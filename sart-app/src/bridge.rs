//! Channel-backed collaborators. The engine thread talks to the window on the
//! main thread through these.

use sart_core::{Key, KeyPress, StimulusType};
use sart_experiment::{AbortSignal, DeviceError, InputSource, StimulusDisplay};
use sart_timing::{HighPrecisionTimer, Timer};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, sync_channel};
use std::time::Duration;
use winit::event_loop::EventLoopProxy;

/// Events the engine sends to the event loop.
#[derive(Debug)]
pub enum UserEvent {
    /// Present `stimulus`, then answer on `ack` once the frame is on screen.
    Frame {
        stimulus: StimulusType,
        ack: SyncSender<Result<(), String>>,
    },
    Finished,
}

/// What the event loop sends back to the engine.
#[derive(Debug, Clone, Copy)]
pub enum InputEvent {
    Press(KeyPress),
    /// Unblocks a pending wait so it can notice the abort flag.
    Wake,
}

pub struct WindowDisplay {
    proxy: EventLoopProxy<UserEvent>,
    back: StimulusType,
}

impl WindowDisplay {
    pub fn new(proxy: EventLoopProxy<UserEvent>) -> Self {
        Self {
            proxy,
            back: StimulusType::Blank,
        }
    }
}

impl StimulusDisplay for WindowDisplay {
    fn draw(&mut self, stimulus: &StimulusType) -> Result<(), DeviceError> {
        self.back = stimulus.clone();
        Ok(())
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        let (ack, done) = sync_channel(1);
        self.proxy
            .send_event(UserEvent::Frame {
                stimulus: self.back.clone(),
                ack,
            })
            .map_err(|_| DeviceError::Disconnected("window"))?;
        done.recv()
            .map_err(|_| DeviceError::Disconnected("window"))?
            .map_err(DeviceError::Render)
    }
}

pub struct ChannelInput {
    events: Receiver<InputEvent>,
    timer: HighPrecisionTimer,
    abort: AbortSignal,
}

impl ChannelInput {
    pub fn new(
        events: Receiver<InputEvent>,
        timer: HighPrecisionTimer,
        abort: AbortSignal,
    ) -> Self {
        Self {
            events,
            timer,
            abort,
        }
    }

    fn next_event(
        &self,
        started: u64,
        max_wait: Option<Duration>,
    ) -> Result<Option<InputEvent>, DeviceError> {
        let Some(max_wait) = max_wait else {
            return self
                .events
                .recv()
                .map(Some)
                .map_err(|_| DeviceError::Disconnected("keyboard"));
        };
        let spent = self.timer.elapsed(started);
        if spent >= max_wait {
            return Ok(None);
        }
        match self.events.recv_timeout(max_wait - spent) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DeviceError::Disconnected("keyboard")),
        }
    }
}

impl InputSource for ChannelInput {
    fn wait_for_key(
        &mut self,
        allowed: &[Key],
        max_wait: Option<Duration>,
    ) -> Result<Option<KeyPress>, DeviceError> {
        let started = self.timer.now();
        loop {
            if self.abort.is_raised() {
                return Ok(None);
            }
            match self.next_event(started, max_wait)? {
                None => return Ok(None),
                Some(InputEvent::Press(press)) if allowed.contains(&press.key) => {
                    return Ok(Some(press));
                }
                Some(_) => continue,
            }
        }
    }

    fn discard_pending(&mut self) {
        let dropped = self.events.try_iter().count();
        if dropped > 0 {
            tracing::trace!(dropped, "discarded early key presses");
        }
    }
}
