//! Seams to the display and keyboard. The window layer implements these; the
//! tests drive them with a manual clock.

use crate::abort::AbortSignal;
use crate::error::{DeviceError, Result, SartError};
use sart_core::{Key, KeyPress, Screen, StimulusType};
use std::time::Duration;

pub trait StimulusDisplay {
    /// Replaces the back buffer contents with `stimulus`.
    fn draw(&mut self, stimulus: &StimulusType) -> Result<(), DeviceError>;

    /// Flips the back buffer. Returns once the frame is visible.
    fn present(&mut self) -> Result<(), DeviceError>;

    fn show(&mut self, stimulus: &StimulusType) -> Result<(), DeviceError> {
        self.draw(stimulus)?;
        self.present()
    }
}

pub trait InputSource {
    /// Waits for the first press of one of `allowed`.
    ///
    /// Returns `None` when `max_wait` passes without a matching press, or early
    /// when the operator aborts. `max_wait: None` waits indefinitely.
    fn wait_for_key(
        &mut self,
        allowed: &[Key],
        max_wait: Option<Duration>,
    ) -> Result<Option<KeyPress>, DeviceError>;

    /// Drops presses queued before the current moment.
    fn discard_pending(&mut self);
}

impl<D: StimulusDisplay + ?Sized> StimulusDisplay for &mut D {
    fn draw(&mut self, stimulus: &StimulusType) -> Result<(), DeviceError> {
        (**self).draw(stimulus)
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        (**self).present()
    }
}

impl<I: InputSource + ?Sized> InputSource for &mut I {
    fn wait_for_key(
        &mut self,
        allowed: &[Key],
        max_wait: Option<Duration>,
    ) -> Result<Option<KeyPress>, DeviceError> {
        (**self).wait_for_key(allowed, max_wait)
    }

    fn discard_pending(&mut self) {
        (**self).discard_pending()
    }
}

/// Shows `screen` and waits for one of its accepted keys.
pub fn prompt<D, I>(
    display: &mut D,
    input: &mut I,
    screen: Screen,
    max_wait: Option<Duration>,
    abort: &AbortSignal,
) -> Result<Option<KeyPress>>
where
    D: StimulusDisplay + ?Sized,
    I: InputSource + ?Sized,
{
    display.show(&StimulusType::Screen(screen))?;
    input.discard_pending();
    let press = input.wait_for_key(screen.accepted_keys(), max_wait)?;
    if abort.is_raised() {
        return Err(SartError::Aborted);
    }
    Ok(press)
}
