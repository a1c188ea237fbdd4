//! Game controller input using gilrs.
//!
//! A background thread owns the `Gilrs` context, waits for controller events
//! and folds the state of every connected pad into a [`SharedInputs`] mask.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::bounded;
use gilrs::{Axis, Button as PadButton, Event, EventType, Gamepad, Gilrs};
use vfriend_runtime::{Button, GamepadInputs, SharedInputs};

use crate::error::SupportError;

/// Right stick deflection needed to count as a right pad press.
pub const STICK_DEADZONE: f32 = 0.5;

const EVENT_WAIT: Duration = Duration::from_millis(20);

/// Maps one controller's state to console controls.
///
/// `pressed` reports gilrs buttons; `right_stick` is the (x, y) deflection with
/// `y` positive up, as gilrs reports it.
pub fn map_controller(
    pressed: impl Fn(PadButton) -> bool,
    right_stick: (f32, f32),
) -> GamepadInputs {
    let mut inputs = GamepadInputs::RELEASED;
    let mapped = [
        (PadButton::South, Button::A),
        (PadButton::East, Button::B),
        (PadButton::LeftTrigger, Button::LeftTrigger),
        (PadButton::LeftTrigger2, Button::LeftTrigger),
        (PadButton::RightTrigger, Button::RightTrigger),
        (PadButton::RightTrigger2, Button::RightTrigger),
        (PadButton::DPadUp, Button::LeftDpadUp),
        (PadButton::DPadDown, Button::LeftDpadDown),
        (PadButton::DPadLeft, Button::LeftDpadLeft),
        (PadButton::DPadRight, Button::LeftDpadRight),
        (PadButton::Start, Button::Start),
        (PadButton::Select, Button::Select),
    ];
    for (pad, button) in mapped {
        if pressed(pad) {
            inputs.set(button, true);
        }
    }

    let (x, y) = right_stick;
    inputs.right_dpad_up = y > STICK_DEADZONE;
    inputs.right_dpad_down = y < -STICK_DEADZONE;
    inputs.right_dpad_right = x > STICK_DEADZONE;
    inputs.right_dpad_left = x < -STICK_DEADZONE;
    inputs
}

fn read_gamepad(gamepad: &Gamepad<'_>) -> GamepadInputs {
    map_controller(
        |button| gamepad.is_pressed(button),
        (
            gamepad.value(Axis::RightStickX),
            gamepad.value(Axis::RightStickY),
        ),
    )
}

/// Polls every connected controller on a dedicated thread.
///
/// All pads feed the same mask. Dropping the poller stops the thread and
/// releases every control.
pub struct GamepadPoller {
    output: SharedInputs,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl GamepadPoller {
    /// Starts the poller. Fails if gilrs cannot be initialized.
    pub fn spawn() -> Result<Self, SupportError> {
        let output = SharedInputs::new();
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = bounded::<Result<(), SupportError>>(1);

        let thread_output = output.clone();
        let thread_stop = Arc::clone(&stop);
        let join = thread::Builder::new()
            .name("vfriend-gamepad".into())
            .spawn(move || {
                // Gilrs is not Send on every platform, so it lives on this thread.
                let mut gilrs = match Gilrs::new() {
                    Ok(gilrs) => {
                        let _ = ready_tx.send(Ok(()));
                        gilrs
                    }
                    Err(err) => {
                        tracing::error!("Failed to initialize gilrs: {}", err);
                        let _ = ready_tx.send(Err(SupportError::Gamepad(err.to_string())));
                        return;
                    }
                };
                poll_loop(&mut gilrs, &thread_output, &thread_stop);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                output,
                stop,
                join: Some(join),
            }),
            Ok(Err(err)) => {
                let _ = join.join();
                Err(err)
            }
            Err(_) => {
                let _ = join.join();
                Err(SupportError::Gamepad(
                    "gamepad thread exited during startup".to_string(),
                ))
            }
        }
    }

    /// Handle to register with the emulator as an input source.
    pub fn source(&self) -> SharedInputs {
        self.output.clone()
    }
}

impl Drop for GamepadPoller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::warn!("gamepad thread panicked");
        }
        self.output.clear();
    }
}

fn poll_loop(gilrs: &mut Gilrs, output: &SharedInputs, stop: &AtomicBool) {
    for (id, gamepad) in gilrs.gamepads() {
        tracing::info!("Gamepad connected: {} ({:?})", gamepad.name(), id);
    }

    while !stop.load(Ordering::Acquire) {
        // Block briefly for the first event, then drain the rest.
        let mut next = gilrs.next_event_blocking(Some(EVENT_WAIT));
        while let Some(Event { id, event, .. }) = next {
            match event {
                EventType::Connected => {
                    let gamepad = gilrs.gamepad(id);
                    tracing::info!("Gamepad connected: {} ({:?})", gamepad.name(), id);
                }
                EventType::Disconnected => {
                    tracing::info!("Gamepad disconnected: {:?}", id);
                }
                _ => {}
            }
            next = gilrs.next_event();
        }

        let merged = gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(_, gamepad)| read_gamepad(&gamepad))
            .fold(GamepadInputs::RELEASED, GamepadInputs::merge);
        output.store(merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressing(buttons: &[PadButton]) -> impl Fn(PadButton) -> bool + '_ {
        move |button| buttons.contains(&button)
    }

    #[test]
    fn face_buttons_and_dpad() {
        let inputs = map_controller(
            pressing(&[PadButton::South, PadButton::DPadLeft, PadButton::Start]),
            (0.0, 0.0),
        );
        assert!(inputs.a_button);
        assert!(!inputs.b_button);
        assert!(inputs.left_dpad_left);
        assert!(inputs.start);
        assert_eq!(
            inputs,
            GamepadInputs::RELEASED
                .with(Button::A, true)
                .with(Button::LeftDpadLeft, true)
                .with(Button::Start, true)
        );
    }

    #[test]
    fn either_shoulder_row_maps_to_triggers() {
        let inputs = map_controller(
            pressing(&[PadButton::LeftTrigger2, PadButton::RightTrigger]),
            (0.0, 0.0),
        );
        assert!(inputs.left_trigger);
        assert!(inputs.right_trigger);
    }

    #[test]
    fn right_stick_respects_deadzone() {
        let idle = map_controller(pressing(&[]), (0.5, -0.5));
        assert_eq!(idle, GamepadInputs::RELEASED);

        let tilted = map_controller(pressing(&[]), (-0.9, 0.7));
        assert!(tilted.right_dpad_left);
        assert!(tilted.right_dpad_up);
        assert!(!tilted.right_dpad_right);
        assert!(!tilted.right_dpad_down);
    }
}
