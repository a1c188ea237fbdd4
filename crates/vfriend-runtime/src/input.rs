//! Controller snapshots and the merge policy shared by every input source.
//!
//! Keyboard, game controller and on-screen touch regions each produce a
//! [`GamepadInputs`] snapshot. The scheduler polls all of them once per tick and
//! folds the results with [`GamepadInputs::merge`], so a control reads pressed
//! when any source reports it pressed.

use std::sync::{
    Arc,
    atomic::{AtomicU16, Ordering},
};

/// Every physical control on the console pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Start,
    Select,
    LeftTrigger,
    RightTrigger,
    LeftDpadUp,
    LeftDpadDown,
    LeftDpadLeft,
    LeftDpadRight,
    RightDpadUp,
    RightDpadDown,
    RightDpadLeft,
    RightDpadRight,
}

impl Button {
    pub const ALL: [Button; 14] = [
        Button::A,
        Button::B,
        Button::Start,
        Button::Select,
        Button::LeftTrigger,
        Button::RightTrigger,
        Button::LeftDpadUp,
        Button::LeftDpadDown,
        Button::LeftDpadLeft,
        Button::LeftDpadRight,
        Button::RightDpadUp,
        Button::RightDpadDown,
        Button::RightDpadLeft,
        Button::RightDpadRight,
    ];

    /// Bit used for this button in packed masks.
    #[inline]
    pub const fn mask(self) -> u16 {
        1 << (self as u16)
    }
}

/// Bits covering every [`Button`]; the upper two bits of a mask are unused.
pub const BUTTON_MASK_ALL: u16 = (1 << Button::ALL.len()) - 1;

/// One boolean per control. Created per poll and discarded after merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GamepadInputs {
    pub a_button: bool,
    pub b_button: bool,

    pub right_trigger: bool,
    pub left_trigger: bool,

    pub right_dpad_up: bool,
    pub right_dpad_right: bool,
    pub right_dpad_left: bool,
    pub right_dpad_down: bool,

    pub left_dpad_up: bool,
    pub left_dpad_right: bool,
    pub left_dpad_left: bool,
    pub left_dpad_down: bool,

    pub start: bool,
    pub select: bool,
}

impl GamepadInputs {
    /// A snapshot with every control released.
    pub const RELEASED: GamepadInputs = GamepadInputs {
        a_button: false,
        b_button: false,
        right_trigger: false,
        left_trigger: false,
        right_dpad_up: false,
        right_dpad_right: false,
        right_dpad_left: false,
        right_dpad_down: false,
        left_dpad_up: false,
        left_dpad_right: false,
        left_dpad_left: false,
        left_dpad_down: false,
        start: false,
        select: false,
    };

    /// Combines two snapshots field by field with logical OR.
    ///
    /// Commutative, associative and idempotent, so sources may be folded in any
    /// order. Conflicting directions are not resolved here.
    #[must_use]
    pub fn merge(self, other: GamepadInputs) -> GamepadInputs {
        GamepadInputs {
            a_button: self.a_button || other.a_button,
            b_button: self.b_button || other.b_button,
            right_trigger: self.right_trigger || other.right_trigger,
            left_trigger: self.left_trigger || other.left_trigger,
            right_dpad_up: self.right_dpad_up || other.right_dpad_up,
            right_dpad_right: self.right_dpad_right || other.right_dpad_right,
            right_dpad_left: self.right_dpad_left || other.right_dpad_left,
            right_dpad_down: self.right_dpad_down || other.right_dpad_down,
            left_dpad_up: self.left_dpad_up || other.left_dpad_up,
            left_dpad_right: self.left_dpad_right || other.left_dpad_right,
            left_dpad_left: self.left_dpad_left || other.left_dpad_left,
            left_dpad_down: self.left_dpad_down || other.left_dpad_down,
            start: self.start || other.start,
            select: self.select || other.select,
        }
    }

    fn field_mut(&mut self, button: Button) -> &mut bool {
        match button {
            Button::A => &mut self.a_button,
            Button::B => &mut self.b_button,
            Button::Start => &mut self.start,
            Button::Select => &mut self.select,
            Button::LeftTrigger => &mut self.left_trigger,
            Button::RightTrigger => &mut self.right_trigger,
            Button::LeftDpadUp => &mut self.left_dpad_up,
            Button::LeftDpadDown => &mut self.left_dpad_down,
            Button::LeftDpadLeft => &mut self.left_dpad_left,
            Button::LeftDpadRight => &mut self.left_dpad_right,
            Button::RightDpadUp => &mut self.right_dpad_up,
            Button::RightDpadDown => &mut self.right_dpad_down,
            Button::RightDpadLeft => &mut self.right_dpad_left,
            Button::RightDpadRight => &mut self.right_dpad_right,
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::A => self.a_button,
            Button::B => self.b_button,
            Button::Start => self.start,
            Button::Select => self.select,
            Button::LeftTrigger => self.left_trigger,
            Button::RightTrigger => self.right_trigger,
            Button::LeftDpadUp => self.left_dpad_up,
            Button::LeftDpadDown => self.left_dpad_down,
            Button::LeftDpadLeft => self.left_dpad_left,
            Button::LeftDpadRight => self.left_dpad_right,
            Button::RightDpadUp => self.right_dpad_up,
            Button::RightDpadDown => self.right_dpad_down,
            Button::RightDpadLeft => self.right_dpad_left,
            Button::RightDpadRight => self.right_dpad_right,
        }
    }

    pub fn set(&mut self, button: Button, pressed: bool) {
        *self.field_mut(button) = pressed;
    }

    #[must_use]
    pub fn with(mut self, button: Button, pressed: bool) -> GamepadInputs {
        self.set(button, pressed);
        self
    }

    pub fn any_pressed(&self) -> bool {
        *self != GamepadInputs::RELEASED
    }

    pub fn to_mask(&self) -> u16 {
        Button::ALL
            .iter()
            .filter(|button| self.is_pressed(**button))
            .fold(0, |mask, button| mask | button.mask())
    }

    /// Unpacks a mask produced by [`GamepadInputs::to_mask`]. Unused bits are ignored.
    pub fn from_mask(mask: u16) -> GamepadInputs {
        let mut inputs = GamepadInputs::RELEASED;
        for button in Button::ALL {
            inputs.set(button, mask & button.mask() != 0);
        }
        inputs
    }
}

/// Something the scheduler can poll once per tick for controller state.
pub trait InputSource: Send {
    fn poll(&mut self) -> GamepadInputs;
}

impl<F> InputSource for F
where
    F: FnMut() -> GamepadInputs + Send,
{
    fn poll(&mut self) -> GamepadInputs {
        self()
    }
}

/// Button state that can be updated from any thread and polled by the scheduler.
///
/// Backed by a single atomic bitmask, so writers (touch callbacks, keyboard
/// handlers, controller pollers) never contend with the emulation thread.
#[derive(Debug, Clone, Default)]
pub struct SharedInputs {
    mask: Arc<AtomicU16>,
}

impl SharedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_button(&self, button: Button, pressed: bool) {
        if pressed {
            self.mask.fetch_or(button.mask(), Ordering::AcqRel);
        } else {
            self.mask.fetch_and(!button.mask(), Ordering::AcqRel);
        }
    }

    pub fn store(&self, inputs: GamepadInputs) {
        self.mask.store(inputs.to_mask(), Ordering::Release);
    }

    pub fn clear(&self) {
        self.mask.store(0, Ordering::Release);
    }

    pub fn snapshot(&self) -> GamepadInputs {
        GamepadInputs::from_mask(self.mask.load(Ordering::Acquire))
    }
}

impl InputSource for SharedInputs {
    fn poll(&mut self) -> GamepadInputs {
        self.snapshot()
    }
}

/// Folds any number of sources into one snapshot per poll.
#[derive(Default)]
pub struct InputMerger {
    sources: Vec<Box<dyn InputSource>>,
}

impl InputMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl InputSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl InputSource for InputMerger {
    fn poll(&mut self) -> GamepadInputs {
        self.sources
            .iter_mut()
            .fold(GamepadInputs::RELEASED, |merged, source| {
                merged.merge(source.poll())
            })
    }
}
