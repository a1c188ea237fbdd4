//! Keyboard bindings.
//!
//! Windowing toolkits report keys in their own types; callers translate to
//! [`Key`] and forward presses to a [`KeyboardInput`], which keeps a
//! [`SharedInputs`] mask up to date for the emulation thread.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
};

use vfriend_runtime::{Button, GamepadInputs, SharedInputs};

use crate::error::SupportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    Enter,
    Escape,
    Tab,
    Up,
    Down,
    Left,
    Right,
    /// A letter or digit, stored lowercase.
    Char(char),
}

impl Key {
    /// Letter or digit key. Letters are case-insensitive.
    pub fn char(c: char) -> Option<Key> {
        c.is_ascii_alphanumeric()
            .then(|| Key::Char(c.to_ascii_lowercase()))
    }
}

impl FromStr for Key {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && let Some(key) = Key::char(c)
        {
            return Ok(key);
        }

        match name.to_ascii_lowercase().as_str() {
            "space" => Ok(Key::Space),
            "enter" | "return" => Ok(Key::Enter),
            "escape" | "esc" => Ok(Key::Escape),
            "tab" => Ok(Key::Tab),
            "up" => Ok(Key::Up),
            "down" => Ok(Key::Down),
            "left" => Ok(Key::Left),
            "right" => Ok(Key::Right),
            _ => Err(SupportError::UnknownKey(name.to_string())),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Space => f.write_str("space"),
            Key::Enter => f.write_str("enter"),
            Key::Escape => f.write_str("escape"),
            Key::Tab => f.write_str("tab"),
            Key::Up => f.write_str("up"),
            Key::Down => f.write_str("down"),
            Key::Left => f.write_str("left"),
            Key::Right => f.write_str("right"),
            Key::Char(c) => write!(f, "{c}"),
        }
    }
}

/// Parses a console control name such as `a`, `start`, `lt` or `r-up`.
pub fn parse_button(name: &str) -> Result<Button, SupportError> {
    let normalized: String = name
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let button = match normalized.as_str() {
        "a" => Button::A,
        "b" => Button::B,
        "start" => Button::Start,
        "select" => Button::Select,
        "l" | "lt" | "lefttrigger" => Button::LeftTrigger,
        "r" | "rt" | "righttrigger" => Button::RightTrigger,
        "lup" | "leftup" => Button::LeftDpadUp,
        "ldown" | "leftdown" => Button::LeftDpadDown,
        "lleft" | "leftleft" => Button::LeftDpadLeft,
        "lright" | "leftright" => Button::LeftDpadRight,
        "rup" | "rightup" => Button::RightDpadUp,
        "rdown" | "rightdown" => Button::RightDpadDown,
        "rleft" | "rightleft" => Button::RightDpadLeft,
        "rright" | "rightright" => Button::RightDpadRight,
        _ => return Err(SupportError::UnknownButton(name.trim().to_string())),
    };
    Ok(button)
}

/// Key to button table. Several keys may drive the same button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    map: HashMap<Key, Button>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let defaults = [
            (Key::Space, Button::A),
            (Key::Char('c'), Button::B),
            (Key::Char('1'), Button::LeftTrigger),
            (Key::Char('3'), Button::RightTrigger),
            (Key::Char('w'), Button::LeftDpadUp),
            (Key::Char('a'), Button::LeftDpadLeft),
            (Key::Char('s'), Button::LeftDpadDown),
            (Key::Char('d'), Button::LeftDpadRight),
            (Key::Char('i'), Button::RightDpadUp),
            (Key::Char('j'), Button::RightDpadLeft),
            (Key::Char('k'), Button::RightDpadDown),
            (Key::Char('l'), Button::RightDpadRight),
            (Key::Char('q'), Button::Start),
            (Key::Char('e'), Button::Select),
        ];
        Self {
            map: defaults.into_iter().collect(),
        }
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Binds `key`, replacing its previous button if any.
    pub fn bind(&mut self, key: Key, button: Button) -> Option<Button> {
        self.map.insert(key, button)
    }

    pub fn unbind(&mut self, key: Key) -> Option<Button> {
        self.map.remove(&key)
    }

    pub fn button_for(&self, key: Key) -> Option<Button> {
        self.map.get(&key).copied()
    }

    /// Applies a `KEY=BUTTON` override, e.g. `enter=start`.
    pub fn apply_override(&mut self, binding: &str) -> Result<(), SupportError> {
        let (key, button) = binding
            .split_once('=')
            .ok_or_else(|| SupportError::InvalidBinding(binding.to_string()))?;
        let key: Key = key.parse()?;
        let button = parse_button(button)?;
        self.bind(key, button);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, Button)> + '_ {
        self.map.iter().map(|(key, button)| (*key, *button))
    }
}

/// Tracks held keys and publishes the resulting controls.
pub struct KeyboardInput {
    bindings: KeyBindings,
    held: HashSet<Key>,
    output: SharedInputs,
}

impl KeyboardInput {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
            output: SharedInputs::new(),
        }
    }

    /// Handle to register with the emulator as an input source.
    pub fn source(&self) -> SharedInputs {
        self.output.clone()
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Returns whether the key is bound. Auto-repeat presses are harmless.
    pub fn key_down(&mut self, key: Key) -> bool {
        if self.bindings.button_for(key).is_none() {
            return false;
        }
        if self.held.insert(key) {
            self.publish();
        }
        true
    }

    pub fn key_up(&mut self, key: Key) -> bool {
        if self.bindings.button_for(key).is_none() {
            return false;
        }
        if self.held.remove(&key) {
            self.publish();
        }
        true
    }

    /// Releases everything, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.held.clear();
        self.output.clear();
    }

    pub fn snapshot(&self) -> GamepadInputs {
        self.held
            .iter()
            .filter_map(|key| self.bindings.button_for(*key))
            .fold(GamepadInputs::RELEASED, |inputs, button| {
                inputs.with(button, true)
            })
    }

    fn publish(&self) {
        self.output.store(self.snapshot());
    }
}

impl Default for KeyboardInput {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}
