//! On-screen controller hit testing.
//!
//! Each visible control registers a named rectangle in one shared coordinate
//! space. Whenever the set of active touches changes, [`TouchController::update`]
//! recomputes which regions are covered and fires the region's callback only when
//! its pressed state flips.

use std::collections::{HashMap, HashSet};

use crate::input::{Button, SharedInputs};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle. Negative sizes are normalized on construction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        let (x, width) = if width < 0.0 { (x + width, -width) } else { (x, width) };
        let (y, height) = if height < 0.0 {
            (y + height, -height)
        } else {
            (y, height)
        };
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Min edges are inclusive, max edges exclusive. Empty rects contain nothing.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

type PressCallback = Box<dyn FnMut(bool) + Send>;

struct ButtonRegistration {
    pressed: bool,
    rect: Rect,
    callback: PressCallback,
    /// Set for regions added by [`TouchController::register_button`].
    binding: Option<(SharedInputs, Button)>,
}

/// Registry of named touch regions. The controller is the only writer of each
/// region's pressed state.
#[derive(Default)]
pub struct TouchController {
    regions: HashMap<String, ButtonRegistration>,
    active: HashSet<String>,
}

impl TouchController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a region.
    ///
    /// Re-registering an existing name keeps its pressed state, so layout churn
    /// does not produce spurious press/release events.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        rect: Rect,
        callback: impl FnMut(bool) + Send + 'static,
    ) {
        self.insert(name.into(), rect, Box::new(callback), None);
    }

    /// Registers a region whose press state drives `button` on `inputs`.
    pub fn register_button(
        &mut self,
        name: impl Into<String>,
        rect: Rect,
        inputs: &SharedInputs,
        button: Button,
    ) {
        let target = inputs.clone();
        let callback = move |pressed| target.set_button(button, pressed);
        self.insert(
            name.into(),
            rect,
            Box::new(callback),
            Some((inputs.clone(), button)),
        );
    }

    fn insert(
        &mut self,
        name: String,
        rect: Rect,
        callback: PressCallback,
        binding: Option<(SharedInputs, Button)>,
    ) {
        let pressed = self
            .regions
            .get(&name)
            .is_some_and(|existing| existing.pressed);
        self.regions.insert(
            name,
            ButtonRegistration {
                pressed,
                rect,
                callback,
                binding,
            },
        );
    }

    /// Removes a region without firing its callback. Returns whether it existed.
    ///
    /// A held region added with [`TouchController::register_button`] releases
    /// its button, so removing a control under a finger never leaves it stuck.
    pub fn deregister(&mut self, name: &str) -> bool {
        self.active.remove(name);
        let Some(registration) = self.regions.remove(name) else {
            return false;
        };
        if registration.pressed
            && let Some((inputs, button)) = &registration.binding
        {
            inputs.set_button(*button, false);
        }
        true
    }

    /// Recomputes every region against the full set of active touches.
    pub fn update(&mut self, touches: &[Point]) {
        for (name, registration) in &mut self.regions {
            let pressed = touches
                .iter()
                .any(|touch| registration.rect.contains(*touch));

            if registration.pressed == pressed {
                continue;
            }

            registration.pressed = pressed;
            if pressed {
                self.active.insert(name.clone());
            } else {
                self.active.remove(name);
            }
            (registration.callback)(pressed);
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Tracks raw touch events by id and feeds the active set to a [`TouchController`].
#[derive(Default)]
pub struct TouchSurface {
    controller: TouchController,
    touches: HashMap<u64, Point>,
    scratch: Vec<Point>,
}

impl TouchSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controller(&self) -> &TouchController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TouchController {
        &mut self.controller
    }

    pub fn touch_began(&mut self, id: u64, location: Point) {
        self.touches.insert(id, location);
        self.dispatch();
    }

    pub fn touch_moved(&mut self, id: u64, location: Point) {
        if let Some(touch) = self.touches.get_mut(&id) {
            *touch = location;
        }
        self.dispatch();
    }

    pub fn touch_ended(&mut self, id: u64) {
        self.touches.remove(&id);
        self.dispatch();
    }

    pub fn touch_cancelled(&mut self, id: u64) {
        self.touch_ended(id);
    }

    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    fn dispatch(&mut self) {
        self.scratch.clear();
        self.scratch.extend(self.touches.values().copied());
        self.controller.update(&self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type Log = Arc<Mutex<Vec<bool>>>;

    fn recorder() -> (Log, impl FnMut(bool) + Send + 'static) {
        let log: Log = Arc::default();
        let sink = Arc::clone(&log);
        (log, move |pressed| sink.lock().unwrap().push(pressed))
    }

    #[test]
    fn callback_fires_only_on_transitions() {
        let mut controller = TouchController::new();
        let (log, callback) = recorder();
        controller.register("a", Rect::new(0.0, 0.0, 10.0, 10.0), callback);

        let inside = Point::new(5.0, 5.0);
        controller.update(&[inside]);
        controller.update(&[inside]);
        controller.update(&[Point::new(6.0, 4.0)]);
        assert_eq!(*log.lock().unwrap(), vec![true]);
        assert!(controller.is_active("a"));

        controller.update(&[]);
        controller.update(&[]);
        assert_eq!(*log.lock().unwrap(), vec![true, false]);
        assert!(!controller.is_active("a"));
    }

    #[test]
    fn reregistering_keeps_pressed_state() {
        let mut controller = TouchController::new();
        let (log, callback) = recorder();
        controller.register("b", Rect::new(0.0, 0.0, 10.0, 10.0), callback);
        controller.update(&[Point::new(1.0, 1.0)]);

        let (moved_log, moved_callback) = recorder();
        controller.register("b", Rect::new(0.0, 0.0, 20.0, 20.0), moved_callback);
        controller.update(&[Point::new(1.0, 1.0)]);
        assert!(moved_log.lock().unwrap().is_empty());

        controller.update(&[Point::new(15.0, 15.0)]);
        assert!(moved_log.lock().unwrap().is_empty());

        controller.update(&[]);
        assert_eq!(*moved_log.lock().unwrap(), vec![false]);
        assert_eq!(*log.lock().unwrap(), vec![true]);
    }

    #[test]
    fn multi_touch_and_overlapping_regions() {
        let mut controller = TouchController::new();
        let (left_log, left) = recorder();
        let (right_log, right) = recorder();
        let (wide_log, wide) = recorder();
        controller.register("left", Rect::new(0.0, 0.0, 10.0, 10.0), left);
        controller.register("right", Rect::new(50.0, 0.0, 10.0, 10.0), right);
        controller.register("wide", Rect::new(0.0, 0.0, 100.0, 10.0), wide);

        controller.update(&[Point::new(5.0, 5.0), Point::new(55.0, 5.0)]);
        assert_eq!(*left_log.lock().unwrap(), vec![true]);
        assert_eq!(*right_log.lock().unwrap(), vec![true]);
        assert_eq!(*wide_log.lock().unwrap(), vec![true]);

        // Lifting one finger keeps the wide region held by the other.
        controller.update(&[Point::new(55.0, 5.0)]);
        assert_eq!(*left_log.lock().unwrap(), vec![true, false]);
        assert_eq!(*right_log.lock().unwrap(), vec![true]);
        assert_eq!(*wide_log.lock().unwrap(), vec![true]);
    }

    #[test]
    fn rect_edges() {
        let rect = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(!rect.contains(Point::new(15.0, 12.0)));
        assert!(!Rect::new(0.0, 0.0, 0.0, 0.0).contains(Point::new(0.0, 0.0)));

        let flipped = Rect::new(10.0, 10.0, -5.0, -5.0);
        assert_eq!(flipped, Rect::new(5.0, 5.0, 5.0, 5.0));
    }

    #[test]
    fn deregister_is_silent() {
        let mut controller = TouchController::new();
        let (log, callback) = recorder();
        controller.register("start", Rect::new(0.0, 0.0, 10.0, 10.0), callback);
        controller.update(&[Point::new(1.0, 1.0)]);

        assert!(controller.deregister("start"));
        assert!(!controller.deregister("start"));
        controller.update(&[]);
        assert_eq!(*log.lock().unwrap(), vec![true]);
        assert!(!controller.is_active("start"));
        assert!(controller.is_empty());
    }

    #[test]
    fn deregistering_a_held_button_releases_it() {
        let inputs = SharedInputs::new();
        let mut controller = TouchController::new();
        controller.register_button("b", Rect::new(0.0, 0.0, 10.0, 10.0), &inputs, Button::B);
        controller.register_button("a", Rect::new(20.0, 0.0, 10.0, 10.0), &inputs, Button::A);

        controller.update(&[Point::new(5.0, 5.0)]);
        assert!(inputs.snapshot().b_button);

        assert!(controller.deregister("b"));
        assert!(!inputs.snapshot().b_button);

        // An idle bound region leaves other held buttons alone.
        inputs.set_button(Button::Start, true);
        assert!(controller.deregister("a"));
        assert_eq!(
            inputs.snapshot(),
            crate::GamepadInputs::RELEASED.with(Button::Start, true)
        );
    }

    #[test]
    fn surface_tracks_touch_lifecycle() {
        let inputs = SharedInputs::new();
        let mut surface = TouchSurface::new();
        surface.controller_mut().register_button(
            "a",
            Rect::new(100.0, 100.0, 40.0, 40.0),
            &inputs,
            Button::A,
        );
        surface.controller_mut().register_button(
            "up",
            Rect::new(0.0, 0.0, 40.0, 40.0),
            &inputs,
            Button::LeftDpadUp,
        );

        surface.touch_began(1, Point::new(110.0, 110.0));
        assert!(inputs.snapshot().a_button);

        surface.touch_began(2, Point::new(10.0, 10.0));
        assert!(inputs.snapshot().left_dpad_up);

        // Sliding off the button releases it while the touch stays down.
        surface.touch_moved(1, Point::new(300.0, 300.0));
        assert!(!inputs.snapshot().a_button);
        assert_eq!(surface.active_touches(), 2);

        surface.touch_cancelled(2);
        surface.touch_ended(1);
        assert_eq!(inputs.snapshot(), crate::GamepadInputs::RELEASED);
        assert_eq!(surface.active_touches(), 0);
    }
}
