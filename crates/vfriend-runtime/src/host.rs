//! Maps application lifecycle events onto emulator sessions.

use crate::{
    bridge::EmulationCore,
    emulator::{Emulator, SessionStatus},
    error::RuntimeError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The emulation view is visible and focused.
    Active,
    /// The view went away.
    Inactive,
    /// The whole application moved to the background.
    Background,
}

type EmulatorFactory<C> = Box<dyn FnMut() -> Result<Emulator<C>, RuntimeError>>;

/// Owns the current session and replaces it after every halt.
///
/// Sessions are terminal once halted, so resuming builds a fresh [`Emulator`]
/// through the factory. The new session reloads the save RAM the old one
/// persisted, and display consumers must resubscribe (see
/// [`SessionHost::generation`]).
pub struct SessionHost<C: EmulationCore> {
    factory: EmulatorFactory<C>,
    current: Option<Emulator<C>>,
    generation: u64,
}

impl<C: EmulationCore> SessionHost<C> {
    pub fn new(factory: impl FnMut() -> Result<Emulator<C>, RuntimeError> + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            current: None,
            generation: 0,
        }
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> Result<(), RuntimeError> {
        tracing::debug!(?event, "lifecycle event");
        match event {
            LifecycleEvent::Active => self.resume(),
            LifecycleEvent::Inactive | LifecycleEvent::Background => {
                self.suspend();
                Ok(())
            }
        }
    }

    fn resume(&mut self) -> Result<(), RuntimeError> {
        let reusable = self
            .current
            .as_ref()
            .is_some_and(|emulator| emulator.status() != SessionStatus::Halted);
        if !reusable {
            // Make sure the previous session has fully halted and saved first.
            self.current = None;
            let emulator = (self.factory)()?;
            self.current = Some(emulator);
            self.generation += 1;
        }

        match self.current.as_mut() {
            Some(emulator) => emulator.start(),
            None => Err(RuntimeError::SessionHalted),
        }
    }

    fn suspend(&mut self) {
        if let Some(emulator) = self.current.as_mut() {
            emulator.shutdown();
        }
    }

    /// The current session, running or halted.
    pub fn emulator(&self) -> Option<&Emulator<C>> {
        self.current.as_ref()
    }

    pub fn emulator_mut(&mut self) -> Option<&mut Emulator<C>> {
        self.current.as_mut()
    }

    /// Incremented each time a new session is built.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
