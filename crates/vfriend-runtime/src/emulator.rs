mod control;
mod handle;
mod pacer;
mod runner;
mod session;
mod state;
mod types;
mod util;

pub use handle::{Emulator, EmulatorBuilder};
pub use types::{EmulatorStats, SessionStatus};
