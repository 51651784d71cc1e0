// Adapters layer: concrete implementations of the domain ports.

pub mod chrome;
pub mod clock;

pub use chrome::{ChromeOptions, ChromeSession};
pub use clock::SystemClock;
