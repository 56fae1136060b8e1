//! Optional session decorations.

mod events;

pub use events::{EventFiringBridge, EventListener};
