//! Kiosk Core Library
//!
//! Carousel state and the render coordination that keeps every slot's canvas
//! showing the right page at the right size.

pub mod carousel;
pub mod config;
pub mod coordinator;
pub mod fit;
pub mod slot;

pub use carousel::{Carousel, CarouselError};
pub use config::{
    CarouselConfig, SlotConfig, DEFAULT_ADVANCE_INTERVAL, DEFAULT_DOCUMENT_COUNT,
    DEFAULT_RELOAD_INTERVAL,
};
pub use coordinator::{RenderCoordinator, RenderOutcome, REFERENCE_SCALE};
pub use fit::fit_scale;
pub use slot::{PendingRender, SharedSlot, Slot};
