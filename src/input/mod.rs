pub mod events;
pub mod modes;
pub mod router;

pub use events::InputEvent;
pub use router::ReactivityRouter;
