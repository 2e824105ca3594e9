pub mod background;
pub mod cards;
pub mod debounce;
pub mod input;
pub mod messages;
pub mod orchestrator;
pub mod runtime;

pub use messages::BackgroundMessage;
pub use runtime::run_tui;
