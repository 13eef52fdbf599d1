//! Application orchestration module

pub mod execution;
pub mod initialization;

pub use execution::{execute, ConsolePresenter, ReplayResolver};
pub use initialization::{configure_logging, load_configuration};
