//! Presentation infrastructure shared by desktop line-of-business shells:
//! a typed notification bus, URI-addressed navigation with a journal, and
//! fault classification feeding a serialized user message queue.

pub mod app;
pub mod cli;
pub mod config;
pub mod faults;
pub mod logging;
pub mod navigation;
pub mod notifications;
