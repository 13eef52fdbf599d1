//! URI-Addressed Navigation
//!
//! Translates locators such as `/Sales;/OrderDetail?orderId=7` into displayed
//! instances and keeps a browser-style back/forward journal.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use appshell::navigation::{Navigable, NavigationService, TypeRegistry};
//!
//! struct OrderDetail;
//! impl Navigable for OrderDetail {}
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = TypeRegistry::new();
//! registry.register("OrderDetail", |_| Ok(Arc::new(OrderDetail) as Arc<dyn Navigable>));
//!
//! let service = NavigationService::new(Arc::new(registry));
//! service.navigate("/Sales;/OrderDetail?orderId=7").await?;
//! assert!(!service.can_go_back());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod journal;
pub mod locator;
pub mod resolver;
pub mod service;


pub use context::{Navigable, NavigationContext, NavigationMode};
pub use error::{NavigationError, NavigationResult};
pub use journal::NavigationJournal;
pub use locator::{Locator, LocatorError, LocatorResult};
pub use resolver::{InstanceFactory, InstanceResolver, TypeRegistry};
pub use service::{NavigationEvent, NavigationService, NavigationSnapshot, DEFAULT_EVENT_CAPACITY};
