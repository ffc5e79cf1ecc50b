//! Runtime dependency injection for records, with structural deep copies.
//!
//! # Simple use case
//!
//! ```
//! # use std::sync::Arc;
//! # use kumiki::*;
//! // Define traits and implementors
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Default, DeepClone, Component)]
//! #[component(implements(dyn Greeter))]
//! pub struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "Hello world".into()
//!     }
//! }
//!
//! #[derive(Default, DeepClone, Component)]
//! pub struct Settings {
//!     pub verbose: bool,
//! }
//!
//! // Injectable fields are marked, everything else is left alone
//! #[derive(Default, DeepClone, Component)]
//! pub struct App {
//!     #[inject]
//!     pub greeter: Option<Interface<dyn Greeter>>,
//!     #[inject("motd")]
//!     pub motd: Option<Arc<String>>,
//!     #[inject]
//!     pub settings: Option<Arc<Settings>>,
//! }
//!
//! # fn main() -> Result<(), WiringError> {
//! let injector = Injector::new();
//! injector.provide(Arc::new(English))?;
//! injector.provide_named("motd", Arc::new("Have a nice day".to_string()))?;
//!
//! let app: Arc<App> = injector.instance()?;
//! assert_eq!(app.greeter.as_ref().unwrap().greet(), "Hello world");
//! assert!(!app.settings.as_ref().unwrap().verbose);
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! The injector keeps a registry of providers: shared values registered either under a
//! name or under their concrete record type. Asking for a record type walks its fields:
//!
//! * A field marked with `#[inject("name")]` receives the provider registered under this name.
//! * An unnamed `Option<Interface<dyn Trait>>` field receives the only registered record
//!   declaring `#[component(implements(dyn Trait))]`. Several candidates are an error.
//! * An unnamed `Option<Arc<T>>` field receives the provider of type `T`. If there is none,
//!   a zero value of `T` is created, populated the same way and registered.
//!
//! Fields which already hold a value are never touched. The resolved record is itself
//! registered, so that later requests share it ([Scope::Shared]) or deep copy it
//! ([Scope::Isolated], see [DeepClone]).
//!
//! Rust has no runtime reflection: the `Component` derive generates the [Reflect] and
//! [Record] implementations describing a record and its fields.

extern crate self as kumiki;

mod clone;
mod config;
mod inject;
pub mod marker;
mod reflect;
mod registry;
mod resolve;
mod slot;

pub use clone::DeepClone;
pub use config::{CommitPolicy, Config};
pub use inject::{global, Injector, Scope};
pub use kumiki_derive::{Component, DeepClone};
pub use reflect::{
    Cast, Field, Injection, Record, RecordInfo, Reflect, SharedAny, Target, TypeInfo,
};
pub use registry::{Key, Provider, Registry};
pub use resolve::{ErrorClass, WiringError};
pub use slot::{Interface, Slot};
