/*! Core types for domwatch.

Regenerate TypeScript types: `cargo test export_bindings`
*/

#![allow(missing_docs)]

mod error;
mod event;
mod geometry;
mod requirement;

pub use error::{DomError, DomResult};
pub use event::Event;
pub use geometry::{Point, Rect, Size};
pub use requirement::Requirement;
