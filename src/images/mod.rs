//! Image handling
//!
//! Provides:
//! - Reference photo storage (per-user, overwritten on upload)
//! - Generated output storage (per-run session tags)
//! - The generation pipeline and its backend trait

mod gen;
mod reference;
mod store;

pub use gen::{generate_images, Generated, ImageGenerator, ImageOutput};
pub use reference::ReferenceStore;
pub use store::OutputStore;
