//! Core data types shared by every engine component.

pub mod generation;
pub mod item;
pub mod usage;

pub use generation::*;
pub use item::*;
pub use usage::*;
