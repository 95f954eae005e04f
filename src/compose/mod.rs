//! Combining channels together
//!
//! [`stack_with`] runs two channels side by side and routes their traffic through a
//! [`Wiring`]. The [`duplex`](crate::duplex) and [`bidi`](crate::bidi) layers each supply
//! one wiring; everything else about stacking is shared.

mod map;
mod stack;

pub use map::{map_input, map_output};
pub use stack::{stack_with, Wiring};
