//! Commonly used imports
//!
//! Use `use twoway::prelude::*;` for quick access to the most common types and functions.

// Core types
pub use crate::{Async, Channel, Effect, Effectable, Io, Step, Value};

// Layers
pub use crate::bidi::{self, Bidi, Flow};
pub use crate::duplex::{self, Closed, Duplex, Side, Sink, Source};

// Most common constructors
pub use crate::build;
pub use crate::pipe;

// Composition
pub use crate::compose::{map_input, map_output};

// Execution
pub use crate::run::{run, run_bidirectional, Driver};
pub use crate::RunError;
