//! # Twoway: Bidirectional Effectful Pipelines
//!
//! Build coroutine-style stages that exchange messages in both directions, run side
//! effects in a pluggable effect context, and stack into pipelines that shut down
//! cooperatively.
//!
//! ## Core Types
//!
//! - **[`Channel<I, O, E, R>`]**: a persistent coroutine that consumes `I`, produces `O`,
//!   runs effects in `E` and finishes with `R`
//! - **[`Effectable<E, R>`]**: what a channel produces if it is cut short
//! - **[`Effect`]**: the effect context, with [`Io`] and [`Async`] provided
//!
//! ## Key Features
//!
//! - **Composable**: stack two channels with [`duplex::stack`] or [`bidi::stack`]
//! - **Cooperative shutdown**: when one side of a stack finishes, the other is
//!   terminated with the result it declared up front
//! - **Finalizers**: [`Channel::attach_finalizer`] runs cleanup exactly once
//! - **Stack-safe**: drivers loop instead of recursing, pipelines can run forever
//!
//! ## Example
//!
//! ```
//! use twoway::prelude::*;
//!
//! // A stage that forwards three values downward, then stops with "A".
//! let upper =
//!     bidi::lift_downstream::<_, _, (), _, _>(pipe::take(Effectable::<Io, _>::ready("A"), 3));
//!
//! // A stage that sums everything it receives from above.
//! fn summing(total: u32) -> Bidi<u32, (), (), (), Io, u32> {
//!     bidi::await_down(Effectable::ready(total), move |n| summing(total + n))
//! }
//!
//! let numbers = pipe::emit_each(Effectable::ready("src"), [1, 2, 3]);
//! let source = bidi::lift_downstream::<(), u32, (), _, _>(numbers);
//! let pipeline = bidi::stack(bidi::stack(source, upper), summing(0));
//! assert_eq!(run_bidirectional(pipeline).run(), (("src", "A"), 6));
//! ```
//!
//! ## Common Functions
//!
//! **Building Channels:**
//! - [`build::done`], [`build::done_effect`], [`build::emit`], [`build::await_raw`]
//! - [`duplex::await_down`], [`duplex::await_up`], [`duplex::emit_down`], [`duplex::emit_up`]
//! - [`pipe::repeat`], [`pipe::pass_through`], [`pipe::take`]
//!
//! **Execution:**
//! - [`run::run`] / [`run::run_bidirectional`]: drive a closed pipeline
//! - [`run::Driver`]: the same with a step budget
//! - [`run::step`]: reduce by a single node

pub mod bidi;
pub mod build;
pub mod channel;
pub mod compose;
pub mod duplex;
pub mod effect;
pub mod effectable;
pub mod error;
pub mod pipe;
pub mod prelude;
pub mod run;
mod step;

pub use channel::Channel;
pub use duplex::{Closed, Duplex, Side, Sink, Source};
pub use effect::{Async, Effect, Io, Task, Thunk, Value};
pub use effectable::Effectable;
pub use error::RunError;
pub use step::Step;
