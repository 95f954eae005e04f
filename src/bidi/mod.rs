//! The bidirectional layer.
//!
//! A [`Bidi`] channel tags every message with its direction of travel. Unlike the
//! port tags of [`duplex`](crate::duplex), a travel tag survives the seam: a `Down`
//! message leaving the upper channel arrives at the lower one still tagged `Down`.
//! This is what makes ordinary one-directional stages easy to embed, see
//! [`lift_downstream`] and [`lift_upstream`].
//!
//! ```
//! use twoway::{bidi, pipe, Effectable, Io};
//!
//! let doubled = bidi::lift_downstream::<_, _, (), _, _>(
//!     pipe::repeat(Effectable::<Io, _>::ready(()), |n: u32| n * 2),
//! );
//! let mirrored = bidi::mirror(doubled);
//! # let _ = mirrored;
//! ```

pub mod projection;

use std::rc::Rc;

use either::Either;

use crate::{
    build,
    channel::{later, Channel},
    compose::{map_input, map_output, stack_with, Wiring},
    duplex::{Closed, Side},
    effect::{Effect, Value},
    effectable::Effectable,
};

/// Direction a message travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow<D, U> {
    Down(D),
    Up(U),
}

impl<D, U> Flow<D, U> {
    /// Swap the direction of travel.
    pub fn flip(self) -> Flow<U, D> {
        match self {
            Flow::Down(d) => Flow::Up(d),
            Flow::Up(u) => Flow::Down(u),
        }
    }
}

/// Consumes `A` travelling down and `B` travelling up; produces `A2` travelling down
/// and `B2` travelling up.
pub type Bidi<A, A2, B, B2, E, R> = Channel<Flow<A, B>, Flow<A2, B2>, E, R>;

/// Send `value` down, then finish with `on_terminate`.
///
/// ```
/// use twoway::{bidi::{emit_down, Bidi, Flow}, Channel, Effectable, Io};
///
/// let stage: Bidi<(), &str, (), (), Io, ()> = emit_down(Effectable::ready(()), "hello");
/// assert!(matches!(stage, Channel::Emit(Flow::Down("hello"), _, _)));
/// ```
pub fn emit_down<A, A2, B, B2, E, R>(
    on_terminate: Effectable<E, R>,
    value: A2,
) -> Bidi<A, A2, B, B2, E, R>
where
    A: 'static,
    A2: Value,
    B: 'static,
    B2: Value,
    E: Effect,
    R: Value,
{
    build::emit(on_terminate, Flow::Down(value))
}

/// Send `value` up, then finish with `on_terminate`.
pub fn emit_up<A, A2, B, B2, E, R>(
    on_terminate: Effectable<E, R>,
    value: B2,
) -> Bidi<A, A2, B, B2, E, R>
where
    A: 'static,
    A2: Value,
    B: 'static,
    B2: Value,
    E: Effect,
    R: Value,
{
    build::emit(on_terminate, Flow::Up(value))
}

/// Await a message travelling down; anything travelling up passes straight through.
pub fn await_down<A, A2, B, E, R, F>(
    on_terminate: Effectable<E, R>,
    resume: F,
) -> Bidi<A, A2, B, B, E, R>
where
    A: 'static,
    A2: Value,
    B: Value,
    E: Effect,
    R: Value,
    F: Fn(A) -> Bidi<A, A2, B, B, E, R> + 'static,
{
    awaiting_down(on_terminate, Rc::new(resume))
}

fn awaiting_down<A, A2, B, E, R>(
    on_terminate: Effectable<E, R>,
    resume: Rc<dyn Fn(A) -> Bidi<A, A2, B, B, E, R>>,
) -> Bidi<A, A2, B, B, E, R>
where
    A: 'static,
    A2: Value,
    B: Value,
    E: Effect,
    R: Value,
{
    let cell = on_terminate.clone();
    build::await_raw(on_terminate, move |input| match input {
        Flow::Down(value) => resume(value),
        Flow::Up(passing) => {
            let waiting = awaiting_down(cell.clone(), Rc::clone(&resume));
            Channel::Emit(Flow::Up(passing), Rc::new(waiting), cell.clone())
        }
    })
}

/// Await a message travelling up; anything travelling down passes straight through.
pub fn await_up<A, B, B2, E, R, F>(
    on_terminate: Effectable<E, R>,
    resume: F,
) -> Bidi<A, A, B, B2, E, R>
where
    A: Value,
    B: 'static,
    B2: Value,
    E: Effect,
    R: Value,
    F: Fn(B) -> Bidi<A, A, B, B2, E, R> + 'static,
{
    awaiting_up(on_terminate, Rc::new(resume))
}

fn awaiting_up<A, B, B2, E, R>(
    on_terminate: Effectable<E, R>,
    resume: Rc<dyn Fn(B) -> Bidi<A, A, B, B2, E, R>>,
) -> Bidi<A, A, B, B2, E, R>
where
    A: Value,
    B: 'static,
    B2: Value,
    E: Effect,
    R: Value,
{
    let cell = on_terminate.clone();
    build::await_raw(on_terminate, move |input| match input {
        Flow::Up(value) => resume(value),
        Flow::Down(passing) => {
            let waiting = awaiting_up(cell.clone(), Rc::clone(&resume));
            Channel::Emit(Flow::Down(passing), Rc::new(waiting), cell.clone())
        }
    })
}

/// Stack `upper` on top of `lower`.
///
/// Messages the upper channel sends down reach the lower channel, messages the lower
/// channel sends up reach the upper one. Down traffic leaves through the bottom of
/// the composite, up traffic through the top.
pub fn stack<A, A2, B, B2, X, Y, E, R1, R2>(
    upper: Bidi<A, X, Y, B2, E, R1>,
    lower: Bidi<X, A2, B, Y, E, R2>,
) -> Bidi<A, A2, B, B2, E, (R1, R2)>
where
    A: Value,
    A2: Value,
    B: Value,
    B2: Value,
    X: Value,
    Y: Value,
    E: Effect,
    R1: Value,
    R2: Value,
{
    let wiring: Wiring<
        Flow<A, B>,
        Flow<A2, B2>,
        Flow<A, Y>,
        Flow<X, B2>,
        Flow<X, B>,
        Flow<A2, Y>,
    > = Wiring {
        inbound: |input| match input {
            Flow::Down(a) => Either::Left(Flow::Down(a)),
            Flow::Up(b) => Either::Right(Flow::Up(b)),
        },
        upper: |out| match out {
            Flow::Down(x) => Either::Right(Flow::Down(x)),
            Flow::Up(b2) => Either::Left(Flow::Up(b2)),
        },
        lower: |out| match out {
            Flow::Down(a2) => Either::Left(Flow::Down(a2)),
            Flow::Up(y) => Either::Right(Flow::Up(y)),
        },
    };
    stack_with(upper, lower, wiring)
}

/// Embed a one-directional stage so that it processes downward traffic.
///
/// Everything the stage emits travels down; upward traffic arriving while it awaits
/// passes through untouched.
pub fn lift_downstream<A, A2, B, E, R>(stage: Channel<A, A2, E, R>) -> Bidi<A, A2, B, B, E, R>
where
    A: 'static,
    A2: Value,
    B: Value,
    E: Effect,
    R: Value,
{
    match stage {
        Channel::Emit(out, next, cell) => {
            let next = later(next, lift_downstream::<A, A2, B, E, R>);
            Channel::Emit(Flow::Down(out), next, cell)
        }
        Channel::Await(resume, cell) => {
            await_down(cell, move |input| lift_downstream(resume(input)))
        }
        Channel::EffectStep(effect, cell) => {
            Channel::EffectStep(E::map(effect, lift_downstream::<A, A2, B, E, R>), cell)
        }
        Channel::DeferStep(thunk) => build::defer(move || lift_downstream(thunk())),
        Channel::Done(result) => Channel::Done(result),
    }
}

/// Embed a one-directional stage so that it processes upward traffic.
pub fn lift_upstream<A, B, B2, E, R>(stage: Channel<B, B2, E, R>) -> Bidi<A, A, B, B2, E, R>
where
    A: Value,
    B: 'static,
    B2: Value,
    E: Effect,
    R: Value,
{
    match stage {
        Channel::Emit(out, next, cell) => {
            let next = later(next, lift_upstream::<A, B, B2, E, R>);
            Channel::Emit(Flow::Up(out), next, cell)
        }
        Channel::Await(resume, cell) => await_up(cell, move |input| lift_upstream(resume(input))),
        Channel::EffectStep(effect, cell) => {
            Channel::EffectStep(E::map(effect, lift_upstream::<A, B, B2, E, R>), cell)
        }
        Channel::DeferStep(thunk) => build::defer(move || lift_upstream(thunk())),
        Channel::Done(result) => Channel::Done(result),
    }
}

/// Swap the roles of the two directions.
///
/// `mirror(mirror(c))` behaves exactly like `c`.
pub fn mirror<A, A2, B, B2, E, R>(channel: Bidi<A, A2, B, B2, E, R>) -> Bidi<B, B2, A, A2, E, R>
where
    A: 'static,
    A2: Value,
    B: 'static,
    B2: Value,
    E: Effect,
    R: Value,
{
    map_output(Flow::flip, map_input(Flow::flip, channel))
}

/// Collapse a fully closed bidirectional channel into the base closed form.
///
/// Signals arriving on the downstream side travel up, signals arriving on the
/// upstream side travel down.
pub fn close<E: Effect, R: Value>(channel: Bidi<(), (), (), (), E, R>) -> Closed<E, R> {
    let inward = map_input(
        |side: Side<(), ()>| match side {
            Side::Downstream(()) => Flow::Up(()),
            Side::Upstream(()) => Flow::Down(()),
        },
        channel,
    );
    map_output(
        |flow: Flow<(), ()>| match flow {
            Flow::Down(()) => Side::Downstream(()),
            Flow::Up(()) => Side::Upstream(()),
        },
        inward,
    )
}
