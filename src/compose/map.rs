//! Relabeling channel inputs and outputs.
//!
//! Both transformations are lazy: continuations are rewritten only as the channel
//! is driven, so relabeling an endless channel is cheap.

use std::rc::Rc;

use crate::{
    channel::{later, Channel},
    effect::{Effect, Value},
};

/// Transform inputs before they reach the wrapped channel.
///
/// # Examples
///
/// ```
/// use twoway::{compose::map_input, pipe, Channel, Effectable, Io};
///
/// let doubler: Channel<i32, i32, Io, ()> = pipe::repeat(Effectable::ready(()), |x| x * 2);
/// let parsed = map_input(|s: &'static str| s.len() as i32, doubler);
///
/// let Channel::Await(resume, _) = parsed else { unreachable!() };
/// assert!(matches!(resume("four"), Channel::Emit(8, _, _)));
/// ```
pub fn map_input<I1, I2, O, E, R, F>(f: F, channel: Channel<I2, O, E, R>) -> Channel<I1, O, E, R>
where
    I1: 'static,
    I2: 'static,
    O: Value,
    E: Effect,
    R: Value,
    F: Fn(I1) -> I2 + 'static,
{
    relabel_input(Rc::new(f), channel)
}

fn relabel_input<I1, I2, O, E, R>(
    f: Rc<dyn Fn(I1) -> I2>,
    channel: Channel<I2, O, E, R>,
) -> Channel<I1, O, E, R>
where
    I1: 'static,
    I2: 'static,
    O: Value,
    E: Effect,
    R: Value,
{
    match channel {
        Channel::Emit(out, next, cell) => {
            let next = later(next, move |channel| relabel_input(Rc::clone(&f), channel));
            Channel::Emit(out, next, cell)
        }
        Channel::Await(resume, cell) => Channel::Await(
            Rc::new(move |input| relabel_input(Rc::clone(&f), resume(f(input)))),
            cell,
        ),
        Channel::EffectStep(effect, cell) => {
            let effect = E::map(effect, move |channel| relabel_input(Rc::clone(&f), channel));
            Channel::EffectStep(effect, cell)
        }
        Channel::DeferStep(thunk) => {
            Channel::DeferStep(Rc::new(move || relabel_input(Rc::clone(&f), thunk())))
        }
        Channel::Done(result) => Channel::Done(result),
    }
}

/// Transform emitted values from the wrapped channel.
///
/// Termination cells and the final result pass through untouched.
pub fn map_output<I, O1, O2, E, R, F>(f: F, channel: Channel<I, O1, E, R>) -> Channel<I, O2, E, R>
where
    I: 'static,
    O1: Value,
    O2: Value,
    E: Effect,
    R: Value,
    F: Fn(O1) -> O2 + 'static,
{
    relabel_output(Rc::new(f), channel)
}

fn relabel_output<I, O1, O2, E, R>(
    f: Rc<dyn Fn(O1) -> O2>,
    channel: Channel<I, O1, E, R>,
) -> Channel<I, O2, E, R>
where
    I: 'static,
    O1: Value,
    O2: Value,
    E: Effect,
    R: Value,
{
    match channel {
        Channel::Emit(out, next, cell) => {
            let out = f(out);
            let next = later(next, move |channel| relabel_output(Rc::clone(&f), channel));
            Channel::Emit(out, next, cell)
        }
        Channel::Await(resume, cell) => Channel::Await(
            Rc::new(move |input| relabel_output(Rc::clone(&f), resume(input))),
            cell,
        ),
        Channel::EffectStep(effect, cell) => {
            let effect = E::map(effect, move |channel| relabel_output(Rc::clone(&f), channel));
            Channel::EffectStep(effect, cell)
        }
        Channel::DeferStep(thunk) => {
            Channel::DeferStep(Rc::new(move || relabel_output(Rc::clone(&f), thunk())))
        }
        Channel::Done(result) => Channel::Done(result),
    }
}
