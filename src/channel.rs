//! The channel tree.
//!
//! A [`Channel`] is an immutable description of a coroutine that consumes `I`,
//! produces `O`, runs side effects in `E`, and finishes with `R`. Every node is shared
//! through `Rc`, so holding a channel value means holding a resumable snapshot: two
//! clones can be driven independently and never observe each other.
//!
//! Every suspended node carries an [`Effectable`] saying what the channel produces if
//! it is cut short there. Composition uses those cells to terminate the side that is
//! still running once its partner has finished.

use std::{fmt, rc::Rc};

use crate::{
    build,
    compose::{map_input, map_output},
    effect::{Effect, Value},
    effectable::Effectable,
};

/// A persistent, effectful, bidirectional coroutine.
pub enum Channel<I, O, E: Effect, R> {
    /// Produce a value, continue with the next state.
    Emit(O, Rc<Channel<I, O, E, R>>, Effectable<E, R>),
    /// Suspend until a value arrives.
    Await(Rc<dyn Fn(I) -> Channel<I, O, E, R>>, Effectable<E, R>),
    /// Run an effect that yields the next state.
    EffectStep(E::Of<Channel<I, O, E, R>>, Effectable<E, R>),
    /// A state that is only built when demanded.
    DeferStep(Rc<dyn Fn() -> Channel<I, O, E, R>>),
    /// Finished.
    Done(R),
}

/// Rebuild a shared continuation lazily through `f`.
pub(crate) fn later<I, O, E, R, I2, O2, R2, F>(
    next: Rc<Channel<I, O, E, R>>,
    f: F,
) -> Rc<Channel<I2, O2, E, R2>>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
    F: Fn(Channel<I, O, E, R>) -> Channel<I2, O2, E, R2> + 'static,
{
    Rc::new(Channel::DeferStep(Rc::new(move || f(next.as_ref().clone()))))
}

impl<I, O, E, R> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
{
    /// The result this channel produces if it is terminated now.
    ///
    /// For a deferred state the answer is itself deferred: the state is only built
    /// once the returned cell is resolved.
    pub fn termination_value(&self) -> Effectable<E, R> {
        match self {
            Channel::Emit(_, _, cell) | Channel::Await(_, cell) | Channel::EffectStep(_, cell) => {
                cell.clone()
            }
            Channel::DeferStep(thunk) => {
                let thunk = Rc::clone(thunk);
                Effectable::defer(move || thunk().termination_value())
            }
            Channel::Done(result) => Effectable::ready(result.clone()),
        }
    }

    /// Replace the termination cell of every suspended node with `on_terminate`.
    pub fn override_termination(self, on_terminate: Effectable<E, R>) -> Self {
        match self {
            Channel::Emit(out, next, _) => {
                let cell = on_terminate.clone();
                let next = later(next, move |channel| channel.override_termination(cell.clone()));
                Channel::Emit(out, next, on_terminate)
            }
            Channel::Await(resume, _) => {
                let cell = on_terminate.clone();
                Channel::Await(
                    Rc::new(move |input| resume(input).override_termination(cell.clone())),
                    on_terminate,
                )
            }
            Channel::EffectStep(effect, _) => {
                let cell = on_terminate.clone();
                let effect = E::map(effect, move |channel| {
                    channel.override_termination(cell.clone())
                });
                Channel::EffectStep(effect, on_terminate)
            }
            Channel::DeferStep(thunk) => build::defer(move || {
                thunk().override_termination(on_terminate.clone())
            }),
            done @ Channel::Done(_) => done,
        }
    }

    /// Run `finalizer` exactly once when the channel stops.
    ///
    /// Voluntary completion runs it before the result is handed on; forced
    /// termination runs it as part of resolving the termination cell.
    ///
    /// Attaching many finalizers one after another stays flat: effect and deferred
    /// states gain one continuation each, and a finished channel reached inside that
    /// effect is finalized there instead of producing another step.
    pub fn attach_finalizer(self, finalizer: E::Of<()>) -> Self
    where
        I: Clone,
    {
        match self {
            Channel::Emit(out, next, cell) => {
                let next = next.as_ref().clone().attach_finalizer(finalizer.clone());
                Channel::Emit(out, Rc::new(next), cell.after(finalizer))
            }
            Channel::Await(resume, cell) => {
                let fin = finalizer.clone();
                let resume = move |input: I| {
                    let resume = Rc::clone(&resume);
                    let fin = fin.clone();
                    build::defer(move || resume(input.clone()).attach_finalizer(fin.clone()))
                };
                Channel::Await(Rc::new(resume), cell.after(finalizer))
            }
            Channel::EffectStep(effect, cell) => {
                Channel::EffectStep(finalize_step::<I, O, E, R>(effect, finalizer.clone()), cell.after(finalizer))
            }
            Channel::DeferStep(thunk) => {
                let cell = Effectable::defer({
                    let thunk = Rc::clone(&thunk);
                    move || thunk().termination_value()
                });
                let step = E::map(E::pure(()), move |()| thunk());
                Channel::EffectStep(finalize_step::<I, O, E, R>(step, finalizer.clone()), cell.after(finalizer))
            }
            Channel::Done(result) => {
                let finished = E::map(finalizer, move |()| result.clone());
                build::done_effect(finished)
            }
        }
    }

    /// Continue with the channel built from this one's result.
    ///
    /// Termination cells are rewritten so that cutting the combined channel short
    /// also accounts for the continuation.
    pub fn and_then<R2, F>(self, f: F) -> Channel<I, O, E, R2>
    where
        R2: Value,
        F: Fn(R) -> Channel<I, O, E, R2> + 'static,
    {
        self.bind(Rc::new(f))
    }

    fn bind<R2: Value>(self, f: Rc<dyn Fn(R) -> Channel<I, O, E, R2>>) -> Channel<I, O, E, R2> {
        match self {
            Channel::Done(result) => f(result),
            Channel::Emit(out, next, cell) => {
                let k = Rc::clone(&f);
                let next = later(next, move |channel| channel.bind(Rc::clone(&k)));
                Channel::Emit(out, next, continued(cell, f))
            }
            Channel::Await(resume, cell) => {
                let k = Rc::clone(&f);
                Channel::Await(
                    Rc::new(move |input| resume(input).bind(Rc::clone(&k))),
                    continued(cell, f),
                )
            }
            Channel::EffectStep(effect, cell) => {
                let k = Rc::clone(&f);
                let effect = E::map(effect, move |channel| channel.bind(Rc::clone(&k)));
                Channel::EffectStep(effect, continued(cell, f))
            }
            Channel::DeferStep(thunk) => build::defer(move || thunk().bind(Rc::clone(&f))),
        }
    }

    pub fn map<R2, F>(self, f: F) -> Channel<I, O, E, R2>
    where
        R2: Value,
        F: Fn(R) -> R2 + 'static,
    {
        self.and_then(move |result| Channel::Done(f(result)))
    }

    /// Run `next` after this channel, discarding this channel's result.
    pub fn then<R2: Value>(self, next: Channel<I, O, E, R2>) -> Channel<I, O, E, R2> {
        self.and_then(move |_| next.clone())
    }

    /// Adapt the channel to a different input type.
    pub fn map_input<I2, F>(self, f: F) -> Channel<I2, O, E, R>
    where
        I2: 'static,
        F: Fn(I2) -> I + 'static,
    {
        map_input(f, self)
    }

    /// Adapt the channel to a different output type.
    pub fn map_output<O2, F>(self, f: F) -> Channel<I, O2, E, R>
    where
        O2: Value,
        F: Fn(O) -> O2 + 'static,
    {
        map_output(f, self)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Channel::Done(_))
    }
}

/// Finalize whatever `step` produces, in the same effect when it is already done.
fn finalize_step<I, O, E, R>(
    step: E::Of<Channel<I, O, E, R>>,
    finalizer: E::Of<()>,
) -> E::Of<Channel<I, O, E, R>>
where
    I: Clone + 'static,
    O: Value,
    E: Effect,
    R: Value,
{
    E::and_then(step, move |channel| match channel {
        Channel::Done(result) => E::map(finalizer.clone(), move |()| Channel::Done(result.clone())),
        other => E::pure(other.attach_finalizer(finalizer.clone())),
    })
}

fn continued<I, O, E, R, R2>(
    cell: Effectable<E, R>,
    f: Rc<dyn Fn(R) -> Channel<I, O, E, R2>>,
) -> Effectable<E, R2>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
    R2: Value,
{
    cell.and_then(move |result| f(result).termination_value())
}

impl<I, O: Clone, E: Effect, R: Clone> Clone for Channel<I, O, E, R> {
    fn clone(&self) -> Self {
        match self {
            Channel::Emit(out, next, cell) => {
                Channel::Emit(out.clone(), Rc::clone(next), cell.clone())
            }
            Channel::Await(resume, cell) => Channel::Await(Rc::clone(resume), cell.clone()),
            Channel::EffectStep(effect, cell) => Channel::EffectStep(effect.clone(), cell.clone()),
            Channel::DeferStep(thunk) => Channel::DeferStep(Rc::clone(thunk)),
            Channel::Done(result) => Channel::Done(result.clone()),
        }
    }
}

impl<I, O, E: Effect, R> fmt::Debug for Channel<I, O, E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Emit(..) => "Emit(..)",
            Channel::Await(..) => "Await(..)",
            Channel::EffectStep(..) => "EffectStep(..)",
            Channel::DeferStep(..) => "DeferStep(..)",
            Channel::Done(..) => "Done(..)",
        })
    }
}
