//! Building channels from scratch
//!
//! Every constructor that suspends takes the termination cell for the new node
//! first: what the channel produces if a partner cuts it short right there.
//!
//! ```
//! use twoway::{build, Channel, Effectable, Io};
//!
//! let greet: Channel<(), &str, Io, u32> = build::emit(Effectable::ready(0), "hello");
//! match greet {
//!     Channel::Emit(out, next, _) => {
//!         assert_eq!(out, "hello");
//!         assert!(next.is_done());
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use std::rc::Rc;

use either::Either;

use crate::{
    channel::Channel,
    effect::{Effect, Value},
    effectable::Effectable,
};

/// A channel that has already finished.
pub fn done<I, O, E: Effect, R>(result: R) -> Channel<I, O, E, R> {
    Channel::Done(result)
}

/// A channel that finishes once `result` has run.
///
/// Cutting it short runs the same effect, so the result is never skipped.
pub fn done_effect<I, O, E, R>(result: E::Of<R>) -> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
{
    Channel::EffectStep(E::map(result.clone(), Channel::Done), Effectable::pending(result))
}

/// A channel that finishes with whatever `on_terminate` resolves to.
pub fn finish<I, O, E, R>(on_terminate: Effectable<E, R>) -> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
{
    match on_terminate.resolve() {
        Either::Left(result) => Channel::Done(result),
        Either::Right(result) => done_effect(result),
    }
}

/// Emit a single value, then finish with `on_terminate`.
pub fn emit<I, O, E, R>(on_terminate: Effectable<E, R>, out: O) -> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
{
    let next = Rc::new(finish(on_terminate.clone()));
    Channel::Emit(out, next, on_terminate)
}

/// Suspend until a value arrives, then continue with `resume`.
pub fn await_raw<I, O, E, R, F>(on_terminate: Effectable<E, R>, resume: F) -> Channel<I, O, E, R>
where
    E: Effect,
    F: Fn(I) -> Channel<I, O, E, R> + 'static,
{
    Channel::Await(Rc::new(resume), on_terminate)
}

/// Run `step` and continue with the channel it produces.
pub fn effect<I, O, E: Effect, R>(
    on_terminate: Effectable<E, R>,
    step: E::Of<Channel<I, O, E, R>>,
) -> Channel<I, O, E, R> {
    Channel::EffectStep(step, on_terminate)
}

/// Build the channel only when it is first driven.
pub fn defer<I, O, E, R, F>(thunk: F) -> Channel<I, O, E, R>
where
    E: Effect,
    F: Fn() -> Channel<I, O, E, R> + 'static,
{
    Channel::DeferStep(Rc::new(thunk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Io;

    type Byte = Channel<u8, u8, Io, &'static str>;

    #[test]
    fn test_finish_keeps_ready_results_pure() {
        let channel: Byte = finish(Effectable::ready("now"));
        assert!(matches!(channel, Channel::Done("now")));
    }

    #[test]
    fn test_finish_runs_pending_results() {
        let channel: Byte = finish(Effectable::pending(Io::pure("later")));
        let Channel::EffectStep(step, _) = channel else {
            panic!("expected an effect step");
        };
        assert!(matches!(step.run(), Channel::Done("later")));
    }

    #[test]
    fn test_emit_then_finishes() {
        let channel: Byte = emit(Effectable::ready("end"), 4);
        let Channel::Emit(4, next, _) = channel else {
            panic!("expected an emit of 4");
        };
        assert!(matches!(next.as_ref(), Channel::Done("end")));
    }

    #[test]
    fn test_await_raw_resumes_with_input() {
        let channel: Byte =
            await_raw(Effectable::ready("cut"), |n| emit(Effectable::ready("end"), n + 1));
        let Channel::Await(resume, cell) = channel else {
            panic!("expected an await");
        };
        assert_eq!(cell.resolve().left(), Some("cut"));
        assert!(matches!(resume(1), Channel::Emit(2, _, _)));
    }

    #[test]
    fn test_defer_is_lazy() {
        let built = Rc::new(std::cell::Cell::new(false));
        let channel: Byte = defer({
            let built = Rc::clone(&built);
            move || {
                built.set(true);
                done("built")
            }
        });
        assert!(!built.get());
        let Channel::DeferStep(thunk) = channel else {
            panic!("expected a deferred state");
        };
        assert!(matches!(thunk(), Channel::Done("built")));
        assert!(built.get());
    }

    #[test]
    fn test_effect_step_carries_cell() {
        let channel: Byte = effect(Effectable::ready("cut"), Io::pure(done("ran")));
        assert_eq!(channel.termination_value().resolve().left(), Some("cut"));
    }
}
