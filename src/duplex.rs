//! The base two-sided layer.
//!
//! A [`Duplex`] channel has a downstream side and an upstream side. Inputs and
//! outputs are tagged with the [`Side`] they arrive on or leave through. When two
//! duplex channels are stacked, the upper channel's downstream side faces the lower
//! channel's upstream side, so a value crossing the seam changes tag.
//!
//! ```text
//!            Upstream
//!        +-------------+
//!        |    upper    |
//!        +-------------+
//!            Downstream  <-- seam -->  Upstream
//!                                  +-------------+
//!                                  |    lower    |
//!                                  +-------------+
//!                                      Downstream
//! ```

use std::rc::Rc;

use either::Either;

use crate::{
    build,
    channel::Channel,
    compose::{stack_with, Wiring},
    effect::{Effect, Value},
    effectable::Effectable,
};

/// Which side of a duplex channel a value arrives on or leaves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side<D, U> {
    Downstream(D),
    Upstream(U),
}

/// Consumes `A` on its downstream side and `B` on its upstream side; produces `A2`
/// downstream and `B2` upstream.
pub type Duplex<A, A2, B, B2, E, R> = Channel<Side<A, B>, Side<A2, B2>, E, R>;

/// Only produces values, upstream.
pub type Source<T, E, R> = Duplex<(), (), (), T, E, R>;

/// Only consumes values, from downstream.
pub type Sink<T, E, R> = Duplex<T, (), (), (), E, R>;

/// Exchanges nothing but unit signals; ready to be driven by [`run`](crate::run::run).
pub type Closed<E, R> = Duplex<(), (), (), (), E, R>;

/// Emit `value` out of the downstream side, then finish with `on_terminate`.
///
/// ```
/// use twoway::{duplex::emit_down, Channel, Duplex, Effectable, Io, Side};
///
/// let stage: Duplex<(), u8, (), (), Io, ()> = emit_down(Effectable::ready(()), 4);
/// assert!(matches!(stage, Channel::Emit(Side::Downstream(4), _, _)));
/// ```
pub fn emit_down<A, A2, B, B2, E, R>(
    on_terminate: Effectable<E, R>,
    value: A2,
) -> Duplex<A, A2, B, B2, E, R>
where
    A: 'static,
    A2: Value,
    B: 'static,
    B2: Value,
    E: Effect,
    R: Value,
{
    build::emit(on_terminate, Side::Downstream(value))
}

/// Emit `value` out of the upstream side, then finish with `on_terminate`.
pub fn emit_up<A, A2, B, B2, E, R>(
    on_terminate: Effectable<E, R>,
    value: B2,
) -> Duplex<A, A2, B, B2, E, R>
where
    A: 'static,
    A2: Value,
    B: 'static,
    B2: Value,
    E: Effect,
    R: Value,
{
    build::emit(on_terminate, Side::Upstream(value))
}

/// Await a downstream-side value.
///
/// Anything arriving on the upstream side meanwhile is forwarded out of the
/// downstream side, and the channel keeps waiting with the same handler.
pub fn await_down<A, B, B2, E, R, F>(
    on_terminate: Effectable<E, R>,
    resume: F,
) -> Duplex<A, B, B, B2, E, R>
where
    A: 'static,
    B: Value,
    B2: Value,
    E: Effect,
    R: Value,
    F: Fn(A) -> Duplex<A, B, B, B2, E, R> + 'static,
{
    awaiting_down(on_terminate, Rc::new(resume))
}

fn awaiting_down<A, B, B2, E, R>(
    on_terminate: Effectable<E, R>,
    resume: Rc<dyn Fn(A) -> Duplex<A, B, B, B2, E, R>>,
) -> Duplex<A, B, B, B2, E, R>
where
    A: 'static,
    B: Value,
    B2: Value,
    E: Effect,
    R: Value,
{
    let cell = on_terminate.clone();
    build::await_raw(on_terminate, move |input| match input {
        Side::Downstream(value) => resume(value),
        Side::Upstream(passing) => {
            let waiting = awaiting_down(cell.clone(), Rc::clone(&resume));
            Channel::Emit(Side::Downstream(passing), Rc::new(waiting), cell.clone())
        }
    })
}

/// Await an upstream-side value, forwarding downstream-side arrivals upstream.
pub fn await_up<A, A2, B, E, R, F>(
    on_terminate: Effectable<E, R>,
    resume: F,
) -> Duplex<A, A2, B, A, E, R>
where
    A: Value,
    A2: Value,
    B: 'static,
    E: Effect,
    R: Value,
    F: Fn(B) -> Duplex<A, A2, B, A, E, R> + 'static,
{
    awaiting_up(on_terminate, Rc::new(resume))
}

fn awaiting_up<A, A2, B, E, R>(
    on_terminate: Effectable<E, R>,
    resume: Rc<dyn Fn(B) -> Duplex<A, A2, B, A, E, R>>,
) -> Duplex<A, A2, B, A, E, R>
where
    A: Value,
    A2: Value,
    B: 'static,
    E: Effect,
    R: Value,
{
    let cell = on_terminate.clone();
    build::await_raw(on_terminate, move |input| match input {
        Side::Upstream(value) => resume(value),
        Side::Downstream(passing) => {
            let waiting = awaiting_up(cell.clone(), Rc::clone(&resume));
            Channel::Emit(Side::Upstream(passing), Rc::new(waiting), cell.clone())
        }
    })
}

/// Stack `upper` on top of `lower`.
///
/// The upper channel's downstream output reaches the lower channel's upstream side
/// and vice versa. The composite keeps the lower channel's downstream side and the
/// upper channel's upstream side.
pub fn stack<A, A2, B, B2, X, Y, E, R1, R2>(
    upper: Duplex<X, Y, B, B2, E, R1>,
    lower: Duplex<A, A2, Y, X, E, R2>,
) -> Duplex<A, A2, B, B2, E, (R1, R2)>
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
        Side<A, B>,
        Side<A2, B2>,
        Side<X, B>,
        Side<Y, B2>,
        Side<A, Y>,
        Side<A2, X>,
    > = Wiring {
        inbound: |input| match input {
            Side::Downstream(a) => Either::Right(Side::Downstream(a)),
            Side::Upstream(b) => Either::Left(Side::Upstream(b)),
        },
        upper: |out| match out {
            Side::Downstream(y) => Either::Right(Side::Upstream(y)),
            Side::Upstream(b2) => Either::Left(Side::Upstream(b2)),
        },
        lower: |out| match out {
            Side::Downstream(a2) => Either::Left(Side::Downstream(a2)),
            Side::Upstream(x) => Either::Right(Side::Downstream(x)),
        },
    };
    stack_with(upper, lower, wiring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{effect::Io, run::run};
    use std::cell::RefCell;

    fn numbers(items: Vec<u32>) -> Source<u32, Io, &'static str> {
        emitting(Effectable::ready("numbers"), Rc::new(items), 0)
    }

    fn emitting(
        cell: Effectable<Io, &'static str>,
        items: Rc<Vec<u32>>,
        index: usize,
    ) -> Source<u32, Io, &'static str> {
        let Some(&n) = items.get(index) else {
            return build::finish(cell);
        };
        let rest = build::defer({
            let cell = cell.clone();
            move || emitting(cell.clone(), Rc::clone(&items), index + 1)
        });
        Channel::Emit(Side::Upstream(n), Rc::new(rest), cell)
    }

    fn summing(seen: Rc<RefCell<Vec<u32>>>, total: u32, left: usize) -> Sink<u32, Io, u32> {
        if left == 0 {
            return build::done(total);
        }
        await_down(Effectable::ready(total), move |n: u32| {
            seen.borrow_mut().push(n);
            summing(Rc::clone(&seen), total + n, left - 1)
        })
    }

    #[test]
    fn test_source_feeds_sink_across_the_seam() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let pipeline = stack(summing(Rc::clone(&seen), 0, 3), numbers(vec![1, 2, 3]));

        assert_eq!(run(pipeline).run(), (6, "numbers"));
        assert_eq!(&*seen.borrow(), &[1, 2, 3]);
    }

    #[test]
    fn test_short_sink_cuts_source() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let pipeline = stack(summing(Rc::clone(&seen), 0, 2), numbers(vec![4, 5, 6, 7]));

        assert_eq!(run(pipeline).run(), (9, "numbers"));
        assert_eq!(&*seen.borrow(), &[4, 5]);
    }

    #[test]
    fn test_await_down_forwards_upstream_arrivals() {
        let stage: Duplex<u32, &str, &str, (), Io, ()> =
            await_down(Effectable::ready(()), |_| build::done(()));
        let Channel::Await(resume, _) = stage else {
            panic!("expected an await");
        };
        let Channel::Emit(Side::Downstream("hi"), next, _) = resume(Side::Upstream("hi")) else {
            panic!("expected the upstream arrival to be forwarded downstream");
        };
        assert!(matches!(next.as_ref(), Channel::Await(..)));
    }

    #[test]
    fn test_await_up_forwards_downstream_arrivals() {
        let stage: Duplex<u8, (), u32, u8, Io, u32> =
            await_up(Effectable::ready(0), |n| build::done(n));
        let Channel::Await(resume, _) = stage else {
            panic!("expected an await");
        };
        assert!(matches!(resume(Side::Downstream(3)), Channel::Emit(Side::Upstream(3), _, _)));
        assert!(matches!(resume(Side::Upstream(8)), Channel::Done(8)));
    }
}
