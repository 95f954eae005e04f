//! Ready-made one-directional stages.
//!
//! These are plain [`Channel`]s: they await on one side and emit on the other. Lift
//! them into a two-way stack with [`bidi::lift_downstream`](crate::bidi::lift_downstream)
//! or [`bidi::lift_upstream`](crate::bidi::lift_upstream).

use std::rc::Rc;

use crate::{
    build,
    channel::Channel,
    effect::{Effect, Value},
    effectable::Effectable,
};

/// Forward every input unchanged, forever.
pub fn pass_through<T, E, R>(on_terminate: Effectable<E, R>) -> Channel<T, T, E, R>
where
    T: Value,
    E: Effect,
    R: Value,
{
    repeat(on_terminate, |value| value)
}

/// Apply `f` to every input and emit the result, forever.
///
/// ```
/// use twoway::{pipe, Channel, Effectable, Io};
///
/// let squares: Channel<u32, u32, Io, ()> = pipe::repeat(Effectable::ready(()), |n| n * n);
/// let Channel::Await(resume, _) = squares else { unreachable!() };
/// assert!(matches!(resume(7), Channel::Emit(49, _, _)));
/// ```
pub fn repeat<I, O, E, R, F>(on_terminate: Effectable<E, R>, f: F) -> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
    F: Fn(I) -> O + 'static,
{
    repeating(on_terminate, Rc::new(f))
}

fn repeating<I, O, E, R>(
    on_terminate: Effectable<E, R>,
    f: Rc<dyn Fn(I) -> O>,
) -> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
{
    let cell = on_terminate.clone();
    build::await_raw(on_terminate, move |input| {
        let next = repeating(cell.clone(), Rc::clone(&f));
        Channel::Emit(f(input), Rc::new(next), cell.clone())
    })
}

/// Apply `f` to a single input, emit the result, then finish.
pub fn once<I, O, E, R, F>(on_terminate: Effectable<E, R>, f: F) -> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
    F: Fn(I) -> O + 'static,
{
    let cell = on_terminate.clone();
    build::await_raw(on_terminate, move |input| build::emit(cell.clone(), f(input)))
}

/// Forward the first `count` inputs, then finish.
pub fn take<T, E, R>(on_terminate: Effectable<E, R>, count: usize) -> Channel<T, T, E, R>
where
    T: Value,
    E: Effect,
    R: Value,
{
    if count == 0 {
        return build::finish(on_terminate);
    }
    let cell = on_terminate.clone();
    build::await_raw(on_terminate, move |input| {
        let next = take(cell.clone(), count - 1);
        Channel::Emit(input, Rc::new(next), cell.clone())
    })
}

/// Emit every item in order, then finish without awaiting.
pub fn emit_each<I, O, E, R, It>(on_terminate: Effectable<E, R>, items: It) -> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
    It: IntoIterator<Item = O>,
{
    emitting(on_terminate, items.into_iter().collect(), 0)
}

fn emitting<I, O, E, R>(
    on_terminate: Effectable<E, R>,
    items: Rc<[O]>,
    index: usize,
) -> Channel<I, O, E, R>
where
    I: 'static,
    O: Value,
    E: Effect,
    R: Value,
{
    let Some(item) = items.get(index).cloned() else {
        return build::finish(on_terminate);
    };
    let cell = on_terminate.clone();
    let rest = build::defer(move || emitting(cell.clone(), Rc::clone(&items), index + 1));
    Channel::Emit(item, Rc::new(rest), on_terminate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Io;

    type Counted<I> = Channel<I, u32, Io, &'static str>;

    fn settle<I: 'static>(channel: Counted<I>) -> Counted<I> {
        let mut channel = channel;
        while let Channel::DeferStep(thunk) = channel {
            channel = thunk();
        }
        channel
    }

    fn feed(channel: Counted<u32>, input: u32) -> (u32, Counted<u32>) {
        let Channel::Await(resume, _) = settle(channel) else {
            panic!("expected an await");
        };
        match resume(input) {
            Channel::Emit(out, next, _) => (out, Rc::unwrap_or_clone(next)),
            other => panic!("expected an emit, got {other:?}"),
        }
    }

    #[test]
    fn test_pass_through_forwards_and_resumes() {
        let (a, stage) = feed(pass_through(Effectable::ready("cut")), 4);
        let (b, stage) = feed(stage, 9);
        assert_eq!((a, b), (4, 9));
        assert!(matches!(stage, Channel::Await(..)));
    }

    #[test]
    fn test_once_finishes_after_one_input() {
        let (out, rest) = feed(once(Effectable::ready("once"), |n: u32| n + 1), 1);
        assert_eq!(out, 2);
        assert!(matches!(rest, Channel::Done("once")));
    }

    #[test]
    fn test_take_counts_down() {
        let stage = take(Effectable::ready("taken"), 2);
        let (_, stage) = feed(stage, 1);
        let (_, stage) = feed(stage, 2);
        assert!(matches!(stage, Channel::Done("taken")));
    }

    #[test]
    fn test_emit_each_then_finishes() {
        let mut channel: Counted<()> = emit_each(Effectable::ready("empty"), [3, 1]);
        let mut seen = Vec::new();
        loop {
            channel = match settle(channel) {
                Channel::Emit(out, next, _) => {
                    seen.push(out);
                    Rc::unwrap_or_clone(next)
                }
                Channel::Done(result) => {
                    assert_eq!(result, "empty");
                    break;
                }
                other => panic!("unexpected state {other:?}"),
            };
        }
        assert_eq!(seen, vec![3, 1]);
    }
}
