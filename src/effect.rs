//! Effect contexts that channels run their side effects in.
//!
//! A channel never performs I/O itself. Whenever it needs something from the outside
//! world it holds a value of the context's effect type, [`Effect::Of<T>`], and the
//! driver sequences into it. Effect values are *descriptions*: cloning one never runs
//! it, and running one twice runs the described work twice.
//!
//! Two contexts ship with the crate:
//!
//! - [`Io`]: synchronous, backed by [`Thunk`].
//! - [`Async`]: backed by [`Task`], a factory of local boxed futures that can be awaited
//!   on any executor.

use std::{any::Any, fmt, future::Future, marker::PhantomData, rc::Rc};

use either::Either;
use futures::future::{self, FutureExt, LocalBoxFuture};

/// Values that can live inside persistent channel trees.
pub trait Value: Clone + 'static {}

impl<T: Clone + 'static> Value for T {}

/// The effect context a channel is parameterized over.
///
/// Implementors supply lifting of pure values, sequencing of dependent computations,
/// independent combination of two computations, and a stack-safe loop.
pub trait Effect: Sized + 'static {
    /// A re-runnable computation producing `T`.
    type Of<T>: Clone;

    /// Lift a pure value.
    fn pure<T: Value>(value: T) -> Self::Of<T>;

    /// Transform the produced value.
    fn map<A: 'static, B: 'static, F>(fa: Self::Of<A>, f: F) -> Self::Of<B>
    where
        F: Fn(A) -> B + 'static;

    /// Run `fa`, then the computation built from its result.
    fn and_then<A: 'static, B: 'static, F>(fa: Self::Of<A>, f: F) -> Self::Of<B>
    where
        F: Fn(A) -> Self::Of<B> + 'static;

    /// Run two independent computations and pair their results.
    fn zip<A: 'static, B: 'static>(fa: Self::Of<A>, fb: Self::Of<B>) -> Self::Of<(A, B)>;

    /// Repeat `step` from `seed` until it produces `Right`.
    ///
    /// Implementations must loop rather than recurse, drivers rely on this to reduce
    /// arbitrarily long pipelines.
    fn iterate<S: Value, T: 'static, F>(seed: S, step: F) -> Self::Of<T>
    where
        F: Fn(S) -> Self::Of<Either<S, T>> + 'static;
}

/// A lazy synchronous computation.
///
/// Sequencing through [`Io::and_then`] and [`Io::map`] never nests native calls:
/// [`run`](Thunk::run) keeps pending continuations on a heap stack and works through
/// them in a loop, so chains of any depth in either direction run in constant stack.
///
/// ```rust
/// use std::{cell::Cell, rc::Rc};
/// use twoway::Thunk;
///
/// let calls = Rc::new(Cell::new(0));
/// let thunk = Thunk::new({
///     let calls = Rc::clone(&calls);
///     move || calls.set(calls.get() + 1)
/// });
/// assert_eq!(calls.get(), 0);
/// thunk.run();
/// thunk.run();
/// assert_eq!(calls.get(), 2);
/// ```
pub struct Thunk<T> {
    work: Work,
    produces: PhantomData<fn() -> T>,
}

type Erased = Box<dyn Any>;

/// What a continuation hands back: the next value, or more work to run first.
type Continue = Rc<dyn Fn(Erased) -> Either<Erased, Work>>;

/// A starting computation followed by continuations, most recently added first.
#[derive(Clone)]
struct Work {
    start: Rc<dyn Fn() -> Erased>,
    then: Option<Rc<Frame>>,
}

struct Frame {
    k: Continue,
    earlier: Option<Rc<Frame>>,
}

impl Drop for Frame {
    fn drop(&mut self) {
        let mut earlier = self.earlier.take();
        while let Some(frame) = earlier {
            earlier = match Rc::try_unwrap(frame) {
                Ok(mut frame) => frame.earlier.take(),
                Err(_) => None,
            };
        }
    }
}

fn unerase<T: 'static>(value: Erased) -> T {
    match value.downcast::<T>() {
        Ok(value) => *value,
        Err(_) => unreachable!("thunk continuation received a value of another type"),
    }
}

impl<T: 'static> Thunk<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let start: Rc<dyn Fn() -> Erased> = Rc::new(move || Box::new(f()) as Erased);
        Self::from_work(Work { start, then: None })
    }

    fn from_work(work: Work) -> Self {
        Thunk {
            work,
            produces: PhantomData,
        }
    }

    fn push<U: 'static>(self, k: Continue) -> Thunk<U> {
        let frame = Frame {
            k,
            earlier: self.work.then,
        };
        Thunk::from_work(Work {
            start: self.work.start,
            then: Some(Rc::new(frame)),
        })
    }

    /// Execute the described computation.
    pub fn run(&self) -> T {
        let mut pending: Vec<Continue> = Vec::new();
        let mut work = self.work.clone();
        loop {
            let mut frame = work.then.as_deref();
            while let Some(f) = frame {
                pending.push(Rc::clone(&f.k));
                frame = f.earlier.as_deref();
            }
            let mut value = (work.start)();
            work = loop {
                let Some(k) = pending.pop() else {
                    return unerase(value);
                };
                match k(value) {
                    Either::Left(next) => value = next,
                    Either::Right(more) => break more,
                }
            };
        }
    }
}

impl<T> Clone for Thunk<T> {
    fn clone(&self) -> Self {
        Thunk {
            work: self.work.clone(),
            produces: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Thunk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk(..)")
    }
}

/// Synchronous effect context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Io;

impl Effect for Io {
    type Of<T> = Thunk<T>;

    fn pure<T: Value>(value: T) -> Thunk<T> {
        Thunk::new(move || value.clone())
    }

    fn map<A: 'static, B: 'static, F>(fa: Thunk<A>, f: F) -> Thunk<B>
    where
        F: Fn(A) -> B + 'static,
    {
        fa.push(Rc::new(move |value: Erased| -> Either<Erased, Work> {
            Either::Left(Box::new(f(unerase(value))))
        }))
    }

    fn and_then<A: 'static, B: 'static, F>(fa: Thunk<A>, f: F) -> Thunk<B>
    where
        F: Fn(A) -> Thunk<B> + 'static,
    {
        fa.push(Rc::new(move |value: Erased| -> Either<Erased, Work> {
            Either::Right(f(unerase(value)).work)
        }))
    }

    fn zip<A: 'static, B: 'static>(fa: Thunk<A>, fb: Thunk<B>) -> Thunk<(A, B)> {
        Thunk::new(move || (fa.run(), fb.run()))
    }

    fn iterate<S: Value, T: 'static, F>(seed: S, step: F) -> Thunk<T>
    where
        F: Fn(S) -> Thunk<Either<S, T>> + 'static,
    {
        Thunk::new(move || {
            let mut state = seed.clone();
            loop {
                match step(state).run() {
                    Either::Left(next) => state = next,
                    Either::Right(done) => return done,
                }
            }
        })
    }
}

/// A re-runnable asynchronous computation.
///
/// Every call to [`run`](Task::run) builds a fresh future from the same description.
pub struct Task<T>(Rc<dyn Fn() -> LocalBoxFuture<'static, T>>);

impl<T> Task<T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = T> + 'static,
    {
        Task(Rc::new(move || f().boxed_local()))
    }

    /// Build the future for one execution of this task.
    pub fn run(&self) -> LocalBoxFuture<'static, T> {
        (self.0)()
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Task(Rc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task(..)")
    }
}

/// Asynchronous effect context built on `futures`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Async;

impl Effect for Async {
    type Of<T> = Task<T>;

    fn pure<T: Value>(value: T) -> Task<T> {
        Task::new(move || future::ready(value.clone()))
    }

    fn map<A: 'static, B: 'static, F>(fa: Task<A>, f: F) -> Task<B>
    where
        F: Fn(A) -> B + 'static,
    {
        let f = Rc::new(f);
        Task::new(move || {
            let f = Rc::clone(&f);
            fa.run().map(move |a| f(a))
        })
    }

    fn and_then<A: 'static, B: 'static, F>(fa: Task<A>, f: F) -> Task<B>
    where
        F: Fn(A) -> Task<B> + 'static,
    {
        let f = Rc::new(f);
        Task::new(move || {
            let f = Rc::clone(&f);
            let first = fa.run();
            async move {
                let a = first.await;
                f(a).run().await
            }
        })
    }

    fn zip<A: 'static, B: 'static>(fa: Task<A>, fb: Task<B>) -> Task<(A, B)> {
        Task::new(move || future::join(fa.run(), fb.run()))
    }

    fn iterate<S: Value, T: 'static, F>(seed: S, step: F) -> Task<T>
    where
        F: Fn(S) -> Task<Either<S, T>> + 'static,
    {
        let step = Rc::new(step);
        Task::new(move || {
            let step = Rc::clone(&step);
            let mut state = seed.clone();
            async move {
                loop {
                    match step(state).run().await {
                        Either::Left(next) => state = next,
                        Either::Right(done) => return done,
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::RefCell;

    fn recorder() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn note(log: &Rc<RefCell<Vec<&'static str>>>, entry: &'static str) -> Thunk<()> {
        let log = Rc::clone(log);
        Thunk::new(move || log.borrow_mut().push(entry))
    }

    #[test]
    fn test_io_is_lazy_until_run() {
        let log = recorder();
        let first = note(&log, "first");
        let both = Io::and_then(first, {
            let log = Rc::clone(&log);
            move |()| note(&log, "second")
        });

        assert!(log.borrow().is_empty());
        both.run();
        assert_eq!(&*log.borrow(), &["first", "second"]);
    }

    #[test]
    fn test_io_zip_runs_left_then_right() {
        let log = recorder();
        let left = Io::map(note(&log, "left"), |()| 1);
        let right = Io::map(note(&log, "right"), |()| "two");

        assert_eq!(Io::zip(left, right).run(), (1, "two"));
        assert_eq!(&*log.borrow(), &["left", "right"]);
    }

    #[test]
    fn test_io_iterate_does_not_grow_the_stack() {
        let counted = Io::iterate(0_u64, |n| {
            if n == 1_000_000 {
                Io::pure(Either::Right(n))
            } else {
                Io::pure(Either::Left(n + 1))
            }
        });
        assert_eq!(counted.run(), 1_000_000);
    }

    #[test]
    fn test_io_and_then_chains_run_in_constant_stack() {
        let nested_left = (0..200_000).fold(Io::pure(0_u64), |acc, _| {
            Io::and_then(acc, |n| Io::pure(n + 1))
        });
        assert_eq!(nested_left.run(), 200_000);

        fn countdown(n: u64) -> Thunk<u64> {
            if n == 0 {
                return Io::pure(0);
            }
            Io::and_then(Io::pure(()), move |()| countdown(n - 1))
        }
        assert_eq!(countdown(200_000).run(), 0);
    }

    #[test]
    fn test_io_long_map_chain() {
        let mapped = (0..200_000).fold(Io::pure(0_u64), |acc, _| Io::map(acc, |n| n + 2));
        assert_eq!(mapped.run(), 400_000);
    }

    #[test]
    fn test_io_thunk_reruns_from_description() {
        let log = recorder();
        let twice = Io::and_then(note(&log, "a"), {
            let log = Rc::clone(&log);
            move |()| note(&log, "b")
        });
        twice.run();
        twice.run();
        assert_eq!(&*log.borrow(), &["a", "b", "a", "b"]);
    }

    #[test]
    fn test_async_and_then_and_zip() {
        let doubled = Async::and_then(Async::pure(21_i32), |x| Async::pure(x * 2));
        let paired = Async::zip(doubled, Async::map(Async::pure("x"), |s| s.len()));
        assert_eq!(block_on(paired.run()), (42, 1));
    }

    #[test]
    fn test_async_task_reruns_from_description() {
        let runs = Rc::new(RefCell::new(0));
        let task = Task::new({
            let runs = Rc::clone(&runs);
            move || {
                *runs.borrow_mut() += 1;
                future::ready(())
            }
        });
        block_on(task.run());
        block_on(task.clone().run());
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn test_async_iterate_counts_up() {
        let counted = Async::iterate(0_u32, |n| {
            Async::pure(if n < 10_000 {
                Either::Left(n + 1)
            } else {
                Either::Right(n)
            })
        });
        assert_eq!(block_on(counted.run()), 10_000);
    }
}
