//! Driving closed pipelines to completion.
//!
//! A [`Closed`] pipeline has nothing left to exchange with the outside world. The
//! drivers reduce it node by node: boundary emissions are discarded, outer awaits
//! are answered with a unit signal, deferred states are forced and effect steps are
//! sequenced through the effect context. Every loop runs through
//! [`Effect::iterate`], so arbitrarily long pipelines never grow the stack.
//!
//! Unit signals are sent from the downstream side. When a signal comes straight
//! back out of the opposite side and the pipeline awaits again, no stage wanted it,
//! so the drivers switch to the other side. A pipeline that echoes signals from both
//! sides can never progress: [`run`] panics and [`Driver`] reports
//! [`RunError::Stalled`].
//!
//! ```
//! use twoway::{build, run, Closed, Io};
//!
//! let finished: Closed<Io, u32> = build::done(3);
//! assert_eq!(run::run(finished).run(), 3);
//! ```

use std::rc::Rc;

use either::Either;
use tracing::{debug, error, trace, warn};

use crate::{
    bidi::{close, Bidi},
    channel::Channel,
    duplex::{Closed, Side},
    effect::{Effect, Value},
    error::RunError,
    step::Step,
};

/// Reduce a closed pipeline to its final result.
///
/// # Panics
///
/// Panics if every unit signal passes straight through the pipeline from both sides.
pub fn run<E: Effect, R: Value>(pipeline: Closed<E, R>) -> E::Of<R> {
    E::iterate((pipeline, Signals::new()), |(mut channel, mut signals)| loop {
        channel = match channel {
            Channel::Done(result) => return E::pure(Either::Right(result)),
            Channel::EffectStep(effect, _) => {
                signals.progressed();
                return E::map(effect, move |next| Either::Left((next, signals)));
            }
            Channel::Emit(out, next, _) => {
                trace!("discarding boundary emission of a closed pipeline");
                signals.emitted(out);
                Rc::unwrap_or_clone(next)
            }
            Channel::Await(resume, _) => match signals.next() {
                Some(signal) => resume(signal),
                None => {
                    error!("unit signals pass straight through a closed pipeline from both sides");
                    panic!("closed pipeline makes no progress: no stage consumes unit signals");
                }
            },
            Channel::DeferStep(thunk) => thunk(),
        };
    })
}

/// Which side outer awaits of a closed pipeline are answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Signals {
    from: Side<(), ()>,
    echo: Echo,
    echoes: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Echo {
    Quiet,
    /// A signal went in and nothing else has happened since.
    Sent,
    /// The signal came back out of the opposite side.
    Returned,
}

impl Signals {
    fn new() -> Self {
        Signals {
            from: Side::Downstream(()),
            echo: Echo::Quiet,
            echoes: 0,
        }
    }

    /// The signal for the next outer await, or `None` once both sides have echoed.
    fn next(&mut self) -> Option<Side<(), ()>> {
        if self.echo == Echo::Returned {
            self.echoes += 1;
            if self.echoes >= 2 {
                return None;
            }
            self.from = opposite(self.from);
            trace!(from = ?self.from, "unit signal passed straight through, switching sides");
        } else {
            self.echoes = 0;
        }
        self.echo = Echo::Sent;
        Some(self.from)
    }

    fn emitted(&mut self, out: Side<(), ()>) {
        self.echo = if self.echo == Echo::Sent && out == opposite(self.from) {
            Echo::Returned
        } else {
            Echo::Quiet
        };
    }

    fn progressed(&mut self) {
        self.echo = Echo::Quiet;
    }
}

fn opposite(side: Side<(), ()>) -> Side<(), ()> {
    match side {
        Side::Downstream(()) => Side::Upstream(()),
        Side::Upstream(()) => Side::Downstream(()),
    }
}

/// Close a bidirectional pipeline and run it.
pub fn run_bidirectional<E: Effect, R: Value>(pipeline: Bidi<(), (), (), (), E, R>) -> E::Of<R> {
    run(close(pipeline))
}

/// Reduce a closed pipeline by exactly one node.
///
/// This is the building block for external step-drivers that bound or interleave
/// execution themselves. An outer await is always answered from the downstream
/// side; drivers that need the other side resume the await themselves.
///
/// ```
/// use twoway::{build, run, Closed, Io};
///
/// let pipeline: Closed<Io, &str> = build::defer(|| build::done("ok"));
/// let next = run::step(pipeline).unwrap_yielded().run();
/// assert_eq!(run::step(next).unwrap_complete(), "ok");
/// ```
pub fn step<E: Effect, R: Value>(pipeline: Closed<E, R>) -> Step<E::Of<Closed<E, R>>, R> {
    match pipeline {
        Channel::Done(result) => Step::Complete(result),
        Channel::EffectStep(effect, _) => Step::Yielded(effect),
        Channel::Emit(_, next, _) => Step::Yielded(E::pure(Rc::unwrap_or_clone(next))),
        Channel::Await(resume, _) => Step::Yielded(E::pure(resume(Side::Downstream(())))),
        Channel::DeferStep(thunk) => Step::Yielded(E::pure(thunk())),
    }
}

/// A configurable driver.
///
/// ```
/// use twoway::{build, run::Driver, Closed, Io, RunError};
///
/// fn forever() -> Closed<Io, ()> {
///     build::defer(forever)
/// }
///
/// let driver = Driver::new().with_step_limit(1_000);
/// assert_eq!(driver.drive(forever()).run(), Err(RunError::StepLimit { limit: 1_000 }));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Driver {
    step_limit: Option<u64>,
}

impl Driver {
    /// A driver without a step limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after `limit` reductions.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// The configured limit, if any.
    pub fn step_limit(&self) -> Option<u64> {
        self.step_limit
    }

    /// Reduce `pipeline` to its result, or fail once the step limit is exhausted.
    pub fn drive<E: Effect, R: Value>(
        &self,
        pipeline: Closed<E, R>,
    ) -> E::Of<Result<R, RunError>> {
        let limit = self.step_limit;
        let seed = (pipeline, 0_u64, Signals::new());
        E::iterate(seed, move |(mut channel, mut steps, mut signals)| loop {
            let pending = match channel {
                Channel::Done(result) => {
                    debug!(steps, "pipeline completed");
                    return E::pure(Either::Right(Ok(result)));
                }
                pending => pending,
            };
            if let Some(limit) = limit {
                if steps >= limit {
                    warn!(limit, "step limit reached before the pipeline completed");
                    return E::pure(Either::Right(Err(RunError::StepLimit { limit })));
                }
            }
            steps += 1;
            channel = match pending {
                Channel::EffectStep(effect, _) => {
                    trace!(steps, "pipeline suspended on an effect step");
                    signals.progressed();
                    return E::map(effect, move |next| Either::Left((next, steps, signals)));
                }
                Channel::Emit(out, next, _) => {
                    trace!(steps, "discarding boundary emission of a closed pipeline");
                    signals.emitted(out);
                    Rc::unwrap_or_clone(next)
                }
                Channel::Await(resume, _) => match signals.next() {
                    Some(signal) => resume(signal),
                    None => {
                        warn!(steps, "unit signals pass straight through from both sides");
                        return E::pure(Either::Right(Err(RunError::Stalled { steps })));
                    }
                },
                Channel::DeferStep(thunk) => thunk(),
                done @ Channel::Done(_) => done,
            };
        })
    }

    /// [`close`] a bidirectional pipeline and [`drive`](Driver::drive) it.
    pub fn drive_bidirectional<E: Effect, R: Value>(
        &self,
        pipeline: Bidi<(), (), (), (), E, R>,
    ) -> E::Of<Result<R, RunError>> {
        self.drive(close(pipeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build, effect::{Async, Io, Task}, effectable::Effectable};
    use futures::executor::block_on;
    use std::cell::RefCell;

    fn countdown(n: u32) -> Closed<Io, u32> {
        if n == 0 {
            return build::done(0);
        }
        build::defer(move || countdown(n - 1).map(move |total| total + n))
    }

    #[test]
    fn test_run_done_yields_result() {
        let pipeline: Closed<Io, &str> = build::done("r");
        assert_eq!(run(pipeline).run(), "r");
    }

    #[test]
    fn test_run_discards_boundary_emissions_and_feeds_awaits() {
        let pipeline: Closed<Io, u8> = build::emit(Effectable::ready(0), Side::Upstream(()))
            .then(build::await_raw(Effectable::ready(1), |side| match side {
                Side::Downstream(()) => build::done(2),
                Side::Upstream(()) => build::done(3),
            }));
        assert_eq!(run(pipeline).run(), 2);
    }

    #[test]
    fn test_run_sequences_effects_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let note = |entry: u32| {
            let log = Rc::clone(&log);
            crate::effect::Thunk::new(move || log.borrow_mut().push(entry))
        };
        let pipeline: Closed<Io, ()> = build::effect(Effectable::ready(()), Io::map(note(1), |()| {
            build::done(())
        }))
        .then(build::done_effect(note(2)));

        run(pipeline).run();
        assert_eq!(&*log.borrow(), &[1, 2]);
    }

    #[test]
    fn test_run_in_async_context() {
        let pipeline: Closed<Async, u32> = build::effect(
            Effectable::ready(0),
            Task::new(|| async { build::done(41) }),
        )
        .map(|n| n + 1);
        assert_eq!(block_on(run(pipeline).run()), 42);
    }

    #[test]
    fn test_driver_without_limit_completes() {
        assert_eq!(Driver::new().drive(countdown(10)).run(), Ok(55));
    }

    #[test]
    fn test_driver_step_limit_trips() {
        let driver = Driver::default().with_step_limit(3);
        assert_eq!(driver.step_limit(), Some(3));
        assert_eq!(
            driver.drive(countdown(10)).run(),
            Err(RunError::StepLimit { limit: 3 })
        );
    }

    #[test]
    fn test_driver_limit_does_not_count_the_final_node() {
        let pipeline: Closed<Io, u8> = build::defer(|| build::done(7));
        assert_eq!(Driver::new().with_step_limit(1).drive(pipeline).run(), Ok(7));
    }

    /// Passes every unit signal straight through, whichever side it arrives on.
    fn echoing() -> Closed<Io, ()> {
        build::await_raw(Effectable::ready(()), |side: Side<(), ()>| {
            build::emit(Effectable::ready(()), opposite(side)).then(echoing())
        })
    }

    /// Waits for a signal from upstream; answers downstream signals by echoing them.
    fn wants_upstream(count: u32) -> Closed<Io, u32> {
        build::await_raw(Effectable::ready(count), move |side| match side {
            Side::Upstream(()) if count == 2 => build::done(count + 1),
            Side::Upstream(()) => wants_upstream(count + 1),
            Side::Downstream(()) => build::emit(Effectable::ready(count), Side::Upstream(()))
                .then(wants_upstream(count)),
        })
    }

    #[test]
    fn test_run_switches_sides_when_signal_is_echoed() {
        assert_eq!(run(wants_upstream(0)).run(), 3);
    }

    #[test]
    fn test_driver_switches_sides_when_signal_is_echoed() {
        let driver = Driver::new().with_step_limit(1_000);
        assert_eq!(driver.drive(wants_upstream(0)).run(), Ok(3));
    }

    #[test]
    fn test_driver_reports_stalled_pipeline() {
        let outcome = Driver::new().drive(echoing()).run();
        assert!(matches!(outcome, Err(RunError::Stalled { .. })));
    }

    #[test]
    #[should_panic(expected = "closed pipeline makes no progress")]
    fn test_run_panics_on_stalled_pipeline() {
        run(echoing()).run();
    }

    #[test]
    fn test_signals_keep_the_side_that_worked() {
        let mut signals = Signals::new();
        assert_eq!(signals.next(), Some(Side::Downstream(())));
        signals.emitted(Side::Upstream(()));
        assert_eq!(signals.next(), Some(Side::Upstream(())));
        signals.progressed();
        assert_eq!(signals.next(), Some(Side::Upstream(())));
    }

    #[test]
    fn test_step_reduces_one_node_at_a_time() {
        let pipeline: Closed<Io, u32> = build::defer(|| build::defer(|| build::done(5)));
        let once = step(pipeline).unwrap_yielded().run();
        assert!(matches!(once, Channel::DeferStep(_)));
        let twice = step(once).unwrap_yielded().run();
        assert_eq!(step(twice).unwrap_complete(), 5);
    }
}
