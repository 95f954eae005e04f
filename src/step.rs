/// Outcome of reducing a closed pipeline by a single node.
///
/// [`run::step`](crate::run::step) returns `Yielded` with an effect that produces the
/// next pipeline state, or `Complete` with the final result. External drivers use
/// it to bound, interleave or instrument execution.
///
/// ```rust
/// use twoway::{build, run, Closed, Io, Step};
///
/// let mut pipeline: Closed<Io, u8> = build::defer(|| build::defer(|| build::done(1)));
/// let mut reductions = 0;
/// let result = loop {
///     match run::step(pipeline) {
///         Step::Yielded(next) => {
///             reductions += 1;
///             pipeline = next.run();
///         }
///         Step::Complete(result) => break result,
///     }
/// };
/// assert_eq!((reductions, result), (2, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step<Y, D> {
    /// More work remains.
    Yielded(Y),
    /// The pipeline finished.
    Complete(D),
}

impl<Y, D> Step<Y, D> {
    /// Whether work remains.
    #[inline]
    pub const fn is_yielded(&self) -> bool {
        matches!(self, Step::Yielded(_))
    }

    /// Whether the pipeline finished.
    #[inline]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Step::Complete(_))
    }

    /// The final result, if the pipeline finished.
    #[inline]
    pub fn complete_value(self) -> Option<D> {
        match self {
            Step::Yielded(_) => None,
            Step::Complete(d) => Some(d),
        }
    }

    /// Transform the pending work, for instance to run it in another context.
    #[inline]
    pub fn map_yielded<Y2, F>(self, f: F) -> Step<Y2, D>
    where
        F: FnOnce(Y) -> Y2,
    {
        match self {
            Step::Yielded(y) => Step::Yielded(f(y)),
            Step::Complete(d) => Step::Complete(d),
        }
    }

    /// # Panics
    ///
    /// Panics if the pipeline already finished.
    #[inline]
    pub fn unwrap_yielded(self) -> Y {
        match self {
            Step::Yielded(y) => y,
            Step::Complete(_) => panic!("called `Step::unwrap_yielded()` on a `Complete` value"),
        }
    }

    /// # Panics
    ///
    /// Panics if the pipeline has work left.
    #[inline]
    pub fn unwrap_complete(self) -> D {
        match self {
            Step::Yielded(_) => panic!("called `Step::unwrap_complete()` on a `Yielded` value"),
            Step::Complete(d) => d,
        }
    }
}
