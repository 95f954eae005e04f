//! Single-direction projections of the bidirectional layer.
//!
//! A [`Downstream`] arrow is a bidirectional channel that only transforms downward
//! traffic and lets upward traffic of type `X` through; [`Upstream`] is the mirror
//! image. Both form a category: [`identity`](Downstream::identity) is a lifted
//! pass-through stage and [`compose`](Downstream::compose) stacks two arrows,
//! merging their results with a [`Monoid`].

use crate::{
    bidi::{lift_downstream, lift_upstream, stack, Bidi},
    channel::Channel,
    effect::{Effect, Value},
    effectable::Effectable,
    pipe,
};

/// Results that can be merged associatively, with a neutral element.
pub trait Monoid {
    /// The neutral element: combining with it on either side changes nothing.
    fn empty() -> Self;

    /// Merge two results, `self` first.
    ///
    /// ```
    /// use twoway::bidi::projection::Monoid;
    ///
    /// assert_eq!(vec![1].combine(vec![2, 3]), vec![1, 2, 3]);
    /// ```
    fn combine(self, other: Self) -> Self;
}

impl Monoid for () {
    fn empty() -> Self {}

    fn combine(self, _other: Self) -> Self {}
}

impl Monoid for String {
    fn empty() -> Self {
        String::new()
    }

    fn combine(mut self, other: Self) -> Self {
        self.push_str(&other);
        self
    }
}

impl<T> Monoid for Vec<T> {
    fn empty() -> Self {
        Vec::new()
    }

    fn combine(mut self, mut other: Self) -> Self {
        self.append(&mut other);
        self
    }
}

impl<A: Monoid, B: Monoid> Monoid for (A, B) {
    fn empty() -> Self {
        (A::empty(), B::empty())
    }

    fn combine(self, other: Self) -> Self {
        (self.0.combine(other.0), self.1.combine(other.1))
    }
}

/// An arrow from `A` to `A2` over downward traffic.
pub struct Downstream<A, A2, X, E: Effect, R> {
    channel: Bidi<A, A2, X, X, E, R>,
}

impl<A, A2, X, E, R> Downstream<A, A2, X, E, R>
where
    A: Value,
    A2: Value,
    X: Value,
    E: Effect,
    R: Value + Monoid,
{
    /// Treat `channel` as a downward arrow. Upward traffic should pass through it.
    pub fn new(channel: Bidi<A, A2, X, X, E, R>) -> Self {
        Downstream { channel }
    }

    /// Embed a one-directional stage.
    pub fn lift(stage: Channel<A, A2, E, R>) -> Self {
        Downstream::new(lift_downstream(stage))
    }

    /// Run `self` above `next`, merging the results in that order.
    pub fn compose<A3: Value>(
        self,
        next: Downstream<A2, A3, X, E, R>,
    ) -> Downstream<A, A3, X, E, R> {
        let stacked = stack(self.channel, next.channel);
        Downstream::new(stacked.map(|(first, second)| first.combine(second)))
    }

    /// The underlying channel, ready to be stacked or closed.
    pub fn into_channel(self) -> Bidi<A, A2, X, X, E, R> {
        self.channel
    }
}

impl<A, X, E, R> Downstream<A, A, X, E, R>
where
    A: Value,
    X: Value,
    E: Effect,
    R: Value + Monoid,
{
    /// The lifted pass-through stage, finishing with the neutral result.
    pub fn identity() -> Self {
        Downstream::lift(pipe::pass_through(Effectable::ready(R::empty())))
    }
}

impl<A, A2, X, E: Effect, R: Clone> Clone for Downstream<A, A2, X, E, R>
where
    A2: Clone,
    X: Clone,
{
    fn clone(&self) -> Self {
        Downstream {
            channel: self.channel.clone(),
        }
    }
}

/// An arrow from `B` to `B2` over upward traffic.
pub struct Upstream<B, B2, X, E: Effect, R> {
    channel: Bidi<X, X, B, B2, E, R>,
}

impl<B, B2, X, E, R> Upstream<B, B2, X, E, R>
where
    B: Value,
    B2: Value,
    X: Value,
    E: Effect,
    R: Value + Monoid,
{
    /// Treat `channel` as an upward arrow. Downward traffic should pass through it.
    pub fn new(channel: Bidi<X, X, B, B2, E, R>) -> Self {
        Upstream { channel }
    }

    /// Embed a one-directional stage.
    pub fn lift(stage: Channel<B, B2, E, R>) -> Self {
        Upstream::new(lift_upstream(stage))
    }

    /// Feed `self`'s output into `next`.
    ///
    /// Upward traffic meets `self` first, so `next` sits above it in the stack; the
    /// merged result still lists `self` first.
    pub fn compose<B3: Value>(
        self,
        next: Upstream<B2, B3, X, E, R>,
    ) -> Upstream<B, B3, X, E, R> {
        let stacked = stack(next.channel, self.channel);
        Upstream::new(stacked.map(|(second, first)| first.combine(second)))
    }

    /// The underlying channel, ready to be stacked or closed.
    pub fn into_channel(self) -> Bidi<X, X, B, B2, E, R> {
        self.channel
    }
}

impl<B, X, E, R> Upstream<B, B, X, E, R>
where
    B: Value,
    X: Value,
    E: Effect,
    R: Value + Monoid,
{
    pub fn identity() -> Self {
        Upstream::lift(pipe::pass_through(Effectable::ready(R::empty())))
    }
}

impl<B, B2, X, E: Effect, R: Clone> Clone for Upstream<B, B2, X, E, R>
where
    B2: Clone,
    X: Clone,
{
    fn clone(&self) -> Self {
        Upstream {
            channel: self.channel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bidi::Flow, effect::Io};
    use proptest::prelude::*;
    use std::rc::Rc;

    type Names = Vec<&'static str>;

    /// Feed inputs, record outputs, then cut the channel short and report its result.
    fn observe<A, A2, B, B2>(
        channel: Bidi<A, A2, B, B2, Io, Names>,
        inputs: &[Flow<A, B>],
    ) -> (Vec<Flow<A2, B2>>, Names)
    where
        A: Value,
        A2: Value,
        B: Value,
        B2: Value,
    {
        let mut inputs = inputs.iter().cloned();
        let mut outputs = Vec::new();
        let mut channel = channel;
        loop {
            channel = match channel {
                Channel::Emit(out, next, _) => {
                    outputs.push(out);
                    Rc::unwrap_or_clone(next)
                }
                Channel::Await(resume, cell) => match inputs.next() {
                    Some(input) => resume(input),
                    None => return (outputs, cell.into_effect().run()),
                },
                Channel::EffectStep(effect, _) => effect.run(),
                Channel::DeferStep(thunk) => thunk(),
                Channel::Done(result) => return (outputs, result),
            }
        }
    }

    fn add(name: &'static str, n: i64) -> Downstream<i64, i64, i64, Io, Names> {
        Downstream::lift(pipe::repeat(Effectable::ready(vec![name]), move |x: i64| x + n))
    }

    fn scale(name: &'static str, n: i64) -> Upstream<i64, i64, i64, Io, Names> {
        Upstream::lift(pipe::repeat(Effectable::ready(vec![name]), move |x: i64| x * n))
    }

    fn traffic() -> impl Strategy<Value = Vec<Flow<i64, i64>>> {
        prop::collection::vec(
            prop_oneof![(-50i64..50).prop_map(Flow::Down), (-50i64..50).prop_map(Flow::Up)],
            0..10,
        )
    }

    #[test]
    fn test_monoid_laws_for_strings_and_pairs() {
        assert_eq!(String::from("ab").combine(String::from("cd")), "abcd");
        let pair = (vec![1], String::from("x")).combine((vec![2], String::from("y")));
        assert_eq!(pair, (vec![1, 2], String::from("xy")));
        assert_eq!(<(Vec<u8>, ())>::empty(), (Vec::new(), ()));
    }

    #[test]
    fn test_downstream_compose_merges_results_in_order() {
        let composed = add("first", 1).compose(add("second", 10));
        let (outputs, names) = observe(composed.into_channel(), &[Flow::Down(5)]);
        assert_eq!(outputs, vec![Flow::Down(16)]);
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_upstream_compose_runs_self_first() {
        let composed = scale("first", 2).compose(Upstream::lift(pipe::repeat(
            Effectable::ready(vec!["second"]),
            |x: i64| x + 1,
        )));
        let (outputs, names) = observe(composed.into_channel(), &[Flow::Up(5)]);
        assert_eq!(outputs, vec![Flow::Up(11)]);
        assert_eq!(names, vec!["first", "second"]);
    }

    proptest! {
        #[test]
        fn test_downstream_identity_laws(inputs in traffic(), n in -20i64..20) {
            let plain = observe(add("f", n).into_channel(), &inputs);
            let left = observe(Downstream::identity().compose(add("f", n)).into_channel(), &inputs);
            let right = add("f", n).compose(Downstream::identity());
            let right = observe(right.into_channel(), &inputs);
            prop_assert_eq!(&left, &plain);
            prop_assert_eq!(&right, &plain);
        }

        #[test]
        fn test_downstream_associativity(
            inputs in traffic(),
            a in -9i64..9,
            b in -9i64..9,
            c in -9i64..9,
        ) {
            let left = add("a", a).compose(add("b", b)).compose(add("c", c));
            let right = add("a", a).compose(add("b", b).compose(add("c", c)));
            prop_assert_eq!(
                observe(left.into_channel(), &inputs),
                observe(right.into_channel(), &inputs)
            );
        }

        #[test]
        fn test_upstream_identity_laws(inputs in traffic(), n in -20i64..20) {
            let plain = observe(scale("g", n).into_channel(), &inputs);
            let left = observe(Upstream::identity().compose(scale("g", n)).into_channel(), &inputs);
            let right = scale("g", n).compose(Upstream::identity());
            let right = observe(right.into_channel(), &inputs);
            prop_assert_eq!(&left, &plain);
            prop_assert_eq!(&right, &plain);
        }

        #[test]
        fn test_upstream_associativity(
            inputs in traffic(),
            a in -9i64..9,
            b in -9i64..9,
            c in -9i64..9,
        ) {
            let left = scale("a", a).compose(scale("b", b)).compose(scale("c", c));
            let right = scale("a", a).compose(scale("b", b).compose(scale("c", c)));
            prop_assert_eq!(
                observe(left.into_channel(), &inputs),
                observe(right.into_channel(), &inputs)
            );
        }
    }
}
