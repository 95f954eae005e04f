//! Running two channels against each other.
//!
//! The *upper* and *lower* channel share a seam. Each output is routed either
//! across the seam to the partner or out through the composite's boundary, and each
//! input arriving at the boundary is routed to one of the two. The reduction rules,
//! tried in order:
//!
//! 1. A boundary-bound emission is relayed immediately; the partner keeps its state.
//! 2. An effect on either side becomes an effect of the composite.
//! 3. A deferred side is forced inside a new deferred composite.
//! 4. Once a side is done, the other is terminated through its termination cell.
//! 5. A seam-bound emission is handed to a partner that is awaiting.
//!
//! When both sides await, the composite awaits and routes the next boundary input.
//! Both sides emitting into the seam at once is a construction error.

use std::rc::Rc;

use either::Either;

use crate::{
    build,
    channel::Channel,
    effect::{Effect, Value},
    effectable::Effectable,
};

/// Routing for a stack.
///
/// `CI`/`CO` are the composite's input and output, `UI`/`UO` the upper channel's,
/// `LI`/`LO` the lower channel's. Each router returns `Left` for the boundary (or,
/// for `inbound`, the upper channel) and `Right` for the partner.
pub struct Wiring<CI, CO, UI, UO, LI, LO> {
    pub inbound: fn(CI) -> Either<UI, LI>,
    pub upper: fn(UO) -> Either<CO, LI>,
    pub lower: fn(LO) -> Either<CO, UI>,
}

impl<CI, CO, UI, UO, LI, LO> Clone for Wiring<CI, CO, UI, UO, LI, LO> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<CI, CO, UI, UO, LI, LO> Copy for Wiring<CI, CO, UI, UO, LI, LO> {}

/// Stack `upper` on `lower`, finishing with both results.
///
/// # Panics
///
/// Panics when both channels emit into the seam with neither awaiting.
pub fn stack_with<CI, CO, UI, UO, LI, LO, E, R1, R2>(
    upper: Channel<UI, UO, E, R1>,
    lower: Channel<LI, LO, E, R2>,
    wiring: Wiring<CI, CO, UI, UO, LI, LO>,
) -> Channel<CI, CO, E, (R1, R2)>
where
    CI: 'static,
    CO: Value,
    UI: Value,
    UO: Value,
    LI: Value,
    LO: Value,
    E: Effect,
    R1: Value,
    R2: Value,
{
    if let Channel::Emit(out, next, cell) = &upper {
        if let Either::Left(boundary) = (wiring.upper)(out.clone()) {
            return relay_upper(boundary, Rc::clone(next), cell.clone(), lower, wiring);
        }
    }
    if let Channel::Emit(out, next, cell) = &lower {
        if let Either::Left(boundary) = (wiring.lower)(out.clone()) {
            return relay_lower(upper, boundary, Rc::clone(next), cell.clone(), wiring);
        }
    }

    if let Channel::EffectStep(effect, cell) = &upper {
        let on_terminate = cell.clone().zip(lower.termination_value());
        let effect = E::map(effect.clone(), move |upper| stack_with(upper, lower.clone(), wiring));
        return Channel::EffectStep(effect, on_terminate);
    }
    if let Channel::EffectStep(effect, cell) = &lower {
        let on_terminate = upper.termination_value().zip(cell.clone());
        let effect = E::map(effect.clone(), move |lower| stack_with(upper.clone(), lower, wiring));
        return Channel::EffectStep(effect, on_terminate);
    }

    if let Channel::DeferStep(thunk) = &upper {
        let thunk = Rc::clone(thunk);
        return build::defer(move || stack_with(thunk(), lower.clone(), wiring));
    }
    if let Channel::DeferStep(thunk) = &lower {
        let thunk = Rc::clone(thunk);
        return build::defer(move || stack_with(upper.clone(), thunk(), wiring));
    }

    match (upper, lower) {
        (Channel::Done(r1), Channel::Done(r2)) => Channel::Done((r1, r2)),
        (Channel::Done(r1), lower) => {
            build::finish(Effectable::ready(r1).zip(lower.termination_value()))
        }
        (upper, Channel::Done(r2)) => {
            build::finish(upper.termination_value().zip(Effectable::ready(r2)))
        }
        (Channel::Emit(out, next, cell), Channel::Await(resume, lower_cell)) => {
            match (wiring.upper)(out) {
                Either::Right(offered) => build::defer(move || {
                    stack_with(next.as_ref().clone(), resume(offered.clone()), wiring)
                }),
                Either::Left(boundary) => {
                    relay_upper(boundary, next, cell, Channel::Await(resume, lower_cell), wiring)
                }
            }
        }
        (Channel::Await(resume, upper_cell), Channel::Emit(out, next, cell)) => {
            match (wiring.lower)(out) {
                Either::Right(offered) => build::defer(move || {
                    stack_with(resume(offered.clone()), next.as_ref().clone(), wiring)
                }),
                Either::Left(boundary) => {
                    relay_lower(Channel::Await(resume, upper_cell), boundary, next, cell, wiring)
                }
            }
        }
        (Channel::Await(upper_resume, upper_cell), Channel::Await(lower_resume, lower_cell)) => {
            let on_terminate = upper_cell.clone().zip(lower_cell.clone());
            build::await_raw(on_terminate, move |input| match (wiring.inbound)(input) {
                Either::Left(input) => stack_with(
                    upper_resume(input),
                    Channel::Await(Rc::clone(&lower_resume), lower_cell.clone()),
                    wiring,
                ),
                Either::Right(input) => stack_with(
                    Channel::Await(Rc::clone(&upper_resume), upper_cell.clone()),
                    lower_resume(input),
                    wiring,
                ),
            })
        }
        (upper, lower) => {
            tracing::error!(?upper, ?lower, "both sides of a stack emit into the seam");
            panic!("malformed stack: {upper:?} and {lower:?} both emit into the seam");
        }
    }
}

fn relay_upper<CI, CO, UI, UO, LI, LO, E, R1, R2>(
    boundary: CO,
    next: Rc<Channel<UI, UO, E, R1>>,
    cell: Effectable<E, R1>,
    lower: Channel<LI, LO, E, R2>,
    wiring: Wiring<CI, CO, UI, UO, LI, LO>,
) -> Channel<CI, CO, E, (R1, R2)>
where
    CI: 'static,
    CO: Value,
    UI: Value,
    UO: Value,
    LI: Value,
    LO: Value,
    E: Effect,
    R1: Value,
    R2: Value,
{
    let on_terminate = cell.zip(lower.termination_value());
    let rest = build::defer(move || stack_with(next.as_ref().clone(), lower.clone(), wiring));
    Channel::Emit(boundary, Rc::new(rest), on_terminate)
}

fn relay_lower<CI, CO, UI, UO, LI, LO, E, R1, R2>(
    upper: Channel<UI, UO, E, R1>,
    boundary: CO,
    next: Rc<Channel<LI, LO, E, R2>>,
    cell: Effectable<E, R2>,
    wiring: Wiring<CI, CO, UI, UO, LI, LO>,
) -> Channel<CI, CO, E, (R1, R2)>
where
    CI: 'static,
    CO: Value,
    UI: Value,
    UO: Value,
    LI: Value,
    LO: Value,
    E: Effect,
    R1: Value,
    R2: Value,
{
    let on_terminate = upper.termination_value().zip(cell);
    let rest = build::defer(move || stack_with(upper.clone(), next.as_ref().clone(), wiring));
    Channel::Emit(boundary, Rc::new(rest), on_terminate)
}
