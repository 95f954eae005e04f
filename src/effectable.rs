//! The deferred-effect cell.
//!
//! An [`Effectable`] describes how to obtain a value: it is either already
//! [`Ready`](Effectable::Ready), one effect step away ([`Pending`](Effectable::Pending)),
//! or [`Deferred`](Effectable::Deferred) until someone asks for it. Channels keep one in
//! every suspended node to say what they produce if a partner cuts them short.
//!
//! Combinators never force their operands: they build new `Deferred` links, and
//! [`resolve`](Effectable::resolve) walks those links in a loop. Finalizers attached
//! with [`after`](Effectable::after) are kept in one flat list in front of the
//! original cell and run through [`Effect::iterate`], so a cell carrying any number
//! of them builds, resolves and drops without recursing.

use std::{fmt, rc::Rc};

use either::Either;

use crate::effect::{Effect, Value};

pub enum Effectable<E: Effect, R> {
    Ready(R),
    Pending(E::Of<R>),
    Deferred(Rc<dyn Fn() -> Effectable<E, R>>),
    /// Run the finalizers, newest first, then produce the inner cell's value.
    After(Finalizers<E>, Rc<Effectable<E, R>>),
}

/// Cleanup effects queued in front of a cell, newest first.
pub struct Finalizers<E: Effect> {
    newest: Option<Rc<Link<E>>>,
}

struct Link<E: Effect> {
    effect: E::Of<()>,
    older: Option<Rc<Link<E>>>,
}

impl<E: Effect> Drop for Link<E> {
    fn drop(&mut self) {
        let mut older = self.older.take();
        while let Some(link) = older {
            older = match Rc::try_unwrap(link) {
                Ok(mut link) => link.older.take(),
                Err(_) => None,
            };
        }
    }
}

impl<E: Effect> Finalizers<E> {
    fn push(self, effect: E::Of<()>) -> Self {
        let link = Link {
            effect,
            older: self.newest,
        };
        Finalizers {
            newest: Some(Rc::new(link)),
        }
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut link = self.newest.as_deref();
        while let Some(current) = link {
            count += 1;
            link = current.older.as_deref();
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.newest.is_none()
    }

    /// Run every finalizer, then `cell`, as one computation.
    fn before<R: Value>(&self, cell: Rc<Effectable<E, R>>) -> E::Of<R> {
        E::iterate(self.newest.clone(), move |cursor: Option<Rc<Link<E>>>| match cursor {
            Some(link) => {
                let older = link.older.clone();
                E::map(link.effect.clone(), move |()| Either::Left(older.clone()))
            }
            None => E::map(cell.as_ref().clone().into_effect(), Either::Right),
        })
    }
}

impl<E: Effect> Clone for Finalizers<E> {
    fn clone(&self) -> Self {
        Finalizers {
            newest: self.newest.clone(),
        }
    }
}

impl<E: Effect, R: Value> Effectable<E, R> {
    /// A value that is already known.
    ///
    /// ```
    /// use twoway::{Effectable, Io};
    ///
    /// let cell = Effectable::<Io, _>::ready(3);
    /// assert_eq!(cell.resolve().left(), Some(3));
    /// ```
    pub fn ready(value: R) -> Self {
        Effectable::Ready(value)
    }

    /// A value that takes one effect to produce.
    pub fn pending(effect: E::Of<R>) -> Self {
        Effectable::Pending(effect)
    }

    /// Postpone building the cell until it is resolved.
    pub fn defer<F>(thunk: F) -> Self
    where
        F: Fn() -> Effectable<E, R> + 'static,
    {
        Effectable::Deferred(Rc::new(thunk))
    }

    /// Follow `Deferred` links until the cell is ready (`Left`) or needs one effect (`Right`).
    pub fn resolve(self) -> Either<R, E::Of<R>> {
        let mut cell = self;
        loop {
            match cell {
                Effectable::Ready(value) => return Either::Left(value),
                Effectable::Pending(effect) => return Either::Right(effect),
                Effectable::Deferred(thunk) => cell = thunk(),
                Effectable::After(finalizers, inner) => {
                    return Either::Right(finalizers.before(inner));
                }
            }
        }
    }

    /// Express the cell as a single computation in the effect context.
    pub fn into_effect(self) -> E::Of<R> {
        match self.resolve() {
            Either::Left(value) => E::pure(value),
            Either::Right(effect) => effect,
        }
    }

    /// Transform the eventual value without forcing the cell.
    pub fn map<R2: Value, F>(self, f: F) -> Effectable<E, R2>
    where
        F: Fn(R) -> R2 + 'static,
    {
        let f = Rc::new(f);
        Effectable::defer(move || match self.clone().resolve() {
            Either::Left(value) => Effectable::Ready(f(value)),
            Either::Right(effect) => {
                let f = Rc::clone(&f);
                Effectable::Pending(E::map(effect, move |value| f(value)))
            }
        })
    }

    /// Feed the eventual value into `f`, staying ready when both sides are ready.
    pub fn and_then<R2: Value, F>(self, f: F) -> Effectable<E, R2>
    where
        F: Fn(R) -> Effectable<E, R2> + 'static,
    {
        let f = Rc::new(f);
        Effectable::defer(move || match self.clone().resolve() {
            Either::Left(value) => f(value),
            Either::Right(effect) => {
                let f = Rc::clone(&f);
                Effectable::Pending(E::and_then(effect, move |value| f(value).into_effect()))
            }
        })
    }

    /// Pair this cell with another; neither operand is forced until the pair is.
    pub fn zip<R2: Value>(self, other: Effectable<E, R2>) -> Effectable<E, (R, R2)> {
        Effectable::defer(move || match (self.clone().resolve(), other.clone().resolve()) {
            (Either::Left(left), Either::Left(right)) => Effectable::Ready((left, right)),
            (left, right) => Effectable::Pending(E::zip(lift::<E, R>(left), lift::<E, R2>(right))),
        })
    }

    /// Run `effect` first, then produce this cell's value.
    ///
    /// Repeated calls extend a single list of finalizers rather than nesting cells.
    pub fn after(self, effect: E::Of<()>) -> Self {
        match self {
            Effectable::After(finalizers, cell) => Effectable::After(finalizers.push(effect), cell),
            cell => {
                let finalizers = Finalizers { newest: None }.push(effect);
                Effectable::After(finalizers, Rc::new(cell))
            }
        }
    }
}

fn lift<E: Effect, R: Value>(resolved: Either<R, E::Of<R>>) -> E::Of<R> {
    match resolved {
        Either::Left(value) => E::pure(value),
        Either::Right(effect) => effect,
    }
}

impl<E: Effect, R: Clone> Clone for Effectable<E, R> {
    fn clone(&self) -> Self {
        match self {
            Effectable::Ready(value) => Effectable::Ready(value.clone()),
            Effectable::Pending(effect) => Effectable::Pending(effect.clone()),
            Effectable::Deferred(thunk) => Effectable::Deferred(Rc::clone(thunk)),
            Effectable::After(finalizers, cell) => {
                Effectable::After(finalizers.clone(), Rc::clone(cell))
            }
        }
    }
}

impl<E: Effect, R: fmt::Debug> fmt::Debug for Effectable<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effectable::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Effectable::Pending(_) => f.write_str("Pending(..)"),
            Effectable::Deferred(_) => f.write_str("Deferred(..)"),
            Effectable::After(finalizers, cell) => f
                .debug_struct("After")
                .field("finalizers", &finalizers.len())
                .field("cell", cell)
                .finish(),
        }
    }
}
