//! Failure short-circuiting over fallible inputs.

use std::future::Future;

use futures_util::future::{ready, Either, Ready};

/// A fixed-size group of results that can be unwrapped together.
///
/// Every slot shares the error type `E`. Implemented for `()`, tuples of one
/// to six `Result`s and `Vec<Result<T, E>>`.
pub trait AllOk<E> {
    /// The unwrapped success values, in the same order.
    type Values;

    /// `Ok` with every value when all succeeded, otherwise the first error
    /// found scanning left to right.
    fn all_ok(self) -> Result<Self::Values, E>;
}

impl<E> AllOk<E> for () {
    type Values = ();

    fn all_ok(self) -> Result<Self::Values, E> {
        Ok(())
    }
}

macro_rules! impl_all_ok {
    ($($ty:ident $var:ident),+) => {
        impl<X, $($ty),+> AllOk<X> for ($(Result<$ty, X>,)+) {
            type Values = ($($ty,)+);

            fn all_ok(self) -> Result<Self::Values, X> {
                let ($($var,)+) = self;
                Ok(($($var?,)+))
            }
        }
    };
}

impl_all_ok!(A a);
impl_all_ok!(A a, B b);
impl_all_ok!(A a, B b, C c);
impl_all_ok!(A a, B b, C c, D d);
impl_all_ok!(A a, B b, C c, D d, E e);
impl_all_ok!(A a, B b, C c, D d, E e, F f);

impl<T, E> AllOk<E> for Vec<Result<T, E>> {
    type Values = Vec<T>;

    fn all_ok(self) -> Result<Self::Values, E> {
        self.into_iter().collect()
    }
}

/// Run `f` on the success value, or hand the failure straight back.
///
/// The transform's return value is passed through as-is, including when it
/// is itself a failure.
pub fn when_not_error<T, E, R, F>(value: Result<T, E>, f: F) -> Result<R, E>
where
    F: FnOnce(T) -> Result<R, E>,
{
    match value {
        Ok(v) => f(v),
        Err(e) => Err(e),
    }
}

/// Run `f` on every success value of the group, or return the first failure.
pub fn when_not_error_all<D, E, R, F>(depends: D, f: F) -> Result<R, E>
where
    D: AllOk<E>,
    F: FnOnce(D::Values) -> Result<R, E>,
{
    match depends.all_ok() {
        Ok(values) => f(values),
        Err(e) => Err(e),
    }
}

/// Either an already settled failure or the transform's pending future.
pub type Deferred<R, E, Fut> = Either<Ready<Result<R, E>>, Fut>;

/// Asynchronous form of [`when_not_error`].
///
/// Returns immediately without polling anything; the caller decides when to
/// `.await` the result.
pub fn when_not_error_async<T, E, R, F, Fut>(value: Result<T, E>, f: F) -> Deferred<R, E, Fut>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    match value {
        Ok(v) => Either::Right(f(v)),
        Err(e) => Either::Left(ready(Err(e))),
    }
}

/// Asynchronous form of [`when_not_error_all`].
pub fn when_not_error_all_async<D, E, R, F, Fut>(depends: D, f: F) -> Deferred<R, E, Fut>
where
    D: AllOk<E>,
    F: FnOnce(D::Values) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    match depends.all_ok() {
        Ok(values) => Either::Right(f(values)),
        Err(e) => Either::Left(ready(Err(e))),
    }
}

/// Borrow a result so it can feed several pipeline steps.
///
/// The success value is borrowed, the failure is cloned.
pub trait Share<T, E> {
    fn share(&self) -> Result<&T, E>;
}

impl<T, E: Clone> Share<T, E> for Result<T, E> {
    fn share(&self) -> Result<&T, E> {
        self.as_ref().map_err(Clone::clone)
    }
}
