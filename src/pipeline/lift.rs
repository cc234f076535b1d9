//! Presence gating over optional inputs.

/// A fixed-size group of optional values that can be unwrapped together.
///
/// Implemented for `()`, tuples of one to six `Option`s (each slot keeps its
/// own type) and `Vec<Option<T>>` for groups whose size is only known at
/// run time.
pub trait AllDefined {
    /// The unwrapped values, in the same order.
    type Values;

    /// `Some` with every value when all are present, `None` on the first gap.
    fn all_defined(self) -> Option<Self::Values>;
}

impl AllDefined for () {
    type Values = ();

    fn all_defined(self) -> Option<Self::Values> {
        Some(())
    }
}

macro_rules! impl_all_defined {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty),+> AllDefined for ($(Option<$ty>,)+) {
            type Values = ($($ty,)+);

            fn all_defined(self) -> Option<Self::Values> {
                let ($($var,)+) = self;
                Some(($($var?,)+))
            }
        }
    };
}

impl_all_defined!(A a);
impl_all_defined!(A a, B b);
impl_all_defined!(A a, B b, C c);
impl_all_defined!(A a, B b, C c, D d);
impl_all_defined!(A a, B b, C c, D d, E e);
impl_all_defined!(A a, B b, C c, D d, E e, F f);

impl<T> AllDefined for Vec<Option<T>> {
    type Values = Vec<T>;

    fn all_defined(self) -> Option<Self::Values> {
        self.into_iter().collect()
    }
}

/// Run `f` on the value if it is present.
///
/// The transform's own return value is not inspected; it may itself be a
/// `Result` or another `Option`.
pub fn when_defined<T, R, F>(value: Option<T>, f: F) -> Option<R>
where
    F: FnOnce(T) -> R,
{
    match value {
        Some(v) => Some(f(v)),
        None => None,
    }
}

/// Run `f` on every value of the group if all of them are present.
///
/// An empty group is vacuously complete, so `f` runs with `()` or an empty
/// `Vec`.
pub fn when_defined_all<D, R, F>(depends: D, f: F) -> Option<R>
where
    D: AllDefined,
    F: FnOnce(D::Values) -> R,
{
    depends.all_defined().map(f)
}
