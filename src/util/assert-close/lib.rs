/* ************************************************************************ **
** This file is part of mlwf, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of mlwf is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

use std::fmt;
use ndarray::{ArrayBase, Data, Dimension};
use num_complex::Complex64;

pub const DEFAULT_NONZERO_TOL: f64 = 1e-9;

#[macro_export]
macro_rules! assert_close {
    ($($t:tt)*) => {$crate::assert_close_impl!{@parsing [$($t)*] [[@rel $crate::DEFAULT_NONZERO_TOL] [@abs 0.0]]}};
}

#[macro_export]
macro_rules! debug_assert_close {
    ($($t:tt)*) => {{
        #[cfg(debug_assertions)] {
            $crate::assert_close!{$($t)*}
        }
    }};
}

#[macro_export]
#[doc(hidden)]
macro_rules! assert_close_impl {
    (@parsing [rel=$tol:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        $crate::assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@rel $tol]]);
    };
    (@parsing [abs=$tol:expr, $($rest:tt)*] [$($assignment:tt)*]) => {
        $crate::assert_close_impl!(@parsing [$($rest)*] [$($assignment)* [@abs $tol]]);
    };
    (@parsing [$a:expr, $b:expr $(,)*] $assignments:tt) => {
        $crate::assert_close_impl!(@expand $assignments [@comp $a, $b] [@fmt "not nearly equal!"])
    };
    (@parsing [$a:expr, $b:expr, $($fmt:tt)+] $assignments:tt) => {
        $crate::assert_close_impl!(@expand $assignments [@comp $a, $b] [@fmt $($fmt)+])
    };
    (@expand [$($assignment:tt)*] [@comp $a:expr, $b:expr] [@fmt $($fmt:tt)+] ) => {
        #[allow(unused_mut)]
        #[allow(unused_assignments)]
        {
            let a = $a;
            let b = $b;

            let mut abs;
            let mut rel;
            $(
                $crate::assert_close_impl!{@stmt::assign [abs, rel] $assignment}
            )*

            if let Err(e) = $crate::CheckClose::check_close(&a, &b, $crate::Tolerances { abs, rel }) {
                panic!(
                "{} (tolerances: rel={}, abs={})\n left: {:?}\nright: {:?}\n{}",
                 format!($($fmt)*), rel, abs, a, b, e);
            }
        }
    };
    (@stmt::assign [$abs:ident, $rel:ident] [@abs $tol:expr]) => { $abs = $tol; };
    (@stmt::assign [$abs:ident, $rel:ident] [@rel $tol:expr]) => { $rel = $tol; };
}

/// Python's `math.isclose`, applied to the distance between two points of a normed space.
///
/// `norm_a` and `norm_b` are the magnitudes of the operands, and `dist` is the magnitude
/// of their difference.
#[doc(hidden)]
#[inline]
pub fn __is_close_normed(norm_a: f64, norm_b: f64, dist: f64, Tolerances { abs, rel }: Tolerances) -> bool {
    assert!(rel >= 0.0);
    assert!(abs >= 0.0);

    dist < abs.max(rel * norm_a).max(rel * norm_b)
}

#[doc(hidden)]
#[inline]
pub fn __is_close(a: f64, b: f64, tol: Tolerances) -> bool {
    // Implementation from Python 3.5.
    // https://hg.python.org/cpython/file/tip/Modules/mathmodule.c#l1993

    // catch infinities of same sign
    if a == b { return true; }

    // catch infinities of opposite sign, avoiding infinite relative tolerance
    if a.is_infinite() || b.is_infinite() { return false; }

    // case for general values and NaN.
    __is_close_normed(a.abs(), b.abs(), (a - b).abs(), tol)
}

#[derive(Debug, Copy, Clone)]
pub struct Tolerances<T = f64> {
    pub abs: T,
    pub rel: T
}

#[derive(Debug, thiserror::Error)]
pub enum CheckCloseError<T: fmt::Debug = f64> {
    #[error("failed at:\n  left: {left:?}\n right: {right:?}\n   tol: {tol:?}")]
    Values {
        left: T,
        right: T,
        tol: Tolerances,
    },
    #[error("shape mismatch: {left:?} vs {right:?}")]
    Shape {
        left: Vec<usize>,
        right: Vec<usize>,
    },
}

pub trait CheckClose<Rhs: ?Sized = Self>: {
    type Scalar: fmt::Debug;

    /// Test that all values of self and other are close.
    fn check_close(&self, other: &Rhs, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>;
}

impl CheckClose for f64 {
    type Scalar = f64;

    #[inline]
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    {
        if __is_close(*self, *other, tol) {
            Ok(())
        } else {
            Err(CheckCloseError::Values {
                left: *self,
                right: *other,
                tol,
            })
        }
    }
}

impl CheckClose for Complex64 {
    type Scalar = Complex64;

    #[inline]
    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    {
        if self == other || __is_close_normed(self.norm(), other.norm(), (self - other).norm(), tol) {
            Ok(())
        } else {
            Err(CheckCloseError::Values {
                left: *self,
                right: *other,
                tol,
            })
        }
    }
}

impl<'a, T: ?Sized + CheckClose> CheckClose for &'a T {
    type Scalar = T::Scalar;

    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    { CheckClose::check_close(*self, *other, tol) }
}

impl<T: CheckClose> CheckClose for [T] {
    type Scalar = T::Scalar;

    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    {
        if self.len() != other.len() {
            return Err(CheckCloseError::Shape { left: vec![self.len()], right: vec![other.len()] });
        }
        self.iter().zip(other)
            .map(|(a, b)| a.check_close(b, tol))
            .collect()
    }
}

impl<T: CheckClose> CheckClose for Vec<T> {
    type Scalar = T::Scalar;

    fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    { (&self[..]).check_close(&other[..], tol) }
}

impl<T: CheckClose> CheckClose<[T]> for Vec<T> {
    type Scalar = T::Scalar;

    fn check_close(&self, other: &[T], tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    { (&self[..]).check_close(&other[..], tol) }
}

impl<T: CheckClose> CheckClose<Vec<T>> for [T] {
    type Scalar = T::Scalar;

    fn check_close(&self, other: &Vec<T>, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    { (&self[..]).check_close(&other[..], tol) }
}

impl<A, S, S2, D> CheckClose<ArrayBase<S2, D>> for ArrayBase<S, D>
where
    A: CheckClose,
    S: Data<Elem = A>,
    S2: Data<Elem = A>,
    D: Dimension,
{
    type Scalar = A::Scalar;

    fn check_close(&self, other: &ArrayBase<S2, D>, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
    {
        if self.shape() != other.shape() {
            return Err(CheckCloseError::Shape {
                left: self.shape().to_vec(),
                right: other.shape().to_vec(),
            });
        }
        self.iter().zip(other.iter())
            .map(|(a, b)| a.check_close(b, tol))
            .collect()
    }
}

macro_rules! gen_array_impls {
    ($($n:tt)*) => {
        $(
        impl<T: CheckClose> CheckClose for [T; $n] {
            type Scalar = T::Scalar;

            fn check_close(&self, other: &Self, tol: Tolerances) -> Result<(), CheckCloseError<Self::Scalar>>
            { (&self[..]).check_close(&other[..], tol) }
        }
        )*
    };
}

gen_array_impls! {
     0  1  2  3  4  5  6  7  8  9
    10 11 12 13 14 15 16
}

#[cfg(test)]
#[deny(unused)]
mod tests {
    use num_complex::Complex64;
    use ndarray::{arr1, arr2};

    #[test]
    fn macro_output_can_compile() {
        assert_close!(1.0, 1.0);
        assert_close!(abs=1e-8, 1.0, 1.0);
        assert_close!(rel=1e-8, abs=1e-8, 1.0, 1.0);
        assert_close!(1.0, 1.0,);
        assert_close!(abs=1e-8, 1.0, 1.0,);
        assert_close!(rel=1e-8, abs=1e-8, 1.0, 1.0,);
    }

    #[test]
    fn bad_parse_regression() {
        #[derive(Debug)] struct S;
        impl S { fn x(self) -> S { self } }
        impl crate::CheckClose for S {
            type Scalar = f64;
            fn check_close(&self, _: &S, _: crate::Tolerances) -> Result<(), crate::CheckCloseError<Self::Scalar>> { Ok(()) }
        }
        assert_close!(
            abs=1e-10,
            S.x().x().x(),
            S.x().x().x(),
        );
        debug_assert_close!(
            abs=1e-10,
            S.x().x().x(),
            S.x().x().x(),
        );
        assert_close!(
            abs=1e-10,
            S.x().x().x(),
            S.x().x().x(),
            "{}", "hello",
        );
    }

    #[test]
    fn complex_and_arrays() {
        let a = Complex64::new(1.0, -2.0);
        assert_close!(abs=1e-12, a, a + Complex64::new(1e-14, 1e-14));
        assert_close!(
            abs=1e-12,
            arr2(&[[a, a], [a, a]]),
            arr2(&[[a, a], [a, a]]),
        );
        assert_close!(abs=1e-12, arr1(&[1.0, 2.0]), arr1(&[1.0, 2.0 + 1e-14]));
    }

    #[test]
    #[should_panic]
    fn complex_not_close() {
        assert_close!(abs=1e-8, rel=0.0, Complex64::new(1.0, 0.0), Complex64::new(1.0, 1e-6));
    }

    #[test]
    #[should_panic]
    fn array_shape_mismatch() {
        assert_close!(arr1(&[1.0, 2.0]), arr1(&[1.0]));
    }

    #[test]
    #[should_panic]
    fn not_close() {
        assert_close!(abs=0.0, rel=0.0, 1.0, 1.1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic)]
    fn debug_not_close() {
        debug_assert_close!(abs=0.0, rel=0.0, 1.0, 1.1);
    }
}
