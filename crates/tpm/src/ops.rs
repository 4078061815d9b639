//! Arithmetic on tables.
//!
//! Every arithmetic result is again a [`Tpm`], so chains like
//! `1.0 - &tpm * 0.5` never fall back to a bare array. Operands broadcast
//! against each other the way ndarray arrays do.
//!
//! The operator impls panic when shapes cannot be broadcast together, as
//! ndarray's own operators do. The `try_*` methods and the element-wise
//! comparisons report [`TpmError::ShapeMismatch`] instead.

use std::ops::{Add, Div, Mul, Neg, Sub};

use ndarray::{arr0, ArrayD, CowArray, IxDyn, Zip};
use phi_core::Shape;

use crate::error::TpmError;
use crate::tpm::Tpm;

/// Anything that can stand on the right-hand side of a table operation.
pub trait Operand {
    /// The operand as an n-dimensional array (borrowed where possible).
    fn operand(&self) -> CowArray<'_, f64, IxDyn>;
}

impl Operand for Tpm {
    fn operand(&self) -> CowArray<'_, f64, IxDyn> {
        CowArray::from(self.array().view())
    }
}

impl Operand for ArrayD<f64> {
    fn operand(&self) -> CowArray<'_, f64, IxDyn> {
        CowArray::from(self.view())
    }
}

impl Operand for f64 {
    fn operand(&self) -> CowArray<'_, f64, IxDyn> {
        CowArray::from(arr0(*self).into_dyn())
    }
}

/// The shape both operands broadcast to, if any.
fn co_broadcast(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let rank = a.len().max(b.len());
    let padded = |s: &[usize], i: usize| {
        let offset = rank - s.len();
        if i < offset {
            1
        } else {
            s[i - offset]
        }
    };
    (0..rank)
        .map(|i| match (padded(a, i), padded(b, i)) {
            (x, y) if x == y => Some(x),
            (1, y) => Some(y),
            (x, 1) => Some(x),
            _ => None,
        })
        .collect()
}

impl Tpm {
    fn zip_with<O, F>(&self, other: &O, f: F) -> Result<Tpm, TpmError>
    where
        O: Operand + ?Sized,
        F: Fn(f64, f64) -> f64,
    {
        let lhs = self.array().view();
        let rhs = other.operand();
        let mismatch = || TpmError::ShapeMismatch {
            expected: Shape::from(lhs.shape()),
            got: Shape::from(rhs.shape()),
        };
        let shape = co_broadcast(lhs.shape(), rhs.shape()).ok_or_else(mismatch)?;
        let l = lhs.broadcast(IxDyn(&shape)).ok_or_else(mismatch)?;
        let r = rhs.broadcast(IxDyn(&shape)).ok_or_else(mismatch)?;
        Ok(Tpm::new(Zip::from(&l).and(&r).map_collect(|&x, &y| f(x, y))))
    }

    pub fn try_add<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| x + y)
    }

    pub fn try_sub<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| x - y)
    }

    pub fn try_mul<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| x * y)
    }

    pub fn try_div<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| x / y)
    }

    /// Element-wise `self < other`, as a table of 0s and 1s.
    pub fn lt<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| indicator(x < y))
    }

    /// Element-wise `self <= other`, as a table of 0s and 1s.
    pub fn le<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| indicator(x <= y))
    }

    /// Element-wise `self > other`, as a table of 0s and 1s.
    pub fn gt<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| indicator(x > y))
    }

    /// Element-wise `self >= other`, as a table of 0s and 1s.
    pub fn ge<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| indicator(x >= y))
    }

    /// Element-wise `self == other`, as a table of 0s and 1s.
    pub fn eq_elementwise<O: Operand + ?Sized>(&self, other: &O) -> Result<Tpm, TpmError> {
        self.zip_with(other, |x, y| indicator(x == y))
    }

    /// Element-wise absolute value.
    pub fn abs(&self) -> Tpm {
        Tpm::new(self.array().mapv(f64::abs))
    }

    /// Whether every entry is within `tolerance` of the matching entry of `other`.
    pub fn all_close<O: Operand + ?Sized>(&self, other: &O, tolerance: f64) -> bool {
        self.zip_with(other, |x, y| indicator((x - y).abs() <= tolerance))
            .map(|close| close.array().iter().all(|&c| c == 1.0))
            .unwrap_or(false)
    }
}

fn indicator(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Tpm> for &Tpm {
            type Output = Tpm;
            fn $method(self, rhs: &Tpm) -> Tpm {
                Tpm::new(self.array() $op rhs.array())
            }
        }

        impl $trait<Tpm> for &Tpm {
            type Output = Tpm;
            fn $method(self, rhs: Tpm) -> Tpm {
                self $op &rhs
            }
        }

        impl $trait<&Tpm> for Tpm {
            type Output = Tpm;
            fn $method(self, rhs: &Tpm) -> Tpm {
                &self $op rhs
            }
        }

        impl $trait<Tpm> for Tpm {
            type Output = Tpm;
            fn $method(self, rhs: Tpm) -> Tpm {
                &self $op &rhs
            }
        }

        impl $trait<&ArrayD<f64>> for &Tpm {
            type Output = Tpm;
            fn $method(self, rhs: &ArrayD<f64>) -> Tpm {
                Tpm::new(self.array() $op rhs)
            }
        }

        impl $trait<ArrayD<f64>> for &Tpm {
            type Output = Tpm;
            fn $method(self, rhs: ArrayD<f64>) -> Tpm {
                self $op &rhs
            }
        }

        impl $trait<&ArrayD<f64>> for Tpm {
            type Output = Tpm;
            fn $method(self, rhs: &ArrayD<f64>) -> Tpm {
                &self $op rhs
            }
        }

        impl $trait<ArrayD<f64>> for Tpm {
            type Output = Tpm;
            fn $method(self, rhs: ArrayD<f64>) -> Tpm {
                &self $op &rhs
            }
        }

        impl $trait<&Tpm> for &ArrayD<f64> {
            type Output = Tpm;
            fn $method(self, rhs: &Tpm) -> Tpm {
                Tpm::new(self $op rhs.array())
            }
        }

        impl $trait<Tpm> for &ArrayD<f64> {
            type Output = Tpm;
            fn $method(self, rhs: Tpm) -> Tpm {
                self $op &rhs
            }
        }

        impl $trait<&Tpm> for ArrayD<f64> {
            type Output = Tpm;
            fn $method(self, rhs: &Tpm) -> Tpm {
                &self $op rhs
            }
        }

        impl $trait<Tpm> for ArrayD<f64> {
            type Output = Tpm;
            fn $method(self, rhs: Tpm) -> Tpm {
                &self $op &rhs
            }
        }

        impl $trait<f64> for &Tpm {
            type Output = Tpm;
            fn $method(self, rhs: f64) -> Tpm {
                Tpm::new(self.array() $op rhs)
            }
        }

        impl $trait<f64> for Tpm {
            type Output = Tpm;
            fn $method(self, rhs: f64) -> Tpm {
                &self $op rhs
            }
        }

        impl $trait<&Tpm> for f64 {
            type Output = Tpm;
            fn $method(self, rhs: &Tpm) -> Tpm {
                Tpm::new(self $op rhs.array())
            }
        }

        impl $trait<Tpm> for f64 {
            type Output = Tpm;
            fn $method(self, rhs: Tpm) -> Tpm {
                self $op &rhs
            }
        }
    };
}

impl_binary_op!(Add, add, +);
impl_binary_op!(Sub, sub, -);
impl_binary_op!(Mul, mul, *);
impl_binary_op!(Div, div, /);

impl Neg for &Tpm {
    type Output = Tpm;
    fn neg(self) -> Tpm {
        Tpm::new(-self.array())
    }
}

impl Neg for Tpm {
    type Output = Tpm;
    fn neg(self) -> Tpm {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn on_column() -> Tpm {
        Tpm::new(array![[0.1, 0.9], [0.5, 0.25]].into_dyn())
    }

    #[test]
    fn test_scalar_on_the_left() {
        let off = 1.0 - &on_column();
        assert!(off.all_close(&array![[0.9, 0.1], [0.5, 0.75]].into_dyn(), 1e-12));
    }

    #[test]
    fn test_array_on_either_side() {
        let tpm = on_column();
        let ones = ArrayD::<f64>::ones(IxDyn(&[2, 2]));

        let off: Tpm = &ones - &tpm;
        assert!(off.all_close(&array![[0.9, 0.1], [0.5, 0.75]].into_dyn(), 1e-12));

        let unchanged: Tpm = ones.clone() * tpm.clone();
        assert_eq!(unchanged, tpm);
        let halved: Tpm = tpm.clone() / (&ones * 2.0);
        assert!(halved.all_close(&array![[0.05, 0.45], [0.25, 0.125]].into_dyn(), 1e-12));
        let back: Tpm = &halved + halved.array().clone();
        assert!(back.all_close(&tpm, 1e-12));
    }

    #[test]
    fn test_results_stay_tables() {
        let tpm = on_column();
        let chained: Tpm = (&tpm * 2.0 - &tpm) / 1.0;
        assert_eq!(chained, tpm);
        assert_eq!(-(-&tpm), tpm);
        assert_eq!((-&tpm).abs(), tpm);
    }

    #[test]
    fn test_broadcasting_singleton_axes() {
        let row = Tpm::new(ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![1.0, 2.0]).unwrap());
        let col = Tpm::new(ArrayD::from_shape_vec(IxDyn(&[2, 1]), vec![10.0, 20.0]).unwrap());
        let sum = &row + &col;
        assert_eq!(sum.shape(), &[2, 2]);
        assert_eq!(sum.array(), &array![[11.0, 12.0], [21.0, 22.0]].into_dyn());
    }

    #[test]
    fn test_try_ops_report_mismatch() {
        let a = Tpm::new(ArrayD::zeros(IxDyn(&[2, 3])));
        let b = Tpm::new(ArrayD::zeros(IxDyn(&[2, 2])));
        assert!(matches!(a.try_add(&b), Err(TpmError::ShapeMismatch { .. })));
        assert!(a.try_mul(&2.0).is_ok());
    }

    #[test]
    fn test_comparisons_are_indicators() {
        let tpm = on_column();
        let above = tpm.gt(&0.5).unwrap();
        assert_eq!(above.array(), &array![[0.0, 1.0], [0.0, 0.0]].into_dyn());
        let at_least = tpm.ge(&0.5).unwrap();
        assert_eq!(at_least.array(), &array![[0.0, 1.0], [1.0, 0.0]].into_dyn());
        let equal = tpm.eq_elementwise(&tpm).unwrap();
        assert_eq!(equal.sum(), 4.0);
        assert_eq!(tpm.lt(&0.5).unwrap().sum() + at_least.sum(), 4.0);
        assert_eq!(tpm.le(&0.25).unwrap().sum(), 2.0);
    }

    #[test]
    fn test_co_broadcast() {
        assert_eq!(co_broadcast(&[2, 1, 3], &[2, 1]), Some(vec![2, 2, 3]));
        assert_eq!(co_broadcast(&[2, 3], &[2, 2]), None);
        assert_eq!(co_broadcast(&[2, 1, 3], &[1, 3]), Some(vec![2, 1, 3]));
        assert_eq!(co_broadcast(&[2, 1], &[1, 2]), Some(vec![2, 2]));
        assert_eq!(co_broadcast(&[], &[2]), Some(vec![2]));
    }
}
