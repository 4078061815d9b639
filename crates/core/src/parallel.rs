//! # Execution Backends
//!
//! Independent pieces of work (edges of a connectivity matrix, states of a
//! purview) can be evaluated one after another or fanned out over a thread
//! pool. The choice is a capability passed in by the caller, not a global
//! switch.
//!
//! ## Pattern: Fan-out → Process → Fan-in
//!
//! ```text
//!               ┌──────────────┐
//!    item 0 ────│      f       │────┐
//!               └──────────────┘    │    ┌─────────┐
//!                                   ├────│ collect │──── Vec<R> (input order)
//!               ┌──────────────┐    │    └─────────┘
//!    item 1 ────│      f       │────┘
//!               └──────────────┘
//! ```
//!
//! Both backends return results in input order, and stop at the first error.

/// A strategy for mapping a fallible function over independent items.
///
/// # Example
///
/// ```rust
/// use phi_core::parallel::{Executor, Sequential};
///
/// let squares: Result<Vec<u32>, std::convert::Infallible> =
///     Sequential.try_map(vec![1, 2, 3], |x| Ok(x * x));
/// assert_eq!(squares.unwrap(), vec![1, 4, 9]);
/// ```
pub trait Executor: Send + Sync {
    /// Apply `f` to every item, returning outputs in input order.
    fn try_map<T, R, E, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>, E>
    where
        T: Send,
        R: Send,
        E: Send,
        F: Fn(T) -> Result<R, E> + Send + Sync;

    /// Name of this backend, for logging.
    fn name(&self) -> &'static str;
}

/// Evaluate items one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Executor for Sequential {
    fn try_map<T, R, E, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>, E>
    where
        T: Send,
        R: Send,
        E: Send,
        F: Fn(T) -> Result<R, E> + Send + Sync,
    {
        items.into_iter().map(f).collect()
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Evaluate items on the rayon global thread pool.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Parallel;

#[cfg(feature = "parallel")]
impl Executor for Parallel {
    fn try_map<T, R, E, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>, E>
    where
        T: Send,
        R: Send,
        E: Send,
        F: Fn(T) -> Result<R, E> + Send + Sync,
    {
        use rayon::prelude::*;

        items.into_par_iter().map(f).collect()
    }

    fn name(&self) -> &'static str {
        "parallel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Odd(u32);

    fn halve(x: u32) -> Result<u32, Odd> {
        if x % 2 == 0 {
            Ok(x / 2)
        } else {
            Err(Odd(x))
        }
    }

    #[test]
    fn test_sequential_preserves_order() {
        let out = Sequential.try_map(vec![8, 2, 4], halve).unwrap();
        assert_eq!(out, vec![4, 1, 2]);
    }

    #[test]
    fn test_sequential_stops_at_error() {
        let out = Sequential.try_map(vec![2, 3, 4], halve);
        assert_eq!(out, Err(Odd(3)));
    }

    #[test]
    fn test_empty_input() {
        let out = Sequential.try_map(Vec::<u32>::new(), halve).unwrap();
        assert!(out.is_empty());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let items: Vec<u32> = (0..64).map(|x| x * 2).collect();
        let seq = Sequential.try_map(items.clone(), halve).unwrap();
        let par = Parallel.try_map(items, halve).unwrap();
        assert_eq!(seq, par);
    }
}
