//! Row-parallel iteration that degrades to sequential iteration.
//!
//! With the `parallel` feature, `into_par_iter()` is rayon's. Without it the
//! same call returns the plain `IntoIterator` iterator, so producers such as
//! the D8 flow direction keep one code path.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Stand-in for `rayon::iter::IntoParallelIterator`
    pub trait IntoParallelIterator {
        type Iter: Iterator<Item = Self::Item>;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
