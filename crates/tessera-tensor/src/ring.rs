//! Element ring contract.
//!
//! Tensors never assume a concrete numeric representation. Every arithmetic
//! step goes through a [`Ring`] object handed to the tensor at construction.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use num_traits::Num;

/// Shared handle to a ring, cloned into every tensor derived from another.
pub type RingRef<T> = Arc<dyn Ring<T>>;

/// Arithmetic capabilities of a tensor element type.
///
/// Implementations are expected to be associative and commutative for `add`
/// so that parallel and sequential merges agree. Floating point rings violate
/// this in the last bits; that order-sensitivity is accepted.
pub trait Ring<T>: Send + Sync {
    /// Short descriptor of the ring, used for provider capability matching (e.g. `"f64"`).
    fn name(&self) -> &str;

    /// The additive identity.
    fn zero(&self) -> T;

    /// The multiplicative identity.
    fn one(&self) -> T;

    /// Returns `a + b`.
    fn add(&self, a: &T, b: &T) -> T;

    /// Returns `a - b`.
    fn subtract(&self, a: &T, b: &T) -> T;

    /// Returns `a * b`.
    fn multiply(&self, a: &T, b: &T) -> T;

    /// Ring equality.
    fn equals(&self, a: &T, b: &T) -> bool;
}

impl<T> fmt::Debug for dyn Ring<T> + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ring").field(&self.name()).finish()
    }
}

/// Ring over any primitive numeric type implementing [`num_traits::Num`].
pub struct NumRing<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> NumRing<T> {
    /// Creates a numeric ring with the given descriptor name.
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for NumRing<T> {
    fn clone(&self) -> Self {
        Self::named(self.name)
    }
}

impl<T> fmt::Debug for NumRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumRing").field("name", &self.name).finish()
    }
}

impl<T: Num + Clone> Ring<T> for NumRing<T> {
    fn name(&self) -> &str {
        self.name
    }

    fn zero(&self) -> T {
        T::zero()
    }

    fn one(&self) -> T {
        T::one()
    }

    fn add(&self, a: &T, b: &T) -> T {
        a.clone() + b.clone()
    }

    fn subtract(&self, a: &T, b: &T) -> T {
        a.clone() - b.clone()
    }

    fn multiply(&self, a: &T, b: &T) -> T {
        a.clone() * b.clone()
    }

    fn equals(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// Element types with a standard ring.
pub trait Element: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Returns the standard ring of this element type.
    fn ring() -> RingRef<Self>;
}

macro_rules! impl_numeric_element {
    ($($ty:ty),*) => {
        $(
            impl Element for $ty {
                fn ring() -> RingRef<Self> {
                    Arc::new(NumRing::<$ty>::named(stringify!($ty)))
                }
            }
        )*
    };
}

impl_numeric_element!(f32, f64, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize);

/// Returns the standard ring of `T`.
pub fn ring_of<T: Element>() -> RingRef<T> {
    T::ring()
}
