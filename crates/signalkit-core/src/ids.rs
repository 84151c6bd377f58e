//! Unique identifier allocation.
//!
//! An [`IdAllocator`] is owned by whichever component hands out identifiers.
//! Allocation is an atomic increment, so one allocator may be shared across
//! threads behind an `Arc` or a `&'static`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic identifier source. The first identifier handed out is 1.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator that has not handed out any identifiers yet
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Allocate the next identifier
    pub fn allocate(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Allocate the next identifier as a typed id
    pub fn next<T: From<u64>>(&self) -> T {
        T::from(self.allocate())
    }

    /// The most recently allocated identifier, if any
    pub fn last(&self) -> Option<u64> {
        match self.last.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }
}

/// Declare a `Copy` newtype identifier over `u64`.
///
/// The generated type implements `From<u64>` so it can be produced by
/// [`IdAllocator::next`], and displays as `Prefix(n)`.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $vis:vis $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(u64);

        impl $name {
            /// The raw numeric value
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $prefix, self.0)
            }
        }
    };
}
