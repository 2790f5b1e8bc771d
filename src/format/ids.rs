//! Newtype IDs for type-safe identification of annotation elements.
//!
//! Using newtypes prevents accidentally mixing up different kinds of IDs
//! (e.g., passing a label ID where an attribute ID is expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! newtype_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[doc = concat!("Creates a new ", stringify!($name), ".")]
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self::new(id)
            }
        }
    };
}

newtype_id!(
    /// Session-local identifier of an annotation object.
    ///
    /// Client IDs are never reused within a process, so they stay unique
    /// for the lifetime of every collection.
    ClientId
);

newtype_id!(
    /// Identifier assigned by the persistence layer.
    ServerId
);

newtype_id!(
    /// Identifier of a label (or skeleton sublabel) in the task schema.
    LabelId
);

newtype_id!(
    /// Identifier of an attribute specification.
    AttributeId
);

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

impl ClientId {
    /// Returns a fresh client ID from the process-wide monotonic counter.
    pub fn fresh() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}
