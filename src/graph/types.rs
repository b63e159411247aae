//! Handles and names used by the graph store
//!
//! Handles are dense arena slots. The store may hand a slot out again once
//! its node or edge is deleted, so a handle means nothing across reloads;
//! natural keys live in node properties.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                $name(id)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }

            /// Arena slot this handle addresses
            pub(crate) fn slot(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

macro_rules! schema_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                $name(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

arena_handle!(
    /// Node handle
    NodeId,
    "n"
);

arena_handle!(
    /// Edge handle
    EdgeId,
    "e"
);

schema_name!(
    /// Node label, e.g. `Station` or `Campus`
    Label
);

schema_name!(
    /// Relationship type, e.g. `NEXT` or `HAS_STATION`
    EdgeType
);
