//! Strongly-typed identifiers.
//!
//! Identifiers are ULIDs wrapped in a phantom-typed `Id<T>`, so an assignment id
//! can never be passed where an exchange job id is expected. They are rendered
//! with a short prefix (`tas_`, `txj_`) when they cross the wire; records keep
//! the rendered string because callers may also supply their own ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait providing the display prefix of an id type.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid.to_string().to_lowercase())
    }
}

pub mod marker {
    use super::IdMarker;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum Assignment {}

    impl IdMarker for Assignment {
        fn prefix() -> &'static str {
            "tas_"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum ExchangeJob {}

    impl IdMarker for ExchangeJob {
        fn prefix() -> &'static str {
            "txj_"
        }
    }
}

/// Identifier of a translation assignment.
pub type AssignmentId = Id<marker::Assignment>;

/// Identifier of an asynchronous exchange job.
pub type ExchangeJobId = Id<marker::ExchangeJob>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_render_with_their_prefix() {
        let ulid = Ulid::new();
        let assignment = AssignmentId::from_ulid(ulid);
        let job = ExchangeJobId::from_ulid(ulid);

        assert!(assignment.to_string().starts_with("tas_"));
        assert!(job.to_string().starts_with("txj_"));
        assert_eq!(assignment.as_ulid(), job.as_ulid());
    }

    #[test]
    fn ulid_ids_are_sortable() {
        let id1 = AssignmentId::from_ulid(Ulid::from_parts(1_000, 7));
        let id2 = AssignmentId::from_ulid(Ulid::from_parts(2_000, 1));
        assert!(id1 < id2);
        assert!(id1.to_string() < id2.to_string());
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<AssignmentId>(), size_of::<Ulid>());
        assert_eq!(size_of::<ExchangeJobId>(), 16);
    }
}
