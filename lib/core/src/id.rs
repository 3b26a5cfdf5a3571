//! Typed identifiers for persisted graph entities.
//!
//! Every id is a ULID tagged with the kind of row it names, so a
//! `ProjectId` cannot be passed where a `NodeInstanceId` is expected.
//!
//! Ids are minted from one process-wide monotonic generator: each new id
//! sorts strictly after every id minted before it, even within the same
//! millisecond. Repositories rely on this to list rows in creation order by
//! sorting on id.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, PoisonError};
use ulid::{Generator, Ulid};

static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// Returns a ULID greater than any previously returned by this process.
#[must_use]
pub fn next_ulid() -> Ulid {
    let mut generator = GENERATOR.lock().unwrap_or_else(PoisonError::into_inner);
    loop {
        // Fails only when the random component overflows within one
        // millisecond; the next millisecond starts a fresh sequence.
        if let Ok(ulid) = generator.generate() {
            return ulid;
        }
        std::thread::yield_now();
    }
}

/// Marker describing one kind of id.
pub trait IdKind {
    /// Display prefix, e.g. `prj` in `prj_01H...`.
    const PREFIX: &'static str;
    /// Type name used in parse errors.
    const NAME: &'static str;
}

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// A ULID naming a row of kind `K`.
///
/// Displays as `<prefix>_<ulid>`. Parses from that form or from a bare
/// ULID. Serializes as a bare ULID, which is what the canvas client sends.
pub struct Id<K> {
    ulid: Ulid,
    kind: PhantomData<fn() -> K>,
}

impl<K: IdKind> Id<K> {
    /// Mints a new id from the monotonic generator.
    #[must_use]
    pub fn new() -> Self {
        Self::from_ulid(next_ulid())
    }
}

impl<K> Id<K> {
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            kind: PhantomData,
        }
    }

    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<K: IdKind> Default for Id<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for Id<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Id<K> {}

impl<K> PartialEq for Id<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ulid == other.ulid
    }
}

impl<K> Eq for Id<K> {}

impl<K> PartialOrd for Id<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Id<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ulid.cmp(&other.ulid)
    }
}

impl<K> Hash for Id<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ulid.hash(state);
    }
}

impl<K: IdKind> fmt::Display for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", K::PREFIX, self.ulid)
    }
}

impl<K: IdKind> fmt::Debug for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({self})", K::NAME)
    }
}

impl<K: IdKind> FromStr for Id<K> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s
            .strip_prefix(K::PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);

        Ulid::from_str(bare)
            .map(Self::from_ulid)
            .map_err(|e| ParseIdError {
                id_type: K::NAME,
                reason: e.to_string(),
            })
    }
}

impl<K> Serialize for Id<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ulid.serialize(serializer)
    }
}

impl<'de, K> Deserialize<'de> for Id<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ulid::deserialize(deserializer).map(Self::from_ulid)
    }
}

macro_rules! id_kind {
    ($(#[$meta:meta])* $alias:ident, $kind:ident, $prefix:literal) => {
        #[doc = concat!("Kind marker for [`", stringify!($alias), "`].")]
        #[derive(Debug)]
        pub enum $kind {}

        impl IdKind for $kind {
            const PREFIX: &'static str = $prefix;
            const NAME: &'static str = stringify!($alias);
        }

        $(#[$meta])*
        pub type $alias = Id<$kind>;
    };
}

id_kind!(
    /// Identifies a user record.
    UserId,
    UserKind,
    "usr"
);

id_kind!(
    /// Identifies a project (one workflow canvas).
    ProjectId,
    ProjectKind,
    "prj"
);

id_kind!(
    /// Identifies a node placed on a project's canvas.
    NodeInstanceId,
    NodeInstanceKind,
    "node"
);

id_kind!(
    /// Identifies a port-to-port connection between two nodes.
    NodeConnectionId,
    NodeConnectionKind,
    "conn"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        assert!(UserId::new().to_string().starts_with("usr_"));
        assert!(ProjectId::new().to_string().starts_with("prj_"));
        assert!(NodeInstanceId::new().to_string().starts_with("node_"));
        assert!(NodeConnectionId::new().to_string().starts_with("conn_"));
    }

    #[test]
    fn parses_display_and_bare_forms() {
        let id = ProjectId::new();
        assert_eq!(id.to_string().parse::<ProjectId>(), Ok(id));
        assert_eq!(id.as_ulid().to_string().parse::<ProjectId>(), Ok(id));
    }

    #[test]
    fn parse_rejects_other_kinds_prefix() {
        let node = NodeInstanceId::new();
        let err = node.to_string().parse::<ProjectId>().expect_err("wrong kind");
        assert_eq!(err.id_type, "ProjectId");
    }

    #[test]
    fn parse_rejects_prefix_without_separator() {
        assert!("prj01ARZ3NDEKTSV4RRFFQ69G5FAV".parse::<ProjectId>().is_err());
    }

    #[test]
    fn ids_minted_in_a_tight_loop_are_strictly_increasing() {
        let ids: Vec<NodeInstanceId> = (0..1000).map(|_| NodeInstanceId::new()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn ordering_holds_across_kinds_sharing_the_generator() {
        let project = ProjectId::new();
        let node = NodeInstanceId::new();
        assert!(project.as_ulid() < node.as_ulid());
    }

    #[test]
    fn ids_minted_on_many_threads_are_unique() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..200).map(|_| UserId::new()).collect::<Vec<_>>()))
            .collect();
        let mut all: Vec<UserId> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("thread"))
            .collect();
        let minted = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), minted);
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
        let parsed: UserId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }

    #[test]
    fn debug_names_the_kind() {
        let id = NodeConnectionId::from_ulid(Ulid::from_parts(1, 2));
        assert!(format!("{id:?}").starts_with("NodeConnectionId(conn_"));
    }
}
