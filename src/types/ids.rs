use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide source of identities. Shared by every marker so an identity
/// is never reused, even across kinds.
static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// Strong typing for identities with phantom types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: u64,
    _phantom: PhantomData<T>,
}

/// Marker types for different identity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipeMarker;

/// Type aliases for specific identity types
pub type StateId = Id<StateMarker>;
pub type TableId = Id<TableMarker>;
pub type CapabilityId = Id<CapabilityMarker>;
pub type RecipeId = Id<RecipeMarker>;

impl<T> Id<T> {
    /// Allocate a fresh, never-before-seen identity
    pub(crate) fn fresh() -> Self {
        Self {
            value: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            _phantom: PhantomData,
        }
    }

    /// Get the raw counter value
    pub fn as_u64(&self) -> u64 {
        self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique_and_increasing() {
        let a = StateId::fresh();
        let b = StateId::fresh();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_ids_never_collide_across_kinds() {
        let state = StateId::fresh();
        let table = TableId::fresh();
        assert_ne!(state.as_u64(), table.as_u64());
    }

    #[test]
    fn test_display() {
        let id = CapabilityId::fresh();
        assert_eq!(id.to_string(), format!("#{}", id.as_u64()));
    }
}
