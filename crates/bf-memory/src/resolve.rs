//! Memory space resolution.
//!
//! A descriptor may be created with [`MemorySpace::Auto`], meaning "let
//! the allocator decide". Before any transfer or compute operation runs,
//! a [`SpaceResolver`] turns it into a [`ResolvedArray`] whose space is
//! concrete. Resolution happens once, early; everything downstream takes
//! `ResolvedArray` and never sees the sentinel.

use bf_array::{ArrayDescriptor, DataPtr, MemorySpace, ResolvedArray, ResolvedSpace};
use bf_status::BfResult;
use tracing::debug;

/// Picks a concrete memory space for a descriptor.
pub trait SpaceResolver: Send + Sync {
    /// Resolve a requested space for the buffer at `data`.
    ///
    /// Concrete requests should normally be returned unchanged.
    ///
    /// # Errors
    ///
    /// Implementations report `InvalidState` or `Unsupported` when no
    /// concrete space can be chosen.
    fn resolve_space(&self, requested: MemorySpace, data: DataPtr) -> BfResult<ResolvedSpace>;

    /// Resolve a whole descriptor.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`SpaceResolver::resolve_space`].
    fn resolve(&self, array: &ArrayDescriptor) -> BfResult<ResolvedArray> {
        let space = self.resolve_space(array.space(), array.data())?;
        ResolvedArray::try_from(array.with_space(space.into()))
    }
}

/// Resolver for processes without an accelerator runtime.
///
/// `Auto` maps to a fixed default space; concrete spaces pass through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostResolver {
    default_space: ResolvedSpace,
}

impl HostResolver {
    /// Create a resolver that maps `Auto` to `default_space`.
    #[must_use]
    pub const fn new(default_space: ResolvedSpace) -> Self {
        Self { default_space }
    }

    /// The space `Auto` resolves to.
    #[must_use]
    pub const fn default_space(&self) -> ResolvedSpace {
        self.default_space
    }
}

impl Default for HostResolver {
    fn default() -> Self {
        Self::new(ResolvedSpace::System)
    }
}

impl SpaceResolver for HostResolver {
    fn resolve_space(&self, requested: MemorySpace, data: DataPtr) -> BfResult<ResolvedSpace> {
        match requested.resolved() {
            Some(space) => Ok(space),
            None => {
                debug!(
                    addr = data.addr(),
                    space = %self.default_space,
                    "resolved auto memory space"
                );
                Ok(self.default_space)
            }
        }
    }
}

/// Resolve a descriptor that must already be concrete.
///
/// # Errors
///
/// Returns `InvalidState` if the descriptor's space is `Auto`.
pub fn require_resolved(array: &ArrayDescriptor) -> BfResult<ResolvedArray> {
    ResolvedArray::try_from(*array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_array::DType;
    use bf_status::BfError;

    fn auto_array() -> ArrayDescriptor {
        ArrayDescriptor::contiguous(MemorySpace::Auto, DType::F32, &[4], DataPtr::null()).unwrap()
    }

    #[test]
    fn test_auto_resolves_to_system_by_default() {
        let resolved = HostResolver::default().resolve(&auto_array()).unwrap();
        assert_eq!(resolved.resolved_space(), ResolvedSpace::System);
        assert_eq!(resolved.space(), MemorySpace::System);
    }

    #[test]
    fn test_auto_resolves_to_configured_space() {
        let resolver = HostResolver::new(ResolvedSpace::AcceleratorHost);
        let resolved = resolver.resolve(&auto_array()).unwrap();
        assert_eq!(resolved.resolved_space(), ResolvedSpace::AcceleratorHost);
    }

    #[test]
    fn test_concrete_space_passes_through() {
        let desc = auto_array().with_space(MemorySpace::AcceleratorDevice);
        let resolved = HostResolver::default().resolve(&desc).unwrap();
        assert_eq!(resolved.resolved_space(), ResolvedSpace::AcceleratorDevice);
        assert_eq!(resolved.shape(), desc.shape());
    }

    #[test]
    fn test_require_resolved() {
        assert_eq!(
            require_resolved(&auto_array()).unwrap_err(),
            BfError::InvalidState
        );
        let desc = auto_array().with_space(MemorySpace::System);
        assert!(require_resolved(&desc).is_ok());
    }
}
