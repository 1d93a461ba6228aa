//! Service key type for registry storage and lookup.

use std::any::TypeId;

/// Key for service registration and lookup.
///
/// A key pairs the `TypeId` of the service type with its qualified type name.
/// The `TypeId` drives lookup; the name is carried for diagnostics and error
/// messages only.
///
/// Keys are unique per [`Registry`](crate::Registry): registering the same
/// service type again replaces the previous registration.
///
/// # Examples
///
/// ```rust
/// use lodestone_di::ServiceKey;
///
/// struct Database;
///
/// let key = ServiceKey::of::<Database>();
/// assert!(key.display_name().ends_with("Database"));
/// assert_eq!(key, ServiceKey::of::<Database>());
/// assert_ne!(key, ServiceKey::of::<String>());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    /// Builds the key for a service type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` this key indexes on.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The qualified type name, for diagnostics.
    pub fn display_name(&self) -> &'static str {
        self.name
    }
}

// TypeId-only comparison: the name is determined by the id.
impl PartialEq for ServiceKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl std::hash::Hash for ServiceKey {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
