//! Deterministic hash-based member identity.
//!
//! [`TypeHash`] identifies a type, field or constant by the module that defines
//! it and its name. The same module and name always hash the same, so a
//! module image can refer to a member of another module before that module is
//! loaded, and two loads of the same image agree on identities.
//!
//! # Examples
//!
//! ```
//! use modlink_core::TypeHash;
//!
//! let a = TypeHash::of_type("Core", "A");
//! assert_eq!(a, TypeHash::of_type("Core", "A"));
//! assert_ne!(a, TypeHash::of_type("Util", "A"));
//! assert_ne!(a, TypeHash::of_constant("Core", "A"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants.
///
/// Keep types, constants and fields with the same name apart.
pub mod hash_constants {
    /// Separator between the module and member components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for constant hashes.
    pub const CONSTANT: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for field hashes.
    pub const FIELD: u64 = 0x7d3c8b4a92e15f6d;
}

/// A deterministic 64-bit hash identifying a module member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    #[inline]
    fn qualified(domain: u64, module: &str, name: &str) -> Self {
        let module_hash = xxh64(module.as_bytes(), 0);
        let name_hash = xxh64(name.as_bytes(), 0);
        TypeHash(domain ^ module_hash.wrapping_mul(hash_constants::SEP).wrapping_add(name_hash))
    }

    /// Hash of a type declared in `module`.
    #[inline]
    pub fn of_type(module: &str, name: &str) -> Self {
        Self::qualified(hash_constants::TYPE, module, name)
    }

    /// Hash of a constant declared in `module`.
    #[inline]
    pub fn of_constant(module: &str, name: &str) -> Self {
        Self::qualified(hash_constants::CONSTANT, module, name)
    }

    /// Hash of a field of the type identified by `owner`.
    #[inline]
    pub fn of_field(owner: TypeHash, name: &str) -> Self {
        TypeHash(
            hash_constants::FIELD
                ^ owner.0.wrapping_mul(hash_constants::SEP).wrapping_add(xxh64(name.as_bytes(), 0)),
        )
    }

    /// Whether this is the empty hash.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
