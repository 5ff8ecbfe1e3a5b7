//! Opaque, fixed-width identifier types shared across the data model.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

macro_rules! fixed_bytes_id {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                Ok(Self(value.try_into()?))
            }
        }
    };
}

fixed_bytes_id!(Pubkey, 32, "A 32-byte account public key.");
fixed_bytes_id!(Signature, 64, "A 64-byte transaction signature.");
fixed_bytes_id!(Hash, 32, "A 32-byte ledger hash (e.g. a block hash).");

/// Identifies a data source. Either a user-provided name passed to the
/// builder, or a freshly generated unique token when the caller doesn't
/// care to name it (see [`generate_source_id`]).
pub type SourceId = String;

/// Generates a unique source-id for a data source the caller didn't name
/// explicitly.
pub fn generate_source_id() -> SourceId {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("source-{:016x}", u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkey_displays_as_lowercase_hex() {
        let pk = Pubkey::new([0xabu8; 32]);
        assert_eq!(pk.to_string().len(), 64);
        assert!(pk.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_source_ids_are_unique() {
        let a = generate_source_id();
        let b = generate_source_id();
        assert_ne!(a, b);
    }
}
