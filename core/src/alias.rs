//! The process-wide alias-string table.
//!
//! Aliased compounds do not store their keys inline; they store 16-bit
//! indices into this table. The table must be installed (for example by
//! loading an ASN stream) before aliased compounds are read or written.
//! Mutating the table while a reader is mid-stream is undefined behavior
//! at the format level, so callers must serialize replacement externally.

use lazy_static::lazy_static;
use snafu::Snafu;
use std::sync::RwLock;

/// The maximum number of strings an alias table may hold.
pub const MAX_ALIASES: usize = u16::MAX as usize;

/// An error raised by an alias table lookup.
#[derive(Debug, Snafu, Clone, PartialEq)]
#[non_exhaustive]
pub enum AliasError {
    /// The string is not present in the table.
    #[snafu(display("string `{}` has no alias in the global table", name))]
    Missing { name: String },

    /// The alias id points past the end of the table.
    #[snafu(display("alias {} is out of range of the table of {} strings", alias, count))]
    OutOfRange { alias: u16, count: u16 },

    /// The proposed table has more entries than a 16-bit alias can address.
    #[snafu(display("alias table of {} strings exceeds the maximum of {}", count, MAX_ALIASES))]
    TableOverflow { count: usize },
}

lazy_static! {
    static ref ALIASES: RwLock<Vec<String>> = RwLock::new(Vec::new());
}

/// Install a new alias table, replacing the previous contents.
///
/// Fails with [`AliasError::TableOverflow`] when the list holds more
/// than 65 535 strings.
pub fn set_alias_strings(strings: Vec<String>) -> Result<(), AliasError> {
    if strings.len() > MAX_ALIASES {
        return TableOverflowSnafu {
            count: strings.len(),
        }
        .fail();
    }
    let mut table = ALIASES.write().unwrap_or_else(|e| e.into_inner());
    if !table.is_empty() {
        tracing::warn!(
            previous = table.len(),
            next = strings.len(),
            "replacing a non-empty alias-string table"
        );
    }
    *table = strings;
    Ok(())
}

/// Find the alias id of `name` by scanning the table in order.
pub fn to_alias(name: &str) -> Result<u16, AliasError> {
    let table = ALIASES.read().unwrap_or_else(|e| e.into_inner());
    table
        .iter()
        .position(|s| s == name)
        .map(|i| i as u16)
        .ok_or_else(|| {
            MissingSnafu {
                name: name.to_owned(),
            }
            .build()
        })
}

/// Resolve an alias id back to its string.
pub fn from_alias(alias: u16) -> Result<String, AliasError> {
    let table = ALIASES.read().unwrap_or_else(|e| e.into_inner());
    table.get(alias as usize).cloned().ok_or_else(|| {
        OutOfRangeSnafu {
            alias,
            count: table.len() as u16,
        }
        .build()
    })
}

/// The number of strings currently installed.
pub fn alias_count() -> u16 {
    let table = ALIASES.read().unwrap_or_else(|e| e.into_inner());
    table.len() as u16
}

/// A copy of the currently installed table, in alias order.
pub fn snapshot() -> Vec<String> {
    let table = ALIASES.read().unwrap_or_else(|e| e.into_inner());
    table.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    // the table is process-global, so exercise it from a single test
    #[test]
    fn install_lookup_and_replace() {
        set_alias_strings(vec!["pos".into(), "rot".into(), "vel".into()]).unwrap();
        assert_eq!(alias_count(), 3);
        assert_eq!(to_alias("rot").unwrap(), 1);
        assert_eq!(from_alias(2).unwrap(), "vel");
        assert!(matches!(
            to_alias("missing"),
            Err(AliasError::Missing { .. })
        ));
        assert!(matches!(
            from_alias(9),
            Err(AliasError::OutOfRange { .. })
        ));

        set_alias_strings(vec!["only".into()]).unwrap();
        assert_eq!(alias_count(), 1);
        assert!(to_alias("rot").is_err());
        assert_eq!(snapshot(), vec!["only".to_owned()]);
    }
}
