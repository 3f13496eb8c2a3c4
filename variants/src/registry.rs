//! Variant registry for automatic front-end discovery.
//!
//! Each variant self-registers via [`inventory::submit!`] with a
//! [`VariantEntry`] containing its CLI name and a factory function, exactly
//! as the model repo's `MachineEntry` self-registers arcade boards. The
//! console discovers available variants at runtime without a central list.

use crate::image::MemoryImage;
use crate::system::System;

/// Describes a front-end-selectable engine variant (single-core or
/// multi-core-with-snoop).
pub struct VariantEntry {
    /// CLI name used to select this variant (e.g. "single-core").
    pub name: &'static str,
    /// One-line description shown by `jvmcore-console --list`.
    pub description: &'static str,
    /// Factory: construct a [`System`] from a loaded memory image.
    pub create: fn(MemoryImage) -> Box<dyn System>,
}

inventory::collect!(VariantEntry);

/// Return all registered variants, sorted by name.
pub fn all() -> Vec<&'static VariantEntry> {
    let mut entries: Vec<_> = inventory::iter::<VariantEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a variant by its CLI name.
pub fn find(name: &str) -> Option<&'static VariantEntry> {
    inventory::iter::<VariantEntry>.into_iter().find(|e| e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_variants_are_registered() {
        let names: Vec<_> = all().iter().map(|e| e.name).collect();
        assert!(names.contains(&"single-core"));
        assert!(names.contains(&"multi-core"));
    }

    #[test]
    fn find_is_case_sensitive_exact_match() {
        assert!(find("single-core").is_some());
        assert!(find("Single-Core").is_none());
    }
}
