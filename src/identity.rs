//! Deterministic identity derivation for bulk-created workers.
//!
//! All generated addresses are aliases of one fixed mailbox so that every
//! worker remains individually addressable while mail routes to a single
//! inbox. Phone numbers are synthetic: a fixed-width digit string keyed on
//! the department prefix and the worker's ordinal position in the batch.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const ALIAS_MAILBOX: &str = "zrxarchit";
const ALIAS_DOMAIN: &str = "gmail.com";
const FALLBACK_PHONE_PREFIX: &str = "999";

static PHONE_PREFIX_BY_DEPARTMENT: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([("PWD", "101"), ("SANITATION", "202"), ("TRAFFIC", "303")])
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub phone: String,
}

/// Derive the email alias and phone number for the worker at `index` within
/// a department batch. Pure: the same inputs always produce the same
/// identity, so re-running a batch regenerates (and collides with) the
/// identifiers of a previous run.
pub fn derive_identity(name: &str, department_code: &str, index: usize) -> Identity {
    let local_part = name.to_lowercase().replace(' ', ".");
    let email = format!(
        "{ALIAS_MAILBOX}+{local_part}.{}@{ALIAS_DOMAIN}",
        department_code.to_lowercase()
    );

    let prefix = PHONE_PREFIX_BY_DEPARTMENT
        .get(department_code.to_uppercase().as_str())
        .copied()
        .unwrap_or(FALLBACK_PHONE_PREFIX);
    let phone = format!("9{prefix}{:06}", index + 1);

    Identity { email, phone }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_department_prefix() {
        let identity = derive_identity("Ramesh Kumar", "PWD", 0);
        assert_eq!(identity.phone, "9101000001");
        assert_eq!(identity.email, "zrxarchit+ramesh.kumar.pwd@gmail.com");
    }

    #[test]
    fn unknown_department_falls_back() {
        let identity = derive_identity("X", "UNKNOWN", 4);
        assert_eq!(identity.phone, "9999000005");
    }

    #[test]
    fn prefix_lookup_is_case_exact_after_uppercasing() {
        assert_eq!(derive_identity("A", "sanitation", 0).phone, "9202000001");
        assert_eq!(derive_identity("A", "Traffic", 9).phone, "9303000010");
    }

    #[test]
    fn email_ignores_index() {
        let first = derive_identity("Suresh Singh", "SANITATION", 0);
        let later = derive_identity("Suresh Singh", "SANITATION", 7);
        assert_eq!(first.email, later.email);
        assert_eq!(first.email, "zrxarchit+suresh.singh.sanitation@gmail.com");
        assert_ne!(first.phone, later.phone);
    }
}
