use crate::core::types::CredentialSet;

/// Name the dashboard gives the account's built-in key
pub const DEFAULT_KEY_NAME: &str = "default";

/// Pick the credential set a caller should use by default.
///
/// The first set named "default" (case-insensitive) wins regardless of its
/// position. Otherwise the last entry is returned: the dashboard lists keys
/// newest first, so the last entry is the oldest key on the account.
pub fn primary(credential_sets: &[CredentialSet]) -> Option<&CredentialSet> {
    credential_sets
        .iter()
        .find(|set| set.is_named(DEFAULT_KEY_NAME))
        .or_else(|| credential_sets.last())
}
