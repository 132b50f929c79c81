/// Shortest abbreviation accepted as naming a commit
pub const MIN_ABBREV_LEN: usize = 7;

/// Whether two commit ids name the same commit.
///
/// Ids compare case-insensitively, and an abbreviated id matches the full id
/// it is a prefix of, as long as it has at least [`MIN_ABBREV_LEN`] digits.
pub fn same_commit(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    if a.eq_ignore_ascii_case(b) {
        return true;
    }

    let (short, long) = if a.len() < b.len() { (a, b) } else { (b, a) };
    short.len() >= MIN_ABBREV_LEN
        && long
            .get(..short.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(short))
}

/// Shorten a commit id for display
pub fn short_id(id: &str) -> &str {
    id.get(..MIN_ABBREV_LEN).unwrap_or(id)
}
