// src/config/partitions.rs
//! Filter values the payments grid knows about: country partitions (dial-code values of
//! the country filter) and the businesses selectable in the extra filter.

pub const COUNTRIES: [(&str, &str); 5] = [
    ("Cameroun", "237"),
    ("Cote d'ivoire", "225"),
    ("Senegal", "221"),
    ("Burkina Faso", "226"),
    ("Togo", "228"),
];

/// Every known country code, table order.
pub fn all_country_codes() -> Vec<String> {
    COUNTRIES.iter().map(|(_, code)| code.to_string()).collect()
}

/// Display name for a partition key; the key itself when unknown.
pub fn display_name(key: &str) -> &str {
    COUNTRIES.iter()
        .find(|(_, code)| *code == key)
        .map(|(name, _)| *name)
        .unwrap_or(key)
}

/// Accepts a code (`225`) or a case-insensitive country name (`togo`).
pub fn resolve(input: &str) -> Option<&'static str> {
    let t = input.trim();
    COUNTRIES.iter()
        .find(|(name, code)| *code == t || name.eq_ignore_ascii_case(t))
        .map(|(_, code)| *code)
}

/* ---------------- Businesses ---------------- */

/// Name → business id. An empty id leaves the business filter untouched.
pub const BUSINESSES: [(&str, &str); 3] = [
    ("all", ""),
    ("tombola_sbc", "105903915"),
    ("sniper_business_center", "5876842"),
];

/// Accepts a known name (`tombola_sbc`) or id (`5876842`). A bare id the table
/// does not know passes through as is.
pub fn resolve_business(input: &str) -> Option<String> {
    let t = input.trim();
    if let Some((_, id)) = BUSINESSES.iter().find(|(name, id)| name.eq_ignore_ascii_case(t) || (!id.is_empty() && *id == t)) {
        return Some(id.to_string());
    }
    (!t.is_empty() && t.chars().all(|c| c.is_ascii_digit())).then(|| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_by_code_or_name() {
        assert_eq!(resolve("225"), Some("225"));
        assert_eq!(resolve(" togo "), Some("228"));
        assert_eq!(resolve("Narnia"), None);
        assert_eq!(display_name("237"), "Cameroun");
        assert_eq!(display_name("999"), "999");
        assert_eq!(all_country_codes().len(), 5);
    }

    #[test]
    fn business_by_name_or_id() {
        assert_eq!(resolve_business("Tombola_SBC").as_deref(), Some("105903915"));
        assert_eq!(resolve_business("5876842").as_deref(), Some("5876842"));
        assert_eq!(resolve_business("all").as_deref(), Some(""));
        assert_eq!(resolve_business(" 42 ").as_deref(), Some("42"));
        assert_eq!(resolve_business("corner shop"), None);
        assert_eq!(resolve_business(""), None);
    }
}
