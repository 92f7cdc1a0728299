// src/core/sanitize.rs

/// Collapse runs of whitespace (newlines inside cells included) to one space, trim ends.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Empty, or nothing but the loading placeholder (with or without trailing dots / ellipsis).
pub fn is_placeholder(cell: &str, placeholder: &str) -> bool {
    let t = cell.trim().trim_end_matches(['.', '…']).trim_end();
    t.is_empty() || (!placeholder.is_empty() && t.eq_ignore_ascii_case(placeholder))
}

/// Make user text safe as a file stem: ASCII alphanumerics, `-` and `_`; whitespace → `_`.
pub fn sanitize_file_stem(name: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_us = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() { out.push(ch); last_us = false; }
        else if ch.is_whitespace() { if !last_us { out.push('_'); last_us = true; } }
        else if ch=='-' || ch=='_' { if !(last_us && ch=='_') { out.push(ch); } last_us = ch=='_'; }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() { fallback.to_string() } else { out }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_collapses_inside_cells() {
        assert_eq!(normalize_ws("  15-01-2025\n  10:32 "), "15-01-2025 10:32");
    }

    #[test]
    fn placeholder_variants() {
        assert!(is_placeholder("", "Loading"));
        assert!(is_placeholder("   ", "Loading"));
        assert!(is_placeholder("Loading...", "Loading"));
        assert!(is_placeholder("loading…", "Loading"));
        assert!(!is_placeholder("TX-Loading-1", "Loading"));
        assert!(!is_placeholder("TX1", ""));
    }

    #[test]
    fn file_stems() {
        assert_eq!(sanitize_file_stem("Côte d'Ivoire export", "x"), "Cte_dIvoire_export");
        assert_eq!(sanitize_file_stem("///", "transactions"), "transactions");
    }
}
