use deunicode::deunicode;

/// Maximum length of a worksheet name.
pub const MAX_LABEL_LEN: usize = 31;

/// Round to two decimal places, ties to even on the exact binary value.
///
/// Goes through decimal formatting rather than `(x * 100).round() / 100`, so
/// values such as `2.675` (stored slightly below) round down.
///
/// # Examples
///
/// ```
/// use session_core::formatting::round2;
///
/// assert_eq!(round2(0.083_055), 0.08);
/// assert_eq!(round2(2.675), 2.67);
/// assert_eq!(round2(-55.555_5), -55.56);
/// ```
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Make an uploaded file name safe to use as a label.
///
/// Transliterates to ASCII, turns path separators and whitespace runs into a
/// single `_`, drops everything outside `[A-Za-z0-9_.-]` and trims leading and
/// trailing `.`/`_`.
///
/// # Examples
///
/// ```
/// use session_core::formatting::secure_filename;
///
/// assert_eq!(secure_filename("My readings.xlsx"), "My_readings.xlsx");
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// ```
pub fn secure_filename(name: &str) -> String {
    let ascii = deunicode(name);
    let mut result = String::with_capacity(ascii.len());
    let mut pending_sep = false;

    for c in ascii.chars() {
        if c.is_whitespace() || c == '/' || c == '\\' {
            pending_sep = true;
            continue;
        }
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-') {
            continue;
        }
        if pending_sep && !result.is_empty() {
            result.push('_');
        }
        pending_sep = false;
        result.push(c);
    }

    result.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Derive a worksheet label from an input file name.
///
/// The label is the stem of the sanitized name, cut to [`MAX_LABEL_LEN`]
/// characters. When nothing usable is left, `input_<index>` is used instead.
///
/// # Examples
///
/// ```
/// use session_core::formatting::sheet_label;
///
/// assert_eq!(sheet_label("site A.xlsx", 0), "site_A");
/// assert_eq!(sheet_label("???.xlsx", 3), "xlsx");
/// assert_eq!(sheet_label("", 3), "input_3");
/// ```
pub fn sheet_label(file_name: &str, index: usize) -> String {
    let safe = secure_filename(file_name);
    let stem = match safe.rfind('.') {
        Some(pos) if pos > 0 => &safe[..pos],
        _ => safe.as_str(),
    };
    let label = truncate_chars(stem, MAX_LABEL_LEN);
    if label.is_empty() {
        format!("input_{}", index)
    } else {
        label
    }
}

/// Return `label`, or `label_2`, `label_3`, ... when already taken.
///
/// Suffixed labels are re-truncated so they stay within [`MAX_LABEL_LEN`].
pub fn unique_label<'a, I>(label: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    let is_taken = |candidate: &str| {
        taken
            .clone()
            .into_iter()
            .any(|t| t.eq_ignore_ascii_case(candidate))
    };

    if !is_taken(label) {
        return label.to_string();
    }

    let mut n = 2usize;
    loop {
        let suffix = format!("_{}", n);
        let base = truncate_chars(label, MAX_LABEL_LEN.saturating_sub(suffix.len()));
        let candidate = format!("{}{}", base, suffix);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── round2 ────────────────────────────────────────────────────────────────

    #[test]
    fn test_round2_basic() {
        assert_eq!(round2(299.0 / 3600.0), 0.08);
        assert_eq!(round2(1.0), 1.0);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(-67.333_333), -67.33);
    }

    #[test]
    fn test_round2_ties_to_even_on_exact_value() {
        // 0.125 is exact in binary: tie goes to the even digit.
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        // 1.005 is stored just below the midpoint.
        assert_eq!(round2(1.005), 1.0);
    }

    #[test]
    fn test_round2_passes_non_finite_through() {
        assert!(round2(f64::NAN).is_nan());
        assert_eq!(round2(f64::INFINITY), f64::INFINITY);
    }

    // ── secure_filename ───────────────────────────────────────────────────────

    #[test]
    fn test_secure_filename_collapses_whitespace() {
        assert_eq!(secure_filename("a   b\tc.xlsx"), "a_b_c.xlsx");
    }

    #[test]
    fn test_secure_filename_strips_traversal() {
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\data\\x.xlsx"), "C_data_x.xlsx");
    }

    #[test]
    fn test_secure_filename_transliterates() {
        assert_eq!(secure_filename("café.xlsx"), "cafe.xlsx");
    }

    #[test]
    fn test_secure_filename_drops_symbols() {
        assert_eq!(secure_filename("report(1)!.xlsx"), "report1.xlsx");
        assert_eq!(secure_filename("..."), "");
    }

    // ── sheet_label ───────────────────────────────────────────────────────────

    #[test]
    fn test_sheet_label_strips_extension() {
        assert_eq!(sheet_label("floor2.xlsx", 0), "floor2");
        assert_eq!(sheet_label("floor2.backup.jsonl", 0), "floor2.backup");
    }

    #[test]
    fn test_sheet_label_truncates_to_31() {
        let name = format!("{}.xlsx", "a".repeat(40));
        let label = sheet_label(&name, 0);
        assert_eq!(label.len(), MAX_LABEL_LEN);
    }

    #[test]
    fn test_sheet_label_fallback_uses_index() {
        assert_eq!(sheet_label("!!!", 7), "input_7");
    }

    // ── unique_label ──────────────────────────────────────────────────────────

    #[test]
    fn test_unique_label_free_name_kept() {
        let taken: Vec<String> = vec!["other".to_string()];
        let label = unique_label("floor", taken.iter().map(String::as_str));
        assert_eq!(label, "floor");
    }

    #[test]
    fn test_unique_label_appends_counter() {
        let taken: Vec<String> = vec!["floor".to_string(), "floor_2".to_string()];
        let label = unique_label("floor", taken.iter().map(String::as_str));
        assert_eq!(label, "floor_3");
    }

    #[test]
    fn test_unique_label_is_case_insensitive() {
        let taken: Vec<String> = vec!["Floor".to_string()];
        let label = unique_label("floor", taken.iter().map(String::as_str));
        assert_eq!(label, "floor_2");
    }

    #[test]
    fn test_unique_label_respects_max_len() {
        let long = "b".repeat(MAX_LABEL_LEN);
        let taken: Vec<String> = vec![long.clone()];
        let label = unique_label(&long, taken.iter().map(String::as_str));
        assert_eq!(label.len(), MAX_LABEL_LEN);
        assert!(label.ends_with("_2"));
    }
}
