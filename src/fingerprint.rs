// src/fingerprint.rs
//
// =============================================================================
// RESUMEPILOT: FINGERPRINT & SALARY GRAMMAR
// =============================================================================
//
// Two independent, deterministic pieces of text normalization that the
// rest of the pipeline leans on: the dedup fingerprint (§3, §4.3) and the
// salary range parser referenced but left unspecified in §9.

use sha2::{Digest, Sha256};

/// Normalizes a field for fingerprinting: lowercase, trim, collapse
/// internal whitespace. Deliberately simple — the point is stability
/// across repeated extractions of the same listing, not linguistic
/// correctness.
fn normalize(field: &str) -> String {
    field.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// 12-hex-char fingerprint of normalized title+company+salary+location
/// (§3: "Fingerprint: a short hash of normalized visible job fields").
pub fn compute_fingerprint(title: &str, company: &str, salary_raw: &str, location: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(title));
    hasher.update("\u{1}");
    hasher.update(normalize(company));
    hasher.update("\u{1}");
    hasher.update(normalize(salary_raw));
    hasher.update("\u{1}");
    hasher.update(normalize(location));
    let digest = hasher.finalize();
    hex::encode(digest)[..12].to_string()
}

/// A parsed monthly salary range, in thousands of currency units (the
/// unit the source strings are already denominated in, e.g. "15-25K").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedSalary {
    pub min_k: f64,
    pub max_k: f64,
    /// Number of paid months per year, from the "·13薪" suffix; 12 if
    /// absent.
    pub months_per_year: f64,
}

impl ParsedSalary {
    /// Annualized range, still in thousands.
    pub fn annual_range_k(&self) -> (f64, f64) {
        let scale = self.months_per_year / 12.0;
        (self.min_k * scale, self.max_k * scale)
    }

    /// Overlap ratio between this range and another, both annualized.
    /// 0 when disjoint, 1 when one fully contains the other.
    pub fn overlap_ratio(&self, other_min_k: f64, other_max_k: f64) -> f64 {
        let (a_min, a_max) = self.annual_range_k();
        let b_min = other_min_k;
        let b_max = other_max_k;
        let overlap = (a_max.min(b_max) - a_min.max(b_min)).max(0.0);
        let union = (a_max.max(b_max) - a_min.min(b_min)).max(f64::EPSILON);
        (overlap / union).clamp(0.0, 1.0)
    }
}

/// Grammar handled, left-to-right:
///
/// ```text
/// salary     := negotiable | range
/// negotiable := "面议" | "薪资面议" (case/whitespace-insensitive) -> None
/// range      := number unit? "-" number unit monthly_suffix?
/// number     := digits ("." digits)?
/// unit       := "k" | "K" | "千" (only trailing one is required)
/// monthly_suffix := "·" digits "薪"   (e.g. "·13薪" => 13 months/year)
/// ```
///
/// Examples: `"15-25K"`, `"15-25K·13薪"`, `"15k-25k"`, `"8000-12000"`
/// (bare numbers are treated as already being in thousands only if a `k`
/// unit is present anywhere in the string; otherwise they are divided by
/// 1000 to normalize to "K" units), `"面议"` => `None`.
pub fn parse_salary_range(raw: &str) -> Option<ParsedSalary> {
    let s = raw.trim();
    if s.is_empty() || s.contains("面议") {
        return None;
    }

    // Split off the monthly-pay multiplier suffix, e.g. "·13薪".
    let (range_part, months_per_year) = if let Some(idx) = s.find('·') {
        let suffix = &s[idx + '·'.len_utf8()..];
        let digits: String = suffix.chars().take_while(|c| c.is_ascii_digit()).collect();
        let months = digits.parse::<f64>().unwrap_or(12.0);
        (&s[..idx], months)
    } else {
        (s, 12.0)
    };

    let has_k_unit = range_part.to_lowercase().contains('k') || range_part.contains('千');
    let cleaned: String = range_part
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    // A leading '-' would otherwise be swallowed into the first number;
    // ranges never start with a negative number in source data so '-' is
    // always the separator.
    let mut parts = cleaned.splitn(2, '-');
    let min_raw = parts.next()?.trim();
    let max_raw = parts.next()?.trim();
    if min_raw.is_empty() || max_raw.is_empty() {
        return None;
    }

    let mut min_val: f64 = min_raw.parse().ok()?;
    let mut max_val: f64 = max_raw.parse().ok()?;

    if !has_k_unit {
        // Bare numbers are absolute currency units (e.g. "8000-12000");
        // normalize to thousands so downstream math is unit-consistent.
        min_val /= 1000.0;
        max_val /= 1000.0;
    }

    if min_val > max_val {
        std::mem::swap(&mut min_val, &mut max_val);
    }

    Some(ParsedSalary {
        min_k: min_val,
        max_k: max_val,
        months_per_year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_across_whitespace_case() {
        let a = compute_fingerprint("Python Developer", "Acme Inc", "15-25K", "Beijing");
        let b = compute_fingerprint("  python   developer", "ACME INC", "15-25K", "beijing");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn fingerprint_differs_on_salary_change() {
        let a = compute_fingerprint("Python Developer", "Acme Inc", "15-25K", "Beijing");
        let b = compute_fingerprint("Python Developer", "Acme Inc", "20-30K", "Beijing");
        assert_ne!(a, b);
    }

    #[test]
    fn parses_plain_k_range() {
        let p = parse_salary_range("15-25K").unwrap();
        assert_eq!(p.min_k, 15.0);
        assert_eq!(p.max_k, 25.0);
        assert_eq!(p.months_per_year, 12.0);
    }

    #[test]
    fn parses_13_month_suffix() {
        let p = parse_salary_range("15-25K·13薪").unwrap();
        assert_eq!(p.min_k, 15.0);
        assert_eq!(p.max_k, 25.0);
        assert_eq!(p.months_per_year, 13.0);
        let (lo, hi) = p.annual_range_k();
        assert!((lo - 16.25).abs() < 1e-6);
        assert!((hi - 27.0833).abs() < 1e-3);
    }

    #[test]
    fn negotiable_returns_none() {
        assert!(parse_salary_range("面议").is_none());
        assert!(parse_salary_range("  薪资面议 ").is_none());
    }

    #[test]
    fn bare_numbers_normalize_to_thousands() {
        let p = parse_salary_range("8000-12000").unwrap();
        assert_eq!(p.min_k, 8.0);
        assert_eq!(p.max_k, 12.0);
    }

    #[test]
    fn overlap_ratio_disjoint_is_zero() {
        let p = parse_salary_range("15-25K").unwrap();
        assert_eq!(p.overlap_ratio(30.0, 40.0), 0.0);
    }

    #[test]
    fn overlap_ratio_full_containment_is_one() {
        let p = parse_salary_range("15-25K").unwrap();
        assert_eq!(p.overlap_ratio(15.0, 25.0), 1.0);
    }
}
