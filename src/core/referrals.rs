use rand::{distributions::Alphanumeric, Rng};

/// Length of the random suffix appended to every referral/affiliate code
const SUFFIX_LEN: usize = 4;

/// Longest slug taken from the owner's display name
const MAX_SLUG_LEN: usize = 12;

/// Credit owed to the referrer for a completed purchase, in integer cents
///
/// Computed over the net (post-discount) amount and rounded down.
pub fn referral_credit_cents(net_amount_cents: i64, credit_pct: i32) -> i64 {
    if net_amount_cents <= 0 || credit_pct <= 0 {
        return 0;
    }
    net_amount_cents * i64::from(credit_pct.min(100)) / 100
}

/// Generate a shareable code from a display name, e.g. "JANE-X4F7"
///
/// The slug keeps only ASCII alphanumerics; callers retry on a rare
/// suffix collision since codes are a primary key.
pub fn generate_referral_code(display_name: &str) -> String {
    let slug: String = display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_SLUG_LEN)
        .collect::<String>()
        .to_ascii_uppercase();

    let slug = if slug.is_empty() { "VOICE".to_string() } else { slug };

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();

    format!("{}-{}", slug, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_rounds_down() {
        // 10% of 4165 is 416.5
        assert_eq!(referral_credit_cents(4_165, 10), 416);
    }

    #[test]
    fn test_credit_edges() {
        assert_eq!(referral_credit_cents(0, 10), 0);
        assert_eq!(referral_credit_cents(-500, 10), 0);
        assert_eq!(referral_credit_cents(1_000, 0), 0);
        assert_eq!(referral_credit_cents(1_000, 100), 1_000);
        assert_eq!(referral_credit_cents(1_000, 150), 1_000);
    }

    #[test]
    fn test_code_shape() {
        let code = generate_referral_code("Jane Doe");
        let (slug, suffix) = code.split_once('-').unwrap();
        assert_eq!(slug, "JANEDOE");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!suffix.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_code_slug_truncated() {
        let code = generate_referral_code("A Very Long Display Name Indeed");
        let (slug, _) = code.split_once('-').unwrap();
        assert!(slug.len() <= MAX_SLUG_LEN);
    }

    #[test]
    fn test_code_fallback_slug() {
        let code = generate_referral_code("!!! ???");
        assert!(code.starts_with("VOICE-"));
    }

    #[test]
    fn test_codes_vary() {
        let a = generate_referral_code("Jane");
        let b = generate_referral_code("Jane");
        // Same slug, random suffixes; equality would be a 1-in-36^4 fluke
        assert!(a.starts_with("JANE-") && b.starts_with("JANE-"));
    }
}
