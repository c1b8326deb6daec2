use similar::TextDiff;

/// Brands most often impersonated by credential-harvesting pages.
pub const PROTECTED_BRANDS: &[&str] = &[
    "paypal", "apple", "google", "microsoft", "amazon", "facebook",
    "netflix", "instagram", "chase", "wellsfargo",
];

const SIMILARITY_THRESHOLD: f32 = 0.8;

/// Undo the common digit and glyph-pair substitutions.
pub fn normalize_homoglyphs(label: &str) -> String {
    let mapped: String = label
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' | '!' | '|' => 'l',
            '3' => 'e',
            '4' | '@' => 'a',
            '5' | '$' => 's',
            '7' => 't',
            other => other,
        })
        .collect();
    mapped.replace("vv", "w").replace("rn", "m")
}

/// Brand that `label` imitates without actually being, if any.
pub fn imitated_brand(label: &str) -> Option<&'static str> {
    let raw = label.to_ascii_lowercase();
    let normalized = normalize_homoglyphs(&raw);

    for brand in PROTECTED_BRANDS {
        if raw.contains(brand) {
            continue;
        }
        if normalized.contains(brand) {
            return Some(brand);
        }
        let near_miss = raw
            .split('-')
            .filter(|t| !t.is_empty() && t != brand)
            .any(|t| TextDiff::from_chars(t, *brand).ratio() >= SIMILARITY_THRESHOLD);
        if near_miss {
            return Some(brand);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_substitution() {
        assert_eq!(imitated_brand("paypa1-verify-account"), Some("paypal"));
        assert_eq!(imitated_brand("micros0ft"), Some("microsoft"));
        assert_eq!(imitated_brand("faceb00k-login"), Some("facebook"));
    }

    #[test]
    fn test_glyph_pairs() {
        assert_eq!(normalize_homoglyphs("rnicrosoft"), "microsoft");
        assert_eq!(imitated_brand("rnicrosoft"), Some("microsoft"));
    }

    #[test]
    fn test_near_miss_spelling() {
        let cases = [
            ("gooogle", Some("google")),
            ("netfllx", Some("netflix")),
            // 0.833
            ("amazom", Some("amazon")),
            ("paypai", Some("paypal")),
            // exactly 0.8
            ("chaze", Some("chase")),
            ("secure-chaze", Some("chase")),
        ];
        for (label, expected) in cases {
            assert_eq!(imitated_brand(label), expected, "label {}", label);
        }
    }

    #[test]
    fn test_threshold_boundary() {
        assert!((TextDiff::from_chars("chaze", "chase").ratio() - 0.8).abs() < 1e-6);
        assert!(TextDiff::from_chars("chaze", "chase").ratio() >= SIMILARITY_THRESHOLD);
        // 2 * 2 / 10
        assert!(TextDiff::from_chars("apron", "apple").ratio() < SIMILARITY_THRESHOLD);
        assert_eq!(imitated_brand("apron"), None);
    }

    #[test]
    fn test_genuine_brand_not_flagged() {
        assert_eq!(imitated_brand("paypal"), None);
        assert_eq!(imitated_brand("google"), None);
        assert_eq!(imitated_brand("pineapple"), None);
    }

    #[test]
    fn test_unrelated_words_not_flagged() {
        assert_eq!(imitated_brand("example"), None);
        assert_eq!(imitated_brand("weather"), None);
        assert_eq!(imitated_brand("rust-lang"), None);
    }
}
