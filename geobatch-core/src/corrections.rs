use regex::Regex;

lazy_static::lazy_static! {
    /// A segment made only of digits is a postal code
    static ref POSTAL_SEGMENT: Regex = Regex::new(r"^\d+$").unwrap();
}

/// A known provider mis-attribution and how to rewrite it
#[derive(Debug)]
struct Correction {
    /// Lowercase token that must appear in the full address
    landmark_token: &'static str,
    /// Lowercase state name the provider wrongly reports
    wrong_state: &'static str,
    corrected_state: &'static str,
    highway: &'static str,
    landmark: &'static str,
    country: &'static str,
    /// Lowercase segments dropped while rebuilding the address
    unwanted_segments: &'static [&'static str],
}

/// Hand-curated corrections. Add entries here; keep the matching rule strict.
const CORRECTIONS: &[Correction] = &[
    Correction {
        landmark_token: "redemption camp",
        wrong_state: "lagos",
        corrected_state: "Ogun State",
        highway: "Lagos-Ibadan Expressway",
        landmark: "Redemption Camp",
        country: "Nigeria",
        unwanted_segments: &["mowe", "obafemi owode", "lagos"],
    },
    Correction {
        landmark_token: "arepo",
        wrong_state: "lagos",
        corrected_state: "Ogun State",
        highway: "Lagos-Ibadan Expressway",
        landmark: "Arepo",
        country: "Nigeria",
        unwanted_segments: &["obafemi owode", "lagos", "ikeja"],
    },
];

/// Applies the correction table to a provider answer
/// Returns (state, full_address), unchanged when no rule matches
pub fn correct(full_address: &str, state: &str) -> (String, String) {
    let address_lower = full_address.to_lowercase();
    let state_lower = state.to_lowercase();

    let rule = CORRECTIONS.iter().find(|rule| {
        address_lower.contains(rule.landmark_token) && state_lower.contains(rule.wrong_state)
    });

    match rule {
        Some(rule) => {
            log::debug!(
                "Correcting state '{}' to '{}' near {}",
                state,
                rule.corrected_state,
                rule.landmark
            );
            (rule.corrected_state.to_string(), rebuild_address(full_address, rule))
        }
        None => (state.to_string(), full_address.to_string()),
    }
}

/// Rebuilds the address as highway, landmark, corrected state, country
fn rebuild_address(full_address: &str, rule: &Correction) -> String {
    let kept: Vec<&str> = full_address
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !POSTAL_SEGMENT.is_match(segment))
        .filter(|segment| !rule.unwanted_segments.contains(&segment.to_lowercase().as_str()))
        .collect();

    // Prefer the provider's own spelling when the segment survived filtering
    let pick = |canonical: &'static str| -> String {
        let wanted = canonical.to_lowercase();
        kept.iter()
            .find(|segment| segment.to_lowercase() == wanted)
            .map(|segment| segment.to_string())
            .unwrap_or_else(|| canonical.to_string())
    };

    [
        pick(rule.highway),
        pick(rule.landmark),
        rule.corrected_state.to_string(),
        pick(rule.country),
    ]
    .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_passes_through() {
        let (state, address) = correct("1 Broad Street, Lagos, Nigeria", "Lagos State");
        assert_eq!(state, "Lagos State");
        assert_eq!(address, "1 Broad Street, Lagos, Nigeria");
    }

    #[test]
    fn test_redemption_camp_moves_to_ogun() {
        let (state, address) = correct(
            "Lagos-Ibadan Expressway, Redemption Camp, Mowe, Obafemi Owode, Lagos, 110113, Nigeria",
            "Lagos State",
        );

        assert_eq!(state, "Ogun State");
        assert_eq!(
            address,
            "Lagos-Ibadan Expressway, Redemption Camp, Ogun State, Nigeria"
        );
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let (state, address) = correct("REDEMPTION CAMP, LAGOS, NIGERIA", "LAGOS");
        assert_eq!(state, "Ogun State");
        assert_eq!(
            address,
            "Lagos-Ibadan Expressway, REDEMPTION CAMP, Ogun State, NIGERIA"
        );
    }

    #[test]
    fn test_landmark_without_wrong_state_is_untouched() {
        let input = "Lagos-Ibadan Expressway, Redemption Camp, Ogun State, Nigeria";
        let (state, address) = correct(input, "Ogun State");
        assert_eq!(state, "Ogun State");
        assert_eq!(address, input);
    }

    #[test]
    fn test_correct_is_deterministic() {
        let input = "Arepo, Ikeja, Lagos, 112101, Nigeria";
        let first = correct(input, "Lagos");
        let second = correct(input, "Lagos");
        assert_eq!(first, second);
        assert_eq!(
            first,
            (
                "Ogun State".to_string(),
                "Lagos-Ibadan Expressway, Arepo, Ogun State, Nigeria".to_string()
            )
        );
    }

    #[test]
    fn test_postal_segment_pattern() {
        assert!(POSTAL_SEGMENT.is_match("110113"));
        assert!(!POSTAL_SEGMENT.is_match("Lagos 102273"));
    }
}
