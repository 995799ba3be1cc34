//! Casino pay table — fixed points → reward reference data.
//!
//! RULE: The table is read-only and ordered ascending by point threshold.
//! A lookup selects the highest threshold not exceeding the point total.

use regex::Regex;
use std::sync::LazyLock;

/// Dollars of coin-in per loyalty point.
pub const COIN_IN_PER_POINT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayTableEntry {
    pub offer_code:        &'static str,
    pub points:            u64,
    pub reward:            &'static str,
    pub next_cruise_bonus: &'static str,
    pub cabin_types:       &'static [&'static str],
}

const ALL_CABINS: &[&str] = &["Interior", "Oceanview", "Balcony", "Suite"];
const UP_TO_BALCONY: &[&str] = &["Interior", "Oceanview", "Balcony"];

pub const PAY_TABLE: &[PayTableEntry] = &[
    PayTableEntry {
        offer_code:        "2502A10",
        points:            400,
        reward:            "$100 Off (Interior Stateroom or Cruise Fare for One + Discounted Fare for Guest)",
        next_cruise_bonus: "Same cruise fare discount",
        cabin_types:       &["Interior"],
    },
    PayTableEntry {
        offer_code:        "2502A09",
        points:            600,
        reward:            "$200 Off",
        next_cruise_bonus: "Same cruise fare discount",
        cabin_types:       ALL_CABINS,
    },
    PayTableEntry {
        offer_code:        "2502A08",
        points:            800,
        reward:            "$250 Off",
        next_cruise_bonus: "Same cruise fare discount",
        cabin_types:       ALL_CABINS,
    },
    PayTableEntry {
        offer_code:        "2502A07",
        points:            1_200,
        reward:            "$300 Off",
        next_cruise_bonus: "Same cruise fare discount",
        cabin_types:       ALL_CABINS,
    },
    PayTableEntry {
        offer_code:        "2502A06",
        points:            1_500,
        reward:            "Interior or up to Balcony Stateroom (Cruise Fare for One + Discounted Fare for Guest)",
        next_cruise_bonus: "$100 FreePlay",
        cabin_types:       UP_TO_BALCONY,
    },
    PayTableEntry {
        offer_code:        "2502A05",
        points:            2_000,
        reward:            "Interior or up to Balcony Stateroom (Cruise Fare for One + Discounted Fare for Guest)",
        next_cruise_bonus: "$150 FreePlay",
        cabin_types:       UP_TO_BALCONY,
    },
    PayTableEntry {
        offer_code:        "2502A04",
        points:            3_000,
        reward:            "Oceanview Stateroom (Balcony on select sailings)",
        next_cruise_bonus: "$250 FreePlay",
        cabin_types:       &["Oceanview", "Balcony"],
    },
    PayTableEntry {
        offer_code:        "2502A03A",
        points:            4_000,
        reward:            "Balcony or Oceanview Stateroom (on select sailings)",
        next_cruise_bonus: "$500 FreePlay",
        cabin_types:       &["Balcony", "Oceanview"],
    },
    PayTableEntry {
        offer_code:        "2502A03",
        points:            6_500,
        reward:            "Balcony Stateroom (Junior Suite on select sailings)",
        next_cruise_bonus: "$750 FreePlay",
        cabin_types:       &["Balcony", "Junior Suite"],
    },
    PayTableEntry {
        offer_code:        "2502A02A",
        points:            9_000,
        reward:            "Junior Suite or Balcony Stateroom (on select sailings)",
        next_cruise_bonus: "$1,000 FreePlay",
        cabin_types:       &["Junior Suite", "Balcony"],
    },
    PayTableEntry {
        offer_code:        "2502A02",
        points:            15_000,
        reward:            "Junior Suite",
        next_cruise_bonus: "$1,500 FreePlay",
        cabin_types:       &["Junior Suite"],
    },
    PayTableEntry {
        offer_code:        "2502A01",
        points:            25_000,
        reward:            "Grand Suite (Junior Suite on select sailings)",
        next_cruise_bonus: "$2,500 FreePlay",
        cabin_types:       &["Suite", "Junior Suite"],
    },
    PayTableEntry {
        offer_code:        "2502AVIP2",
        points:            40_000,
        reward:            "Variable Category Suite (on select sailings)",
        next_cruise_bonus: "Variable FreePlay up to $5,000",
        cabin_types:       &["Suite"],
    },
];

static BONUS_DOLLARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+(?:,\d+)?)").expect("valid regex"));
static REWARD_OFF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)\s+Off").expect("valid regex"));

/// Highest tier whose threshold does not exceed `points`.
/// None below the lowest threshold.
pub fn tier_for_points(points: u64) -> Option<&'static PayTableEntry> {
    PAY_TABLE.iter().rev().find(|e| e.points <= points)
}

/// Tier for `points`, or the lowest tier when below every threshold.
pub fn tier_or_lowest(points: u64) -> &'static PayTableEntry {
    tier_for_points(points).unwrap_or(&PAY_TABLE[0])
}

/// First tier strictly above `points`. None once the top tier is reached.
pub fn next_tier(points: u64) -> Option<&'static PayTableEntry> {
    PAY_TABLE.iter().find(|e| e.points > points)
}

/// Look a tier up by offer code, or by a case-insensitive fragment of its
/// reward text.
pub fn find_tier(target: &str) -> Option<&'static PayTableEntry> {
    let needle = target.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    PAY_TABLE
        .iter()
        .find(|e| e.offer_code.eq_ignore_ascii_case(&needle))
        .or_else(|| {
            PAY_TABLE
                .iter()
                .find(|e| e.reward.to_lowercase().contains(&needle))
        })
}

impl PayTableEntry {
    /// Cash value of the tier: the first dollar figure in the bonus text,
    /// else the "$N Off" figure in the reward text, else zero.
    pub fn offer_value(&self) -> f64 {
        if let Some(caps) = BONUS_DOLLARS.captures(self.next_cruise_bonus) {
            if let Ok(v) = caps[1].replace(',', "").parse::<f64>() {
                return v;
            }
        }
        REWARD_OFF
            .captures(self.reward)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_ascending() {
        for pair in PAY_TABLE.windows(2) {
            assert!(pair[0].points < pair[1].points);
        }
    }

    #[test]
    fn exact_threshold_selects_that_tier() {
        assert_eq!(tier_for_points(9_000).map(|e| e.offer_code), Some("2502A02A"));
        assert_eq!(tier_for_points(8_999).map(|e| e.offer_code), Some("2502A03"));
        assert_eq!(tier_for_points(399), None);
        assert_eq!(tier_or_lowest(10).offer_code, "2502A10");
        assert_eq!(tier_for_points(1_000_000).map(|e| e.offer_code), Some("2502AVIP2"));
    }

    #[test]
    fn offer_value_reads_bonus_then_reward() {
        let a02a = find_tier("2502A02A").unwrap();
        assert_eq!(a02a.offer_value(), 1_000.0);
        let a07 = find_tier("2502A07").unwrap();
        assert_eq!(a07.offer_value(), 300.0);
        let vip = find_tier("2502avip2").unwrap();
        assert_eq!(vip.offer_value(), 5_000.0);
    }

    #[test]
    fn next_tier_stops_at_top() {
        assert_eq!(next_tier(20_720).map(|e| e.offer_code), Some("2502A01"));
        assert_eq!(next_tier(40_000), None);
    }
}
