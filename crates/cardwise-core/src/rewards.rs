//! Static credit card catalog and reward optimization
//!
//! The catalog is a fixed snapshot of popular US cards. Recommendation picks
//! the card with the best net annual reward for a single category at a given
//! monthly spend: annualize the spend, clamp to the rule's annual cap, apply
//! the rate, subtract the annual fee.

/// A single earning rule on a card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardRule {
    /// Reward category this rule earns in; "all" is the catch-all
    pub category: &'static str,
    /// Earn rate as a percentage (or points multiplier)
    pub rate: f64,
    /// Annual spend cap in USD, if the rule is capped
    pub cap: Option<f64>,
    pub notes: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignupBonus {
    /// Bonus value (USD or points, per the card's program)
    pub amount: f64,
    pub spend_requirement: f64,
    pub timeframe_months: u32,
    pub notes: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditCard {
    pub id: &'static str,
    pub name: &'static str,
    pub issuer: &'static str,
    pub rewards: &'static [RewardRule],
    pub annual_fee: f64,
    pub signup_bonus: Option<SignupBonus>,
}

pub const CATALOG: &[CreditCard] = &[
    CreditCard {
        id: "chase-freedom-flex",
        name: "Chase Freedom Flex",
        issuer: "Chase",
        rewards: &[
            RewardRule {
                category: "dining",
                rate: 3.0,
                cap: None,
                notes: Some("3% cash back on dining"),
            },
            RewardRule {
                category: "drugstores",
                rate: 3.0,
                cap: None,
                notes: Some("3% cash back at drugstores"),
            },
            RewardRule {
                category: "gas_stations",
                rate: 5.0,
                cap: Some(1500.0),
                notes: Some("5% rotating quarterly categories"),
            },
            RewardRule {
                category: "grocery_stores",
                rate: 5.0,
                cap: Some(12000.0),
                notes: Some("5% at grocery stores first year (via offer)"),
            },
            RewardRule {
                category: "all",
                rate: 1.0,
                cap: None,
                notes: Some("1% on all other purchases"),
            },
        ],
        annual_fee: 0.0,
        signup_bonus: Some(SignupBonus {
            amount: 200.0,
            spend_requirement: 500.0,
            timeframe_months: 3,
            notes: Some("Earn $200 bonus after $500 spend in 3 months"),
        }),
    },
    CreditCard {
        id: "chase-sapphire-preferred",
        name: "Chase Sapphire Preferred",
        issuer: "Chase",
        rewards: &[
            RewardRule {
                category: "travel",
                rate: 5.0,
                cap: None,
                notes: Some("5x on travel purchased through Chase"),
            },
            RewardRule {
                category: "travel_general",
                rate: 2.0,
                cap: None,
                notes: Some("2x on other travel"),
            },
            RewardRule {
                category: "dining",
                rate: 3.0,
                cap: None,
                notes: Some("3x on dining"),
            },
            RewardRule {
                category: "streaming",
                rate: 3.0,
                cap: None,
                notes: Some("3x on select streaming services"),
            },
            RewardRule {
                category: "online_grocery",
                rate: 3.0,
                cap: None,
                notes: Some("3x on online grocery (excluding Target/Walmart)"),
            },
            RewardRule {
                category: "all",
                rate: 1.0,
                cap: None,
                notes: None,
            },
        ],
        annual_fee: 95.0,
        signup_bonus: Some(SignupBonus {
            amount: 60000.0,
            spend_requirement: 4000.0,
            timeframe_months: 3,
            notes: Some("60k Ultimate Rewards points after $4k/3mo"),
        }),
    },
    CreditCard {
        id: "amex-gold",
        name: "American Express Gold",
        issuer: "American Express",
        rewards: &[
            RewardRule {
                category: "dining",
                rate: 4.0,
                cap: None,
                notes: Some("4x points at restaurants"),
            },
            RewardRule {
                category: "grocery_stores",
                rate: 4.0,
                cap: Some(25000.0),
                notes: Some("4x at U.S. supermarkets (up to $25k/year)"),
            },
            RewardRule {
                category: "travel_general",
                rate: 3.0,
                cap: None,
                notes: Some("3x on flights booked directly or via Amex Travel"),
            },
            RewardRule {
                category: "all",
                rate: 1.0,
                cap: None,
                notes: None,
            },
        ],
        annual_fee: 250.0,
        signup_bonus: Some(SignupBonus {
            amount: 60000.0,
            spend_requirement: 4000.0,
            timeframe_months: 6,
            notes: Some("60k Membership Rewards points after $4k/6mo"),
        }),
    },
    CreditCard {
        id: "amex-blue-cash-preferred",
        name: "Blue Cash Preferred Card from American Express",
        issuer: "American Express",
        rewards: &[
            RewardRule {
                category: "grocery_stores",
                rate: 6.0,
                cap: Some(6000.0),
                notes: Some("6% cash back at U.S. supermarkets (up to $6k/year)"),
            },
            RewardRule {
                category: "streaming",
                rate: 6.0,
                cap: None,
                notes: Some("6% on select U.S. streaming services"),
            },
            RewardRule {
                category: "transit",
                rate: 3.0,
                cap: None,
                notes: Some("3% on transit (taxi, rideshare, parking, etc.)"),
            },
            RewardRule {
                category: "gas_stations",
                rate: 3.0,
                cap: None,
                notes: Some("3% at U.S. gas stations"),
            },
            RewardRule {
                category: "all",
                rate: 1.0,
                cap: None,
                notes: None,
            },
        ],
        annual_fee: 95.0,
        signup_bonus: Some(SignupBonus {
            amount: 300.0,
            spend_requirement: 3000.0,
            timeframe_months: 6,
            notes: Some("Earn $300 back after $3k/6mo"),
        }),
    },
    CreditCard {
        id: "citi-double-cash",
        name: "Citi Double Cash",
        issuer: "Citi",
        rewards: &[RewardRule {
            category: "all",
            rate: 2.0,
            cap: None,
            notes: Some("2% cash back on everything (1% when you buy, 1% when you pay)"),
        }],
        annual_fee: 0.0,
        signup_bonus: None,
    },
    CreditCard {
        id: "citi-premier",
        name: "Citi Premier",
        issuer: "Citi",
        rewards: &[
            RewardRule {
                category: "travel_general",
                rate: 3.0,
                cap: None,
                notes: Some("3x on air travel and hotels"),
            },
            RewardRule {
                category: "gas_stations",
                rate: 3.0,
                cap: None,
                notes: Some("3x at gas stations"),
            },
            RewardRule {
                category: "dining",
                rate: 3.0,
                cap: None,
                notes: Some("3x on dining"),
            },
            RewardRule {
                category: "grocery_stores",
                rate: 3.0,
                cap: None,
                notes: Some("3x at supermarkets"),
            },
            RewardRule {
                category: "all",
                rate: 1.0,
                cap: None,
                notes: None,
            },
        ],
        annual_fee: 95.0,
        signup_bonus: Some(SignupBonus {
            amount: 60000.0,
            spend_requirement: 4000.0,
            timeframe_months: 3,
            notes: Some("60k ThankYou points after $4k/3mo"),
        }),
    },
    CreditCard {
        id: "capital-one-venture",
        name: "Capital One Venture",
        issuer: "Capital One",
        rewards: &[
            RewardRule {
                category: "travel_general",
                rate: 2.0,
                cap: None,
                notes: Some("2x miles on every purchase"),
            },
            RewardRule {
                category: "all",
                rate: 2.0,
                cap: None,
                notes: Some("Flat 2x everywhere"),
            },
        ],
        annual_fee: 95.0,
        signup_bonus: Some(SignupBonus {
            amount: 75000.0,
            spend_requirement: 4000.0,
            timeframe_months: 3,
            notes: Some("75k miles after $4k/3mo"),
        }),
    },
    CreditCard {
        id: "capital-one-savor-one",
        name: "Capital One SavorOne",
        issuer: "Capital One",
        rewards: &[
            RewardRule {
                category: "dining",
                rate: 3.0,
                cap: None,
                notes: Some("3% cash back on dining"),
            },
            RewardRule {
                category: "entertainment",
                rate: 3.0,
                cap: None,
                notes: Some("3% on entertainment"),
            },
            RewardRule {
                category: "streaming",
                rate: 3.0,
                cap: None,
                notes: Some("3% on popular streaming services"),
            },
            RewardRule {
                category: "grocery_stores",
                rate: 3.0,
                cap: None,
                notes: Some("3% at grocery stores"),
            },
            RewardRule {
                category: "all",
                rate: 1.0,
                cap: None,
                notes: None,
            },
        ],
        annual_fee: 0.0,
        signup_bonus: Some(SignupBonus {
            amount: 200.0,
            spend_requirement: 500.0,
            timeframe_months: 3,
            notes: Some("Earn $200 after $500/3mo"),
        }),
    },
    CreditCard {
        id: "discover-it-cash-back",
        name: "Discover it Cash Back",
        issuer: "Discover",
        rewards: &[
            RewardRule {
                category: "gas_stations",
                rate: 5.0,
                cap: Some(1500.0),
                notes: Some("5% rotating quarterly categories (gas, etc.)"),
            },
            RewardRule {
                category: "grocery_stores",
                rate: 5.0,
                cap: Some(1500.0),
                notes: Some("5% at supermarkets in applicable quarters"),
            },
            RewardRule {
                category: "restaurants",
                rate: 5.0,
                cap: Some(1500.0),
                notes: Some("5% at restaurants in applicable quarters"),
            },
            RewardRule {
                category: "online_shopping",
                rate: 5.0,
                cap: Some(1500.0),
                notes: Some("5% at select online retailers in applicable quarters"),
            },
            RewardRule {
                category: "all",
                rate: 1.0,
                cap: None,
                notes: Some("1% on all other purchases"),
            },
        ],
        annual_fee: 0.0,
        signup_bonus: Some(SignupBonus {
            amount: 0.0,
            spend_requirement: 0.0,
            timeframe_months: 12,
            notes: Some("Cashback Match: Discover matches all cash back at end of first year"),
        }),
    },
];

/// Map a provider's transaction category labels to a reward category
///
/// Primary label is tried first, then the secondary, then the "all"
/// catch-all. Matching is case-insensitive.
pub fn reward_category_for_provider(labels: &[String]) -> &'static str {
    fn lookup(label: &str) -> Option<&'static str> {
        let mapped = match label {
            "food and drink" | "restaurants" | "fast food" | "bars" => "dining",
            "gas stations" | "gas" => "gas_stations",
            "groceries" | "supermarkets" | "convenience stores" => "grocery_stores",
            "travel" | "airlines and aviation services" | "lodging" => "travel_general",
            "drug stores and pharmacies" | "drugstores" => "drugstores",
            "entertainment" | "movies and music" => "entertainment",
            "shopping" => "shopping",
            "online shopping" => "online_shopping",
            "subscription" | "subscription services" => "streaming",
            "public transportation services" | "taxicabs and limousines" => "transit",
            _ => return None,
        };
        Some(mapped)
    }

    let primary = labels.first().map(|l| l.to_lowercase()).unwrap_or_default();
    let secondary = labels.get(1).map(|l| l.to_lowercase()).unwrap_or_default();

    lookup(&primary)
        .or_else(|| lookup(&secondary))
        .unwrap_or("all")
}

/// Best card in the static catalog for a category at a monthly spend
///
/// Returns `None` when no card nets a positive annual reward.
pub fn best_card_for_category(category: &str, monthly_spend: f64) -> Option<&'static CreditCard> {
    best_card_in(CATALOG, category, monthly_spend)
}

pub fn best_card_in<'a>(
    catalog: &'a [CreditCard],
    category: &str,
    monthly_spend: f64,
) -> Option<&'a CreditCard> {
    let mut best_card: Option<&CreditCard> = None;
    let mut best_reward = 0.0;

    for card in catalog {
        for rule in card.rewards {
            if rule.category != category && rule.category != "all" {
                continue;
            }

            // A catch-all rule earns nothing for a specific category query;
            // it still subjects the card's fee to the comparison
            let effective_rate = if rule.category == category {
                rule.rate
            } else {
                0.0
            };

            let annual_spend = monthly_spend * 12.0;
            let capped_spend = match rule.cap {
                Some(cap) => annual_spend.min(cap),
                None => annual_spend,
            };
            let annual_reward = capped_spend * effective_rate / 100.0;
            let net_reward = annual_reward - card.annual_fee;

            if net_reward > best_reward {
                best_reward = net_reward;
                best_card = Some(card);
            }
        }
    }

    best_card
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_FEE_DINING: CreditCard = CreditCard {
        id: "card-a",
        name: "Card A",
        issuer: "Test",
        rewards: &[RewardRule {
            category: "dining",
            rate: 3.0,
            cap: None,
            notes: None,
        }],
        annual_fee: 0.0,
        signup_bonus: None,
    };

    const FEE_DINING_CAPPED: CreditCard = CreditCard {
        id: "card-b",
        name: "Card B",
        issuer: "Test",
        rewards: &[RewardRule {
            category: "dining",
            rate: 5.0,
            cap: Some(1200.0),
            notes: None,
        }],
        annual_fee: 95.0,
        signup_bonus: None,
    };

    #[test]
    fn fee_and_cap_can_flip_the_winner() {
        // $200/mo dining: A nets 2400 * 3% = $72; B nets min(2400, 1200) * 5%
        // - 95 = -$35. The lower headline rate wins.
        let cards = [NO_FEE_DINING, FEE_DINING_CAPPED];
        let best = best_card_in(&cards, "dining", 200.0).unwrap();
        assert_eq!(best.id, "card-a");
    }

    #[test]
    fn zero_spend_recommends_nothing() {
        assert!(best_card_for_category("dining", 0.0).is_none());
    }

    #[test]
    fn no_positive_net_means_no_recommendation() {
        // Only a fee card qualifies and its net is negative
        let cards = [FEE_DINING_CAPPED];
        assert!(best_card_in(&cards, "dining", 10.0).is_none());
    }

    #[test]
    fn unknown_category_only_fee_free_catch_all_can_win() {
        // "all" rules earn their rate only when the query is literally "all",
        // so an unknown category finds no positive net anywhere
        let best = best_card_for_category("weird_category", 500.0);
        assert!(best.is_none());
    }

    #[test]
    fn catch_all_query_earns_flat_rate() {
        // "all" at $500/mo: Citi Double Cash nets 6000 * 2% = $120 with no fee
        let best = best_card_for_category("all", 500.0).unwrap();
        assert_eq!(best.id, "citi-double-cash");
    }

    #[test]
    fn grocery_spend_picks_highest_net_card() {
        // $400/mo groceries = $4800/yr.
        // Blue Cash Preferred: min(4800, 6000) * 6% - 95 = $193
        // Freedom Flex: 4800 * 5% = $240, no fee
        let best = best_card_for_category("grocery_stores", 400.0).unwrap();
        assert_eq!(best.id, "chase-freedom-flex");
    }

    #[test]
    fn first_card_wins_ties() {
        let duplicate = CreditCard {
            id: "card-a2",
            ..NO_FEE_DINING
        };
        let cards = [NO_FEE_DINING, duplicate];
        let best = best_card_in(&cards, "dining", 100.0).unwrap();
        assert_eq!(best.id, "card-a");
    }

    #[test]
    fn provider_labels_map_to_reward_categories() {
        let labels = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(reward_category_for_provider(&labels(&["Food and Drink"])), "dining");
        assert_eq!(reward_category_for_provider(&labels(&["Travel", "Lodging"])), "travel_general");
        // Primary unknown, secondary recognized
        assert_eq!(
            reward_category_for_provider(&labels(&["Payment", "Gas Stations"])),
            "gas_stations"
        );
        assert_eq!(reward_category_for_provider(&labels(&["Mystery"])), "all");
        assert_eq!(reward_category_for_provider(&[]), "all");
    }
}
