/// Billing model for a pricing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingKind {
    OneTime,
    Monthly,
}

/// A purchasable tier of the product
#[derive(Debug, Clone, Copy)]
pub struct PricingTier {
    pub id: &'static str,
    pub name: &'static str,
    pub amount_cents: i64,
    pub currency: &'static str,
    /// Voice profile generations granted by the purchase
    pub generations: i32,
    /// Whether the tier unlocks the testing playground
    pub playground: bool,
    pub billing: BillingKind,
}

/// Tier catalog. Amounts are integer cents.
pub const TIERS: &[PricingTier] = &[
    PricingTier {
        id: "essential",
        name: "Essential",
        amount_cents: 4_900,
        currency: "usd",
        generations: 1,
        playground: false,
        billing: BillingKind::OneTime,
    },
    PricingTier {
        id: "professional",
        name: "Professional",
        amount_cents: 9_900,
        currency: "usd",
        generations: 3,
        playground: true,
        billing: BillingKind::OneTime,
    },
    PricingTier {
        id: "studio",
        name: "Studio",
        amount_cents: 24_900,
        currency: "usd",
        generations: 10,
        playground: true,
        billing: BillingKind::OneTime,
    },
    PricingTier {
        id: "creator-monthly",
        name: "Creator Monthly",
        amount_cents: 1_900,
        currency: "usd",
        generations: 0,
        playground: true,
        billing: BillingKind::Monthly,
    },
];

/// Look up a tier by its identifier
pub fn lookup_tier(id: &str) -> Option<&'static PricingTier> {
    TIERS.iter().find(|tier| tier.id == id)
}

/// Whether the caller may use the testing playground
///
/// Access comes from owning a completed playground-enabled tier or from an
/// active subscription.
pub fn playground_access(purchased_tier_ids: &[String], subscription_active: bool) -> bool {
    if subscription_active {
        return true;
    }

    purchased_tier_ids
        .iter()
        .any(|id| lookup_tier(id).map(|tier| tier.playground).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_tiers() {
        let essential = lookup_tier("essential").unwrap();
        assert_eq!(essential.amount_cents, 4_900);
        assert_eq!(essential.generations, 1);
        assert!(!essential.playground);

        let studio = lookup_tier("studio").unwrap();
        assert_eq!(studio.generations, 10);
        assert!(studio.playground);
    }

    #[test]
    fn test_lookup_unknown_tier() {
        assert!(lookup_tier("enterprise").is_none());
        assert!(lookup_tier("").is_none());
    }

    #[test]
    fn test_subscription_tier_is_monthly() {
        let sub = lookup_tier("creator-monthly").unwrap();
        assert_eq!(sub.billing, BillingKind::Monthly);
        assert_eq!(sub.generations, 0);
    }

    #[test]
    fn test_playground_access_from_tier() {
        assert!(playground_access(&["professional".to_string()], false));
        assert!(!playground_access(&["essential".to_string()], false));
        assert!(!playground_access(&[], false));
    }

    #[test]
    fn test_playground_access_from_subscription() {
        assert!(playground_access(&[], true));
        assert!(playground_access(&["essential".to_string()], true));
    }

    #[test]
    fn test_playground_access_ignores_unknown_tiers() {
        assert!(!playground_access(&["deleted-tier".to_string()], false));
    }
}
