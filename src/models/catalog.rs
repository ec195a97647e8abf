//! Static service catalog. This is the only source of prices; anything a
//! client submits about price or service name is ignored.

use serde::Serialize;

pub const CATALOG_VERSION: &str = "2025.1";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePackage {
    pub id: &'static str,
    pub name: &'static str,
    pub price_low: i64,
    pub price_high: i64,
    pub avg_price: i64,
    pub description: &'static str,
    pub includes: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipTier {
    pub id: &'static str,
    pub name: &'static str,
    pub price: i64,
    pub frequency: &'static str,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub recommended_for: &'static str,
}

/// A catalog entry resolved to the name and price a booking is recorded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    pub id: &'static str,
    pub name: &'static str,
    pub price: i64,
}

pub static SERVICE_PACKAGES: &[ServicePackage] = &[
    ServicePackage {
        id: "basic",
        name: "The \"Quick Refresh\"",
        price_low: 45,
        price_high: 75,
        avg_price: 60,
        description: "Maintain a professional image without lifting a finger. Premium pH-neutral soaps preserve your paint's integrity.",
        includes: &["Foam Cannon Bath", "Spot-Free Rinse", "Tire Shine", "Interior Vacuum"],
        badge: None,
    },
    ServicePackage {
        id: "silver",
        name: "The \"Family Hauler\"",
        price_low: 130,
        price_high: 220,
        avg_price: 175,
        description: "Deep cleaning carpets and sanitizing surfaces after road trips and school runs.",
        includes: &["Deep Interior Scrub", "Carpet Shampoo", "Leather Wipe Down", "Spray Wax Protection"],
        badge: None,
    },
    ServicePackage {
        id: "ev_special",
        name: "The \"Electric\"",
        price_low: 150,
        price_high: 250,
        avg_price: 200,
        description: "Sensor-safe techniques and EV-specific cleaners.",
        includes: &["Vegan Leather Care", "Frunk Cleaning", "Charge Port Detail", "Scratch-Free Wash"],
        badge: Some("TESLA FRIENDLY"),
    },
    ServicePackage {
        id: "tesla_3y_special",
        name: "The \"Model 3/Y\" Kit",
        price_low: 150,
        price_high: 250,
        avg_price: 200,
        description: "Maintenance targeting common Model 3/Y wear points.",
        includes: &["Vegan Leather Conditioning", "Glass Roof Clarity", "Frunk & Sub-Trunk", "Screen Fingerprint Removal"],
        badge: Some("OWNER FAVORITE"),
    },
    ServicePackage {
        id: "gold",
        name: "The \"Showroom\"",
        price_low: 220,
        price_high: 350,
        avg_price: 285,
        description: "Comprehensive detail that restores the just-off-the-lot feeling.",
        includes: &["Clay Bar Treatment", "Iron Decon", "6-Month Sealant", "Engine Bay Rinse"],
        badge: None,
    },
    ServicePackage {
        id: "advanced",
        name: "Ceramic Coating",
        price_low: 450,
        price_high: 2000,
        avg_price: 1000,
        description: "A hardened shield that repels dirt and UV rays for years.",
        includes: &["Multi-Year Protection", "Paint Correction", "Hydrophobic Layer", "Carfax Report Update"],
        badge: None,
    },
];

pub static MEMBERSHIP_TIERS: &[MembershipTier] = &[
    MembershipTier {
        id: "basic_membership",
        name: "The Regular",
        price: 69,
        frequency: "Monthly",
        description: "We come by once a month to keep it fresh.",
        features: &["1 Premium Wash / Month", "Vacuum & Wipe Down", "10% OFF other services", "Cancel anytime"],
        recommended_for: "Leased Cars",
    },
    MembershipTier {
        id: "premium_membership",
        name: "The \"Always Clean\"",
        price: 179,
        frequency: "Bi-Weekly",
        description: "We stop by every two weeks.",
        features: &["2 Visits Per Month", "1 Full Interior Deep Clean", "1 Maintenance Wash", "Priority Scheduling"],
        recommended_for: "School Drop-off Line",
    },
    MembershipTier {
        id: "elite_membership",
        name: "The Enthusiast",
        price: 349,
        frequency: "Custom",
        description: "For the weekend toy or the baby of the garage.",
        features: &["Quarterly Detail + Ceramic Boost", "Engine Bay Included", "Annual Polish", "Direct line to the owners"],
        recommended_for: "Sports Cars",
    },
];

#[derive(Debug, Clone)]
pub struct PromoOffer {
    pub code: &'static str,
    pub service_id: &'static str,
    pub name: &'static str,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct Upgrade {
    pub id: &'static str,
    pub name: &'static str,
    pub price: i64,
}

pub static PROMO_OFFERS: &[PromoOffer] = &[PromoOffer {
    code: "kores",
    service_id: "exterior_wash",
    name: "Exterior Wash (KoRes Promo)",
    price: 0,
}];

pub static UPGRADES: &[Upgrade] = &[
    Upgrade { id: "interior", name: "Interior Wash", price: 37 },
    Upgrade { id: "wax", name: "Full Wax", price: 127 },
    Upgrade { id: "ceramic_windows", name: "Window Ceramic", price: 77 },
];

pub fn find_package(id: &str) -> Option<&'static ServicePackage> {
    SERVICE_PACKAGES.iter().find(|p| p.id == id)
}

/// Resolves a client-supplied service id against packages, then memberships.
/// Packages are booked at their average price.
pub fn resolve_service(id: &str) -> Option<ResolvedService> {
    if let Some(pkg) = find_package(id) {
        return Some(ResolvedService {
            id: pkg.id,
            name: pkg.name,
            price: pkg.avg_price,
        });
    }
    MEMBERSHIP_TIERS
        .iter()
        .find(|t| t.id == id)
        .map(|t| ResolvedService {
            id: t.id,
            name: t.name,
            price: t.price,
        })
}

pub fn find_promo_offer(code: &str) -> Option<&'static PromoOffer> {
    PROMO_OFFERS.iter().find(|o| o.code == code)
}

pub fn find_upgrade(id: &str) -> Option<&'static Upgrade> {
    UPGRADES.iter().find(|u| u.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_package_uses_average_price() {
        let resolved = resolve_service("gold").unwrap();
        assert_eq!(resolved.name, "The \"Showroom\"");
        assert_eq!(resolved.price, 285);
    }

    #[test]
    fn test_resolve_membership() {
        let resolved = resolve_service("premium_membership").unwrap();
        assert_eq!(resolved.price, 179);
    }

    #[test]
    fn test_resolve_unknown_service() {
        assert!(resolve_service("platinum").is_none());
        assert!(resolve_service("").is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<&str> = SERVICE_PACKAGES
            .iter()
            .map(|p| p.id)
            .chain(MEMBERSHIP_TIERS.iter().map(|t| t.id))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_price_ranges_contain_average() {
        for pkg in SERVICE_PACKAGES {
            assert!(pkg.price_low <= pkg.avg_price && pkg.avg_price <= pkg.price_high, "{}", pkg.id);
        }
    }

    #[test]
    fn test_promo_and_upgrade_lookup() {
        assert_eq!(find_promo_offer("kores").unwrap().price, 0);
        assert!(find_promo_offer("KORES").is_none());
        assert_eq!(find_upgrade("wax").unwrap().price, 127);
        assert!(find_upgrade("rims").is_none());
    }
}
