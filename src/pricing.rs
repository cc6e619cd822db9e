//! Pricing estimator for aluminum-fixture projects
//!
//! Pure arithmetic over a fixed constant table. The chatbot's calculation
//! node and the public `/api/estimate` endpoint both go through
//! [`estimate`].

use serde::{Deserialize, Serialize};

/// Service categories the contractor quotes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    WindowsDoors,
    Facades,
    Railings,
    Brises,
}

impl Service {
    /// Parse the canonical slug stored in collected data.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "windows_doors" => Some(Service::WindowsDoors),
            "facades" => Some(Service::Facades),
            "railings" => Some(Service::Railings),
            "brises" => Some(Service::Brises),
            _ => None,
        }
    }

    /// Material cost per square meter, in BRL.
    fn material_unit_cost(self) -> f64 {
        match self {
            Service::WindowsDoors => 280.0,
            Service::Facades => 450.0,
            Service::Railings => 220.0,
            Service::Brises => 350.0,
        }
    }
}

/// Finish tiers offered in the quote flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Standard,
    Premium,
    Luxury,
}

impl Quality {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "standard" => Some(Quality::Standard),
            "premium" => Some(Quality::Premium),
            "luxury" => Some(Quality::Luxury),
            _ => None,
        }
    }

    /// Complexity multiplier applied to materials and execution time.
    fn complexity_factor(self) -> f64 {
        match self {
            Quality::Standard => 1.0,
            Quality::Premium => 1.35,
            Quality::Luxury => 1.8,
        }
    }
}

/// Square meters one team executes per working day.
const DAILY_EXECUTION_RATE: f64 = 10.0;
/// Day rate per worker, in BRL.
const DAILY_RATE_PER_WORKER: f64 = 150.0;
/// Workers on a standard crew.
const TEAM_SIZE: f64 = 7.0;
/// Margin applied on top of material + labor.
const PROFIT_MARGIN_MULTIPLIER: f64 = 1.25;

/// Cost and schedule breakdown for one project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub total: f64,
    pub material_cost: f64,
    pub labor_cost: f64,
    pub estimated_days: u32,
}

/// Compute a quote for `area` square meters of the given service/quality.
///
/// Returns `None` for a non-positive or non-finite area. Deterministic:
/// same inputs always yield the same breakdown.
pub fn estimate(service: Service, area: f64, quality: Quality) -> Option<Estimate> {
    if !area.is_finite() || area <= 0.0 {
        return None;
    }

    let factor = quality.complexity_factor();
    let material_cost = service.material_unit_cost() * area * factor;

    // ceil keeps partial days billable as whole days
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let estimated_days = ((area / DAILY_EXECUTION_RATE) * factor).ceil() as u32;
    let labor_cost = f64::from(estimated_days) * DAILY_RATE_PER_WORKER * TEAM_SIZE;

    let total = (material_cost + labor_cost) * PROFIT_MARGIN_MULTIPLIER;

    Some(Estimate {
        total,
        material_cost,
        labor_cost,
        estimated_days,
    })
}

/// Format a BRL amount the way the chat renders it: `R$ 9.625,00`.
pub fn format_brl(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{frac:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn reference_quote_windows_doors_20sqm_standard() {
        // 280 * 20 = 5600 materials; ceil(20/10) = 2 days;
        // 2 * 150 * 7 = 2100 labor; (5600 + 2100) * 1.25 = 9625
        let e = estimate(Service::WindowsDoors, 20.0, Quality::Standard).unwrap();
        assert!(close(e.material_cost, 5600.0));
        assert_eq!(e.estimated_days, 2);
        assert!(close(e.labor_cost, 2100.0));
        assert!(close(e.total, 9625.0));
    }

    #[test]
    fn reference_quote_railings_10sqm_standard() {
        // 220 * 10 = 2200 materials; ceil(10/10) = 1 day;
        // 1 * 150 * 7 = 1050 labor; (2200 + 1050) * 1.25 = 4062.50
        let e = estimate(Service::Railings, 10.0, Quality::Standard).unwrap();
        assert!(close(e.material_cost, 2200.0));
        assert_eq!(e.estimated_days, 1);
        assert!(close(e.labor_cost, 1050.0));
        assert!(close(e.total, 4062.5));
        assert_eq!(format_brl(e.total), "R$ 4.062,50");
    }

    #[test]
    fn rejects_non_positive_area() {
        for service in [
            Service::WindowsDoors,
            Service::Facades,
            Service::Railings,
            Service::Brises,
        ] {
            for quality in [Quality::Standard, Quality::Premium, Quality::Luxury] {
                assert!(estimate(service, 0.0, quality).is_none());
                assert!(estimate(service, -5.0, quality).is_none());
            }
        }
        assert!(estimate(Service::Facades, f64::NAN, Quality::Standard).is_none());
        assert!(estimate(Service::Facades, f64::INFINITY, Quality::Standard).is_none());
    }

    #[test]
    fn deterministic() {
        let a = estimate(Service::Railings, 37.5, Quality::Premium).unwrap();
        let b = estimate(Service::Railings, 37.5, Quality::Premium).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn quality_tiers_are_strictly_ordered() {
        let s = estimate(Service::Brises, 42.0, Quality::Standard).unwrap();
        let p = estimate(Service::Brises, 42.0, Quality::Premium).unwrap();
        let l = estimate(Service::Brises, 42.0, Quality::Luxury).unwrap();
        assert!(l.total > p.total);
        assert!(p.total > s.total);
    }

    #[test]
    fn monotonic_in_area() {
        let mut prev = estimate(Service::Facades, 1.0, Quality::Luxury).unwrap();
        for step in 2..=200 {
            let next = estimate(Service::Facades, f64::from(step), Quality::Luxury).unwrap();
            assert!(next.total >= prev.total);
            assert!(next.material_cost >= prev.material_cost);
            assert!(next.estimated_days >= prev.estimated_days);
            prev = next;
        }
    }

    #[test]
    fn slug_round_trips() {
        assert_eq!(Service::from_slug("windows_doors"), Some(Service::WindowsDoors));
        assert_eq!(Service::from_slug("esquadrias"), None);
        assert_eq!(Quality::from_slug("luxury"), Some(Quality::Luxury));
        assert_eq!(Quality::from_slug("gold"), None);
    }

    #[test]
    fn brl_formatting() {
        assert_eq!(format_brl(9625.0), "R$ 9.625,00");
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(1_234_567.891), "R$ 1.234.567,89");
        assert_eq!(format_brl(7.5), "R$ 7,50");
    }
}
