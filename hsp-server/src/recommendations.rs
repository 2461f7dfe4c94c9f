//! Recommendation scoring (spec §4.6): up to three ranked suggestions over
//! a prediction and its fare comparison, tagged `money`/`time`/`balanced`.

use hsp_core::domain::{FareOffer, PredictionResult, TicketType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTag {
    Money,
    Time,
    Balanced,
}

impl RecommendationTag {
    /// `money > time > balanced`, the tie-break order spec §4.6 specifies.
    fn rank(self) -> u8 {
        match self {
            RecommendationTag::Money => 0,
            RecommendationTag::Time => 1,
            RecommendationTag::Balanced => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Recommendation {
    pub tag: RecommendationTag,
    pub title: String,
    pub description: String,
    pub score: f64,
}

/// Builds up to three recommendations from a prediction and, if present,
/// fare offers. Ordering is strictly by score descending, ties broken by
/// `money > time > balanced` (spec §4.6).
pub fn build_recommendations(prediction: &PredictionResult, fares: Option<&[FareOffer]>) -> Vec<Recommendation> {
    let mut recommendations = Vec::with_capacity(3);

    let money = fares.and_then(|fares| money_recommendation(fares));
    let time = time_recommendation(prediction);

    if let Some(money) = &money {
        recommendations.push(money.clone());
    }
    recommendations.push(time.clone());

    let money_score = money.as_ref().map(|r| r.score).unwrap_or(0.0);
    recommendations.push(balanced_recommendation(money_score, time.score));

    recommendations.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.tag.rank().cmp(&b.tag.rank())));
    recommendations
}

fn money_recommendation(fares: &[FareOffer]) -> Option<Recommendation> {
    let anytime_price = fares.iter().filter(|f| f.ticket_type == TicketType::Anytime).map(|f| f.adult_pence).max()?;
    let cheapest = fares.iter().map(|f| f.adult_pence).min()?;
    if anytime_price == 0 || cheapest >= anytime_price {
        return None;
    }
    let savings_percentage = 100.0 * (anytime_price - cheapest) as f64 / anytime_price as f64;
    let score = (savings_percentage / 10.0).min(10.0);
    Some(Recommendation {
        tag: RecommendationTag::Money,
        title: "Save by booking in advance".to_string(),
        description: format!("The cheapest fare is {savings_percentage:.0}% below the anytime price for this route."),
        score,
    })
}

fn time_recommendation(prediction: &PredictionResult) -> Recommendation {
    let score = (prediction.expected_delay_minutes / 6.0).min(10.0).max(0.0);
    let description = if prediction.expected_delay_minutes <= 1.0 {
        "This departure is predicted to run on time.".to_string()
    } else {
        format!("This departure is predicted to run {:.1} minutes late on average.", prediction.expected_delay_minutes)
    };
    Recommendation { tag: RecommendationTag::Time, title: "Departure reliability".to_string(), description, score }
}

fn balanced_recommendation(money_score: f64, time_score: f64) -> Recommendation {
    let score = 0.5 * money_score + 0.5 * time_score;
    Recommendation {
        tag: RecommendationTag::Balanced,
        title: "Best overall value".to_string(),
        description: "A blend of fare savings and predicted punctuality for this journey.".to_string(),
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hsp_core::domain::{Confidence, Crs, PredictionLevel, TicketClass};

    fn fare(ticket_type: TicketType, adult_pence: u32) -> FareOffer {
        FareOffer {
            origin: Crs::parse("EUS").unwrap(),
            destination: Crs::parse("MAN").unwrap(),
            ticket_type,
            ticket_class: TicketClass::Standard,
            adult_pence,
            child_pence: None,
            valid_from: Utc::now().date_naive(),
            valid_until: None,
            route_restriction: None,
            issuing_operator: None,
            data_source: "test".to_string(),
            ingested_at: Utc::now(),
        }
    }

    fn prediction(expected_delay_minutes: f64) -> PredictionResult {
        PredictionResult {
            expected_delay_minutes,
            on_time_probability: 0.8,
            ppm5_probability: 0.85,
            ppm15_probability: 0.95,
            severe_delay_probability: 0.02,
            confidence: Confidence::High,
            sample_size: 500,
            level: PredictionLevel::RouteSummary,
            is_degraded: false,
            degradation_reason: None,
            explanation: "test".to_string(),
        }
    }

    #[test]
    fn recommendations_sort_by_score_descending() {
        let fares = vec![fare(TicketType::Anytime, 10_000), fare(TicketType::Advance, 2_000)];
        let recs = build_recommendations(&prediction(3.0), Some(&fares));
        for pair in recs.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn ties_break_money_before_time_before_balanced() {
        // Equal scores by construction: no fares (money absent), zero delay (time=0),
        // balanced computed from a zero money score and a zero time score.
        let recs = build_recommendations(&prediction(0.0), None);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].tag, RecommendationTag::Time);
        assert_eq!(recs[1].tag, RecommendationTag::Balanced);
    }

    #[test]
    fn money_score_caps_at_ten() {
        let fares = vec![fare(TicketType::Anytime, 100_000), fare(TicketType::Advance, 1)];
        let recs = build_recommendations(&prediction(0.0), Some(&fares));
        let money = recs.iter().find(|r| r.tag == RecommendationTag::Money).unwrap();
        assert_eq!(money.score, 10.0);
    }
}
