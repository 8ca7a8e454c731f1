//! End-to-end valuation scenarios and invariants

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use crate::aggregation::weighted_value;
use crate::{
    CardAttributes, CardCondition, CardValueEstimator, ConfidenceCalculator, MarketDataPoint,
    MarketSource, MockDataFactory, MultiplierBreakdown, MultiplierEngine, MultiplierFactor, Sport,
    ValuationError,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 18, 30, 0).unwrap()
}

fn comp(source: &str, value: f64, days_old: i64, samples: u32) -> MarketDataPoint {
    let date = now() - Duration::days(days_old);
    MarketDataPoint::new(source, value, date, samples, CardCondition::NearMint)
}

fn mahomes_contenders() -> CardAttributes {
    CardAttributes {
        sport: Sport::Football,
        parallel: Some("Cracked Ice".into()),
        serial_number: Some("23/25".into()),
        autograph: true,
        rookie: true,
        condition: CardCondition::NearMintPlus,
        ..CardAttributes::new("Patrick Mahomes", 2017, "Contenders", "303")
    }
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_premium_rookie_auto_is_capped() {
        let card = mahomes_contenders();
        let estimator = CardValueEstimator::default();
        let estimate = estimator.estimate_value_at(&card, None, true, now()).unwrap();

        assert!(estimate.data_points.iter().all(|p| p.is_synthetic));
        assert!(estimate
            .data_points
            .iter()
            .all(|p| p.url.as_deref().is_some_and(|u| u.contains("mock"))));

        let breakdown = &estimate.multipliers_applied;
        assert_eq!(breakdown.factor(MultiplierFactor::Condition), Some(1.5));
        assert_eq!(breakdown.factor(MultiplierFactor::Rookie), Some(1.5));
        assert_eq!(breakdown.factor(MultiplierFactor::Autograph), Some(2.5));
        // 25-run table value with the jersey-number bonus for #23
        assert!((breakdown.factor(MultiplierFactor::Scarcity).unwrap() - 4.2).abs() < 1e-9);
        assert_eq!(breakdown.factor(MultiplierFactor::Parallel), Some(1.8));
        assert_eq!(breakdown.factor(MultiplierFactor::Era), Some(1.2));
        assert_eq!(breakdown.factor(MultiplierFactor::SportMarket), Some(1.1));

        assert_eq!(breakdown.total(), Some(25.0));
        let cap = breakdown.cap().expect("compound exceeds the cap");
        assert_eq!(cap.cap, 25.0);
        assert_eq!(cap.uncapped, 56.13);

        let base = weighted_value(&estimate.data_points);
        assert_eq!(estimate.estimated_value, crate::round_to(base * 25.0, 2));
        assert!(estimate.grading_recommendation.is_some());
    }

    #[test]
    fn test_no_data_and_mock_disabled_fails() {
        let estimator = CardValueEstimator::default();
        let result = estimator.estimate_value_at(&mahomes_contenders(), None, false, now());
        assert!(matches!(result, Err(ValuationError::NoMarketData)));

        let result = estimator.estimate_value_at(&mahomes_contenders(), Some(vec![]), false, now());
        assert!(matches!(result, Err(ValuationError::NoMarketData)));
    }

    #[test]
    fn test_real_sold_comps_bypass_multipliers() {
        let data = vec![
            comp("ebay_sold", 410.0, 1, 1).with_url("https://www.ebay.com/itm/111"),
            comp("ebay_sold", 390.0, 6, 1).with_url("https://www.ebay.com/itm/222"),
            comp("130point", 450.0, 9, 4).with_url("https://130point.com/sales/333"),
        ];
        let expected = crate::round_to(weighted_value(&data), 2);

        let estimate = CardValueEstimator::default()
            .estimate_value_at(&mahomes_contenders(), Some(data), false, now())
            .unwrap();

        assert_eq!(estimate.estimated_value, expected);
        match &estimate.multipliers_applied {
            MultiplierBreakdown::Skipped { note } => assert!(note.contains("real sold comp")),
            other => panic!("Expected skipped multipliers, got {other:?}"),
        }
        let json = serde_json::to_value(&estimate.multipliers_applied).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_single_real_comp_among_synthetic_skips_everything() {
        let mut data = MockDataFactory::default().generate_at(&mahomes_contenders(), now());
        data.push(
            MarketDataPoint::new("ebay_sold", 500.0, now(), 1, CardCondition::Raw)
                .with_url("https://www.ebay.com/itm/999"),
        );
        let estimate = CardValueEstimator::default()
            .estimate_value_at(&mahomes_contenders(), Some(data), true, now())
            .unwrap();
        assert!(estimate.multipliers_applied.is_skipped());
    }

    #[test]
    fn test_grade_overrides_declared_condition() {
        let card = CardAttributes {
            graded: true,
            grade_value: Some(9.6),
            grading_company: Some("BGS".into()),
            condition: CardCondition::VeryGood,
            ..CardAttributes::new("Connor McDavid", 2015, "Upper Deck", "201")
        };
        let estimate =
            CardValueEstimator::default().estimate_value_at(&card, None, true, now()).unwrap();

        assert_eq!(estimate.multipliers_applied.factor(MultiplierFactor::Grade), Some(3.0));
        assert_eq!(estimate.multipliers_applied.factor(MultiplierFactor::Condition), None);
        assert!(estimate.grading_recommendation.is_none());
        assert!(estimate.data_points.iter().all(|p| p.source != MarketSource::PsaApr));
    }

    #[test]
    fn test_divergent_same_source_lowers_confidence() {
        let card = CardAttributes::new("Mike Trout", 2011, "Topps Update", "US175");
        let tight = vec![
            MarketDataPoint::new("comc", 100.0, now() - Duration::days(2), 3, CardCondition::Raw),
            MarketDataPoint::new("comc", 104.0, now() - Duration::days(3), 3, CardCondition::Raw),
        ];
        let divergent = vec![
            MarketDataPoint::new("comc", 20.0, now() - Duration::days(2), 3, CardCondition::Raw),
            MarketDataPoint::new("comc", 400.0, now() - Duration::days(3), 3, CardCondition::Raw),
        ];
        let estimator = CardValueEstimator::default();
        let tight = estimator.estimate_value_at(&card, Some(tight), false, now()).unwrap();
        let divergent = estimator.estimate_value_at(&card, Some(divergent), false, now()).unwrap();

        assert!(
            divergent.accuracy_factors.value_consistency < tight.accuracy_factors.value_consistency
        );
        assert!(divergent.confidence_score < tight.confidence_score);
        let tight_width = tight.value_range.1 - tight.value_range.0;
        assert!(tight_width / tight.estimated_value < 1.0);
    }

    #[test]
    fn test_estimates_are_reproducible() {
        let estimator = CardValueEstimator::default();
        let a = estimator.estimate_value_at(&mahomes_contenders(), None, true, now()).unwrap();
        let b = estimator.estimate_value_at(&mahomes_contenders(), None, true, now()).unwrap();
        assert_eq!(
            serde_json::to_string(&a.to_response()).unwrap(),
            serde_json::to_string(&b.to_response()).unwrap()
        );
    }

    #[test]
    fn test_response_shape() {
        let estimate = CardValueEstimator::default()
            .estimate_value_at(&mahomes_contenders(), None, true, now())
            .unwrap();
        let json = serde_json::to_value(estimate.to_response()).unwrap();

        for key in [
            "estimated_value",
            "confidence",
            "confidence_score",
            "range",
            "multipliers",
            "grading_rec",
            "trend",
            "sources",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["multipliers"]["_total"], 25.0);
        assert_eq!(json["multipliers"]["_cap_applied"], 25.0);
        assert!(json["trend"].get("30_day_change").is_some());
        assert_eq!(json["sources"][0]["source"], "ebay_sold");
        assert!(json["sources"].as_array().unwrap().len() <= 6);
    }
}

fn card_strategy() -> impl Strategy<Value = CardAttributes> {
    let sports = prop_oneof![
        Just(Sport::Basketball),
        Just(Sport::Football),
        Just(Sport::Baseball),
        Just(Sport::Soccer),
        Just(Sport::Hockey),
        Just(Sport::Other),
    ];
    let conditions = prop_oneof![
        Just(CardCondition::GemMint),
        Just(CardCondition::Mint),
        Just(CardCondition::NearMintPlus),
        Just(CardCondition::NearMint),
        Just(CardCondition::Excellent),
        Just(CardCondition::VeryGood),
        Just(CardCondition::Good),
        Just(CardCondition::Raw),
    ];
    let parallels = proptest::option::of(prop_oneof![
        Just("Superfractor".to_string()),
        Just("Gold Wave".to_string()),
        Just("Cracked Ice".to_string()),
        Just("Silver".to_string()),
        Just("Tie-Dye".to_string()),
        Just(String::new()),
    ]);
    let serials = proptest::option::of("[0-9]{1,3}/[0-9]{1,4}|[a-z ]{0,6}");
    let grades = proptest::option::of(1.0f64..=10.0);

    (
        "[A-Za-z ]{1,24}",
        1900i32..2030,
        sports,
        conditions,
        parallels,
        serials,
        any::<(bool, bool, bool)>(),
        grades,
    )
        .prop_map(|(player, year, sport, condition, parallel, serial_number, flags, grade_value)| {
            let (rookie, autograph, graded) = flags;
            CardAttributes {
                sport,
                condition,
                parallel,
                serial_number,
                rookie,
                autograph,
                graded,
                grade_value,
                ..CardAttributes::new(player, year, "Set", "1")
            }
        })
}

proptest! {
    #[test]
    fn prop_multiplier_total_never_exceeds_cap(card in card_strategy(), base in 0.0f64..10_000.0) {
        let (value, breakdown) = MultiplierEngine::default().apply_all(base, &card);
        let MultiplierBreakdown::Applied { factors, total, cap } = breakdown else {
            panic!("multipliers are always applied by the engine");
        };

        prop_assert!(total <= 25.0);
        prop_assert!(value >= 0.0);
        let raw: f64 = factors.iter().map(|(_, m)| *m).product();
        prop_assert_eq!(cap.is_some(), raw > 25.0);
    }

    #[test]
    fn prop_estimate_invariants(card in card_strategy()) {
        let estimate =
            CardValueEstimator::default().estimate_value_at(&card, None, true, now()).unwrap();
        let (low, high) = estimate.value_range;

        prop_assert!((0.0..=100.0).contains(&estimate.confidence_score));
        prop_assert!(estimate.estimated_value >= 0.0);
        prop_assert!(low >= 0.0);
        prop_assert!(low <= estimate.estimated_value && estimate.estimated_value <= high);
    }

    #[test]
    fn prop_range_narrows_with_confidence(
        value in 0.0f64..100_000.0,
        a in 0.0f64..=100.0,
        b in 0.0f64..=100.0,
    ) {
        let (lo_score, hi_score) = if a <= b { (a, b) } else { (b, a) };
        let wide = CardValueEstimator::value_range(value, lo_score);
        let narrow = CardValueEstimator::value_range(value, hi_score);
        prop_assert!(narrow.1 - narrow.0 <= wide.1 - wide.0);
    }

    #[test]
    fn prop_confidence_bounded(
        card in card_strategy(),
        values in proptest::collection::vec(0.01f64..5_000.0, 0..12),
    ) {
        let data: Vec<MarketDataPoint> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let source = ["ebay_sold", "comc", "pwcc", "myslabs"][i % 4];
                comp(source, *v, i as i64 * 9, (i as u32 % 5) + 1)
            })
            .collect();
        let result = ConfidenceCalculator::default().calculate_at(&card, &data, now());
        prop_assert!((0.0..=100.0).contains(&result.score));
    }

    #[test]
    fn prop_mock_data_deterministic(card in card_strategy()) {
        let factory = MockDataFactory::default();
        let first = factory.generate_at(&card, now());
        let second = factory.generate_at(&card, now());
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        prop_assert!(first.iter().all(|p| p.value > 0.0));
    }
}
