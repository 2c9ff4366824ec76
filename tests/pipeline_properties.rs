use proptest::prelude::*;
use talentscore::pipeline::scaling::ScalingPolicy;
use talentscore::{
    run_pipeline, CandidateRecord, CandidateTable, PipelineConfig, RankedCandidate, ScoringError,
};

/// Table with the preset's identity and proxy columns plus two more features.
fn profile_table(config: &PipelineConfig, rows: &[(u32, u32, u32)]) -> CandidateTable {
    let mut table = CandidateTable::new(config.identity_column.as_str());
    for (i, &(proxy, a, b)) in rows.iter().enumerate() {
        table.push(
            CandidateRecord::new(i.to_string())
                .with_feature(config.proxy_column.as_str(), f64::from(proxy))
                .with_feature("activity", f64::from(a))
                .with_feature("reach", f64::from(b)),
        );
    }
    table
}

fn profiles() -> impl Strategy<Value = Vec<(u32, u32, u32)>> {
    prop::collection::vec((0u32..5000, 0u32..300, 0u32..80), 6..30)
}

fn presets() -> impl Strategy<Value = PipelineConfig> {
    prop_oneof![
        Just(PipelineConfig::github()),
        Just(PipelineConfig::stackoverflow()),
    ]
}

fn input_index(row: &RankedCandidate) -> usize {
    row.record.identity.parse().unwrap_or(usize::MAX)
}

/// Two groups of identical StackOverflow profiles, reputation 10 and 1000.
fn separated_csv(n_low: usize, n_high: usize) -> String {
    let mut csv = String::from("user_id,DisplayName,Reputation,answers,questions\n");
    for i in 0..n_low {
        csv.push_str(&format!("{i},low{i},10,2,1\n"));
    }
    for i in 0..n_high {
        csv.push_str(&format!("{},high{i},1000,300,80\n", n_low + i));
    }
    csv
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn tiers_are_ordered_by_mean_proxy(rows in profiles(), config in presets()) {
        let ranked = match run_pipeline(&profile_table(&config, &rows), &config) {
            Ok(ranked) => ranked,
            Err(ScoringError::DegenerateLabels { .. }) => return Ok(()),
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };

        prop_assert!(ranked.rows.iter().all(|r| r.tier.tier_rank < config.tier_count()));
        let mut means = Vec::new();
        for rank in 0..config.tier_count() {
            let proxies: Vec<f64> = ranked
                .rows
                .iter()
                .filter(|r| r.tier.tier_rank == rank)
                .map(|r| r.record.feature(&config.proxy_column))
                .collect();
            if !proxies.is_empty() {
                means.push(proxies.iter().sum::<f64>() / proxies.len() as f64);
            }
        }
        for pair in means.windows(2) {
            prop_assert!(pair[0] <= pair[1], "tier means out of order: {means:?}");
        }
    }

    #[test]
    fn score_order_matches_raw_order(rows in profiles(), quantile in any::<bool>()) {
        let config = PipelineConfig {
            scaling: if quantile { ScalingPolicy::QuantileUniform } else { ScalingPolicy::MinMax },
            ..PipelineConfig::github()
        };
        let Ok(ranked) = run_pipeline(&profile_table(&config, &rows), &config) else {
            return Ok(());
        };

        let mut by_raw: Vec<&RankedCandidate> = ranked.rows.iter().collect();
        by_raw.sort_by(|a, b| {
            b.raw_score
                .total_cmp(&a.raw_score)
                .then_with(|| input_index(a).cmp(&input_index(b)))
        });
        let by_score: Vec<&str> = ranked.rows.iter().map(|r| r.record.identity.as_str()).collect();
        let by_raw: Vec<&str> = by_raw.iter().map(|r| r.record.identity.as_str()).collect();
        prop_assert_eq!(by_score, by_raw);
        prop_assert!(ranked.rows.iter().all(|r| (0.0..=100.0).contains(&r.score)));
    }

    #[test]
    fn identical_runs_are_byte_identical(rows in profiles(), config in presets()) {
        let table = profile_table(&config, &rows);
        let first = run_pipeline(&table, &config).map(|r| r.to_csv());
        let second = run_pipeline(&table, &config).map(|r| r.to_csv());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn extremes_land_in_extreme_tiers(followers in prop::collection::btree_set(0u32..100_000, 6..30)) {
        // Every feature rises with followers, so the batch is effectively one-dimensional
        let mut table = CandidateTable::new("username");
        for (i, &f) in followers.iter().enumerate() {
            let f = f64::from(f);
            table.push(
                CandidateRecord::new(format!("dev{i}"))
                    .with_feature("followers", f)
                    .with_feature("public_repos", 2.0 * f + 1.0)
                    .with_feature("public_gists", f / 3.0),
            );
        }
        let ranked = run_pipeline(&table, &PipelineConfig::github())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let last = followers.len() - 1;
        let rank_of = |id: String| ranked.get(&id).map(|r| r.tier.tier_rank);
        prop_assert_eq!(rank_of("dev0".to_string()), Some(0));
        prop_assert_eq!(rank_of(format!("dev{last}")), Some(2));
    }

    #[test]
    fn separated_groups_keep_their_order(
        n_low in 2usize..12,
        n_high in 2usize..12,
        seed in any::<u64>(),
    ) {
        let config = PipelineConfig { seed, ..PipelineConfig::stackoverflow() };
        let table = CandidateTable::from_csv(&separated_csv(n_low, n_high), config.schema())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let ranked = run_pipeline(&table, &config)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        for row in &ranked.rows {
            let high = row.record.feature("Reputation") > 500.0;
            prop_assert_eq!(row.tier.tier_rank, usize::from(high));
            prop_assert_eq!(row.tier.label.as_str(), if high { "Top Talent" } else { "Standard" });
        }
    }

    #[test]
    fn spread_groups_keep_their_extremes(
        low in prop::collection::btree_set(1u32..40, 3..12),
        high in prop::collection::btree_set(900u32..1200, 3..12),
        seed in any::<u64>(),
    ) {
        // Reputation varies inside each group; the other features follow it
        let config = PipelineConfig { seed, ..PipelineConfig::stackoverflow() };
        let mut table = CandidateTable::new("user_id");
        for (i, &rep) in low.iter().chain(&high).enumerate() {
            let rep = f64::from(rep);
            table.push(
                CandidateRecord::new(i.to_string())
                    .with_feature("Reputation", rep)
                    .with_feature("answers", 0.3f64.mul_add(rep, 1.0))
                    .with_feature("questions", rep / 10.0),
            );
        }
        let ranked = run_pipeline(&table, &config)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let lowest = ranked.get("0").map(|r| r.tier.label.as_str());
        let highest = (low.len() + high.len() - 1).to_string();
        let highest = ranked.get(&highest).map(|r| r.tier.label.as_str());
        prop_assert_eq!(lowest, Some("Standard"));
        prop_assert_eq!(highest, Some("Top Talent"));
    }
}

#[test]
fn single_row_is_insufficient() {
    let config = PipelineConfig::github();
    let table = profile_table(&config, &[(12, 3, 1)]);
    let err = run_pipeline(&table, &config).expect_err("one row");
    assert!(matches!(err, ScoringError::InsufficientData { rows: 1, .. }));
}

#[test]
fn stackoverflow_report_keeps_passthrough_columns() {
    let config = PipelineConfig::stackoverflow();
    let table = CandidateTable::from_csv(&separated_csv(3, 3), config.schema()).expect("parse");
    let ranked = run_pipeline(&table, &config).expect("run");
    let csv = ranked.to_csv();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("user_id,DisplayName,Reputation,SOTS,Tier_Name")
    );
    assert!(lines.next().is_some_and(|l| l.contains(",high") && l.ends_with(",Top Talent")));
}
