use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use overgoals::api_football::{extract_market_odds, parse_fixtures_page};
use overgoals::beta;
use overgoals::model::{ModelConfig, TeamCounts, estimate_match_probabilities};
use overgoals::stats::compute_over_stats;

fn bench_beta_quantile(c: &mut Criterion) {
    c.bench_function("beta_quantile", |b| {
        b.iter(|| {
            let q = beta::quantile(black_box(0.05), black_box(137.0), black_box(41.0));
            black_box(q);
        })
    });
}

fn bench_match_estimate(c: &mut Criterion) {
    let cfg = ModelConfig::default();
    let home = TeamCounts::new(120, 150, 111, 150).expect("valid counts");
    let away = TeamCounts::new(98, 150, 104, 150).expect("valid counts");
    c.bench_function("match_estimate", |b| {
        b.iter(|| {
            let probs = estimate_match_probabilities(black_box(&home), black_box(&away), &cfg);
            black_box(probs.over15_ft.p_min);
        })
    });
}

fn bench_fixture_aggregate(c: &mut Criterion) {
    let page = parse_fixtures_page(&fixtures_json(170)).expect("valid fixture json");
    c.bench_function("fixture_aggregate", |b| {
        b.iter(|| {
            let counts = compute_over_stats(black_box(&page.fixtures));
            black_box(counts);
        })
    });
}

fn bench_odds_extract(c: &mut Criterion) {
    c.bench_function("odds_extract", |b| {
        b.iter(|| {
            let odds = extract_market_odds(black_box(ODDS_JSON));
            black_box(odds);
        })
    });
}

fn fixtures_json(n: u32) -> String {
    let rows = (0..n)
        .map(|i| {
            format!(
                r#"{{"fixture":{{"id":{i},"status":{{"short":"FT","elapsed":90}}}},"goals":{{"home":{},"away":{}}},"score":{{"halftime":{{"home":{},"away":0}}}}}}"#,
                i % 4,
                i % 3,
                i % 2
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!(r#"{{"paging":{{"total":1}},"response":[{rows}]}}"#)
}

const ODDS_JSON: &str = r#"{"response":[{"bookmakers":[{"id":8,"bets":[
{"name":"Match Winner","values":[{"value":"Home","odd":"1.80"}]},
{"name":"Goals Over/Under","values":[{"value":"Over 1.5","odd":"1.30"},{"value":"Under 1.5","odd":"3.40"}]},
{"name":"Goals Over/Under First Half","values":[{"value":"Over 0.5","odd":"1.40"}]}
]}]}]}"#;

criterion_group!(
    benches,
    bench_beta_quantile,
    bench_match_estimate,
    bench_fixture_aggregate,
    bench_odds_extract
);
criterion_main!(benches);
