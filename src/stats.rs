use crate::api_football::Fixture;
use crate::model::TeamCounts;

const HT_OVER_GOALS: u32 = 1;
const FT_OVER_GOALS: u32 = 2;

/// Aggregates finished fixtures into over-0.5 HT and over-1.5 FT counts.
/// Fixtures missing a score only drop out of the market whose score is missing.
pub fn compute_over_stats(fixtures: &[Fixture]) -> TeamCounts {
    let mut ht_s = 0u32;
    let mut ht_n = 0u32;
    let mut ft_s = 0u32;
    let mut ft_n = 0u32;

    for fx in fixtures.iter().filter(|fx| fx.is_finished()) {
        if let Some(total) = fx.score.halftime.total() {
            ht_n += 1;
            if total >= HT_OVER_GOALS {
                ht_s += 1;
            }
        }
        if let Some(total) = fx.goals.total() {
            ft_n += 1;
            if total >= FT_OVER_GOALS {
                ft_s += 1;
            }
        }
    }

    // Successes never exceed trials here, so construction cannot fail.
    TeamCounts::new(ht_s, ht_n, ft_s, ft_n).unwrap_or_default()
}
