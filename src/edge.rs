use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeDecision {
    pub implied_probability: f64,
    pub edge: f64,
    pub should_alert: bool,
    /// False when the odd was <= 1.0 (or not a number) and the implied probability fell back to 0.
    pub odds_usable: bool,
}

pub fn implied_probability(decimal_odd: f64) -> f64 {
    if decimal_odd.is_finite() && decimal_odd > 1.0 {
        1.0 / decimal_odd
    } else {
        0.0
    }
}

/// Edge of the conservative estimate over the market. Unusable odds still go through the
/// threshold check with an implied probability of 0.
pub fn decide_alert(p_min: f64, decimal_odd: f64, min_edge_threshold: f64) -> EdgeDecision {
    let odds_usable = decimal_odd.is_finite() && decimal_odd > 1.0;
    let implied = implied_probability(decimal_odd);
    let edge = p_min - implied;
    EdgeDecision {
        implied_probability: implied,
        edge,
        should_alert: edge >= min_edge_threshold,
        odds_usable,
    }
}
