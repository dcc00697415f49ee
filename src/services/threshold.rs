use crate::{error::AlarmError, models::ThresholdKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Percent change of the current price against the base price.
    pub change_rate: f64,
    pub kind: Option<ThresholdKind>,
}

impl Evaluation {
    pub fn crossed(&self) -> bool {
        self.kind.is_some()
    }
}

pub fn change_rate(base_price: f64, current_price: f64) -> Result<f64, AlarmError> {
    if !base_price.is_finite() || base_price <= 0.0 {
        return Err(AlarmError::InvalidBaseline(base_price));
    }
    Ok((current_price - base_price) / base_price * 100.0)
}

/// Decides whether an alert fires.
///
/// Both bounds are inclusive. The upper bound is checked first, so a
/// configuration where both could match reports `Upper`.
pub fn evaluate(
    base_price: f64,
    current_price: f64,
    upper: Option<f64>,
    lower: Option<f64>,
) -> Result<Evaluation, AlarmError> {
    let change_rate = change_rate(base_price, current_price)?;

    let kind = match (upper, lower) {
        (Some(up), _) if change_rate >= up => Some(ThresholdKind::Upper),
        // lower is stored negative
        (_, Some(low)) if change_rate <= low => Some(ThresholdKind::Lower),
        _ => None,
    };

    Ok(Evaluation { change_rate, kind })
}
