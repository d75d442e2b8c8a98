//! Per-token pricing for the models we know about.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// (input, output) USD price per token. Unknown models are treated as free so
/// cost logging never blocks a request.
pub fn model_cost(model: &str) -> (Decimal, Decimal) {
    if model.contains("opus") {
        (dec!(0.000015), dec!(0.000075))
    } else if model.contains("sonnet") {
        (dec!(0.000003), dec!(0.000015))
    } else if model.contains("haiku") {
        (dec!(0.0000008), dec!(0.000004))
    } else if model.starts_with("gpt-4o-mini") {
        (dec!(0.00000015), dec!(0.0000006))
    } else if model.starts_with("gpt-4o") {
        (dec!(0.0000025), dec!(0.00001))
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    }
}
