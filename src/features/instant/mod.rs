//! Instant-answer widgets. The raw query is pattern-dispatched; the first
//! matching widget wins. A match whose computation fails yields no answer at
//! all rather than an error in the response.

pub mod calc;
pub mod currency;
pub mod dictionary;
pub mod timezone;
pub mod units;
pub mod weather;

use serde_json::json;
use tracing::warn;

use crate::core::types::InstantAnswer;
use crate::core::AppState;

/// Trim a converted quantity for display; the raw f64 stays in `data`.
fn format_quantity(x: f64) -> String {
    let formatted = format!("{:.4}", x);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

pub async fn detect(state: &AppState, query: &str) -> Option<InstantAnswer> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let widgets = state.records.widgets().await;

    if widgets.calculator && calc::is_candidate(query) {
        return match calc::evaluate(query) {
            Ok(value) => {
                let result = calc::format_number(value);
                Some(InstantAnswer {
                    answer_type: "calculator".to_string(),
                    query: query.to_string(),
                    result: result.clone(),
                    data: json!({ "expression": query, "result": result, "value": value }),
                })
            }
            Err(e) => {
                warn!("calculator matched but failed: {}", e);
                None
            }
        };
    }

    if widgets.unit_converter {
        if let Some((value, from, to)) = units::detect(query) {
            return match units::convert(value, from, to) {
                Ok(converted) => Some(InstantAnswer {
                    answer_type: "unit_conversion".to_string(),
                    query: query.to_string(),
                    result: format!(
                        "{} {} = {} {}",
                        format_quantity(value),
                        from.symbol,
                        format_quantity(converted),
                        to.symbol
                    ),
                    data: json!({
                        "from_value": value,
                        "from_unit": from.symbol,
                        "to_value": converted,
                        "to_unit": to.symbol,
                        "category": from.category.to_string(),
                    }),
                }),
                Err(e) => {
                    warn!("unit conversion matched but failed: {}", e);
                    None
                }
            };
        }
    }

    if widgets.currency {
        if let Some((amount, from, to)) = currency::detect(query) {
            return match currency::convert(state, amount, &from, &to).await {
                Ok(answer) => Some(InstantAnswer {
                    answer_type: "currency".to_string(),
                    query: query.to_string(),
                    result: format!(
                        "{} {} = {} {}",
                        format_quantity(amount),
                        answer.from,
                        format_quantity(answer.converted),
                        answer.to
                    ),
                    data: serde_json::to_value(&answer).unwrap_or_default(),
                }),
                Err(e) => {
                    warn!("currency matched but failed: {}", e);
                    None
                }
            };
        }
    }

    if widgets.weather {
        if let Some(location) = weather::detect(query) {
            return match weather::lookup(state, &location).await {
                Ok(answer) => Some(InstantAnswer {
                    answer_type: "weather".to_string(),
                    query: query.to_string(),
                    result: format!("{}°C, {}", answer.temperature_c, answer.condition),
                    data: serde_json::to_value(&answer).unwrap_or_default(),
                }),
                Err(e) => {
                    warn!("weather matched but failed: {}", e);
                    None
                }
            };
        }
    }

    if widgets.dictionary {
        if let Some(word) = dictionary::detect(query) {
            return match dictionary::lookup(state, &word).await {
                Ok(answer) => Some(InstantAnswer {
                    answer_type: "definition".to_string(),
                    query: query.to_string(),
                    result: answer
                        .definitions
                        .first()
                        .map(|d| d.definition.clone())
                        .unwrap_or_default(),
                    data: serde_json::to_value(&answer).unwrap_or_default(),
                }),
                Err(e) => {
                    warn!("dictionary matched but failed: {}", e);
                    None
                }
            };
        }
    }

    if widgets.time {
        if let Some(location) = timezone::detect(query) {
            return match timezone::lookup(&location) {
                Ok(answer) => Some(InstantAnswer {
                    answer_type: "time".to_string(),
                    query: query.to_string(),
                    result: format!("{} in {}", answer.time, answer.location),
                    data: serde_json::to_value(&answer).unwrap_or_default(),
                }),
                Err(e) => {
                    warn!("time matched but failed: {}", e);
                    None
                }
            };
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::WidgetSettingsPatch;

    fn state() -> AppState {
        AppState::new(reqwest::Client::new())
    }

    #[tokio::test]
    async fn calculator_answers_locally() {
        let answer = detect(&state(), "2+2").await.unwrap();
        assert_eq!(answer.answer_type, "calculator");
        assert_eq!(answer.result, "4");
    }

    #[tokio::test]
    async fn unit_conversion_answers_locally() {
        let answer = detect(&state(), "10 km to mi").await.unwrap();
        assert_eq!(answer.answer_type, "unit_conversion");
        let to_value = answer.data["to_value"].as_f64().unwrap();
        assert!((to_value - 6.2137).abs() < 1e-3);
    }

    #[tokio::test]
    async fn time_answers_locally() {
        let answer = detect(&state(), "time in Tokyo").await.unwrap();
        assert_eq!(answer.answer_type, "time");
        assert_eq!(answer.data["timezone"], "Asia/Tokyo");
    }

    #[tokio::test]
    async fn no_pattern_means_no_answer() {
        assert!(detect(&state(), "best pizza recipe").await.is_none());
        assert!(detect(&state(), "").await.is_none());
    }

    #[tokio::test]
    async fn matched_but_failing_computation_is_swallowed() {
        assert!(detect(&state(), "1/0").await.is_none());
        assert!(detect(&state(), "10 km to kg").await.is_none());
    }

    #[tokio::test]
    async fn disabled_widget_is_skipped() {
        let state = state();
        state
            .records
            .update_widgets(WidgetSettingsPatch {
                calculator: Some(false),
                ..Default::default()
            })
            .await;
        assert!(detect(&state, "2+2").await.is_none());
    }
}
