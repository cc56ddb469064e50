use chrono::{Duration, Months, NaiveDate, Utc};

use crate::error::{CompilationError, Result};
use crate::models::{
    Comparison, ComparisonKind, Filter, FilterOperator, FilterValue, QueryRequest,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Derives the shifted-window request for an enabled comparison: the same
/// query with every period filter rewritten to a BETWEEN over the comparison
/// range. Returns `None` when the request asks for no comparison.
pub fn comparison_request(request: &QueryRequest) -> Result<Option<QueryRequest>> {
    let Some(comparison) = &request.comparison else {
        return Ok(None);
    };
    if !comparison.enabled {
        return Ok(None);
    }

    let indices = period_filter_indices(request, comparison);
    let Some(&first) = indices.first() else {
        return Err(CompilationError::MissingDateFilterForComparison.into());
    };
    let (start, end) = primary_window(&request.filters[first])?;
    let (shifted_start, shifted_end) = shifted_window(comparison, start, end)?;

    let mut shifted = request.clone();
    shifted.comparison = None;
    let window = FilterValue::List(vec![
        FilterValue::String(shifted_start.format(DATE_FORMAT).to_string()),
        FilterValue::String(shifted_end.format(DATE_FORMAT).to_string()),
    ]);
    for index in indices {
        let filter = &mut shifted.filters[index];
        filter.operator = FilterOperator::Between;
        filter.value = window.clone();
    }
    Ok(Some(shifted))
}

/// An explicit `date_field` designates one filter; otherwise every filter
/// whose field looks date-like (contains "date", or is the created_at
/// column) belongs to the period. The first one carries the primary window.
fn period_filter_indices(request: &QueryRequest, comparison: &Comparison) -> Vec<usize> {
    if let Some(field) = &comparison.date_field {
        return request
            .filters
            .iter()
            .position(|f| &f.field == field)
            .into_iter()
            .collect();
    }
    request
        .filters
        .iter()
        .enumerate()
        .filter(|(_, f)| f.field.contains("date") || f.field == "created_at")
        .map(|(i, _)| i)
        .collect()
}

/// BETWEEN filters define both ends; any other operator defines the start
/// and the window runs to today.
fn primary_window(filter: &Filter) -> Result<(NaiveDate, NaiveDate)> {
    if filter.operator == FilterOperator::Between {
        let elements = filter.value.elements();
        if elements.len() != 2 {
            return Err(
                CompilationError::InvalidBetweenValues(filter.value.to_string()).into(),
            );
        }
        return Ok((parse_date(&elements[0])?, parse_date(&elements[1])?));
    }
    Ok((parse_date(&filter.value)?, Utc::now().date_naive()))
}

fn shifted_window(
    comparison: &Comparison,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    match comparison.kind {
        ComparisonKind::PreviousPeriod => {
            // A window of n days back-to-back with the primary one.
            let span = (end - start).num_days();
            let shifted_end = start - Duration::days(1);
            let shifted_start = shifted_end - Duration::days(span);
            Ok((shifted_start, shifted_end))
        }
        ComparisonKind::SamePeriodLastYear => {
            let year_back = |date: NaiveDate| {
                date.checked_sub_months(Months::new(12)).ok_or_else(|| {
                    CompilationError::InvalidDateValue(date.to_string())
                })
            };
            Ok((year_back(start)?, year_back(end)?))
        }
        ComparisonKind::Custom => {
            let (Some(custom_start), Some(custom_end)) =
                (&comparison.custom_start, &comparison.custom_end)
            else {
                return Err(CompilationError::MissingCustomDates.into());
            };
            Ok((parse_str(custom_start)?, parse_str(custom_end)?))
        }
    }
}

fn parse_date(value: &FilterValue) -> Result<NaiveDate> {
    let text = value
        .as_str()
        .ok_or_else(|| CompilationError::InvalidDateValue(value.to_string()))?;
    parse_str(text)
}

/// Values arrive either as bare dates or ISO timestamps; only the leading
/// `YYYY-MM-DD` part counts.
fn parse_str(text: &str) -> Result<NaiveDate> {
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT)
        .map_err(|_| CompilationError::InvalidDateValue(text.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn march_request(comparison: Comparison) -> QueryRequest {
        QueryRequest {
            metrics: vec!["total_sales".to_string()],
            filters: vec![Filter {
                field: "date_day".to_string(),
                operator: FilterOperator::Between,
                value: FilterValue::List(vec![
                    FilterValue::String("2024-03-01".to_string()),
                    FilterValue::String("2024-03-31".to_string()),
                ]),
                logical_operator: None,
            }],
            comparison: Some(comparison),
            ..Default::default()
        }
    }

    fn comparison(kind: ComparisonKind) -> Comparison {
        Comparison {
            enabled: true,
            kind,
            custom_start: None,
            custom_end: None,
            date_field: None,
        }
    }

    fn window_of(request: &QueryRequest) -> (String, String) {
        match &request.filters[0].value {
            FilterValue::List(items) => (
                items[0].as_str().unwrap().to_string(),
                items[1].as_str().unwrap().to_string(),
            ),
            other => panic!("expected BETWEEN list, got {other}"),
        }
    }

    #[test]
    fn previous_period_is_back_to_back() {
        let shifted = comparison_request(&march_request(comparison(
            ComparisonKind::PreviousPeriod,
        )))
        .unwrap()
        .unwrap();
        assert_eq!(
            window_of(&shifted),
            ("2024-01-30".to_string(), "2024-02-29".to_string())
        );
        assert!(shifted.comparison.is_none());
    }

    #[test]
    fn same_period_last_year_shifts_twelve_months() {
        let shifted = comparison_request(&march_request(comparison(
            ComparisonKind::SamePeriodLastYear,
        )))
        .unwrap()
        .unwrap();
        assert_eq!(
            window_of(&shifted),
            ("2023-03-01".to_string(), "2023-03-31".to_string())
        );
    }

    #[test]
    fn every_date_named_filter_shifts_with_the_window() {
        let mut request = march_request(comparison(ComparisonKind::PreviousPeriod));
        request.filters.push(Filter {
            field: "date_month".to_string(),
            operator: FilterOperator::Eq,
            value: FilterValue::String("2024-03-01".to_string()),
            logical_operator: None,
        });
        let shifted = comparison_request(&request).unwrap().unwrap();
        let window = FilterValue::List(vec![
            FilterValue::String("2024-01-30".to_string()),
            FilterValue::String("2024-02-29".to_string()),
        ]);
        assert_eq!(shifted.filters[0].value, window);
        assert_eq!(shifted.filters[1].operator, FilterOperator::Between);
        assert_eq!(shifted.filters[1].value, window);
    }

    #[test]
    fn timestamp_values_truncate_to_their_date() {
        let mut request = march_request(comparison(ComparisonKind::SamePeriodLastYear));
        request.filters[0].value = FilterValue::List(vec![
            FilterValue::String("2024-03-01T00:00:00.000Z".to_string()),
            FilterValue::String("2024-03-31T23:59:59.999Z".to_string()),
        ]);
        let shifted = comparison_request(&request).unwrap().unwrap();
        assert_eq!(
            window_of(&shifted),
            ("2023-03-01".to_string(), "2023-03-31".to_string())
        );
    }

    #[test]
    fn custom_window_uses_given_dates() {
        let mut cmp = comparison(ComparisonKind::Custom);
        cmp.custom_start = Some("2024-01-01".to_string());
        cmp.custom_end = Some("2024-01-15".to_string());
        let shifted = comparison_request(&march_request(cmp)).unwrap().unwrap();
        assert_eq!(
            window_of(&shifted),
            ("2024-01-01".to_string(), "2024-01-15".to_string())
        );
    }

    #[test]
    fn custom_without_dates_fails() {
        let err = comparison_request(&march_request(comparison(ComparisonKind::Custom)))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Compilation(CompilationError::MissingCustomDates)
        ));
    }

    #[test]
    fn comparison_without_date_filter_fails() {
        let mut request = march_request(comparison(ComparisonKind::PreviousPeriod));
        request.filters.clear();
        let err = comparison_request(&request).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Compilation(CompilationError::MissingDateFilterForComparison)
        ));
    }

    #[test]
    fn explicit_date_field_takes_precedence() {
        let mut request = march_request(comparison(ComparisonKind::PreviousPeriod));
        request.filters.insert(
            0,
            Filter {
                field: "date_hour".to_string(),
                operator: FilterOperator::Eq,
                value: FilterValue::Number(12.0),
                logical_operator: None,
            },
        );
        request.comparison.as_mut().unwrap().date_field = Some("date_day".to_string());
        let shifted = comparison_request(&request).unwrap().unwrap();
        // the hour filter is untouched, the designated one is rewritten
        assert_eq!(shifted.filters[0].value, FilterValue::Number(12.0));
        assert!(matches!(shifted.filters[1].value, FilterValue::List(_)));
    }

    #[test]
    fn disabled_comparison_yields_nothing() {
        let mut cmp = comparison(ComparisonKind::PreviousPeriod);
        cmp.enabled = false;
        assert!(comparison_request(&march_request(cmp)).unwrap().is_none());
    }
}
