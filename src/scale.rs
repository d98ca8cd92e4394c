use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime};

use crate::data::CellValue;
use crate::error::{ChartError, ChartResult};
use crate::ir::XAxisKind;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// X coordinates for every row plus the axis kind they were mapped with.
///
/// `coords[i]` is `None` when row `i` has an empty X cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedX {
    pub kind: XAxisKind,
    pub coords: Vec<Option<f64>>,
}

/// Map an X column onto a continuous coordinate.
///
/// All numbers gives a numeric axis, all dates a temporal one; any other mix
/// is categorical with labels in first-appearance order.
pub fn resolve_x(column: &str, values: &[CellValue]) -> ChartResult<ResolvedX> {
    let present: Vec<&CellValue> = values.iter().filter(|v| !v.is_empty()).collect();
    if present.is_empty() {
        return Err(ChartError::Render(format!(
            "X column '{}' has no values to plot",
            column
        )));
    }

    if present.iter().all(|v| v.as_number().is_some()) {
        return Ok(ResolvedX {
            kind: XAxisKind::Numeric,
            coords: values.iter().map(CellValue::as_number).collect(),
        });
    }

    if present.iter().all(|v| matches!(v, CellValue::Date(_))) {
        let with_time = present.iter().any(|v| match v {
            CellValue::Date(dt) => dt.time() != chrono::NaiveTime::MIN,
            _ => false,
        });
        let coords = values
            .iter()
            .map(|v| match v {
                CellValue::Date(dt) => Some(date_to_days(dt)),
                _ => None,
            })
            .collect();
        return Ok(ResolvedX {
            kind: XAxisKind::Temporal { with_time },
            coords,
        });
    }

    // Categorical: equal labels share one position.
    let mut categories: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut coords = Vec::with_capacity(values.len());
    for value in values {
        if value.is_empty() {
            coords.push(None);
            continue;
        }
        let label = value.to_string();
        let idx = match index.get(&label) {
            Some(&idx) => idx,
            None => {
                let idx = categories.len();
                index.insert(label.clone(), idx);
                categories.push(label);
                idx
            }
        };
        coords.push(Some(idx as f64));
    }

    Ok(ResolvedX {
        kind: XAxisKind::Categorical { categories },
        coords,
    })
}

pub fn date_to_days(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY
}

pub fn days_to_date(days: f64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis((days * MILLIS_PER_DAY).round() as i64).map(|d| d.naive_utc())
}

/// Axis range for the X axis.
pub fn x_range(kind: &XAxisKind, coords: impl Iterator<Item = f64>) -> (f64, f64) {
    match kind {
        XAxisKind::Categorical { categories } => {
            let n = categories.len().max(1) as f64;
            (-0.5, n - 0.5)
        }
        _ => continuous_range(coords),
    }
}

/// Padded range covering all finite values, or `(0, 1)` when there are none.
pub fn continuous_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        if v < min { min = v; }
        if v > max { max = v; }
    }

    if min == f64::INFINITY {
        return (0.0, 1.0);
    }
    pad_range(min, max)
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = max * 0.05 - min * 0.05;
        ((min - padding).max(f64::MIN), (max + padding).min(f64::MAX))
    }
}

/// Fail with `Render` unless `range` is a non-empty span a backend can draw:
/// both ends and the width finite.
pub fn check_range(axis: &str, range: (f64, f64)) -> ChartResult<()> {
    let (lo, hi) = range;
    if lo.is_finite() && hi.is_finite() && lo < hi && (hi - lo).is_finite() {
        Ok(())
    } else {
        Err(ChartError::Render(format!(
            "{} axis range {}..{} cannot be drawn",
            axis, lo, hi
        )))
    }
}

/// Tick label for an X coordinate.
pub fn format_x_label(kind: &XAxisKind, value: f64) -> String {
    match kind {
        XAxisKind::Numeric => format_number(value),
        XAxisKind::Temporal { with_time } => match days_to_date(value) {
            Some(dt) if *with_time => dt.format("%Y-%m-%d %H:%M").to_string(),
            Some(dt) => dt.format("%Y-%m-%d").to_string(),
            None => String::new(),
        },
        XAxisKind::Categorical { categories } => {
            let idx = value.round();
            if (value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            categories.get(idx as usize).cloned().unwrap_or_default()
        }
    }
}

/// Compact numeric tick label.
pub fn format_number(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.3}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn test_resolve_numeric() {
        let values = vec![CellValue::Number(1.0), CellValue::Empty, CellValue::Number(3.0)];
        let x = resolve_x("x", &values).unwrap();
        assert_eq!(x.kind, XAxisKind::Numeric);
        assert_eq!(x.coords, vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_resolve_temporal() {
        let values = vec![date(1970, 1, 2), date(1970, 1, 4)];
        let x = resolve_x("Date", &values).unwrap();
        assert_eq!(x.kind, XAxisKind::Temporal { with_time: false });
        assert_eq!(x.coords, vec![Some(1.0), Some(3.0)]);
        assert_eq!(format_x_label(&x.kind, 3.0), "1970-01-04");
    }

    #[test]
    fn test_resolve_categorical_merges_equal_labels() {
        let values = vec![
            CellValue::Text("A".into()),
            CellValue::Text("B".into()),
            CellValue::Text("A".into()),
            CellValue::Number(1.0),
        ];
        let x = resolve_x("cat", &values).unwrap();
        assert_eq!(
            x.kind,
            XAxisKind::Categorical {
                categories: vec!["A".into(), "B".into(), "1".into()]
            }
        );
        assert_eq!(x.coords, vec![Some(0.0), Some(1.0), Some(0.0), Some(2.0)]);
        assert_eq!(format_x_label(&x.kind, 1.0), "B");
        assert_eq!(format_x_label(&x.kind, 0.5), "");
        assert_eq!(x_range(&x.kind, std::iter::empty()), (-0.5, 2.5));
    }

    #[test]
    fn test_resolve_many_categories() {
        let values: Vec<CellValue> = (0..20_000)
            .map(|i| CellValue::Text(format!("c{}", i % 10_000)))
            .collect();
        let x = resolve_x("cat", &values).unwrap();
        match &x.kind {
            XAxisKind::Categorical { categories } => {
                assert_eq!(categories.len(), 10_000);
                assert_eq!(categories[9_999], "c9999");
            }
            other => panic!("expected categorical axis, got {:?}", other),
        }
        assert_eq!(x.coords[10_000], Some(0.0));
        assert_eq!(x.coords[19_999], Some(9_999.0));
    }

    #[test]
    fn test_resolve_empty_column_fails() {
        let err = resolve_x("x", &[CellValue::Empty]).unwrap_err();
        assert!(matches!(err, ChartError::Render(_)));
    }

    #[test]
    fn test_continuous_range_padding() {
        assert_eq!(continuous_range([5.0].into_iter()), (4.0, 6.0));
        let (min, max) = continuous_range([0.0, 10.0].into_iter());
        assert!(min < 0.0 && max > 10.0);
        assert_eq!(continuous_range(std::iter::empty()), (0.0, 1.0));
    }

    #[test]
    fn test_padding_does_not_overflow() {
        let (min, max) = continuous_range([-1e308, 1e308].into_iter());
        assert!(min.is_finite() && max.is_finite());
        assert!(min <= -1e308 && max >= 1e308);
        // Finite ends, but the width itself overflows.
        assert!(check_range("y", (min, max)).is_err());

        let (min, max) = continuous_range([f64::MAX, f64::MAX / 2.0].into_iter());
        assert_eq!(max, f64::MAX);
        assert!(check_range("y", (min, max)).is_ok());
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("x", (0.0, 1.0)).is_ok());
        assert!(check_range("x", (1.0, 1.0)).is_err());
        assert!(check_range("x", (f64::NEG_INFINITY, 1.0)).is_err());
        assert!(matches!(check_range("x", (0.0, f64::NAN)), Err(ChartError::Render(_))));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.125), "0.125");
    }
}
