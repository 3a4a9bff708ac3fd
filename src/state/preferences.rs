use serde::{Deserialize, Serialize};

use crate::processing::statistics::Statistic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// What the grid shows per cell. Read only by the report layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPreferences {
    pub show_pid_labels: bool,
    pub show_custom_pid_labels: bool,
    pub show_min_and_max: bool,
    pub show_average: bool,
    pub show_last_value: bool,
    pub show_sample_size: bool,
    pub y_axis_sort: SortOrder,
    pub highlight: Option<HighlightRule>,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            show_pid_labels: true,
            show_custom_pid_labels: true,
            show_min_and_max: true,
            show_average: true,
            show_last_value: false,
            show_sample_size: true,
            y_axis_sort: SortOrder::Ascending,
            highlight: None,
        }
    }
}

/// Colour assigned to a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellColor {
    /// No samples landed in the cell.
    Empty,
    /// The highlighted PID has no data here, or no rule is set.
    Neutral,
    Normal,
    Alert,
    /// Exactly on the threshold.
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HighlightCriterion {
    Threshold { value: f64, above_is_alert: bool },
    Range { min: f64, max: f64, inside_is_alert: bool },
}

/// Colour cells by comparing one statistic of one PID (matched by name)
/// against a threshold or range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub pid: String,
    pub statistic: Statistic,
    pub criterion: HighlightCriterion,
}

impl HighlightRule {
    pub fn classify(&self, value: f64) -> CellColor {
        let alert_if = |alert: bool| if alert { CellColor::Alert } else { CellColor::Normal };
        match self.criterion {
            HighlightCriterion::Threshold { value: limit, above_is_alert } => {
                if value > limit {
                    alert_if(above_is_alert)
                } else if value == limit {
                    CellColor::Equal
                } else {
                    alert_if(!above_is_alert)
                }
            }
            HighlightCriterion::Range { min, max, inside_is_alert } => {
                let inside = value >= min && value <= max;
                alert_if(inside == inside_is_alert)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(criterion: HighlightCriterion) -> HighlightRule {
        HighlightRule {
            pid: "Knock Retard".to_string(),
            statistic: Statistic::Maximum,
            criterion,
        }
    }

    #[test]
    fn threshold_colours() {
        let r = rule(HighlightCriterion::Threshold { value: 2.0, above_is_alert: true });
        assert_eq!(r.classify(3.0), CellColor::Alert);
        assert_eq!(r.classify(2.0), CellColor::Equal);
        assert_eq!(r.classify(1.0), CellColor::Normal);

        let swapped = rule(HighlightCriterion::Threshold { value: 2.0, above_is_alert: false });
        assert_eq!(swapped.classify(3.0), CellColor::Normal);
        assert_eq!(swapped.classify(1.0), CellColor::Alert);
    }

    #[test]
    fn range_colours() {
        let r = rule(HighlightCriterion::Range { min: 1.0, max: 2.0, inside_is_alert: true });
        assert_eq!(r.classify(1.0), CellColor::Alert);
        assert_eq!(r.classify(2.5), CellColor::Normal);

        let swapped = rule(HighlightCriterion::Range { min: 1.0, max: 2.0, inside_is_alert: false });
        assert_eq!(swapped.classify(1.5), CellColor::Normal);
        assert_eq!(swapped.classify(0.5), CellColor::Alert);
    }

    #[test]
    fn preferences_fill_missing_fields_from_defaults() {
        let prefs: DisplayPreferences =
            serde_json::from_str(r#"{ "show_last_value": true, "y_axis_sort": "Descending" }"#).unwrap();
        assert!(prefs.show_last_value);
        assert!(prefs.show_average);
        assert_eq!(prefs.y_axis_sort, SortOrder::Descending);
    }
}
