use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid month `{0}`, expected YEAR-MONTH")]
    Month(String),

    #[error("invalid day status `{0}`, expected normal, half or full")]
    Status(String),
}

/// Overtime recorded for a single day. Only `Half` and `Full` are ever stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    #[default]
    Normal,
    Half,
    Full,
}

impl DayStatus {
    /// normal -> half -> full -> normal
    pub fn next(self) -> Self {
        match self {
            DayStatus::Normal => DayStatus::Half,
            DayStatus::Half => DayStatus::Full,
            DayStatus::Full => DayStatus::Normal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayStatus::Normal => "normal",
            DayStatus::Half => "half",
            DayStatus::Full => "full",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(DayStatus::Normal),
            "half" => Ok(DayStatus::Half),
            "full" => Ok(DayStatus::Full),
            _ => Err(ParseError::Status(s.to_string())),
        }
    }
}

/// Calendar month, rendered as `YYYY-M` (no zero padding on the month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn days_in_month(&self) -> u32 {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.pred_opt())
            .map(|last| last.day())
            .unwrap_or(31)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::Month(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year = year.parse::<i32>().map_err(|_| err())?;
        let month = month.parse::<u32>().map_err(|_| err())?;
        MonthKey::new(year, month).ok_or_else(err)
    }
}

pub type MonthDays = BTreeMap<u32, DayStatus>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MonthStats {
    pub full_days: usize,
    pub half_days: usize,
    pub total_days: f64,
}

/// Month-key -> day -> status. A month never maps to an empty set of days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OvertimeData {
    months: BTreeMap<String, MonthDays>,
}

// Normal days and empty months are dropped on the way in.
impl<'de> Deserialize<'de> for OvertimeData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let months = BTreeMap::<String, MonthDays>::deserialize(deserializer)?;
        Ok(Self::from_months(months))
    }
}

impl OvertimeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_months(months: BTreeMap<String, MonthDays>) -> Self {
        let months = months
            .into_iter()
            .filter_map(|(key, days)| {
                let days: MonthDays = days
                    .into_iter()
                    .filter(|(_, status)| *status != DayStatus::Normal)
                    .collect();
                (!days.is_empty()).then_some((key, days))
            })
            .collect();
        Self { months }
    }

    /// Keeps every well-formed `day -> half|full` entry and counts the rest.
    ///
    /// Anything but a JSON object decodes as an empty dataset.
    pub fn from_value_lossy(value: serde_json::Value) -> (Self, usize) {
        let serde_json::Value::Object(months) = value else {
            return (Self::default(), usize::from(!value.is_null()));
        };

        let mut skipped = 0;
        let mut kept = BTreeMap::new();
        for (key, days) in months {
            let serde_json::Value::Object(days) = days else {
                skipped += 1;
                continue;
            };
            let mut month = MonthDays::new();
            for (day, status) in days {
                let day = day.parse::<u32>().ok().filter(|d| (1..=31).contains(d));
                let status = serde_json::from_value::<DayStatus>(status).ok();
                match (day, status) {
                    (Some(day), Some(status)) => {
                        month.insert(day, status);
                    }
                    _ => skipped += 1,
                }
            }
            kept.insert(key, month);
        }
        (Self::from_months(kept), skipped)
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn contains_month(&self, key: &str) -> bool {
        self.months.contains_key(key)
    }

    pub fn month(&self, key: &str) -> Option<&MonthDays> {
        self.months.get(key)
    }

    pub fn months(&self) -> impl Iterator<Item = (&String, &MonthDays)> {
        self.months.iter()
    }

    pub fn day_status(&self, date: NaiveDate) -> DayStatus {
        self.months
            .get(&MonthKey::from_date(date).to_string())
            .and_then(|days| days.get(&date.day()))
            .copied()
            .unwrap_or_default()
    }

    /// Upserts half/full; normal removes the day and, if it was the last one, the month.
    pub fn set_day(&mut self, date: NaiveDate, status: DayStatus) {
        let key = MonthKey::from_date(date).to_string();
        let day = date.day();

        if status == DayStatus::Normal {
            if let Some(days) = self.months.get_mut(&key) {
                days.remove(&day);
                if days.is_empty() {
                    self.months.remove(&key);
                }
            }
        } else {
            self.months.entry(key).or_default().insert(day, status);
        }
    }

    /// Advances the day one step through the cycle and returns the new status.
    pub fn cycle_day(&mut self, date: NaiveDate) -> DayStatus {
        let next = self.day_status(date).next();
        self.set_day(date, next);
        next
    }

    pub fn remove_month(&mut self, month: &MonthKey) -> bool {
        self.months.remove(&month.to_string()).is_some()
    }

    /// Remote wins month by month; months only `local` knows are carried over whole.
    /// Days are never merged inside a month both sides track.
    pub fn merge(local: &OvertimeData, remote: OvertimeData) -> OvertimeData {
        let mut merged = remote;
        for (key, days) in &local.months {
            if !merged.months.contains_key(key) {
                merged.months.insert(key.clone(), days.clone());
            }
        }
        merged
    }

    pub fn month_stats(&self, month: &MonthKey) -> MonthStats {
        let Some(days) = self.months.get(&month.to_string()) else {
            return MonthStats::default();
        };

        let full_days = days.values().filter(|s| **s == DayStatus::Full).count();
        let half_days = days.values().filter(|s| **s == DayStatus::Half).count();

        MonthStats {
            full_days,
            half_days,
            total_days: full_days as f64 + half_days as f64 / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: serde_json::Value) -> OvertimeData {
        serde_json::from_value(value).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn merge_keeps_local_only_months() {
        let local = data(json!({"2024-1": {"2": "full"}}));
        let remote = data(json!({"2024-2": {"5": "half"}}));

        let merged = OvertimeData::merge(&local, remote);
        assert_eq!(
            serde_json::to_value(&merged).unwrap(),
            json!({"2024-2": {"5": "half"}, "2024-1": {"2": "full"}})
        );
    }

    #[test]
    fn merge_remote_month_wins_whole() {
        let local = data(json!({"2024-3": {"1": "full", "2": "half"}, "2024-4": {"9": "full"}}));
        let remote = data(json!({"2024-3": {"7": "half"}}));

        let merged = OvertimeData::merge(&local, remote.clone());
        assert_eq!(merged.month("2024-3"), remote.month("2024-3"));
        assert_eq!(merged.month("2024-4"), local.month("2024-4"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let d = data(json!({"2023-12": {"31": "full"}, "2024-1": {"1": "half"}}));
        assert_eq!(OvertimeData::merge(&d, OvertimeData::new()), d);
        assert_eq!(OvertimeData::merge(&OvertimeData::new(), d.clone()), d);
    }

    #[test]
    fn cycling_has_period_three() {
        let mut status = DayStatus::Normal;
        let seen: Vec<_> = (0..3)
            .map(|_| {
                status = status.next();
                status
            })
            .collect();
        assert_eq!(seen, vec![DayStatus::Half, DayStatus::Full, DayStatus::Normal]);
    }

    #[test]
    fn cycle_day_round_trip_leaves_no_empty_month() {
        let mut d = OvertimeData::new();
        let day = date(2024, 3, 5);

        assert_eq!(d.cycle_day(day), DayStatus::Half);
        assert_eq!(d.cycle_day(day), DayStatus::Full);
        assert_eq!(d.month("2024-3").unwrap().get(&5), Some(&DayStatus::Full));
        assert_eq!(d.cycle_day(day), DayStatus::Normal);
        assert!(!d.contains_month("2024-3"));
        assert!(d.is_empty());
    }

    #[test]
    fn writing_normal_keeps_other_days() {
        let mut d = OvertimeData::new();
        d.set_day(date(2024, 3, 5), DayStatus::Full);
        d.set_day(date(2024, 3, 6), DayStatus::Half);
        d.set_day(date(2024, 3, 5), DayStatus::Normal);

        assert_eq!(d.day_status(date(2024, 3, 5)), DayStatus::Normal);
        assert_eq!(d.day_status(date(2024, 3, 6)), DayStatus::Half);

        // normal on a month that was never touched is a no-op
        d.set_day(date(2025, 1, 1), DayStatus::Normal);
        assert!(!d.contains_month("2025-1"));
    }

    #[test]
    fn deserialize_drops_empty_months_and_normal_days() {
        let d = data(json!({"2024-1": {}, "2024-2": {"3": "normal"}, "2024-3": {"4": "half"}}));
        assert_eq!(d.len(), 1);
        assert!(d.contains_month("2024-3"));
    }

    #[test]
    fn lossy_decode_keeps_valid_days() {
        let (d, skipped) = OvertimeData::from_value_lossy(json!({
            "2024-1": {"2": "full", "3": "double", "x": "half", "4": "normal"},
            "2024-2": {"40": "full"},
            "notes": "hello",
            "2024-3": {"9": "half"}
        }));

        assert_eq!(skipped, 4);
        assert_eq!(
            serde_json::to_value(&d).unwrap(),
            json!({"2024-1": {"2": "full"}, "2024-3": {"9": "half"}})
        );
    }

    #[test]
    fn lossy_decode_of_non_object_is_empty() {
        assert_eq!(OvertimeData::from_value_lossy(json!([1, 2])), (OvertimeData::new(), 1));
        assert_eq!(OvertimeData::from_value_lossy(json!(null)), (OvertimeData::new(), 0));
    }

    #[test]
    fn month_stats_counts_half_days_as_half() {
        let d = data(json!({"2024-3": {"5": "full", "6": "half", "7": "half"}}));
        let stats = d.month_stats(&"2024-3".parse().unwrap());
        assert_eq!(stats.full_days, 1);
        assert_eq!(stats.half_days, 2);
        assert_eq!(stats.total_days, 2.0);

        let empty = d.month_stats(&"2024-4".parse().unwrap());
        assert_eq!(empty, MonthStats::default());
    }

    #[test]
    fn month_key_format_and_parse() {
        let key = MonthKey::from_date(date(2024, 3, 31));
        assert_eq!(key.to_string(), "2024-3");
        assert_eq!("2024-03".parse::<MonthKey>().unwrap(), key);
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("March".parse::<MonthKey>().is_err());
        assert_eq!(MonthKey::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(MonthKey::new(2023, 12).unwrap().days_in_month(), 31);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("FULL".parse::<DayStatus>(), Ok(DayStatus::Full));
        assert!("double".parse::<DayStatus>().is_err());
    }
}
