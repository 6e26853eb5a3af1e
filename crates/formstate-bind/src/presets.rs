//! Ready-made [`InputOptions`] for common element kinds
//!
//! Each preset fixes the parser, formatter and comparator of one kind of
//! input. The remaining options are set with the usual builders:
//!
//! ```
//! use formstate_bind::presets;
//!
//! let options = presets::number().required(true).input_delay_ms(200);
//! assert!(options.is_partial.is_none());
//! ```

use crate::input::InputOptions;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use formstate_core::equality::is_equal_opt;
use formstate_core::value::{FieldValue, FormValue};

/// `chrono` format of date inputs
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// `chrono` format of date-time inputs
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
/// Shown by a colour input whose field has no value
pub const DEFAULT_COLOUR: &str = "#000000";

/// Hour and minute of a time input, stored as `{ hour, minute }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
	pub hour: u32,
	pub minute: u32,
}

impl TimeOfDay {
	/// `None` when the hour or minute is out of range
	pub fn new(hour: u32, minute: u32) -> Option<Self> {
		NaiveTime::from_hms_opt(hour, minute, 0)?;
		Some(Self { hour, minute })
	}
}

impl FormValue for TimeOfDay {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::record([
			("hour", FieldValue::Int(i64::from(self.hour))),
			("minute", FieldValue::Int(i64::from(self.minute))),
		])
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		let part = |key| value.get(key)?.as_i64().and_then(|v| u32::try_from(v).ok());
		Self::new(part("hour")?, part("minute")?)
	}
}

/// ISO week of a week input, stored as `{ year, week }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoWeek {
	pub year: i32,
	pub week: u32,
}

impl IsoWeek {
	/// `None` when the year has no such ISO week
	pub fn new(year: i32, week: u32) -> Option<Self> {
		NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
		Some(Self { year, week })
	}

	/// Monday of the week
	pub fn first_day(&self) -> Option<NaiveDate> {
		NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
	}
}

impl FormValue for IsoWeek {
	fn to_field_value(&self) -> FieldValue {
		FieldValue::record([
			("year", FieldValue::Int(i64::from(self.year))),
			("week", FieldValue::Int(i64::from(self.week))),
		])
	}

	fn from_field_value(value: &FieldValue) -> Option<Self> {
		let year = value.get("year")?.as_i64().and_then(|v| i32::try_from(v).ok())?;
		let week = value.get("week")?.as_i64().and_then(|v| u32::try_from(v).ok())?;
		Self::new(year, week)
	}
}

/// Non-empty text that failed to parse
fn unparsed<T>(raw: &str, parsed: Option<&T>) -> bool {
	!raw.trim().is_empty() && parsed.is_none()
}

/// Free text; an absent store value shows as the empty string
pub fn text() -> InputOptions<String> {
	InputOptions::new(|raw| Some(raw.to_string()), |value| value.cloned().unwrap_or_default())
		.to_internal(|value| Some(value.and_then(String::from_field_value).unwrap_or_default()))
}

/// Floating point number, empty or unparsable text clears the value
pub fn number() -> InputOptions<f64> {
	InputOptions::new(
		|raw| raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
		|value| value.map(f64::to_string).unwrap_or_default(),
	)
}

/// Number that must be strictly positive
pub fn positive_number() -> InputOptions<f64> {
	number().validator(|value: Option<&f64>| match value {
		Some(v) if *v <= 0.0 => Err("must be positive"),
		_ => Ok(()),
	})
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
	NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// `yyyy-MM-dd` date
///
/// Text that does not parse yet, like `202-`, is partial and never reaches
/// the store.
pub fn date() -> InputOptions<NaiveDate> {
	InputOptions::new(parse_date, |value| {
		value.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default()
	})
	.is_partial(unparsed)
}

/// `yyyy-MM` month, stored as the first day of the month
///
/// Two dates in the same month compare equal, so a store value on another
/// day of the displayed month leaves the element alone.
pub fn month() -> InputOptions<NaiveDate> {
	InputOptions::new(
		|raw| parse_date(&format!("{}-01", raw.trim())),
		|value| value.map(|d| d.format("%Y-%m").to_string()).unwrap_or_default(),
	)
	.comparator(|a, b| match (a, b) {
		(Some(a), Some(b)) => a.year() == b.year() && a.month() == b.month(),
		(None, None) => true,
		_ => false,
	})
	.is_partial(unparsed)
}

fn parse_time(raw: &str) -> Option<TimeOfDay> {
	let (hour, minute) = raw.trim().split_once(':')?;
	TimeOfDay::new(hour.parse().ok()?, minute.parse().ok()?)
}

/// `hh:mm` time
///
/// Partial until both the hour and the minute are present.
pub fn time() -> InputOptions<TimeOfDay> {
	InputOptions::new(parse_time, |value| {
		value
			.map(|t| format!("{:02}:{:02}", t.hour, t.minute))
			.unwrap_or_default()
	})
	.is_partial(unparsed)
}

/// `yyyy-MM-ddThh:mm` local date and time
pub fn datetime() -> InputOptions<NaiveDateTime> {
	InputOptions::new(
		|raw| NaiveDateTime::parse_from_str(raw.trim(), DATETIME_FORMAT).ok(),
		|value| value.map(|d| d.format(DATETIME_FORMAT).to_string()).unwrap_or_default(),
	)
	.is_partial(unparsed)
}

fn parse_week(raw: &str) -> Option<IsoWeek> {
	let (year, week) = raw.trim().split_once("-W")?;
	IsoWeek::new(year.parse().ok()?, week.parse().ok()?)
}

/// `yyyy-Www` ISO week
///
/// Partial until both the year and the week are present.
pub fn week() -> InputOptions<IsoWeek> {
	InputOptions::new(parse_week, |value| {
		value
			.map(|w| format!("{:04}-W{:02}", w.year, w.week))
			.unwrap_or_default()
	})
	.is_partial(unparsed)
}

/// `#rrggbb` colour; an absent store value shows as [`DEFAULT_COLOUR`]
pub fn colour() -> InputOptions<String> {
	InputOptions::new(|raw| Some(raw.to_string()), |value| value.cloned().unwrap_or_default())
		.to_internal(|value| {
			Some(
				value
					.and_then(String::from_field_value)
					.unwrap_or_else(|| DEFAULT_COLOUR.to_string()),
			)
		})
}

/// Slider value, clamped into `min..=max` like a range element does
pub fn range(min: f64, max: f64) -> InputOptions<f64> {
	let (low, high) = if min <= max { (min, max) } else { (max, min) };
	InputOptions::new(
		move |raw| {
			raw.trim()
				.parse::<f64>()
				.ok()
				.filter(|v| !v.is_nan())
				.map(|v| v.clamp(low, high))
		},
		|value| value.map(f64::to_string).unwrap_or_default(),
	)
}

/// Checkbox storing `checked` or `unchecked`
///
/// The element text is `"true"` while checked.
pub fn checkbox<T: FormValue>(checked: T, unchecked: Option<T>) -> InputOptions<T> {
	let checked_value = checked.to_field_value();
	let on = checked.clone();
	InputOptions::new(
		move |raw| {
			if raw == "true" {
				Some(on.clone())
			} else {
				unchecked.clone()
			}
		},
		move |value| {
			let value = value.map(FormValue::to_field_value);
			is_equal_opt(value.as_ref(), Some(&checked_value)).to_string()
		},
	)
}

/// Boolean checkbox storing `true` or `false`
pub fn toggle() -> InputOptions<bool> {
	checkbox(true, Some(false))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("", None)]
	#[case("12.5", Some(12.5))]
	#[case(" 3 ", Some(3.0))]
	#[case("abc", None)]
	fn test_number_parser(#[case] raw: &str, #[case] expected: Option<f64>) {
		assert_eq!((number().parser)(raw), expected);
	}

	#[rstest]
	#[case("202-", true)]
	#[case("2024-13-01", true)]
	#[case("", false)]
	#[case("2024-02-29", false)]
	fn test_date_partial(#[case] raw: &str, #[case] partial: bool) {
		let options = date();
		let parsed = (options.parser)(raw);
		let check = options.is_partial.as_ref().map(|f| f(raw, parsed.as_ref()));
		assert_eq!(check, Some(partial));
	}

	#[rstest]
	fn test_month_round_trip_and_comparison() {
		let options = month();
		let parsed = (options.parser)("2025-05");
		assert_eq!(parsed, NaiveDate::from_ymd_opt(2025, 5, 1));
		assert_eq!((options.to_string)(parsed.as_ref()), "2025-05");

		let later = NaiveDate::from_ymd_opt(2025, 5, 20);
		assert!((options.comparator)(parsed.as_ref(), later.as_ref()));
	}

	#[rstest]
	#[case("09:30", TimeOfDay::new(9, 30))]
	#[case("9:05", TimeOfDay::new(9, 5))]
	#[case("00:00", TimeOfDay::new(0, 0))]
	#[case("24:00", None)]
	#[case("12:", None)]
	#[case("12", None)]
	fn test_time_parser(#[case] raw: &str, #[case] expected: Option<TimeOfDay>) {
		assert_eq!((time().parser)(raw), expected);
	}

	#[rstest]
	#[case("12:", true)]
	#[case(":30", true)]
	#[case("", false)]
	#[case("12:30", false)]
	fn test_time_partial_until_both_parts(#[case] raw: &str, #[case] partial: bool) {
		let options = time();
		let parsed = (options.parser)(raw);
		let check = options.is_partial.as_ref().map(|f| f(raw, parsed.as_ref()));
		assert_eq!(check, Some(partial));
	}

	#[rstest]
	fn test_time_store_shape() {
		let value = TimeOfDay { hour: 7, minute: 45 };
		let stored = value.to_field_value();
		assert_eq!(stored.get("hour"), Some(&FieldValue::Int(7)));
		assert_eq!(TimeOfDay::from_field_value(&stored), Some(value));
		assert_eq!((time().to_string)(Some(&value)), "07:45");
	}

	#[rstest]
	#[case("2025-03-04T08:15", NaiveDate::from_ymd_opt(2025, 3, 4).and_then(|d| d.and_hms_opt(8, 15, 0)))]
	#[case("2025-03-04", None)]
	#[case("2025-03-04T25:00", None)]
	fn test_datetime_parser(#[case] raw: &str, #[case] expected: Option<NaiveDateTime>) {
		assert_eq!((datetime().parser)(raw), expected);
	}

	#[rstest]
	fn test_datetime_formats_to_minutes() {
		let value = NaiveDate::from_ymd_opt(2025, 3, 4).and_then(|d| d.and_hms_opt(8, 15, 59));
		assert_eq!((datetime().to_string)(value.as_ref()), "2025-03-04T08:15");
	}

	#[rstest]
	#[case("2025-W07", IsoWeek::new(2025, 7))]
	#[case("2020-W53", IsoWeek::new(2020, 53))]
	#[case("2025-W53", None)]
	#[case("2025-W", None)]
	#[case("2025", None)]
	fn test_week_parser(#[case] raw: &str, #[case] expected: Option<IsoWeek>) {
		assert_eq!((week().parser)(raw), expected);
	}

	#[rstest]
	fn test_week_store_shape() {
		let value = IsoWeek { year: 2025, week: 7 };
		assert_eq!(IsoWeek::from_field_value(&value.to_field_value()), Some(value));
		assert_eq!((week().to_string)(Some(&value)), "2025-W07");
		assert_eq!(value.first_day(), NaiveDate::from_ymd_opt(2025, 2, 10));
	}

	#[rstest]
	#[case(None, "#000000")]
	#[case(Some(FieldValue::from("#ff8800")), "#ff8800")]
	fn test_colour_reads_absent_as_black(#[case] stored: Option<FieldValue>, #[case] expected: &str) {
		let options = colour();
		assert_eq!((options.to_internal)(stored.as_ref()).as_deref(), Some(expected));
	}

	#[rstest]
	#[case("50", Some(50.0))]
	#[case("-3", Some(0.0))]
	#[case("250", Some(100.0))]
	#[case("", None)]
	fn test_range_clamps(#[case] raw: &str, #[case] expected: Option<f64>) {
		assert_eq!((range(0.0, 100.0).parser)(raw), expected);
	}

	#[rstest]
	fn test_text_reads_absent_as_empty() {
		let options = text();
		assert_eq!((options.to_internal)(None), Some(String::new()));
	}

	#[rstest]
	#[case("true", Some("yes"))]
	#[case("false", Some("no"))]
	fn test_checkbox_values(#[case] raw: &str, #[case] expected: Option<&str>) {
		let options = checkbox("yes".to_string(), Some("no".to_string()));
		assert_eq!((options.parser)(raw).as_deref(), expected);
	}

	#[rstest]
	fn test_checkbox_formats_checked_state() {
		let options = toggle();
		assert_eq!((options.to_string)(Some(&true)), "true");
		assert_eq!((options.to_string)(Some(&false)), "false");
		assert_eq!((options.to_string)(None), "false");
	}
}
