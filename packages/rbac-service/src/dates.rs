//! Relative and absolute date literals resolved to UTC instant ranges.
//!
//! Every literal becomes an inclusive range. Calendar units (`Today`, `Last Week`,
//! `3 Months Ago`, a bare date) cover the whole unit in the requester's timezone and end one
//! nanosecond before the next unit starts. Literals with a time of day are points.

use std::sync::LazyLock;

use regex::Regex;
use time::{
	Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time,
	format_description::well_known::Rfc3339,
};
use time_tz::{OffsetDateTimeExt, OffsetResult, PrimitiveDateTimeExt, Tz};

static RELATIVE_AGO: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(\d+)\s+(hour|day|week|month|quarter|year)s?\s+ago$")
		.expect("relative date pattern is valid")
});
static ABSOLUTE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2}))?)?$")
		.expect("absolute date pattern is valid")
});

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WeekStart {
	Monday,
	Sunday,
}
impl WeekStart {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"monday" => Some(Self::Monday),
			"sunday" => Some(Self::Sunday),
			_ => None,
		}
	}

	fn days_into_week(self, date: Date) -> i64 {
		match self {
			Self::Monday => i64::from(date.weekday().number_days_from_monday()),
			Self::Sunday => i64::from(date.weekday().number_days_from_sunday()),
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimeRange {
	pub start: OffsetDateTime,
	pub end: OffsetDateTime,
}
impl TimeRange {
	fn point(at: OffsetDateTime) -> Self {
		Self { start: at, end: at }
	}

	/// Smallest range covering both, so reversed `FROM` endpoints still work.
	pub fn span(self, other: Self) -> Self {
		Self { start: self.start.min(other.start), end: self.end.max(other.end) }
	}

	/// First and last calendar dates the range touches in `tz`.
	pub fn local_dates(self, tz: &Tz) -> (Date, Date) {
		(self.start.to_timezone(tz).date(), self.end.to_timezone(tz).date())
	}
}

#[derive(Clone, Copy, Debug)]
enum Unit {
	Hour,
	Day,
	Week,
	Month,
	Quarter,
	Year,
}
impl Unit {
	fn parse(raw: &str) -> Option<Self> {
		match raw {
			"hour" => Some(Self::Hour),
			"day" => Some(Self::Day),
			"week" => Some(Self::Week),
			"month" => Some(Self::Month),
			"quarter" => Some(Self::Quarter),
			"year" => Some(Self::Year),
			_ => None,
		}
	}
}

/// Everything a literal needs to resolve: the frozen now, the requester's zone, and where
/// weeks begin.
#[derive(Clone, Copy)]
pub struct DateContext<'a> {
	pub now: OffsetDateTime,
	pub tz: &'a Tz,
	pub week_start: WeekStart,
}
impl<'a> DateContext<'a> {
	pub fn new(now: OffsetDateTime, tz: &'a Tz, week_start: WeekStart) -> Self {
		Self { now, tz, week_start }
	}

	/// Resolves `raw`, or `None` when it is neither a known relative phrase nor a date.
	pub fn resolve(&self, raw: &str) -> Option<TimeRange> {
		let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();

		if let Some(range) = self.relative(&normalized) {
			return Some(range);
		}

		self.absolute(raw.trim())
	}

	fn relative(&self, phrase: &str) -> Option<TimeRange> {
		let range = match phrase {
			"now" => TimeRange::point(self.now),
			"today" => self.unit(Unit::Day, 0)?,
			"yesterday" => self.unit(Unit::Day, 1)?,
			_ => {
				if let Some((which, unit)) = phrase.split_once(' ')
					&& let Some(unit) = Unit::parse(unit)
				{
					match which {
						"this" => return self.unit(unit, 0),
						"last" => return self.unit(unit, 1),
						_ => {},
					}
				}

				let captures = RELATIVE_AGO.captures(phrase)?;
				let count = captures[1].parse::<i64>().ok()?;
				let unit = Unit::parse(&captures[2])?;

				self.unit(unit, count)?
			},
		};

		Some(range)
	}

	/// The `unit` containing now, moved `back` units into the past. `None` once the move leaves
	/// the representable calendar.
	fn unit(&self, unit: Unit, back: i64) -> Option<TimeRange> {
		let local = self.now.to_timezone(self.tz);
		let today = local.date();

		match unit {
			Unit::Hour => {
				let start = local
					.replace_time(Time::from_hms(local.hour(), 0, 0).ok()?)
					.checked_sub(whole(back, Duration::HOUR)?)?;
				let end = start.checked_add(Duration::HOUR)? - Duration::NANOSECOND;

				Some(TimeRange { start, end })
			},
			Unit::Day => {
				let day = today.checked_sub(whole(back, Duration::DAY)?)?;

				self.dates(day, day.next_day()?)
			},
			Unit::Week => {
				let days = back.checked_mul(7)?.checked_add(self.week_start.days_into_week(today))?;
				let start = today.checked_sub(whole(days, Duration::DAY)?)?;

				self.dates(start, start.checked_add(Duration::WEEK)?)
			},
			Unit::Month => {
				let start = month_start(today.year(), today.month(), back.checked_neg()?)?;

				self.dates(start, month_start(start.year(), start.month(), 1)?)
			},
			Unit::Quarter => {
				let quarter_month = Month::try_from(((today.month() as u8 - 1) / 3) * 3 + 1).ok()?;
				let start = month_start(today.year(), quarter_month, back.checked_mul(-3)?)?;

				self.dates(start, month_start(start.year(), start.month(), 3)?)
			},
			Unit::Year => {
				let year = today.year().checked_sub(i32::try_from(back).ok()?)?;

				self.dates(
					Date::from_calendar_date(year, Month::January, 1).ok()?,
					Date::from_calendar_date(year.checked_add(1)?, Month::January, 1).ok()?,
				)
			},
		}
	}

	/// `[start, next)` as local midnights, closed one nanosecond before `next`.
	fn dates(&self, start: Date, next: Date) -> Option<TimeRange> {
		let start = self.local_midnight(start);
		let next = self.local_midnight(next);

		Some(TimeRange { start, end: next - Duration::NANOSECOND })
	}

	fn absolute(&self, raw: &str) -> Option<TimeRange> {
		if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
			return Some(TimeRange::point(at));
		}

		let captures = ABSOLUTE.captures(raw)?;
		let number = |index: usize| captures.get(index).and_then(|m| m.as_str().parse::<u8>().ok());
		let year = captures[1].parse::<i32>().ok()?;
		let month = Month::try_from(number(2)?).ok()?;
		let date = Date::from_calendar_date(year, month, number(3)?).ok()?;

		let Some(hour) = number(4) else {
			return self.dates(date, date.next_day()?);
		};
		let time = Time::from_hms(hour, number(5)?, number(6).unwrap_or(0)).ok()?;

		Some(TimeRange::point(self.local_instant(PrimitiveDateTime::new(date, time))))
	}

	fn local_midnight(&self, date: Date) -> OffsetDateTime {
		self.local_instant(PrimitiveDateTime::new(date, Time::MIDNIGHT))
	}

	/// Wall-clock time in the context zone. Times inside a DST gap move forward to the first
	/// valid hour.
	fn local_instant(&self, wall: PrimitiveDateTime) -> OffsetDateTime {
		let mut probe = wall;

		for _ in 0..24 {
			match probe.assume_timezone(self.tz) {
				OffsetResult::Some(at) | OffsetResult::Ambiguous(at, _) => return at,
				OffsetResult::None => probe += Duration::HOUR,
			}
		}

		wall.assume_utc()
	}
}

/// `count` whole `unit`s, or `None` when that overflows a [`Duration`].
fn whole(count: i64, unit: Duration) -> Option<Duration> {
	Some(Duration::seconds(count.checked_mul(unit.whole_seconds())?))
}

fn month_start(year: i32, month: Month, delta: i64) -> Option<Date> {
	let index = (i64::from(year) * 12 + i64::from(month as u8 - 1)).checked_add(delta)?;
	let year = i32::try_from(index.div_euclid(12)).ok()?;
	let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;

	Date::from_calendar_date(year, month, 1).ok()
}
