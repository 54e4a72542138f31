//! Timezone lookup for requester settings.
//!
//! User settings carry display names such as "Eastern Time (US & Canada)"; those are mapped to
//! their IANA zone before lookup. IANA names are accepted as is.

use time_tz::{Tz, timezones};

use crate::{Error, Result};

const DISPLAY_NAMES: &[(&str, &str)] = &[
	("International Date Line West", "Etc/GMT+12"),
	("Midway Island", "Pacific/Midway"),
	("American Samoa", "Pacific/Pago_Pago"),
	("Hawaii", "Pacific/Honolulu"),
	("Alaska", "America/Juneau"),
	("Pacific Time (US & Canada)", "America/Los_Angeles"),
	("Tijuana", "America/Tijuana"),
	("Mountain Time (US & Canada)", "America/Denver"),
	("Arizona", "America/Phoenix"),
	("Chihuahua", "America/Chihuahua"),
	("Central Time (US & Canada)", "America/Chicago"),
	("Mexico City", "America/Mexico_City"),
	("Saskatchewan", "America/Regina"),
	("Eastern Time (US & Canada)", "America/New_York"),
	("Indiana (East)", "America/Indiana/Indianapolis"),
	("Bogota", "America/Bogota"),
	("Lima", "America/Lima"),
	("Atlantic Time (Canada)", "America/Halifax"),
	("Caracas", "America/Caracas"),
	("Santiago", "America/Santiago"),
	("Newfoundland", "America/St_Johns"),
	("Brasilia", "America/Sao_Paulo"),
	("Buenos Aires", "America/Argentina/Buenos_Aires"),
	("Greenland", "America/Godthab"),
	("Azores", "Atlantic/Azores"),
	("Cape Verde Is.", "Atlantic/Cape_Verde"),
	("UTC", "Etc/UTC"),
	("London", "Europe/London"),
	("Dublin", "Europe/Dublin"),
	("Lisbon", "Europe/Lisbon"),
	("Amsterdam", "Europe/Amsterdam"),
	("Berlin", "Europe/Berlin"),
	("Paris", "Europe/Paris"),
	("Madrid", "Europe/Madrid"),
	("Rome", "Europe/Rome"),
	("Stockholm", "Europe/Stockholm"),
	("Prague", "Europe/Prague"),
	("Warsaw", "Europe/Warsaw"),
	("Athens", "Europe/Athens"),
	("Helsinki", "Europe/Helsinki"),
	("Istanbul", "Europe/Istanbul"),
	("Jerusalem", "Asia/Jerusalem"),
	("Cairo", "Africa/Cairo"),
	("Moscow", "Europe/Moscow"),
	("Dubai", "Asia/Dubai"),
	("Karachi", "Asia/Karachi"),
	("Kolkata", "Asia/Kolkata"),
	("New Delhi", "Asia/Kolkata"),
	("Dhaka", "Asia/Dhaka"),
	("Bangkok", "Asia/Bangkok"),
	("Jakarta", "Asia/Jakarta"),
	("Beijing", "Asia/Shanghai"),
	("Hong Kong", "Asia/Hong_Kong"),
	("Singapore", "Asia/Singapore"),
	("Taipei", "Asia/Taipei"),
	("Seoul", "Asia/Seoul"),
	("Tokyo", "Asia/Tokyo"),
	("Sydney", "Australia/Sydney"),
	("Melbourne", "Australia/Melbourne"),
	("Brisbane", "Australia/Brisbane"),
	("Adelaide", "Australia/Adelaide"),
	("Perth", "Australia/Perth"),
	("Auckland", "Pacific/Auckland"),
];

/// IANA name for `name`, resolving display names first.
pub fn iana_name(name: &str) -> &str {
	let trimmed = name.trim();

	DISPLAY_NAMES
		.iter()
		.find(|(display, _)| display.eq_ignore_ascii_case(trimmed))
		.map(|(_, iana)| *iana)
		.unwrap_or(trimmed)
}

pub fn resolve(name: &str) -> Result<&'static Tz> {
	let iana = iana_name(name);
	let lookup = if iana.eq_ignore_ascii_case("utc") { "Etc/UTC" } else { iana };

	timezones::get_by_name(lookup).ok_or_else(|| Error::UnknownTimezone { name: name.to_string() })
}
