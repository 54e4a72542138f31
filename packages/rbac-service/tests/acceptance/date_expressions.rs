use serde_json::{Value, json};
use time::{Date, Duration, Month, OffsetDateTime, macros::datetime};

use rbac_domain::entity::AttrValue;
use rbac_service::{Expression, ScopeEngine, SearchRequest};
use rbac_testkit::{EntityBuilder, World, group, user};

use super::{for_user, frozen_engine, search};

const NOW: OffsetDateTime = datetime!(2011-01-11 17:30 UTC);
const EASTERN_USER: u64 = 100;

// Hourly scans land on host 1, everything older on host 2.
fn world() -> World {
	let mut world = World::new().expect("world");
	let mut eastern = user(EASTERN_USER, 10);
	let mut next_id = 0;

	eastern.timezone = Some("Eastern Time (US & Canada)".to_string());

	world.tenant(0, None).expect("root tenant");
	world.group(group(10, 0)).expect("group");
	world.user_with(eastern).expect("eastern user");

	for host in [1, 2] {
		world
			.entity(EntityBuilder::new(host, "Host").attr("name", format!("host{host}").as_str()).build())
			.expect("host");
	}

	let mut scanned = |name: String, host: i64, at: Option<OffsetDateTime>| {
		let mut vm = EntityBuilder::new(next_id + 1, "Vm")
			.tenant(0)
			.attr("name", name.as_str())
			.attr("host_id", host);

		next_id += 1;

		if let Some(at) = at {
			vm = vm.time("last_scan_on", at).attr("retires_on", AttrValue::Date(at.date()));
		}

		world.entity(vm.build()).expect("vm");
	};

	for i in 0..20 {
		scanned(format!("VM Hour {i}"), 1, Some(NOW - Duration::hours(i)));
	}
	for i in 0..15 {
		scanned(format!("VM Day {i}"), 2, Some(NOW - Duration::days(i)));
	}
	for i in 0..10 {
		scanned(format!("VM Week {i}"), 2, Some(NOW - Duration::weeks(i)));
	}
	for i in 0..10 {
		scanned(format!("VM Month {i}"), 2, Some(months_ago(i)));
	}
	for i in 0..5 {
		scanned(format!("VM Quarter {i}"), 2, Some(months_ago(3 * i)));
	}
	for i in 0..2 {
		scanned(format!("VM Unscanned {i}"), 2, None);
	}

	world
}

fn months_ago(months: i32) -> OffsetDateTime {
	let index = NOW.year() * 12 + i32::from(NOW.month() as u8 - 1) - months;
	let month = Month::try_from((index.rem_euclid(12) + 1) as u8).expect("month");
	let date = Date::from_calendar_date(index.div_euclid(12), month, 11).expect("date");

	NOW.replace_date(date)
}

fn engine() -> ScopeEngine {
	frozen_engine(world(), NOW)
}

fn count_as(engine: &ScopeEngine, request: SearchRequest, filter: Value) -> u64 {
	let filter = Expression::parse(&filter).expect("filter");

	search(engine, SearchRequest { filter: Some(filter), ..request }).auth_count
}

fn count(engine: &ScopeEngine, kind: &str, filter: Value) -> u64 {
	count_as(engine, SearchRequest::new(kind), filter)
}

fn leaf(op: &str, field: &str, value: Value) -> Value {
	json!({ op: { "field": field, "value": value } })
}

#[test]
fn after_takes_times_past_the_instant() {
	let engine = engine();

	for op in ["AFTER", ">"] {
		assert_eq!(count(&engine, "Vm", leaf(op, "Vm-last_scan_on", json!("2011-01-11 9:00"))), 13);
	}
}

#[test]
fn emptiness_checks_see_missing_dates() {
	let engine = engine();

	for field in ["Vm-last_scan_on", "Vm-retires_on"] {
		assert_eq!(count(&engine, "Vm", json!({ "IS EMPTY": { "field": field } })), 2);
		assert_eq!(count(&engine, "Vm", json!({ "IS NOT EMPTY": { "field": field } })), 60);
	}
}

#[test]
fn is_covers_the_whole_day() {
	let engine = engine();

	assert_eq!(count(&engine, "Vm", leaf("IS", "Vm-retires_on", json!("2011-01-10"))), 3);
	assert_eq!(count(&engine, "Vm", leaf("IS", "Vm-last_scan_on", json!("2011-01-11"))), 22);
	assert_eq!(count(&engine, "Vm", leaf("IS", "Vm-last_scan_on", json!("Today"))), 22);
}

#[test]
fn hours_ago_narrows_times_but_not_dates() {
	let engine = engine();

	assert_eq!(count(&engine, "Vm", leaf("IS", "Vm-last_scan_on", json!("3 Hours Ago"))), 1);
	assert_eq!(count(&engine, "Vm", leaf("IS", "Vm-retires_on", json!("3 Hours Ago"))), 22);
}

#[test]
fn last_month_is_the_previous_calendar_month() {
	let engine = engine();

	for field in ["Vm-last_scan_on", "Vm-retires_on"] {
		assert_eq!(count(&engine, "Vm", leaf("IS", field, json!("Last Month"))), 9);
		assert_eq!(count(&engine, "Vm", leaf("FROM", field, json!(["Last Month", "Last Month"]))), 9);
	}
}

#[test]
fn from_spans_absolute_dates() {
	let engine = engine();

	for field in ["Vm-last_scan_on", "Vm-retires_on"] {
		assert_eq!(count(&engine, "Vm", leaf("FROM", field, json!(["2010-07-11", "2010-12-31"]))), 20);
	}

	assert_eq!(
		count(
			&engine,
			"Vm",
			leaf("FROM", "Vm-last_scan_on", json!(["2011-01-09 17:00", "2011-01-10 23:30:59"]))
		),
		4
	);
}

#[test]
fn from_spans_relative_periods() {
	let engine = engine();
	let from = |field: &str, value: Value| count(&engine, "Vm", leaf("FROM", field, value));

	for field in ["Vm-last_scan_on", "Vm-retires_on"] {
		assert_eq!(from(field, json!(["Last Week", "Last Week"])), 8);
	}

	assert_eq!(from("Vm-last_scan_on", json!(["Last Week", "This Week"])), 33);
	assert_eq!(from("Vm-last_scan_on", json!(["2 Months Ago", "1 Month Ago"])), 14);
}

#[test]
fn find_checks_any_related_row() {
	let engine = engine();
	let in_range =
		leaf("FROM", "Host.vms-last_scan_on", json!(["2011-01-08 17:00", "2011-01-09 23:30:59"]));
	let named = json!({ "IS NOT NULL": { "field": "Host.vms-name" } });
	let any = json!({ "FIND": { "search": named.clone(), "checkany": in_range.clone() } });
	let all = json!({ "FIND": { "search": in_range, "checkall": named } });

	assert_eq!(count(&engine, "Host", any), 1);
	assert_eq!(count(&engine, "Host", all), 1);
}

#[test]
fn requester_timezones_shift_local_literals() {
	let engine = engine();
	let eastern = |filter: Value| count_as(&engine, for_user("Vm", EASTERN_USER), filter);

	assert_eq!(
		eastern(leaf("FROM", "Vm-last_scan_on", json!(["2011-01-09 17:00", "2011-01-10 23:30:59"]))),
		8
	);
	assert_eq!(eastern(leaf("IS", "Vm-retires_on", json!("2011-01-10"))), 3);
	assert_eq!(eastern(leaf("IS", "Vm-last_scan_on", json!("2011-01-11"))), 17);
}

#[test]
fn unresolvable_dates_are_malformed() {
	let engine = engine();

	for raw in ["Next Tuesday", "200000000000000 Days Ago", "2000000000000000000 Weeks Ago"] {
		let filter = Expression::parse(&leaf("IS", "Vm-last_scan_on", json!(raw))).expect("filter");
		let result =
			engine.search(&SearchRequest { filter: Some(filter), ..SearchRequest::new("Vm") });

		assert!(
			matches!(result, Err(rbac_service::Error::MalformedExpression { .. })),
			"{raw} should be malformed"
		);
	}
}
