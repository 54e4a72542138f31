//! Postgres DDL for the layout [`crate::sql`] renders against.

use std::collections::BTreeMap;

use rbac_domain::kinds::{BUILTIN_COLUMNS, ColumnType, KindRegistry};

const SHARED_TABLES: &str = "\
CREATE TABLE IF NOT EXISTS tenants (
	id BIGINT PRIMARY KEY,
	name TEXT NOT NULL,
	parent_id BIGINT REFERENCES tenants (id),
	divisible BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS containment_nodes (
	id BIGINT PRIMARY KEY,
	kind TEXT NOT NULL,
	name TEXT NOT NULL,
	parent_id BIGINT REFERENCES containment_nodes (id)
);

CREATE TABLE IF NOT EXISTS taggings (
	taggable_table TEXT NOT NULL,
	taggable_id BIGINT NOT NULL,
	tag TEXT NOT NULL,
	PRIMARY KEY (taggable_table, taggable_id, tag)
);
";

/// One table per storage table in `kinds`, carrying the union of the columns of every kind
/// stored there.
pub fn render_schema(kinds: &KindRegistry) -> String {
	let mut tables: BTreeMap<&'static str, BTreeMap<&'static str, ColumnType>> = BTreeMap::new();

	for kind in kinds.iter() {
		let columns = tables.entry(kind.table).or_default();

		for column in &kind.columns {
			columns.entry(column.name).or_insert(column.column_type);
		}
	}

	let mut out = String::from(SHARED_TABLES);

	for (table, columns) in tables {
		out.push('\n');
		out.push_str(&format!("CREATE TABLE IF NOT EXISTS {table} (\n"));
		out.push_str("\tid BIGINT PRIMARY KEY,\n");
		out.push_str("\tkind TEXT NOT NULL,\n");

		for builtin in BUILTIN_COLUMNS.iter().filter(|column| column.name != "id") {
			out.push_str(&format!("\t{} BIGINT,\n", builtin.name));
		}

		out.push_str("\tcontainment_node_id BIGINT REFERENCES containment_nodes (id)");

		for (name, column_type) in columns {
			out.push_str(&format!(",\n\t{name} {}", sql_type(column_type)));
		}

		out.push_str("\n);\n");
		out.push_str(&format!(
			"CREATE INDEX IF NOT EXISTS {table}_kind_tenant_idx ON {table} (kind, tenant_id);\n"
		));
	}

	out
}

fn sql_type(column_type: ColumnType) -> &'static str {
	match column_type {
		ColumnType::String => "TEXT",
		ColumnType::Integer => "BIGINT",
		ColumnType::Float => "DOUBLE PRECISION",
		ColumnType::Boolean => "BOOLEAN",
		ColumnType::Date => "DATE",
		ColumnType::DateTime => "TIMESTAMPTZ",
	}
}
