//! Table catalog for the five persisted tables.
//!
//! Both schema-creation strategies consume the same definitions: the REST
//! adapter ships `name` + `columns` to the `create_table_if_not_exists` RPC,
//! the SQL adapter executes [`TableDefinition::create_statement`] directly.

/// One table as `(name, column list)` in DDL form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: &'static str,
    pub columns: &'static str,
}

impl TableDefinition {
    pub fn create_statement(&self) -> String {
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, self.columns)
    }
}

pub const USERS: TableDefinition = TableDefinition {
    name: "users",
    columns: "id SERIAL PRIMARY KEY, \
              username TEXT NOT NULL UNIQUE, \
              password TEXT NOT NULL",
};

pub const ACTIVITY_TYPES: TableDefinition = TableDefinition {
    name: "activity_types",
    columns: "id SERIAL PRIMARY KEY, \
              code TEXT NOT NULL UNIQUE, \
              name TEXT NOT NULL, \
              color TEXT NOT NULL",
};

pub const PROFESSIONALS: TableDefinition = TableDefinition {
    name: "professionals",
    columns: "id SERIAL PRIMARY KEY, \
              name TEXT NOT NULL, \
              initials TEXT NOT NULL, \
              active INTEGER NOT NULL DEFAULT 1",
};

pub const TIME_SLOTS: TableDefinition = TableDefinition {
    name: "time_slots",
    columns: "id SERIAL PRIMARY KEY, \
              start_time TEXT NOT NULL, \
              end_time TEXT NOT NULL, \
              interval_minutes INTEGER NOT NULL DEFAULT 30, \
              is_base_slot INTEGER NOT NULL DEFAULT 1",
};

// professional_id and activity_code carry no foreign-key constraint.
pub const SCHEDULES: TableDefinition = TableDefinition {
    name: "schedules",
    columns: "id SERIAL PRIMARY KEY, \
              professional_id INTEGER NOT NULL, \
              weekday TEXT NOT NULL, \
              start_time TEXT NOT NULL, \
              end_time TEXT NOT NULL, \
              activity_code TEXT NOT NULL, \
              location TEXT, \
              notes TEXT, \
              updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP",
};

/// All tables in creation order.
pub const ALL_TABLES: [TableDefinition; 5] =
    [USERS, ACTIVITY_TYPES, PROFESSIONALS, TIME_SLOTS, SCHEDULES];

/// Look up a table definition by name.
pub fn table(name: &str) -> Option<&'static TableDefinition> {
    ALL_TABLES.iter().find(|t| t.name == name)
}
