//! Typed table schemas for the local store and the DDL derived from them.

use sea_query::{Alias, ColumnDef, SqliteQueryBuilder, Table};

use crate::db::wire::Statement;

/// Storage class of a column as the application sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// Stored as 0/1.
    Boolean,
    /// Structured value stored as JSON text.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
    }
}

const fn integer(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Integer,
    }
}

const fn real(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Real,
    }
}

const fn boolean(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Boolean,
    }
}

const fn json(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Json,
    }
}

/// A table whose rows are owned by rows of another table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    pub table: &'static str,
    pub foreign_key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub primary_key: &'static str,
    /// Primary key is an integer sequence assigned by the store.
    pub auto_increment: bool,
    pub columns: &'static [Column],
    /// Tables whose rows are removed together with a row of this table.
    pub dependents: &'static [Dependent],
}

impl TableSchema {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }

    #[must_use]
    pub fn has_soft_delete(&self) -> bool {
        self.column("deletedAt").is_some()
    }

    /// ## Summary
    /// `CREATE TABLE IF NOT EXISTS` for this schema.
    #[must_use]
    pub fn create_statement(&self) -> Statement {
        let mut table = Table::create();
        table.table(Alias::new(self.name)).if_not_exists();

        for column in self.columns {
            let mut def = ColumnDef::new(Alias::new(column.name));
            match column.kind {
                ColumnKind::Text | ColumnKind::Json => def.text(),
                ColumnKind::Integer => def.big_integer(),
                ColumnKind::Real => def.double(),
                ColumnKind::Boolean => def.boolean(),
            };
            if column.name == self.primary_key {
                if self.auto_increment {
                    def.integer().auto_increment();
                }
                def.not_null().primary_key();
            }
            table.col(&mut def);
        }

        Statement::execute(table.build(SqliteQueryBuilder), Vec::new())
    }
}

pub const BOOKINGS: TableSchema = TableSchema {
    name: "bookings",
    primary_key: "id",
    auto_increment: false,
    columns: &[
        text("id"),
        text("clientId"),
        text("clientName"),
        text("clientPhone"),
        text("category"),
        text("rentalType"),
        text("shootDate"),
        text("startTime"),
        text("endTime"),
        text("status"),
        real("totalAmount"),
        real("paidAmount"),
        text("currency"),
        real("exchangeRate"),
        json("details"),
        json("statusHistory"),
        text("selectionDeadline"),
        text("selectionConfirmedAt"),
        text("deliveryDeadline"),
        text("deliveredAt"),
        text("clientToken"),
        integer("lastEditorRank"),
        text("createdBy"),
        text("createdByName"),
        text("updatedBy"),
        text("updatedByName"),
        text("createdAt"),
        text("updatedAt"),
        text("deletedAt"),
        text("deletedBy"),
    ],
    dependents: &[
        Dependent {
            table: "reminders",
            foreign_key: "bookingId",
        },
        Dependent {
            table: "dashboard_tasks",
            foreign_key: "bookingId",
        },
    ],
};

pub const REMINDERS: TableSchema = TableSchema {
    name: "reminders",
    primary_key: "id",
    auto_increment: false,
    columns: &[
        text("id"),
        text("bookingId"),
        text("title"),
        text("dueDate"),
        boolean("completed"),
        text("reminderType"),
        text("createdBy"),
        text("createdAt"),
        text("updatedAt"),
        text("deletedAt"),
        text("deletedBy"),
    ],
    dependents: &[],
};

pub const DASHBOARD_TASKS: TableSchema = TableSchema {
    name: "dashboard_tasks",
    primary_key: "id",
    auto_increment: false,
    columns: &[
        text("id"),
        text("bookingId"),
        text("title"),
        text("assignedRole"),
        boolean("completed"),
        text("createdAt"),
        text("updatedAt"),
        text("deletedAt"),
        text("deletedBy"),
    ],
    dependents: &[],
};

pub const INVENTORY: TableSchema = TableSchema {
    name: "inventory",
    primary_key: "id",
    auto_increment: false,
    columns: &[
        text("id"),
        text("name"),
        text("itemType"),
        text("status"),
        text("assignedTo"),
        text("assignedToName"),
        integer("batteryTotal"),
        integer("batteryCharged"),
        integer("memoryTotal"),
        integer("memoryFree"),
        text("notes"),
        text("createdAt"),
        text("updatedAt"),
        text("deletedAt"),
        text("deletedBy"),
    ],
    dependents: &[],
};

pub const INVENTORY_LOGS: TableSchema = TableSchema {
    name: "inventory_logs",
    primary_key: "id",
    auto_increment: false,
    columns: &[
        text("id"),
        text("itemId"),
        text("action"),
        text("actorId"),
        text("actorName"),
        text("detail"),
        text("createdAt"),
    ],
    dependents: &[],
};

pub const ACTIVITY_LOGS: TableSchema = TableSchema {
    name: "activity_logs",
    primary_key: "id",
    auto_increment: false,
    columns: &[
        text("id"),
        text("actorId"),
        text("actorName"),
        text("actorRole"),
        text("action"),
        text("entityType"),
        text("entityId"),
        text("summary"),
        text("createdAt"),
    ],
    dependents: &[],
};

pub const BOOKING_CONFLICTS: TableSchema = TableSchema {
    name: "booking_conflicts",
    primary_key: "id",
    auto_increment: false,
    columns: &[
        text("id"),
        text("bookingId"),
        text("proposedById"),
        text("proposedByName"),
        integer("proposedRank"),
        json("proposal"),
        text("status"),
        text("resolvedById"),
        text("resolvedByName"),
        text("resolvedAt"),
        text("createdAt"),
    ],
    dependents: &[],
};

pub const SYNC_QUEUE: TableSchema = TableSchema {
    name: "sync_queue",
    primary_key: "id",
    auto_increment: true,
    columns: &[
        integer("id"),
        text("entityType"),
        text("entityId"),
        text("operation"),
        json("payload"),
        text("status"),
        text("createdAt"),
        integer("retryCount"),
        text("lastError"),
        text("nextAttemptAt"),
    ],
    dependents: &[],
};

pub const NOTIFICATIONS: TableSchema = TableSchema {
    name: "notifications",
    primary_key: "id",
    auto_increment: false,
    columns: &[
        text("id"),
        text("kind"),
        text("title"),
        text("message"),
        json("targetRoles"),
        text("bookingId"),
        boolean("read"),
        text("createdAt"),
    ],
    dependents: &[],
};

/// Every table the local store carries, in creation order.
pub const ALL_TABLES: [&TableSchema; 9] = [
    &BOOKINGS,
    &REMINDERS,
    &DASHBOARD_TASKS,
    &INVENTORY,
    &INVENTORY_LOGS,
    &ACTIVITY_LOGS,
    &BOOKING_CONFLICTS,
    &SYNC_QUEUE,
    &NOTIFICATIONS,
];

/// ## Summary
/// Looks a schema up by table name.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES.iter().copied().find(|schema| schema.name == name)
}
