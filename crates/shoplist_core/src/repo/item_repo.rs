//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `items` table.
//! - Own the explicit mapping between `Item` and its storage row.
//!
//! # Invariants
//! - Write paths call `Item::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Lists are ordered by `name` (binary collation) then `id`.

use crate::db::DbError;
use crate::model::item::{Item, ItemId, ItemValidationError};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    name,
    quantity,
    purchased
FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for item CRUD operations.
pub trait ItemRepository {
    /// Inserts a new row and returns the store-assigned id.
    ///
    /// Any id carried by `item` is ignored.
    fn insert_item(&self, item: &Item) -> RepoResult<ItemId>;
    /// Replaces the row matching `item.id`. Returns `false` when no row matched.
    fn update_item(&self, item: &Item) -> RepoResult<bool>;
    /// Removes the row with `id`. Returns `false` when no row matched.
    fn delete_item(&self, id: ItemId) -> RepoResult<bool>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    fn list_items(&self) -> RepoResult<Vec<Item>>;
    fn count_items(&self) -> RepoResult<usize>;
}

/// SQLite-backed item repository borrowing an open connection.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn insert_item(&self, item: &Item) -> RepoResult<ItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO items (name, quantity, purchased) VALUES (?1, ?2, ?3);",
            params![
                item.name.as_str(),
                item.quantity,
                bool_to_int(item.purchased)
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_item(&self, item: &Item) -> RepoResult<bool> {
        item.validate()?;

        let changed = self.conn.execute(
            "UPDATE items
             SET
                name = ?1,
                quantity = ?2,
                purchased = ?3
             WHERE id = ?4;",
            params![
                item.name.as_str(),
                item.quantity,
                bool_to_int(item.purchased),
                item.id,
            ],
        )?;

        Ok(changed > 0)
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }

        Ok(None)
    }

    fn list_items(&self) -> RepoResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL} ORDER BY name COLLATE BINARY ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }

    fn count_items(&self) -> RepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("invalid item count `{count}`")))
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let purchased = match row.get::<_, i64>("purchased")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid purchased value `{other}` in items.purchased"
            )));
        }
    };

    let item = Item {
        id: row.get("id")?,
        name: row.get("name")?,
        quantity: row.get("quantity")?,
        purchased,
    };
    item.validate()?;
    Ok(item)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{bool_to_int, ItemRepository, RepoError, SqliteItemRepository};
    use crate::db::open_db_in_memory;

    #[test]
    fn bool_to_int_maps_flags() {
        assert_eq!(bool_to_int(true), 1);
        assert_eq!(bool_to_int(false), 0);
    }

    #[test]
    fn blank_persisted_name_is_reported_as_invalid() {
        let conn = open_db_in_memory().unwrap();
        conn.execute("INSERT INTO items (name) VALUES ('   ');", [])
            .unwrap();

        let repo = SqliteItemRepository::new(&conn);
        let err = repo.list_items().unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }
}
