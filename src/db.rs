use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

const DB_PATH: &str = "data/menu.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            id               INTEGER PRIMARY KEY,
            name             TEXT UNIQUE NOT NULL,
            description      TEXT NOT NULL DEFAULT '',
            calories         INTEGER,
            fats             REAL,
            proteins         REAL,
            unsaturated_fats TEXT NOT NULL,
            sugar            TEXT NOT NULL,
            salt             TEXT NOT NULL,
            portion          TEXT NOT NULL,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_products_name ON products(name);
        ",
    )?;
    Ok(())
}

/// One fully normalized menu entry. Serialized field order is the export
/// order; `name` is the uniqueness key, enforced by the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: String,
    pub calories: Option<i64>,
    pub fats: Option<f64>,
    pub proteins: Option<f64>,
    pub unsaturated_fats: String,
    pub sugar: String,
    pub salt: String,
    pub portion: String,
}

/// Insert one product in its own transaction. A duplicate name violates the
/// UNIQUE constraint and rolls back, leaving the connection usable.
pub fn insert_product(conn: &Connection, p: &Product) -> Result<(), rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO products
         (name, description, calories, fats, proteins, unsaturated_fats, sugar, salt, portion)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            p.name,
            p.description,
            p.calories,
            p.fats,
            p.proteins,
            p.unsaturated_fats,
            p.sugar,
            p.salt,
            p.portion,
        ],
    )?;
    tx.commit()?;
    Ok(())
}

// ── Read side ──

pub fn fetch_products(conn: &Connection, skip: usize, limit: usize) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(
        "SELECT name, description, calories, fats, proteins, unsaturated_fats, sugar, salt, portion
         FROM products ORDER BY id LIMIT ?1 OFFSET ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![limit, skip], row_to_product)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_by_name(conn: &Connection, name: &str) -> Result<Option<Product>> {
    let mut stmt = conn.prepare(
        "SELECT name, description, calories, fats, proteins, unsaturated_fats, sugar, salt, portion
         FROM products WHERE name = ?1",
    )?;
    let product = stmt
        .query_row(rusqlite::params![name], row_to_product)
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(product)
}

fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        name: row.get(0)?,
        description: row.get(1)?,
        calories: row.get(2)?,
        fats: row.get(3)?,
        proteins: row.get(4)?,
        unsaturated_fats: row.get(5)?,
        sugar: row.get(6)?,
        salt: row.get(7)?,
        portion: row.get(8)?,
    })
}

/// Look one field up by its serialized name. `None` when no such field
/// exists on the record shape.
pub fn field_value(p: &Product, field: &str) -> Option<serde_json::Value> {
    let value = serde_json::to_value(p).ok()?;
    value.get(field).cloned()
}

// ── Tests ──
