use crate::{
    config::StorageConfig,
    domain::{Card, CardId},
    error::{CardsError, Result},
    storage::Storage,
};
use async_trait::async_trait;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cards (
        id          INTEGER PRIMARY KEY,
        title       TEXT NOT NULL,
        summary     TEXT,
        state       TEXT NOT NULL,
        priority    TEXT NOT NULL,
        created_at  TEXT NOT NULL,
        started_at  TEXT,
        finished_at TEXT
    );
    CREATE TABLE IF NOT EXISTS counters (
        name  TEXT PRIMARY KEY,
        value INTEGER NOT NULL
    );
    INSERT OR IGNORE INTO counters (name, value) VALUES ('card_id', 0);
";

const CARD_COLUMNS: &str =
    "id, title, summary, state, priority, created_at, started_at, finished_at";

/// SQLite-based storage backend for cards
pub struct SqliteStorage {
    connection: Arc<Mutex<Connection>>,
    location: String,
}

impl SqliteStorage {
    /// Opens (or creates) a database file
    pub fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        let path = database_path.as_ref();
        let connection = Connection::open(path)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            location: path.display().to_string(),
        })
    }

    /// Opens the database file under the configured data root
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::open(config.sqlite_path())
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            location: ":memory:".to_string(),
        })
    }

    /// Runs blocking database work off the async executor.
    async fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut connection = connection
                .lock()
                .map_err(|_| CardsError::StorageError("connection lock poisoned".to_string()))?;
            work(&mut connection)
        })
        .await
        .map_err(|e| CardsError::StorageError(e.to_string()))?
    }
}

fn parse_column<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = CardsError>,
{
    let raw: String = row.get(index)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    let id: i64 = row.get(0)?;
    Ok(Card {
        id: CardId::new(id as u64),
        title: row.get(1)?,
        summary: row.get(2)?,
        state: parse_column(row, 3)?,
        priority: parse_column(row, 4)?,
        created_at: row.get(5)?,
        started_at: row.get(6)?,
        finished_at: row.get(7)?,
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
    }

    async fn is_initialized(&self) -> bool {
        self.with_connection(|conn| {
            let found = conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'cards'",
                    [],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
        .unwrap_or(false)
    }

    async fn next_card_id(&self) -> Result<CardId> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE counters SET value = value + 1 WHERE name = 'card_id'",
                [],
            )?;
            let value: i64 = tx.query_row(
                "SELECT value FROM counters WHERE name = 'card_id'",
                [],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(CardId::new(value as u64))
        })
        .await
    }

    async fn save_card(&self, card: &Card) -> Result<()> {
        let card = card.clone();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cards
                    (id, title, summary, state, priority, created_at, started_at, finished_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    card.id.value() as i64,
                    card.title,
                    card.summary,
                    card.state.as_str(),
                    card.priority.as_str(),
                    card.created_at,
                    card.started_at,
                    card.finished_at,
                ],
            )?;
            debug!(id = %card.id, "saved card");
            Ok(())
        })
        .await
    }

    async fn replace_card(&self, card: &Card) -> Result<()> {
        let card = card.clone();
        self.with_connection(move |conn| {
            let updated = conn.execute(
                "UPDATE cards
                 SET title = ?2, summary = ?3, state = ?4, priority = ?5,
                     created_at = ?6, started_at = ?7, finished_at = ?8
                 WHERE id = ?1",
                params![
                    card.id.value() as i64,
                    card.title,
                    card.summary,
                    card.state.as_str(),
                    card.priority.as_str(),
                    card.created_at,
                    card.started_at,
                    card.finished_at,
                ],
            )?;
            if updated == 0 {
                return Err(CardsError::CardNotFound(card.id));
            }
            debug!(id = %card.id, "replaced card");
            Ok(())
        })
        .await
    }

    async fn load_card(&self, id: CardId) -> Result<Card> {
        self.with_connection(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
                params![id.value() as i64],
                card_from_row,
            )
            .optional()?
            .ok_or(CardsError::CardNotFound(id))
        })
        .await
    }

    async fn list_cards(&self) -> Result<Vec<Card>> {
        self.with_connection(|conn| {
            let mut statement =
                conn.prepare(&format!("SELECT {} FROM cards ORDER BY id", CARD_COLUMNS))?;
            let cards = statement
                .query_map([], card_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(cards)
        })
        .await
    }

    async fn delete_card(&self, id: CardId) -> Result<()> {
        self.with_connection(move |conn| {
            let removed = conn.execute("DELETE FROM cards WHERE id = ?1", params![id.value() as i64])?;
            if removed == 0 {
                return Err(CardsError::CardNotFound(id));
            }
            debug!(%id, "deleted card");
            Ok(())
        })
        .await
    }

    async fn count_cards(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}
