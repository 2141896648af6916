//! Chat persistence using SQLite

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use std::path::Path;

use super::types::{ChatMessage, Sender};
use crate::{Error, Result};

/// SQLite-based chat message store
pub struct ChatStore {
    conn: Connection,
}

impl ChatStore {
    /// Open (or create) the database at `db_path`
    pub fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_session_id ON chat_messages(session_id)",
            [],
        )?;

        Ok(())
    }

    /// Append a message to a session
    pub fn create_message(
        &self,
        session_id: &str,
        user_id: &str,
        sender: Sender,
        content: &str,
    ) -> Result<ChatMessage> {
        let timestamp = Utc::now();
        self.conn.execute(
            "INSERT INTO chat_messages (session_id, user_id, sender, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session_id,
                user_id,
                sender.as_str(),
                content,
                timestamp.to_rfc3339(),
            ],
        )?;

        Ok(ChatMessage {
            id: self.conn.last_insert_rowid(),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            sender,
            content: content.to_string(),
            timestamp,
        })
    }

    /// Messages of a session in chronological order
    pub fn messages_by_session(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, user_id, sender, content, timestamp FROM chat_messages
             WHERE session_id = ?1 ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![session_id], row_to_message)?;

        let mut messages = Vec::new();
        for message in rows {
            messages.push(message?);
        }
        Ok(messages)
    }

    /// User who opened the session, if it exists
    pub fn session_owner(&self, session_id: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT user_id FROM chat_messages WHERE session_id = ?1 ORDER BY id ASC LIMIT 1",
            params![session_id],
            |row| row.get(0),
        );

        match result {
            Ok(owner) => Ok(Some(owner)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::from(e)),
        }
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let sender: String = row.get(3)?;
    let sender = Sender::parse(&sender).ok_or(rusqlite::Error::InvalidQuery)?;

    let timestamp: String = row.get(5)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|_| rusqlite::Error::InvalidQuery)?
        .with_timezone(&Utc);

    Ok(ChatMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        sender,
        content: row.get(4)?,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_in_order() {
        let store = ChatStore::in_memory().unwrap();
        store.create_message("s1", "alice", Sender::User, "hi").unwrap();
        store.create_message("s1", "alice", Sender::Agent, "hello").unwrap();
        store.create_message("s2", "bob", Sender::User, "other").unwrap();

        let messages = store.messages_by_session("s1").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].content, "hello");
        assert!(messages[0].id < messages[1].id);
    }

    #[test]
    fn test_session_owner() {
        let store = ChatStore::in_memory().unwrap();
        assert_eq!(store.session_owner("s1").unwrap(), None);

        store.create_message("s1", "alice", Sender::User, "hi").unwrap();
        assert_eq!(store.session_owner("s1").unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");
        let path = path.to_str().unwrap();

        {
            let store = ChatStore::new(path).unwrap();
            store.create_message("s1", "alice", Sender::User, "persisted").unwrap();
        }

        let reopened = ChatStore::new(path).unwrap();
        let messages = reopened.messages_by_session("s1").unwrap();
        assert_eq!(messages[0].content, "persisted");
    }
}
