// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation turn operations.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use rusqlite::types::Type;
use spark_core::{ConversationTurn, Role, SparkError, UserId};

use crate::database::{Database, map_tr_err};

/// Append one turn.
pub async fn insert_turn(db: &Database, turn: &ConversationTurn) -> Result<(), SparkError> {
    let sql = format!(
        "INSERT INTO {} (user_id, session_id, role, content, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        db.tables().chat_history()
    );
    let user_id = turn.user_id.clone();
    let session_id = turn.session_id.clone();
    let role = turn.role.to_string();
    let content = turn.content.clone();
    let timestamp = turn.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);

    db.connection()
        .call(move |conn| {
            conn.execute(&sql, params![user_id, session_id, role, content, timestamp])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent `limit` turns for a user, returned oldest first.
pub async fn recent_turns(
    db: &Database,
    user_id: &UserId,
    limit: usize,
) -> Result<Vec<ConversationTurn>, SparkError> {
    let sql = format!(
        "SELECT user_id, session_id, role, content, timestamp FROM {}
         WHERE user_id = ?1
         ORDER BY timestamp DESC, id DESC
         LIMIT ?2",
        db.tables().chat_history()
    );
    let user_id = user_id.as_str().to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                let role: String = row.get(2)?;
                let timestamp: String = row.get(4)?;
                Ok(ConversationTurn {
                    user_id: row.get(0)?,
                    session_id: row.get(1)?,
                    role: Role::from_str(&role)
                        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
                    content: row.get(3)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .map(|t| t.with_timezone(&Utc))
                        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
                })
            })?;
            let mut turns = Vec::new();
            for row in rows {
                turns.push(row?);
            }
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(map_tr_err)
}
