use std::collections::HashMap;

use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::entities::{phone_numbers, prelude::*};
use crate::models::PhoneMode;

/// Optional filters for listings; all of them combine with AND.
#[derive(Debug, Default, Clone)]
pub struct NumberFilter {
    /// Case-insensitive substring over number, notes and tags.
    pub q: Option<String>,
    pub mode: Option<PhoneMode>,
    pub state: Option<String>,
    /// Exact tag membership (tags are stored lowercased).
    pub tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewNumber {
    pub number: String,
    pub mode: PhoneMode,
    pub tags: Vec<String>,
    pub notes: String,
    pub state: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct NumberPatch {
    pub mode: Option<PhoneMode>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub state: Option<String>,
}

impl NumberPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.mode.is_none() && self.tags.is_none() && self.notes.is_none() && self.state.is_none()
    }
}

/// Insert result; `Duplicate` is derived from the store's unique-constraint
/// violation, never from a pre-check.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(phone_numbers::Model),
    Duplicate,
}

pub struct PhoneRepository {
    conn: DatabaseConnection,
}

impl PhoneRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Lists entries newest-created first.
    pub async fn list(&self, filter: &NumberFilter) -> Result<Vec<phone_numbers::Model>> {
        let mut query = PhoneNumbers::find()
            .order_by_desc(phone_numbers::Column::CreatedAt)
            .order_by_desc(phone_numbers::Column::Id);

        if let Some(q) = filter.q.as_deref().filter(|q| !q.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(phone_numbers::Column::Number.contains(q))
                    .add(phone_numbers::Column::Notes.contains(q))
                    .add(phone_numbers::Column::Tags.contains(q)),
            );
        }

        if let Some(mode) = filter.mode {
            query = query.filter(phone_numbers::Column::Mode.eq(mode.as_str()));
        }

        if let Some(state) = filter.state.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(phone_numbers::Column::State.eq(state));
        }

        if let Some(tag) = filter.tag.as_deref().filter(|t| !t.is_empty()) {
            // Tags are a JSON array in a TEXT column; an exact member always
            // appears quoted.
            query = query.filter(phone_numbers::Column::Tags.contains(format!("\"{tag}\"")));
        }

        query
            .all(&self.conn)
            .await
            .context("Failed to list phone numbers")
    }

    pub async fn get(&self, id: i32) -> Result<Option<phone_numbers::Model>> {
        PhoneNumbers::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query phone number by id")
    }

    pub async fn get_by_number(&self, number: &str) -> Result<Option<phone_numbers::Model>> {
        PhoneNumbers::find()
            .filter(phone_numbers::Column::Number.eq(number))
            .one(&self.conn)
            .await
            .context("Failed to query phone number by value")
    }

    /// Inserts a new entry, relying on the unique index on `number` to reject
    /// duplicates atomically.
    pub async fn insert(&self, new: NewNumber) -> Result<InsertOutcome> {
        let now = chrono::Utc::now().to_rfc3339();
        let tags = serde_json::to_string(&new.tags).context("Failed to encode tags")?;

        let active = phone_numbers::ActiveModel {
            number: Set(new.number),
            mode: Set(new.mode.as_str().to_string()),
            tags: Set(tags),
            notes: Set(new.notes),
            state: Set(new.state),
            usage_count: Set(0),
            last_used: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(InsertOutcome::Inserted(model)),
            Err(err) => {
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    Ok(InsertOutcome::Duplicate)
                } else {
                    Err(err).context("Failed to insert phone number")
                }
            }
        }
    }

    /// Applies the supplied fields only; returns `None` when the id is absent.
    pub async fn update(
        &self,
        id: i32,
        patch: NumberPatch,
    ) -> Result<Option<phone_numbers::Model>> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: phone_numbers::ActiveModel = existing.into();

        if let Some(mode) = patch.mode {
            active.mode = Set(mode.as_str().to_string());
        }
        if let Some(tags) = patch.tags {
            active.tags = Set(serde_json::to_string(&tags).context("Failed to encode tags")?);
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(notes);
        }
        if let Some(state) = patch.state {
            active.state = Set(state);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update phone number")?;

        Ok(Some(updated))
    }

    /// Permanent removal; reports whether a row existed.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = PhoneNumbers::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete phone number")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self, mode: Option<PhoneMode>) -> Result<u64> {
        let mut query = PhoneNumbers::find();
        if let Some(mode) = mode {
            query = query.filter(phone_numbers::Column::Mode.eq(mode.as_str()));
        }

        query
            .count(&self.conn)
            .await
            .context("Failed to count phone numbers")
    }

    /// Bumps the usage counter and stamps `last_used` in one statement.
    pub async fn record_usage(&self, id: i32) -> Result<()> {
        PhoneNumbers::update_many()
            .col_expr(
                phone_numbers::Column::UsageCount,
                Expr::col(phone_numbers::Column::UsageCount).add(1),
            )
            .col_expr(
                phone_numbers::Column::LastUsed,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(phone_numbers::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record usage")?;

        Ok(())
    }

    /// Tag -> occurrence count, descending. Tags live inside a JSON column,
    /// so the aggregation runs over the decoded arrays here rather than in
    /// SQL.
    pub async fn tag_frequencies(&self, limit: Option<usize>) -> Result<Vec<(String, u64)>> {
        let rows: Vec<String> = PhoneNumbers::find()
            .select_only()
            .column(phone_numbers::Column::Tags)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to load tag column")?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for raw in rows {
            let tags: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();
            for tag in tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }

        let mut frequencies: Vec<(String, u64)> = counts.into_iter().collect();
        frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(limit) = limit {
            frequencies.truncate(limit);
        }

        Ok(frequencies)
    }

    /// State -> entry count, descending, grouped in SQL.
    pub async fn state_frequencies(&self, limit: Option<u64>) -> Result<Vec<(String, i64)>> {
        let mut query = PhoneNumbers::find()
            .select_only()
            .column(phone_numbers::Column::State)
            .column_as(phone_numbers::Column::Id.count(), "count")
            .group_by(phone_numbers::Column::State)
            .order_by_desc(phone_numbers::Column::Id.count());

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to aggregate states")
    }
}
