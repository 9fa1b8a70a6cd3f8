//! SQLite-backed profile store and durable cache table.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    CacheError, CacheKey, CurrentCity, PersonaSnapshot, PlaceTarget, Target, TargetType,
    UserProfile, UserTarget,
};

use super::schema::{SchemaError, initialise_schema};
use super::{CacheEntry, CacheEntryStore, ProfileStore, StoreError};

/// SQLite limits bound parameters per statement to 999 by default. The store
/// chunks `IN` queries to remain below that ceiling.
const SQLITE_MAX_VARIABLE_NUMBER: usize = 999;

const UPSERT_CACHE_ENTRY_SQL: &str = "INSERT INTO match_cache (
        user_id, target_type, target_id, mode, score, breakdown, reasoning, calculated_at, expires_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT (user_id, target_type, target_id, mode) DO UPDATE SET
        score = excluded.score,
        breakdown = excluded.breakdown,
        reasoning = excluded.reasoning,
        calculated_at = excluded.calculated_at,
        expires_at = excluded.expires_at";

const FIND_FRESH_CACHE_ENTRY_SQL: &str = "SELECT score, breakdown, reasoning, calculated_at, expires_at
    FROM match_cache
    WHERE user_id = ?1 AND target_type = ?2 AND target_id = ?3 AND mode = ?4 AND expires_at > ?5";

/// Errors raised when opening a [`SqliteStore`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating or validating the schema failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Profile, place and cache storage in a single SQLite database.
///
/// Cloning shares the underlying connection.
///
/// # Examples
/// ```
/// use rapport_core::{PlaceTarget, ProfileStore, TargetType, store::SqliteStore};
///
/// let store = SqliteStore::open_in_memory().expect("open store");
/// store
///     .insert_place(&PlaceTarget::new("cafe-1", ["coffee"]))
///     .expect("insert place");
/// let found = store
///     .fetch_target(TargetType::Place, "cafe-1")
///     .expect("fetch place");
/// assert!(found.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when the file cannot be opened or holds an
    /// incompatible schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        let database_path = path.as_ref();
        let connection =
            Connection::open(database_path).map_err(|source| SqliteStoreError::OpenDatabase {
                path: database_path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection)
    }

    fn from_connection(mut connection: Connection) -> Result<Self, SqliteStoreError> {
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Insert or replace a user record.
    ///
    /// # Errors
    /// Returns [`StoreError`] when encoding or the write fails.
    pub fn insert_user(
        &self,
        id: &str,
        profile: Option<&UserProfile>,
        current_city: Option<&CurrentCity>,
    ) -> Result<(), StoreError> {
        let profile_json = profile
            .map(|value| encode(id, "profile", value))
            .transpose()?;
        let city_json = current_city
            .map(|value| encode(id, "current_city", value))
            .transpose()?;
        let connection = self.lock_store()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO users (id, profile, current_city) VALUES (?1, ?2, ?3)",
                (id, profile_json, city_json),
            )
            .map(|_| ())
            .map_err(|source| StoreError::backend("insert user", source))
    }

    /// Insert or replace a place record.
    ///
    /// # Errors
    /// Returns [`StoreError`] when encoding or the write fails.
    pub fn insert_place(&self, place: &PlaceTarget) -> Result<(), StoreError> {
        let tags = encode(&place.id, "tags", &place.tags)?;
        let vibe = place
            .vibe_scores
            .as_ref()
            .map(|value| encode(&place.id, "vibe_scores", value))
            .transpose()?;
        let categories = place
            .categories
            .as_ref()
            .map(|value| encode(&place.id, "categories", value))
            .transpose()?;
        let connection = self.lock_store()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO places (id, tags, price_level, vibe_scores, categories)
                    VALUES (?1, ?2, ?3, ?4, ?5)",
                (place.id.as_str(), tags, place.price_level, vibe, categories),
            )
            .map(|_| ())
            .map_err(|source| StoreError::backend("insert place", source))
    }

    /// Delete cache rows that have expired at `now`.
    ///
    /// # Errors
    /// Returns [`CacheError`] when the delete fails.
    pub fn delete_expired_cache_entries(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let connection = self.lock_cache()?;
        connection
            .execute(
                "DELETE FROM match_cache WHERE expires_at <= ?1",
                [format_timestamp(now)],
            )
            .map_err(|source| CacheError::backend("delete expired cache entries", source))
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.connection.lock().map_err(|_| CacheError::Poisoned)
    }
}

impl ProfileStore for SqliteStore {
    fn fetch_persona(&self, user_id: &str) -> Result<Option<PersonaSnapshot>, StoreError> {
        let connection = self.lock_store()?;
        let stored: Option<Option<String>> = connection
            .prepare_cached("SELECT profile FROM users WHERE id = ?1")
            .and_then(|mut statement| statement.query_row([user_id], |row| row.get(0)).optional())
            .map_err(|source| StoreError::backend("read user profile", source))?;
        drop(connection);

        let Some(Some(profile_json)) = stored else {
            debug!("no usable profile stored for user {user_id}");
            return Ok(None);
        };
        let profile: UserProfile = decode(user_id, "profile", &profile_json)?;
        Ok(Some(PersonaSnapshot::from_profile(&profile)))
    }

    fn fetch_targets(
        &self,
        target_type: TargetType,
        target_ids: &[String],
    ) -> Result<Vec<Target>, StoreError> {
        let mut ids: Vec<&str> = target_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids.dedup();

        let connection = self.lock_store()?;
        let mut targets = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(SQLITE_MAX_VARIABLE_NUMBER) {
            match target_type {
                TargetType::User => targets.extend(
                    load_users_chunk(&connection, chunk)?
                        .into_iter()
                        .map(Target::User),
                ),
                TargetType::Place => targets.extend(
                    load_places_chunk(&connection, chunk)?
                        .into_iter()
                        .map(Target::Place),
                ),
            }
        }
        debug!(
            "resolved {} of {} requested {target_type} targets",
            targets.len(),
            ids.len()
        );
        Ok(targets)
    }
}

impl CacheEntryStore for SqliteStore {
    fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let breakdown = serde_json::to_string(&entry.breakdown).map_err(|source| {
            CacheError::Encode {
                field: "breakdown",
                source,
            }
        })?;
        let reasoning = serde_json::to_string(&entry.reasoning).map_err(|source| {
            CacheError::Encode {
                field: "reasoning",
                source,
            }
        })?;
        let key = entry.key();
        let connection = self.lock_cache()?;
        connection
            .prepare_cached(UPSERT_CACHE_ENTRY_SQL)
            .and_then(|mut statement| {
                statement.execute((
                    key.user_id.as_str(),
                    key.target_type.as_str(),
                    key.target_id.as_str(),
                    key.mode_label(),
                    entry.score,
                    breakdown,
                    reasoning,
                    format_timestamp(entry.calculated_at),
                    format_timestamp(entry.expires_at),
                ))
            })
            .map(|_| ())
            .map_err(|source| CacheError::backend("upsert cache entry", source))
    }

    fn find_fresh_cache_entry(
        &self,
        key: &CacheKey,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let connection = self.lock_cache()?;
        let row = connection
            .prepare_cached(FIND_FRESH_CACHE_ENTRY_SQL)
            .and_then(|mut statement| {
                statement
                    .query_row(
                        (
                            key.user_id.as_str(),
                            key.target_type.as_str(),
                            key.target_id.as_str(),
                            key.mode_label(),
                            format_timestamp(now),
                        ),
                        CachedRow::from_row,
                    )
                    .optional()
            })
            .map_err(|source| CacheError::backend("read cache entry", source))?;
        drop(connection);

        row.map(|cached| cached.into_entry(key)).transpose()
    }

    fn delete_cache_entries_for_user(&self, user_id: &str) -> Result<usize, CacheError> {
        let connection = self.lock_cache()?;
        connection
            .execute("DELETE FROM match_cache WHERE user_id = ?1", [user_id])
            .map_err(|source| CacheError::backend("delete cache entries", source))
    }
}

struct CachedRow {
    score: i64,
    breakdown: String,
    reasoning: String,
    calculated_at: String,
    expires_at: String,
}

impl CachedRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            score: row.get(0)?,
            breakdown: row.get(1)?,
            reasoning: row.get(2)?,
            calculated_at: row.get(3)?,
            expires_at: row.get(4)?,
        })
    }

    fn into_entry(self, key: &CacheKey) -> Result<CacheEntry, CacheError> {
        let decode_field = |field: &'static str, source| CacheError::Decode {
            key: key.composite(),
            field,
            source,
        };
        Ok(CacheEntry {
            user_id: key.user_id.clone(),
            target_type: key.target_type,
            target_id: key.target_id.clone(),
            mode: key.mode,
            score: u8::try_from(self.score)
                .map_err(|source| CacheError::backend("read cached score", source))?,
            breakdown: serde_json::from_str(&self.breakdown)
                .map_err(|source| decode_field("breakdown", source))?,
            reasoning: serde_json::from_str(&self.reasoning)
                .map_err(|source| decode_field("reasoning", source))?,
            calculated_at: parse_timestamp(&self.calculated_at)?,
            expires_at: parse_timestamp(&self.expires_at)?,
        })
    }
}

fn load_users_chunk(
    connection: &Connection,
    ids: &[&str],
) -> Result<Vec<UserTarget>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let query =
        format!("SELECT id, profile, current_city FROM users WHERE id IN ({placeholders})");
    let rows: Vec<(String, Option<String>, Option<String>)> = connection
        .prepare(&query)
        .and_then(|mut statement| {
            let mapped = statement.query_map(params_from_iter(ids.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            mapped.collect()
        })
        .map_err(|source| StoreError::backend("read users", source))?;

    rows.into_iter()
        .map(|(id, profile_json, city_json)| {
            let profile = decode_optional(&id, "profile", profile_json.as_deref())?;
            let current_city = decode_optional(&id, "current_city", city_json.as_deref())?;
            Ok(UserTarget {
                id,
                profile,
                current_city,
            })
        })
        .collect()
}

fn load_places_chunk(
    connection: &Connection,
    ids: &[&str],
) -> Result<Vec<PlaceTarget>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let query = format!(
        "SELECT id, tags, price_level, vibe_scores, categories FROM places WHERE id IN ({placeholders})"
    );
    let rows: Vec<PlaceRow> = connection
        .prepare(&query)
        .and_then(|mut statement| {
            let mapped = statement.query_map(params_from_iter(ids.iter()), |row| {
                Ok(PlaceRow {
                    id: row.get(0)?,
                    tags: row.get(1)?,
                    price_level: row.get(2)?,
                    vibe_scores: row.get(3)?,
                    categories: row.get(4)?,
                })
            })?;
            mapped.collect()
        })
        .map_err(|source| StoreError::backend("read places", source))?;

    rows.into_iter().map(PlaceRow::into_place).collect()
}

struct PlaceRow {
    id: String,
    tags: String,
    price_level: Option<i64>,
    vibe_scores: Option<String>,
    categories: Option<String>,
}

impl PlaceRow {
    fn into_place(self) -> Result<PlaceTarget, StoreError> {
        let price_level = self.price_level.and_then(|level| {
            let converted = u8::try_from(level).ok();
            if converted.is_none() {
                debug!("ignoring out-of-range price level {level} for place {}", self.id);
            }
            converted
        });
        Ok(PlaceTarget {
            tags: decode(&self.id, "tags", &self.tags)?,
            price_level,
            vibe_scores: decode_optional(&self.id, "vibe_scores", self.vibe_scores.as_deref())?,
            categories: decode_optional(&self.id, "categories", self.categories.as_deref())?,
            id: self.id,
        })
    }
}

fn decode<T: DeserializeOwned>(id: &str, field: &'static str, json: &str) -> Result<T, StoreError> {
    serde_json::from_str(json).map_err(|source| StoreError::Decode {
        id: id.to_owned(),
        field,
        source,
    })
}

fn decode_optional<T: DeserializeOwned>(
    id: &str,
    field: &'static str,
    json: Option<&str>,
) -> Result<Option<T>, StoreError> {
    json.map(|value| decode(id, field, value)).transpose()
}

fn encode<T: serde::Serialize + ?Sized>(
    id: &str,
    field: &'static str,
    value: &T,
) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode {
        id: id.to_owned(),
        field,
        source,
    })
}

/// Fixed-width RFC 3339 so lexical order in SQL matches time order.
///
/// Instants past year 9999 would gain a signed five-digit year and break
/// that ordering, so they are clamped to the last representable instant.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.min(latest_storable_instant())
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn latest_storable_instant() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_nano_opt(23, 59, 59, 999_999_999))
        .map_or(DateTime::<Utc>::MAX_UTC, |naive| naive.and_utc())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| CacheError::backend("parse cached timestamp", source))
}
