pub mod models;
pub mod query;
pub mod schema;
pub mod toggle;

use crate::auth::Owned;
use crate::config::DatabaseConfig;
use crate::error::AppError;
use diesel::prelude::*;
use deadpool::managed::BuildError;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use models::{OwnerSummary, WithOwner};
use std::collections::HashMap;
use uuid::Uuid;

pub type DbPool = deadpool::managed::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

pub fn create_pool(config: &DatabaseConfig) -> Result<DbPool, BuildError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
    Pool::builder(manager)
        .max_size(config.max_connections as usize)
        .build()
}

/// Loads public profiles for `ids` in one query, keyed by user id.
pub async fn owner_summaries(
    conn: &mut AsyncPgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, OwnerSummary>, AppError> {
    use schema::users;

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let owners = users::table
        .filter(users::id.eq_any(ids))
        .select(OwnerSummary::as_select())
        .load::<OwnerSummary>(conn)
        .await?;

    Ok(owners.into_iter().map(|o| (o.id, o)).collect())
}

/// Attaches each record's owner profile, keeping the input order.
pub async fn with_owners<T: Owned>(
    conn: &mut AsyncPgConnection,
    records: Vec<T>,
) -> Result<Vec<WithOwner<T>>, AppError> {
    let mut ids: Vec<Uuid> = records.iter().map(Owned::owner_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let owners = owner_summaries(conn, &ids).await?;
    Ok(records
        .into_iter()
        .map(|record| {
            let owner = owners.get(&record.owner_id()).cloned();
            WithOwner { record, owner }
        })
        .collect())
}

/// Reorders `rows` to follow `order`, dropping ids with no row and repeating
/// rows whose id repeats.
pub fn in_id_order<T: Clone>(order: &[Uuid], rows: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> Vec<T> {
    let by_id: HashMap<Uuid, T> = rows.into_iter().map(|row| (id_of(&row), row)).collect();
    order.iter().filter_map(|id| by_id.get(id).cloned()).collect()
}

diesel::define_sql_function! {
    /// Postgres `array_append(anyarray, anyelement)` for uuid arrays.
    fn array_append(list: diesel::sql_types::Array<diesel::sql_types::Uuid>, item: diesel::sql_types::Uuid) -> diesel::sql_types::Array<diesel::sql_types::Uuid>;
}

diesel::define_sql_function! {
    /// Postgres `array_remove(anyarray, anyelement)` for uuid arrays.
    fn array_remove(list: diesel::sql_types::Array<diesel::sql_types::Uuid>, item: diesel::sql_types::Uuid) -> diesel::sql_types::Array<diesel::sql_types::Uuid>;
}
