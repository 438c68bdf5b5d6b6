use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use futures_lite::Stream;
use tokio::sync::watch;

use verifai_shared::{Notification, PageRequest, SyncError, SyncResult};

use crate::cache::live;
use crate::models::NotificationRow;
use crate::schema::notifications;

pub type CachePool = Pool<ConnectionManager<SqliteConnection>>;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY NOT NULL,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at BIGINT NOT NULL,
    is_read BOOLEAN NOT NULL DEFAULT 0,
    priority INTEGER NOT NULL DEFAULT 0,
    user_id TEXT NOT NULL,
    group_id TEXT,
    deep_link TEXT,
    metadata TEXT,
    kind_data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_user_created ON notifications (user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_notifications_group ON notifications (group_id);
CREATE INDEX IF NOT EXISTS idx_notifications_is_read ON notifications (is_read);
";

#[derive(Debug)]
struct CachePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for CachePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Durable sqlite-backed notification cache.
///
/// Every write bumps a version counter on a watch channel; live queries
/// subscribe to it and re-read on each bump, so a remote-triggered upsert is
/// visible to observers without an explicit refresh signal.
#[derive(Clone)]
pub struct NotificationCache {
    pool: CachePool,
    changes: Arc<watch::Sender<u64>>,
}

impl NotificationCache {
    pub fn open(database_url: &str, pool_size: u32) -> SyncResult<Self> {
        // every sqlite :memory: connection is its own database
        let max_size = if database_url.contains(":memory:") { 1 } else { pool_size.max(1) };

        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_customizer(Box::new(CachePragmas))
            .build(manager)
            .map_err(|e| SyncError::pool(e.to_string()))?;

        {
            let mut conn = pool
                .get()
                .map_err(|e| SyncError::pool(e.to_string()))?;
            conn.batch_execute(SCHEMA_SQL)?;
        }

        let (changes, _) = watch::channel(0);
        tracing::info!(database_url = %database_url, "notification cache opened");

        Ok(Self { pool, changes: Arc::new(changes) })
    }

    fn conn(&self) -> SyncResult<PooledConnection<ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get cache connection");
            SyncError::pool(e.to_string())
        })
    }

    fn mark_changed(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    /// One page of a user's inbox, newest first (`id` breaks timestamp ties).
    pub fn page(&self, user_id: &str, page: PageRequest) -> SyncResult<Vec<Notification>> {
        let mut conn = self.conn()?;
        let rows = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .limit(page.limit())
            .offset(page.offset())
            .load::<NotificationRow>(&mut conn)?;

        rows.into_iter().map(NotificationRow::into_domain).collect()
    }

    /// Every notification in a group, newest first.
    pub fn by_group(&self, group: &str) -> SyncResult<Vec<Notification>> {
        let mut conn = self.conn()?;
        let rows = notifications::table
            .filter(notifications::group_id.eq(group))
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .load::<NotificationRow>(&mut conn)?;

        rows.into_iter().map(NotificationRow::into_domain).collect()
    }

    /// Insert-or-replace by id. Re-upserting an id keeps exactly one row
    /// reflecting the latest content.
    pub fn upsert(&self, items: &[Notification]) -> SyncResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let rows = items
            .iter()
            .map(NotificationRow::from_domain)
            .collect::<SyncResult<Vec<_>>>()?;

        let mut conn = self.conn()?;
        diesel::replace_into(notifications::table)
            .values(&rows)
            .execute(&mut conn)?;

        tracing::debug!(count = rows.len(), "notifications upserted");
        self.mark_changed();
        Ok(())
    }

    pub fn update_read_state(&self, ids: &[String], read: bool) -> SyncResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn()?;
        let updated = diesel::update(notifications::table.filter(notifications::id.eq_any(ids)))
            .set(notifications::is_read.eq(read))
            .execute(&mut conn)?;

        if updated > 0 {
            self.mark_changed();
        }
        Ok(updated)
    }

    pub fn mark_all_read(&self, user_id: &str) -> SyncResult<usize> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            notifications::table
                .filter(notifications::user_id.eq(user_id))
                .filter(notifications::is_read.eq(false)),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)?;

        if updated > 0 {
            self.mark_changed();
        }
        Ok(updated)
    }

    pub fn delete_by_ids(&self, ids: &[String]) -> SyncResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn()?;
        let removed = diesel::delete(notifications::table.filter(notifications::id.eq_any(ids)))
            .execute(&mut conn)?;

        if removed > 0 {
            self.mark_changed();
        }
        Ok(removed)
    }

    pub fn delete_all_for_user(&self, user_id: &str) -> SyncResult<usize> {
        let mut conn = self.conn()?;
        let removed =
            diesel::delete(notifications::table.filter(notifications::user_id.eq(user_id)))
                .execute(&mut conn)?;

        if removed > 0 {
            self.mark_changed();
        }
        Ok(removed)
    }

    pub fn unread_count(&self, user_id: &str) -> SyncResult<i64> {
        let mut conn = self.conn()?;
        let count = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.eq(false))
            .count()
            .get_result(&mut conn)?;
        Ok(count)
    }

    /// Wholesale reconciliation from a full remote snapshot: rows whose id is
    /// absent from the snapshot are deleted, everything else is upserted, all
    /// in one transaction.
    pub fn replace_all(&self, items: &[Notification]) -> SyncResult<()> {
        let rows = items
            .iter()
            .map(NotificationRow::from_domain)
            .collect::<SyncResult<Vec<_>>>()?;
        let incoming: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();

        let mut conn = self.conn()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(notifications::table.filter(notifications::id.ne_all(&incoming)))
                .execute(conn)?;
            if !rows.is_empty() {
                diesel::replace_into(notifications::table)
                    .values(&rows)
                    .execute(conn)?;
            }
            Ok(())
        })?;

        tracing::debug!(count = incoming.len(), "cache replaced from snapshot");
        self.mark_changed();
        Ok(())
    }

    /// Live page query; re-emits after every cache write.
    pub fn watch_page(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> impl Stream<Item = SyncResult<Vec<Notification>>> {
        let cache = self.clone();
        let user = user_id.to_string();
        live::live_query(self.changes.subscribe(), move || cache.page(&user, page))
    }

    /// Live group query; re-emits after every cache write.
    pub fn watch_group(&self, group: &str) -> impl Stream<Item = SyncResult<Vec<Notification>>> {
        let cache = self.clone();
        let group = group.to_string();
        live::live_query(self.changes.subscribe(), move || cache.by_group(&group))
    }

    /// Live unread counter; re-emits after every cache write.
    pub fn watch_unread_count(&self, user_id: &str) -> impl Stream<Item = SyncResult<i64>> {
        let cache = self.clone();
        let user = user_id.to_string();
        live::live_query(self.changes.subscribe(), move || cache.unread_count(&user))
    }
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, Duration, Utc};
    use verifai_shared::NotificationKind;

    use super::*;

    fn notification(id: &str, user_id: &str, minutes_ago: i64, is_read: bool) -> Notification {
        let created = Utc::now() - Duration::minutes(minutes_ago);
        Notification {
            id: id.into(),
            kind: NotificationKind::System {
                action_type: "ANNOUNCE".into(),
                metadata: Default::default(),
            },
            title: format!("title {id}"),
            content: format!("content {id}"),
            created_at: DateTime::from_timestamp_millis(created.timestamp_millis()).unwrap(),
            is_read,
            priority: 0,
            user_id: user_id.into(),
            group_id: None,
            deep_link: None,
            metadata: None,
        }
    }

    fn open_cache() -> NotificationCache {
        NotificationCache::open(":memory:", 1).unwrap()
    }

    #[test]
    fn page_is_newest_first_and_user_scoped() {
        let cache = open_cache();
        cache
            .upsert(&[
                notification("a", "u1", 30, false),
                notification("b", "u1", 10, false),
                notification("c", "u2", 5, false),
            ])
            .unwrap();

        let page = cache.page("u1", PageRequest::new(0, 10)).unwrap();
        let ids: Vec<&str> = page.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn upsert_by_id_is_idempotent() {
        let cache = open_cache();
        cache.upsert(&[notification("a", "u1", 10, false)]).unwrap();

        let mut newer = notification("a", "u1", 10, true);
        newer.title = "updated".into();
        cache.upsert(&[newer]).unwrap();

        let page = cache.page("u1", PageRequest::default()).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "updated");
        assert!(page[0].is_read);
    }

    #[test]
    fn replace_all_drops_rows_missing_from_the_snapshot() {
        let cache = open_cache();
        cache
            .upsert(&[
                notification("a", "u1", 30, true),
                notification("b", "u1", 20, false),
            ])
            .unwrap();

        let snapshot = vec![notification("b", "u1", 20, true), notification("d", "u1", 1, false)];
        cache.replace_all(&snapshot).unwrap();

        let page = cache.page("u1", PageRequest::default()).unwrap();
        let ids: Vec<&str> = page.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["d", "b"]);
        assert!(page.iter().find(|n| n.id == "b").unwrap().is_read);
    }

    #[test]
    fn unread_count_tracks_read_state() {
        let cache = open_cache();
        cache
            .upsert(&[
                notification("a", "u1", 3, false),
                notification("b", "u1", 2, false),
                notification("c", "u1", 1, true),
                notification("d", "u2", 1, false),
            ])
            .unwrap();
        assert_eq!(cache.unread_count("u1").unwrap(), 2);

        cache.update_read_state(&["a".into()], true).unwrap();
        assert_eq!(cache.unread_count("u1").unwrap(), 1);

        cache.mark_all_read("u1").unwrap();
        assert_eq!(cache.unread_count("u1").unwrap(), 0);
        assert_eq!(cache.unread_count("u2").unwrap(), 1);
    }

    #[test]
    fn delete_all_leaves_other_users_alone() {
        let cache = open_cache();
        cache
            .upsert(&[
                notification("a", "u1", 2, false),
                notification("b", "u2", 1, false),
            ])
            .unwrap();

        assert_eq!(cache.delete_all_for_user("u1").unwrap(), 1);
        assert!(cache.page("u1", PageRequest::default()).unwrap().is_empty());
        assert_eq!(cache.page("u2", PageRequest::default()).unwrap().len(), 1);
    }

    #[test]
    fn grouped_rows_are_queryable() {
        let cache = open_cache();
        let mut a = notification("a", "u1", 2, false);
        a.group_id = Some("answers".into());
        let mut b = notification("b", "u1", 1, false);
        b.group_id = Some("points".into());
        cache.upsert(&[a, b]).unwrap();

        let grouped = cache.by_group("answers").unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].id, "a");
    }
}
