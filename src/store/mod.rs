//! SQLite-backed registry and snapshot store
//!
//! Holds the tracked applications per collector, the per-application
//! environment snapshot rows, and the dashboard-binding reference set that
//! drives enablement.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::models::{
    ApplicationId, Collector, CollectorId, DeployApplication, EnvironmentComponent,
    EnvironmentStatus,
};

/// Schema version, bumped on incompatible layout changes
const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, StoreError>;

/// SQLite-backed store for collectors, applications and snapshot rows
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the store at the given database path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("Failed to create store dir: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            return Err(StoreError::Sqlite(format!(
                "store schema version mismatch ({} != {})",
                version, SCHEMA_VERSION
            )));
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collectors (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                enabled INTEGER NOT NULL,
                online INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY,
                collector_id INTEGER NOT NULL,
                instance_url TEXT NOT NULL,
                application_id TEXT NOT NULL,
                application_name TEXT NOT NULL,
                nice_name TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                enabled INTEGER NOT NULL DEFAULT 0
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_app_natural_key
                ON applications(collector_id, instance_url, application_id);

            CREATE TABLE IF NOT EXISTS environment_components (
                id INTEGER PRIMARY KEY,
                collector_item_id INTEGER NOT NULL,
                environment_name TEXT NOT NULL,
                component_name TEXT NOT NULL,
                component_version TEXT NOT NULL,
                deployed INTEGER NOT NULL,
                as_of INTEGER NOT NULL,
                environment_url TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_component_owner
                ON environment_components(collector_item_id);

            CREATE TABLE IF NOT EXISTS environment_statuses (
                id INTEGER PRIMARY KEY,
                collector_item_id INTEGER NOT NULL,
                component_id TEXT NOT NULL,
                component_name TEXT NOT NULL,
                environment_name TEXT NOT NULL,
                resource_name TEXT NOT NULL,
                online INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_status_owner
                ON environment_statuses(collector_item_id);

            CREATE TABLE IF NOT EXISTS dashboard_bindings (
                collector_item_id INTEGER PRIMARY KEY
            );
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn })
    }

    // --- collectors -----------------------------------------------------

    /// Insert the collector row if missing and return its id (keyed by name)
    pub fn upsert_collector(&self, collector: &Collector) -> Result<CollectorId> {
        self.conn.execute(
            "INSERT INTO collectors (name, enabled, online) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET enabled = ?2, online = ?3",
            params![collector.name, collector.enabled, collector.online],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM collectors WHERE name = ?1",
            [&collector.name],
            |r| r.get(0),
        )?;
        Ok(CollectorId(id))
    }

    // --- application registry -------------------------------------------

    /// Natural-key lookup: (collector id, instance URL, remote application id)
    pub fn find_application(
        &self,
        collector_id: CollectorId,
        instance_url: &str,
        application_id: &str,
    ) -> Result<Option<DeployApplication>> {
        self.conn
            .query_row(
                "SELECT id, collector_id, instance_url, application_id, application_name,
                        nice_name, description, enabled
                 FROM applications
                 WHERE collector_id = ?1 AND instance_url = ?2 AND application_id = ?3",
                params![collector_id.0, instance_url, application_id],
                row_to_application,
            )
            .optional()
            .map_err(StoreError::from)
    }

    /// All applications tracked under a collector id
    pub fn find_by_collector_id(&self, collector_id: CollectorId) -> Result<Vec<DeployApplication>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, collector_id, instance_url, application_id, application_name,
                    nice_name, description, enabled
             FROM applications WHERE collector_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([collector_id.0], row_to_application)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Enabled applications for (collector id, instance URL)
    pub fn find_enabled_applications(
        &self,
        collector_id: CollectorId,
        instance_url: &str,
    ) -> Result<Vec<DeployApplication>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, collector_id, instance_url, application_id, application_name,
                    nice_name, description, enabled
             FROM applications
             WHERE collector_id = ?1 AND instance_url = ?2 AND enabled = 1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![collector_id.0, instance_url], row_to_application)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Insert a newly discovered application.
    ///
    /// Surfaces [`StoreError::Duplicate`] when the natural key already
    /// exists; callers decide whether that is fatal.
    pub fn insert_application(&self, app: &DeployApplication) -> Result<ApplicationId> {
        let collector_id = app
            .collector_id
            .ok_or_else(|| StoreError::Sqlite("application has no collector id".to_string()))?;

        self.conn.execute(
            "INSERT INTO applications
                 (collector_id, instance_url, application_id, application_name,
                  nice_name, description, enabled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                collector_id.0,
                app.instance_url,
                app.application_id,
                app.application_name,
                app.nice_name,
                app.description,
                app.enabled
            ],
        )?;
        Ok(ApplicationId(self.conn.last_insert_rowid()))
    }

    /// Update a tracked application's mutable attributes
    pub fn update_application(&self, app: &DeployApplication) -> Result<()> {
        let id = app
            .id
            .ok_or_else(|| StoreError::Sqlite("application has no stored id".to_string()))?;

        self.conn.execute(
            "UPDATE applications
             SET application_name = ?2, nice_name = ?3, description = ?4, enabled = ?5
             WHERE id = ?1",
            params![
                id.0,
                app.application_name,
                app.nice_name,
                app.description,
                app.enabled
            ],
        )?;
        Ok(())
    }

    /// Persist the enabled flag for a batch of applications in one transaction
    pub fn save_enabled_flags(&mut self, apps: &[DeployApplication]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE applications SET enabled = ?2 WHERE id = ?1")?;
            for app in apps {
                if let Some(id) = app.id {
                    stmt.execute(params![id.0, app.enabled])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Bulk-delete applications and their snapshot rows
    pub fn delete_applications(&mut self, ids: &[ApplicationId]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut deleted = 0;
        {
            let mut del_app = tx.prepare("DELETE FROM applications WHERE id = ?1")?;
            let mut del_comp =
                tx.prepare("DELETE FROM environment_components WHERE collector_item_id = ?1")?;
            let mut del_status =
                tx.prepare("DELETE FROM environment_statuses WHERE collector_item_id = ?1")?;
            for id in ids {
                deleted += del_app.execute([id.0])?;
                del_comp.execute([id.0])?;
                del_status.execute([id.0])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    // --- environment snapshots ------------------------------------------

    /// Replace all component rows owned by an application in one transaction
    pub fn replace_components(
        &mut self,
        owner: ApplicationId,
        components: &[EnvironmentComponent],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM environment_components WHERE collector_item_id = ?1",
            [owner.0],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO environment_components
                     (collector_item_id, environment_name, component_name,
                      component_version, deployed, as_of, environment_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for comp in components {
                stmt.execute(params![
                    comp.collector_item_id.0,
                    comp.environment_name,
                    comp.component_name,
                    comp.component_version,
                    comp.deployed,
                    comp.as_of.timestamp_millis(),
                    comp.environment_url
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace all status rows owned by an application in one transaction
    pub fn replace_statuses(
        &mut self,
        owner: ApplicationId,
        statuses: &[EnvironmentStatus],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM environment_statuses WHERE collector_item_id = ?1",
            [owner.0],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO environment_statuses
                     (collector_item_id, component_id, component_name,
                      environment_name, resource_name, online)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for status in statuses {
                stmt.execute(params![
                    status.collector_item_id.0,
                    status.component_id,
                    status.component_name,
                    status.environment_name,
                    status.resource_name,
                    status.online
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Component rows owned by an application
    pub fn find_components_by_owner(
        &self,
        owner: ApplicationId,
    ) -> Result<Vec<EnvironmentComponent>> {
        let mut stmt = self.conn.prepare(
            "SELECT collector_item_id, environment_name, component_name,
                    component_version, deployed, as_of, environment_url
             FROM environment_components WHERE collector_item_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([owner.0], |row| {
            let as_of_millis: i64 = row.get(5)?;
            Ok(EnvironmentComponent {
                collector_item_id: ApplicationId(row.get(0)?),
                environment_name: row.get(1)?,
                component_name: row.get(2)?,
                component_version: row.get(3)?,
                deployed: row.get(4)?,
                as_of: DateTime::<Utc>::from_timestamp_millis(as_of_millis)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                environment_url: row.get(6)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Status rows owned by an application
    pub fn find_statuses_by_owner(&self, owner: ApplicationId) -> Result<Vec<EnvironmentStatus>> {
        let mut stmt = self.conn.prepare(
            "SELECT collector_item_id, component_id, component_name,
                    environment_name, resource_name, online
             FROM environment_statuses WHERE collector_item_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([owner.0], |row| {
            Ok(EnvironmentStatus {
                collector_item_id: ApplicationId(row.get(0)?),
                component_id: row.get(1)?,
                component_name: row.get(2)?,
                environment_name: row.get(3)?,
                resource_name: row.get(4)?,
                online: row.get(5)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    // --- dashboard bindings ---------------------------------------------

    /// Mark a collector item as bound to a dashboard component
    pub fn add_binding(&self, item: ApplicationId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO dashboard_bindings (collector_item_id) VALUES (?1)",
            [item.0],
        )?;
        Ok(())
    }

    /// Remove a dashboard binding; returns whether one existed
    pub fn remove_binding(&self, item: ApplicationId) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM dashboard_bindings WHERE collector_item_id = ?1",
            [item.0],
        )?;
        Ok(removed > 0)
    }

    /// Collector item ids currently referenced by any dashboard component
    pub fn referenced_collector_item_ids(&self) -> Result<HashSet<ApplicationId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT collector_item_id FROM dashboard_bindings")?;
        let rows = stmt.query_map([], |row| Ok(ApplicationId(row.get(0)?)))?;
        rows.collect::<std::result::Result<HashSet<_>, _>>()
            .map_err(StoreError::from)
    }
}

fn row_to_application(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeployApplication> {
    Ok(DeployApplication {
        id: Some(ApplicationId(row.get(0)?)),
        collector_id: Some(CollectorId(row.get(1)?)),
        instance_url: row.get(2)?,
        application_id: row.get(3)?,
        application_name: row.get(4)?,
        nice_name: row.get(5)?,
        description: row.get(6)?,
        enabled: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (Store, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("store.db")).unwrap();
        (store, dir)
    }

    fn tracked_app(
        store: &Store,
        collector_id: CollectorId,
        instance_url: &str,
        application_id: &str,
    ) -> DeployApplication {
        let mut app = DeployApplication::discovered(instance_url, application_id, "App");
        app.collector_id = Some(collector_id);
        let id = store.insert_application(&app).unwrap();
        app.id = Some(id);
        app
    }

    fn component(owner: ApplicationId, env: &str, name: &str) -> EnvironmentComponent {
        EnvironmentComponent {
            collector_item_id: owner,
            environment_name: env.to_string(),
            component_name: name.to_string(),
            component_version: "1.0".to_string(),
            deployed: true,
            as_of: Utc::now(),
            environment_url: "http://x/#environment/e1".to_string(),
        }
    }

    fn status(owner: ApplicationId, env: &str, resource: &str) -> EnvironmentStatus {
        EnvironmentStatus {
            collector_item_id: owner,
            component_id: "c1".to_string(),
            component_name: "svc".to_string(),
            environment_name: env.to_string(),
            resource_name: resource.to_string(),
            online: true,
        }
    }

    #[test]
    fn test_upsert_collector_is_stable() {
        let (store, _dir) = test_store();
        let collector = Collector::prototype(vec!["http://a".to_string()], vec![]);

        let first = store.upsert_collector(&collector).unwrap();
        let second = store.upsert_collector(&collector).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_insert_and_find_application() {
        let (store, _dir) = test_store();
        let cid = store
            .upsert_collector(&Collector::prototype(vec![], vec![]))
            .unwrap();

        let app = tracked_app(&store, cid, "http://x", "app-1");

        let found = store
            .find_application(cid, "http://x", "app-1")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, app.id);
        assert_eq!(found.application_name, "App");
        assert!(!found.enabled);

        assert!(store
            .find_application(cid, "http://x", "app-2")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_insert_duplicate_natural_key() {
        let (store, _dir) = test_store();
        let cid = store
            .upsert_collector(&Collector::prototype(vec![], vec![]))
            .unwrap();

        tracked_app(&store, cid, "http://x", "app-1");

        let mut dup = DeployApplication::discovered("http://x", "app-1", "Other name");
        dup.collector_id = Some(cid);
        match store.insert_application(&dup) {
            Err(StoreError::Duplicate(_)) => (),
            other => panic!("Expected StoreError::Duplicate, got {:?}", other),
        }
    }

    #[test]
    fn test_find_enabled_applications_filters() {
        let (mut store, _dir) = test_store();
        let cid = store
            .upsert_collector(&Collector::prototype(vec![], vec![]))
            .unwrap();

        let mut a = tracked_app(&store, cid, "http://x", "app-1");
        let _b = tracked_app(&store, cid, "http://x", "app-2");
        let mut c = tracked_app(&store, cid, "http://y", "app-3");

        a.enabled = true;
        c.enabled = true;
        store.save_enabled_flags(&[a.clone(), c]).unwrap();

        let enabled = store.find_enabled_applications(cid, "http://x").unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].application_id, "app-1");
    }

    #[test]
    fn test_update_application_nice_name() {
        let (store, _dir) = test_store();
        let cid = store
            .upsert_collector(&Collector::prototype(vec![], vec![]))
            .unwrap();

        let mut app = tracked_app(&store, cid, "http://x", "app-1");
        app.nice_name = "Alias".to_string();
        store.update_application(&app).unwrap();

        let found = store
            .find_application(cid, "http://x", "app-1")
            .unwrap()
            .unwrap();
        assert_eq!(found.nice_name, "Alias");
    }

    #[test]
    fn test_delete_applications_cascades_to_snapshots() {
        let (mut store, _dir) = test_store();
        let cid = store
            .upsert_collector(&Collector::prototype(vec![], vec![]))
            .unwrap();

        let app = tracked_app(&store, cid, "http://x", "app-1");
        let owner = app.id.unwrap();
        store
            .replace_components(owner, &[component(owner, "prod", "svc")])
            .unwrap();
        store
            .replace_statuses(owner, &[status(owner, "prod", "node-a")])
            .unwrap();

        let deleted = store.delete_applications(&[owner]).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.find_by_collector_id(cid).unwrap().is_empty());
        assert!(store.find_components_by_owner(owner).unwrap().is_empty());
        assert!(store.find_statuses_by_owner(owner).unwrap().is_empty());
    }

    #[test]
    fn test_replace_components_is_full_replace() {
        let (mut store, _dir) = test_store();
        let cid = store
            .upsert_collector(&Collector::prototype(vec![], vec![]))
            .unwrap();
        let app = tracked_app(&store, cid, "http://x", "app-1");
        let owner = app.id.unwrap();

        store
            .replace_components(
                owner,
                &[component(owner, "prod", "svc"), component(owner, "qa", "svc")],
            )
            .unwrap();
        store
            .replace_components(owner, &[component(owner, "prod", "api")])
            .unwrap();

        let rows = store.find_components_by_owner(owner).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].component_name, "api");
    }

    #[test]
    fn test_replace_only_touches_owner() {
        let (mut store, _dir) = test_store();
        let cid = store
            .upsert_collector(&Collector::prototype(vec![], vec![]))
            .unwrap();
        let a = tracked_app(&store, cid, "http://x", "app-1");
        let b = tracked_app(&store, cid, "http://x", "app-2");
        let (oa, ob) = (a.id.unwrap(), b.id.unwrap());

        store
            .replace_components(oa, &[component(oa, "prod", "svc")])
            .unwrap();
        store
            .replace_components(ob, &[component(ob, "prod", "other")])
            .unwrap();

        store.replace_components(oa, &[]).unwrap();

        assert!(store.find_components_by_owner(oa).unwrap().is_empty());
        assert_eq!(store.find_components_by_owner(ob).unwrap().len(), 1);
    }

    #[test]
    fn test_component_round_trips_as_of_millis() {
        let (mut store, _dir) = test_store();
        let cid = store
            .upsert_collector(&Collector::prototype(vec![], vec![]))
            .unwrap();
        let app = tracked_app(&store, cid, "http://x", "app-1");
        let owner = app.id.unwrap();

        let mut comp = component(owner, "prod", "svc");
        comp.as_of = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
        store.replace_components(owner, &[comp.clone()]).unwrap();

        let rows = store.find_components_by_owner(owner).unwrap();
        assert_eq!(rows[0].as_of, comp.as_of);
    }

    #[test]
    fn test_bindings_set() {
        let (store, _dir) = test_store();

        store.add_binding(ApplicationId(1)).unwrap();
        store.add_binding(ApplicationId(1)).unwrap();
        store.add_binding(ApplicationId(2)).unwrap();

        let ids = store.referenced_collector_item_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&ApplicationId(1)));

        assert!(store.remove_binding(ApplicationId(2)).unwrap());
        assert!(!store.remove_binding(ApplicationId(2)).unwrap());
        assert_eq!(store.referenced_collector_item_ids().unwrap().len(), 1);
    }
}
