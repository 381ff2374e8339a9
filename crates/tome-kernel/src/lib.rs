use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the embedded database, created inside the state directory.
pub const DB_FILE: &str = "tome.sqlite";

/// Handle to the single-file store. Holds only the path; every operation
/// opens a short-lived connection and commits independently.
#[derive(Clone)]
pub struct Kernel {
    db_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Task {
    pub id: i64,
    pub content: String,
    pub completed: bool,
    pub priority: String,
    pub created_at: String,
    pub updated_at: String,
}

const KNOWLEDGE_COLS: &str = "id,title,content,category,tags,created_at,updated_at";
const TASK_COLS: &str = "id,content,completed,priority,created_at,updated_at";

impl Kernel {
    /// Open (or create) the database under `dir`. The directory is created if
    /// missing and the schema is applied idempotently, so the first request
    /// after `open` returns always sees both tables.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        // Busy timeout (default 5000ms; override with TOME_SQLITE_BUSY_MS)
        let busy_ms: u64 = std::env::var("TOME_SQLITE_BUSY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);
        conn.busy_timeout(std::time::Duration::from_millis(busy_ms))?;
        Self::init_schema(&conn)?;
        Ok(Self { db_path })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              title TEXT NOT NULL,
              content TEXT NOT NULL,
              category TEXT NOT NULL DEFAULT '',
              tags TEXT NOT NULL DEFAULT '',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_knowledge_category ON knowledge(category);
            CREATE INDEX IF NOT EXISTS idx_knowledge_updated ON knowledge(updated_at);

            CREATE TABLE IF NOT EXISTS tasks (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              content TEXT NOT NULL,
              completed INTEGER NOT NULL DEFAULT 0,
              priority TEXT NOT NULL DEFAULT '',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    /// Trivial readiness query.
    pub fn probe(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // ---------- knowledge ----------

    pub fn list_knowledge(&self, category: Option<&str>) -> Result<Vec<KnowledgeEntry>> {
        let conn = self.conn()?;
        let mut stmt_filtered;
        let mut stmt_all;
        let mut rows = match category {
            Some(cat) if !cat.is_empty() => {
                stmt_filtered = conn.prepare(&format!(
                    "SELECT {KNOWLEDGE_COLS} FROM knowledge WHERE category = ? ORDER BY updated_at DESC, id DESC",
                ))?;
                stmt_filtered.query(params![cat])?
            }
            _ => {
                stmt_all = conn.prepare(&format!(
                    "SELECT {KNOWLEDGE_COLS} FROM knowledge ORDER BY updated_at DESC, id DESC",
                ))?;
                stmt_all.query([])?
            }
        };
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(Self::knowledge_from_row(row)?);
        }
        Ok(out)
    }

    /// Substring search over title, content and tags. An empty keyword
    /// matches nothing, not everything.
    pub fn search_knowledge(&self, keyword: &str) -> Result<Vec<KnowledgeEntry>> {
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {KNOWLEDGE_COLS} FROM knowledge \
             WHERE title LIKE ?1 OR content LIKE ?1 OR tags LIKE ?1 \
             ORDER BY updated_at DESC, id DESC",
        ))?;
        let pattern = format!("%{keyword}%");
        let mut rows = stmt.query(params![pattern])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(Self::knowledge_from_row(row)?);
        }
        Ok(out)
    }

    pub fn insert_knowledge(
        &self,
        title: &str,
        content: &str,
        category: &str,
        tags: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;
        let now = Self::now();
        conn.execute(
            "INSERT INTO knowledge(title,content,category,tags,created_at,updated_at) \
             VALUES (?,?,?,?,?,?)",
            params![title, content, category, tags, now, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the number of rows touched; zero for an unknown id.
    pub fn update_knowledge(
        &self,
        id: i64,
        title: &str,
        content: &str,
        category: &str,
        tags: &str,
    ) -> Result<usize> {
        let conn = self.conn()?;
        let now = Self::now();
        let n = conn.execute(
            "UPDATE knowledge SET title = ?, content = ?, category = ?, tags = ?, updated_at = ? \
             WHERE id = ?",
            params![title, content, category, tags, now, id],
        )?;
        Ok(n)
    }

    pub fn delete_knowledge(&self, id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM knowledge WHERE id = ?", params![id])?;
        Ok(n)
    }

    fn knowledge_from_row(row: &rusqlite::Row<'_>) -> Result<KnowledgeEntry> {
        Ok(KnowledgeEntry {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            category: row.get(3)?,
            tags: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // ---------- tasks ----------

    /// Tasks ordered by priority rank (high, normal, low, then anything
    /// else/unset), newest first within a rank. Ids are monotonic, so the id
    /// tiebreak keeps same-millisecond inserts newest-first too.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLS} FROM tasks ORDER BY \
             CASE priority WHEN 'high' THEN 0 WHEN 'normal' THEN 1 WHEN 'low' THEN 2 ELSE 3 END, \
             created_at DESC, id DESC",
        ))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(Self::task_from_row(row)?);
        }
        Ok(out)
    }

    pub fn insert_task(&self, content: &str, priority: &str) -> Result<Task> {
        let conn = self.conn()?;
        let now = Self::now();
        conn.execute(
            "INSERT INTO tasks(content,completed,priority,created_at,updated_at) \
             VALUES (?,?,?,?,?)",
            params![content, false, priority, now, now],
        )?;
        Ok(Task {
            id: conn.last_insert_rowid(),
            content: content.to_string(),
            completed: false,
            priority: priority.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn set_task_completed(&self, id: i64, completed: bool) -> Result<usize> {
        let conn = self.conn()?;
        let now = Self::now();
        let n = conn.execute(
            "UPDATE tasks SET completed = ?, updated_at = ? WHERE id = ?",
            params![completed, now, id],
        )?;
        Ok(n)
    }

    pub fn delete_task(&self, id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM tasks WHERE id = ?", params![id])?;
        Ok(n)
    }

    fn task_from_row(row: &rusqlite::Row<'_>) -> Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            content: row.get(1)?,
            completed: row.get(2)?,
            priority: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

// Async wrappers for use from request handlers; rusqlite work stays off the
// runtime threads.
impl Kernel {
    pub async fn probe_async(&self) -> Result<()> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.probe())
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn list_knowledge_async(
        &self,
        category: Option<String>,
    ) -> Result<Vec<KnowledgeEntry>> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.list_knowledge(category.as_deref()))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn search_knowledge_async(&self, keyword: String) -> Result<Vec<KnowledgeEntry>> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.search_knowledge(&keyword))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn insert_knowledge_async(
        &self,
        title: String,
        content: String,
        category: String,
        tags: String,
    ) -> Result<i64> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || {
            k.insert_knowledge(&title, &content, &category, &tags)
        })
        .await
        .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn update_knowledge_async(
        &self,
        id: i64,
        title: String,
        content: String,
        category: String,
        tags: String,
    ) -> Result<usize> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || {
            k.update_knowledge(id, &title, &content, &category, &tags)
        })
        .await
        .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn delete_knowledge_async(&self, id: i64) -> Result<usize> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.delete_knowledge(id))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn list_tasks_async(&self) -> Result<Vec<Task>> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.list_tasks())
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn insert_task_async(&self, content: String, priority: String) -> Result<Task> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.insert_task(&content, &priority))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn set_task_completed_async(&self, id: i64, completed: bool) -> Result<usize> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.set_task_completed(id, completed))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }

    pub async fn delete_task_async(&self, id: i64) -> Result<usize> {
        let k = self.clone();
        tokio::task::spawn_blocking(move || k.delete_task(id))
            .await
            .map_err(|e| anyhow!("join error: {}", e))?
    }
}
