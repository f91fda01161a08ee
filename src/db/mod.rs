mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::graph::GoalGraph;
use crate::models::*;

const DATE_FORMAT: &str = "%Y-%m-%d";

const TASK_COLUMNS: &str = "id, text, priority, goal_id, is_daily, status, created_at, completed_at, last_completed";

/// SQLite-backed storage for goals, tasks, journal and analysis entries.
///
/// Cloning is cheap; clones share one connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    /// Location of the database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ============================================================
    // Goal graph
    // ============================================================

    pub fn load_graph(&self) -> Result<GraphSnapshot> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let mut stmt =
            conn.prepare("SELECT id, description, category FROM goals ORDER BY position")?;
        let nodes = stmt
            .query_map([], |row| {
                Ok(GoalNode::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    Category::parse_lenient(&row.get::<_, String>(2)?),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT source, target FROM goal_links ORDER BY position")?;
        let links = stmt
            .query_map([], |row| {
                Ok(GoalLink::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GraphSnapshot { nodes, links })
    }

    /// Load and rebuild the goal graph, restoring adjacency from the stored links.
    pub fn load_goal_graph(&self) -> Result<GoalGraph> {
        Ok(GoalGraph::from(self.load_graph()?))
    }

    /// Replace the stored graph with `graph`. Last write wins.
    pub fn save_graph(&self, graph: &GoalGraph) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM goal_links", [])?;
        tx.execute("DELETE FROM goals", [])?;

        {
            let mut insert_goal = tx.prepare(
                "INSERT INTO goals (id, description, category, position) VALUES (?, ?, ?, ?)",
            )?;
            for (position, node) in graph.all_nodes().into_iter().enumerate() {
                insert_goal.execute((
                    &node.id,
                    &node.description,
                    node.category.as_str(),
                    position as i64,
                ))?;
            }

            let mut insert_link = tx.prepare(
                "INSERT INTO goal_links (source, target, position) VALUES (?, ?, ?)",
            )?;
            for (position, link) in graph.all_links().iter().enumerate() {
                insert_link.execute((&link.source, &link.target, position as i64))?;
            }
        }

        tx.commit()?;
        tracing::debug!(
            "Saved goal graph: {} goals, {} links",
            graph.len(),
            graph.all_links().len()
        );
        Ok(())
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn get_task_lists(&self) -> Result<TaskLists> {
        Ok(TaskLists {
            active: self.get_tasks(TaskStatus::Active)?,
            completed: self.get_tasks(TaskStatus::Completed)?,
        })
    }

    pub fn get_tasks(&self, status: TaskStatus) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE status = ? ORDER BY created_at, rowid",
            TASK_COLUMNS
        ))?;

        let tasks = stmt
            .query_map([status.as_str()], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    pub fn get_tasks_for_goal(&self, goal_id: &str) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE goal_id = ? ORDER BY created_at, rowid",
            TASK_COLUMNS
        ))?;

        let tasks = stmt
            .query_map([goal_id], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let task = conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS),
                [id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        let text = input.text.trim().to_string();
        if text.is_empty() {
            anyhow::bail!("Task text must not be empty");
        }

        let task = Task {
            id: format!("todo_{}", Uuid::new_v4().simple()),
            text,
            priority: input.priority.unwrap_or_default(),
            goal_id: input.goal_id.filter(|g| !g.is_empty()),
            is_daily: input.is_daily,
            status: TaskStatus::Active,
            created_at: now(),
            completed_at: None,
            last_completed: None,
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        insert_task(&conn, &task)?;
        Ok(task)
    }

    pub fn update_task(&self, id: &str, input: UpdateTaskInput) -> Result<Option<Task>> {
        let Some(existing) = self.get_task(id)? else {
            return Ok(None);
        };

        let text = match input.text {
            Some(text) if text.trim().is_empty() => anyhow::bail!("Task text must not be empty"),
            Some(text) => text.trim().to_string(),
            None => existing.text,
        };
        let priority = input.priority.unwrap_or(existing.priority);
        let goal_id = match input.goal_id {
            Some(g) if g.is_empty() => None,
            Some(g) => Some(g),
            None => existing.goal_id,
        };
        let is_daily = input.is_daily.unwrap_or(existing.is_daily);

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE tasks SET text = ?, priority = ?, goal_id = ?, is_daily = ? WHERE id = ?",
            (&text, priority.as_str(), &goal_id, is_daily, id),
        )?;

        Ok(Some(Task {
            text,
            priority,
            goal_id,
            is_daily,
            ..existing
        }))
    }

    /// Move an active task to the completed list.
    ///
    /// Returns `None` if there is no active task with that id.
    pub fn complete_task(&self, id: &str) -> Result<Option<Task>> {
        let Some(task) = self.get_task(id)? else {
            return Ok(None);
        };
        if task.status != TaskStatus::Active {
            return Ok(None);
        }

        let now = now();
        let last_completed = if task.is_daily {
            Some(now.date_naive())
        } else {
            task.last_completed
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE tasks SET status = 'completed', completed_at = ?, last_completed = ? WHERE id = ?",
            (
                timestamp(now),
                last_completed.map(|d| d.format(DATE_FORMAT).to_string()),
                id,
            ),
        )?;

        Ok(Some(Task {
            status: TaskStatus::Completed,
            completed_at: Some(now),
            last_completed,
            ..task
        }))
    }

    /// Move a completed task back to the active list.
    ///
    /// Returns `None` if there is no completed task with that id.
    pub fn reactivate_task(&self, id: &str) -> Result<Option<Task>> {
        let Some(task) = self.get_task(id)? else {
            return Ok(None);
        };
        if task.status != TaskStatus::Completed {
            return Ok(None);
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE tasks SET status = 'active', completed_at = NULL WHERE id = ?",
            [id],
        )?;

        Ok(Some(Task {
            status: TaskStatus::Active,
            completed_at: None,
            ..task
        }))
    }

    /// Delete a task, keeping it in the single-slot undo buffer.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let Some(task) = self.get_task(id)? else {
            return Ok(false);
        };

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM tasks WHERE id = ?", [id])?;
        tx.execute(
            "INSERT OR REPLACE INTO deleted_task (slot, task) VALUES (1, ?)",
            [serde_json::to_string(&task)?],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Restore the most recently deleted task, once.
    pub fn undo_delete_task(&self) -> Result<Option<Task>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let stored: Option<String> = tx
            .query_row("SELECT task FROM deleted_task WHERE slot = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(json) = stored else {
            return Ok(None);
        };

        let task: Task = serde_json::from_str(&json)?;
        tx.execute("DELETE FROM deleted_task", [])?;
        tx.execute("DELETE FROM tasks WHERE id = ?", [&task.id])?;
        insert_task(&tx, &task)?;
        tx.commit()?;

        Ok(Some(task))
    }

    /// Delete every task pointing at `goal_id`. Does not touch the undo buffer.
    pub fn delete_tasks_for_goal(&self, goal_id: &str) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM tasks WHERE goal_id = ?", [goal_id])?;
        Ok(rows)
    }

    /// Reactivate completed daily tasks last completed before `today`.
    pub fn reset_daily_tasks(&self, today: NaiveDate) -> Result<usize> {
        let due: Vec<String> = self
            .get_tasks(TaskStatus::Completed)?
            .into_iter()
            .filter(|t| t.is_daily && t.last_completed.is_some_and(|d| d < today))
            .map(|t| t.id)
            .collect();

        let mut reset = 0;
        for id in &due {
            if self.reactivate_task(id)?.is_some() {
                reset += 1;
            }
        }

        if reset > 0 {
            tracing::info!("{} daily task(s) reset for {}", reset, today);
        }
        Ok(reset)
    }

    pub fn clear_completed_tasks(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM tasks WHERE status = 'completed'", [])?;
        Ok(rows)
    }

    // ============================================================
    // Journal operations
    // ============================================================

    /// Journal entries matching `filter`, most recently updated first.
    pub fn get_journal_entries(&self, filter: &JournalFilter) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, entry_type, content, created_at, updated_at
             FROM journal_entries
             WHERE ?1 IS NULL OR entry_type = ?1
             ORDER BY updated_at DESC, rowid DESC",
        )?;

        let mut entries = stmt
            .query_map([filter.entry_type()], journal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(query) = filter.query() {
            entries.retain(|e| e.content.to_lowercase().contains(&query));
        }

        Ok(entries)
    }

    pub fn get_journal_entry(&self, id: &str) -> Result<Option<JournalEntry>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let entry = conn
            .query_row(
                "SELECT id, entry_type, content, created_at, updated_at
                 FROM journal_entries WHERE id = ?",
                [id],
                journal_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Insert a new entry or overwrite an existing one.
    pub fn save_journal_entry(&self, input: SaveJournalEntryInput) -> Result<JournalEntry> {
        let now = now();
        let entry_type = input
            .entry_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENTRY_TYPE.to_string());

        if let Some(id) = input.id.as_deref().filter(|id| !id.is_empty()) {
            if let Some(existing) = self.get_journal_entry(id)? {
                let conn = self.conn.lock().expect("database lock poisoned");
                conn.execute(
                    "UPDATE journal_entries SET entry_type = ?, content = ?, updated_at = ? WHERE id = ?",
                    (&entry_type, &input.content, timestamp(now), id),
                )?;
                return Ok(JournalEntry {
                    entry_type,
                    content: input.content,
                    updated_at: now,
                    ..existing
                });
            }
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = match input.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => next_journal_id(&conn, now)?,
        };

        conn.execute(
            "INSERT INTO journal_entries (id, entry_type, content, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (&id, &entry_type, &input.content, timestamp(now), timestamp(now)),
        )?;

        Ok(JournalEntry {
            id,
            entry_type,
            content: input.content,
            created_at: now,
            updated_at: now,
        })
    }

    /// Delete an entry together with its analyses.
    pub fn delete_journal_entry(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM analysis_entries WHERE entry_id = ?", [id])?;
        let rows = tx.execute("DELETE FROM journal_entries WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // ============================================================
    // Analysis operations
    // ============================================================

    pub fn create_analysis(&self, input: CreateAnalysisInput) -> Result<AnalysisEntry> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            anyhow::bail!("Analysis title must not be empty");
        }
        let entry_id = input.entry_id.trim().to_string();
        if entry_id.is_empty() {
            anyhow::bail!("Analysis entry id must not be empty");
        }
        if input.answers.values().all(|a| a.trim().is_empty()) {
            anyhow::bail!("Analysis answers must not be empty");
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM journal_entries WHERE id = ?)",
            [&entry_id],
            |row| row.get(0),
        )?;
        if !exists {
            anyhow::bail!("Journal entry not found: {}", entry_id);
        }

        let id = Uuid::new_v4().to_string();
        let now = now();

        conn.execute(
            "INSERT INTO analysis_entries (id, title, entry_id, answers, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                &id,
                &title,
                &entry_id,
                serde_json::to_string(&input.answers)?,
                timestamp(now),
            ),
        )?;

        Ok(AnalysisEntry {
            id,
            title,
            entry_id: Some(entry_id),
            answers: input.answers,
            created_at: now,
        })
    }

    /// All saved analyses, newest first.
    pub fn get_analyses(&self) -> Result<Vec<AnalysisEntry>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, entry_id, answers, created_at
             FROM analysis_entries ORDER BY created_at DESC, rowid DESC",
        )?;

        let entries = stmt
            .query_map([], analysis_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Analyses of one journal entry, newest first.
    pub fn get_analyses_for_entry(&self, entry_id: &str) -> Result<Vec<AnalysisEntry>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, entry_id, answers, created_at
             FROM analysis_entries WHERE entry_id = ?
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let entries = stmt
            .query_map([entry_id], analysis_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn get_analysis(&self, id: &str) -> Result<Option<AnalysisEntry>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let entry = conn
            .query_row(
                "SELECT id, title, entry_id, answers, created_at
                 FROM analysis_entries WHERE id = ?",
                [id],
                analysis_from_row,
            )
            .optional()?;
        Ok(entry)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            path: self.path.clone(),
        }
    }
}

fn insert_task(conn: &Connection, task: &Task) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO tasks ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TASK_COLUMNS
        ),
        (
            &task.id,
            &task.text,
            task.priority.as_str(),
            &task.goal_id,
            task.is_daily,
            task.status.as_str(),
            timestamp(task.created_at),
            task.completed_at.map(timestamp),
            task.last_completed
                .map(|d| d.format(DATE_FORMAT).to_string()),
        ),
    )?;
    Ok(())
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        text: row.get(1)?,
        priority: Priority::from_str(&row.get::<_, String>(2)?).unwrap_or_default(),
        goal_id: row.get(3)?,
        is_daily: row.get(4)?,
        status: TaskStatus::from_str(&row.get::<_, String>(5)?).unwrap_or(TaskStatus::Active),
        created_at: datetime_column(row, 6)?,
        completed_at: row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_datetime(7, &s))
            .transpose()?,
        last_completed: row
            .get::<_, Option<String>>(8)?
            .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(8, e)))
            .transpose()?,
    })
}

fn journal_from_row(row: &Row) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        entry_type: row.get(1)?,
        content: row.get(2)?,
        created_at: datetime_column(row, 3)?,
        updated_at: datetime_column(row, 4)?,
    })
}

fn analysis_from_row(row: &Row) -> rusqlite::Result<AnalysisEntry> {
    let answers_json: String = row.get(3)?;
    Ok(AnalysisEntry {
        id: row.get(0)?,
        title: row.get(1)?,
        entry_id: row.get(2)?,
        answers: serde_json::from_str(&answers_json).map_err(|e| conversion_error(3, e))?,
        created_at: datetime_column(row, 4)?,
    })
}

/// Millisecond-timestamp id, bumped until it is unused.
fn next_journal_id(conn: &Connection, now: DateTime<Utc>) -> Result<String> {
    let mut candidate = now.timestamp_millis();
    loop {
        let id = candidate.to_string();
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM journal_entries WHERE id = ?)",
            [&id],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(id);
        }
        candidate += 1;
    }
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_datetime(idx, &row.get::<_, String>(idx)?)
}

fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

/// A stored value that does not parse. Surfaces as a query error.
fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    tracing::warn!("Unreadable value in column {}: {}", idx, err);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn execute(db: &Database, sql: &str) {
        db.conn.lock().unwrap().execute_batch(sql).unwrap();
    }

    #[test]
    fn corrupt_answers_fail_the_query() {
        let db = setup();
        execute(
            &db,
            "INSERT INTO journal_entries (id, entry_type, content, created_at, updated_at)
             VALUES ('1', 'personal', '', '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z');
             INSERT INTO analysis_entries (id, title, entry_id, answers, created_at)
             VALUES ('a', 'Broken', '1', '{not json', '2024-01-01T00:00:00.000000Z');",
        );

        assert!(db.get_analyses().is_err());
        assert!(db.get_analysis("a").is_err());
        assert!(db.get_analyses_for_entry("1").is_err());
    }

    #[test]
    fn corrupt_timestamp_fails_the_query() {
        let db = setup();
        execute(
            &db,
            "INSERT INTO journal_entries (id, entry_type, content, created_at, updated_at)
             VALUES ('1', 'personal', '', 'yesterday', '2024-01-01T00:00:00.000000Z');",
        );

        let err = db.get_journal_entry("1").unwrap_err();
        let source = err.downcast_ref::<rusqlite::Error>().expect("rusqlite error");
        assert!(matches!(
            source,
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, _)
        ));
        assert!(db.get_journal_entries(&JournalFilter::default()).is_err());
    }

    #[test]
    fn corrupt_completion_date_fails_the_query() {
        let db = setup();
        let task = db
            .create_task(CreateTaskInput {
                text: "stretch".to_string(),
                priority: None,
                goal_id: None,
                is_daily: true,
            })
            .unwrap();
        execute(
            &db,
            &format!("UPDATE tasks SET last_completed = '31/12/2024' WHERE id = '{}'", task.id),
        );

        assert!(db.get_task(&task.id).is_err());
    }

    #[test]
    fn legacy_analysis_without_entry_still_loads() {
        let db = setup();
        execute(
            &db,
            "INSERT INTO analysis_entries (id, title, answers, created_at)
             VALUES ('old', 'Before linking', '{\"facts\":\"x\"}', '2024-01-01T00:00:00.000000Z');",
        );

        let analysis = db.get_analysis("old").unwrap().expect("analysis missing");
        assert!(analysis.entry_id.is_none());
        assert_eq!(analysis.answers["facts"], "x");
    }
}
