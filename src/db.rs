use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::warn;

use crate::batch::{BatchReport, Document, DocumentStore};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::parser::rules::{PostCard, PostLookup};
use crate::parser::Tally;

pub struct SqliteStore {
    conn: Connection,
    post_types: Vec<String>,
    keep_revisions: bool,
}

impl SqliteStore {
    pub fn open(path: &Path, settings: &Settings) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| Error::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn, settings)
    }

    pub fn open_in_memory(settings: &Settings) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, settings)
    }

    fn with_connection(conn: Connection, settings: &Settings) -> Result<Self> {
        let store = SqliteStore {
            conn,
            post_types: settings.post_types.clone(),
            keep_revisions: settings.keep_revisions,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS posts (
                id            INTEGER PRIMARY KEY,
                post_type     TEXT NOT NULL DEFAULT 'post',
                post_status   TEXT NOT NULL DEFAULT 'publish',
                post_title    TEXT NOT NULL DEFAULT '',
                post_content  TEXT NOT NULL DEFAULT '',
                permalink     TEXT,
                thumbnail_url TEXT,
                author_name   TEXT,
                category_name TEXT,
                modified_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_posts_type ON posts(post_type);

            CREATE TABLE IF NOT EXISTS post_revisions (
                id          INTEGER PRIMARY KEY,
                post_id     INTEGER NOT NULL REFERENCES posts(id),
                run_id      TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_revisions_run ON post_revisions(run_id);

            -- Conversion history
            CREATE TABLE IF NOT EXISTS conversion_runs (
                run_id      TEXT PRIMARY KEY,
                started_at  TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                scanned     INTEGER NOT NULL,
                updated     INTEGER NOT NULL,
                failed      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS conversion_counts (
                run_id      TEXT NOT NULL REFERENCES conversion_runs(run_id),
                block_type  TEXT NOT NULL,
                count       INTEGER NOT NULL,
                UNIQUE(run_id, block_type)
            );
            ",
        )?;
        Ok(())
    }

    // ── Run history ──

    /// Callers running the batch inside a transaction record the run in it.
    pub fn record_run(&self, report: &BatchReport) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO conversion_runs
             (run_id, started_at, finished_at, scanned, updated, failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                report.run_id,
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                report.scanned as i64,
                report.updated as i64,
                report.failed as i64,
            ],
        )?;
        {
            let mut stmt = self.conn.prepare(
                "INSERT OR REPLACE INTO conversion_counts (run_id, block_type, count)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (block_type, count) in report.tally.entries() {
                stmt.execute(params![report.run_id, block_type, count as i64])?;
            }
        }
        Ok(())
    }

    /// Most recent runs first.
    pub fn fetch_runs(&self, limit: usize) -> Result<Vec<RunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, started_at, finished_at, scanned, updated, failed
             FROM conversion_runs
             ORDER BY started_at DESC, run_id DESC
             LIMIT ?1",
        )?;
        let mut runs = stmt
            .query_map([limit as i64], |row| {
                Ok(RunRow {
                    run_id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    scanned: row.get(3)?,
                    updated: row.get(4)?,
                    failed: row.get(5)?,
                    tally: Tally::default(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut counts = self
            .conn
            .prepare("SELECT block_type, count FROM conversion_counts WHERE run_id = ?1")?;
        for run in &mut runs {
            run.tally = counts
                .query_map([&run.run_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
                })?
                .collect::<std::result::Result<Tally, _>>()?;
        }
        Ok(runs)
    }

    /// Put back the content each post had before `run_id` saved it.
    pub fn revert(&self, run_id: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let revisions: Vec<(i64, String)> = {
            let mut stmt = tx.prepare(
                "SELECT post_id, content FROM post_revisions WHERE run_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        if revisions.is_empty() {
            return Err(Error::RunNotFound(run_id.to_string()));
        }
        {
            let mut stmt = tx.prepare(
                "UPDATE posts SET post_content = ?2, modified_at = datetime('now') WHERE id = ?1",
            )?;
            for (post_id, content) in &revisions {
                stmt.execute(params![post_id, content])?;
            }
        }
        tx.commit()?;
        Ok(revisions.len())
    }
}

impl DocumentStore for SqliteStore {
    fn find(&self, marker: &str, limit: Option<usize>) -> Result<Vec<Document>> {
        if self.post_types.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (0..self.post_types.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, post_title, post_content
             FROM posts
             WHERE instr(post_content, ?1) > 0 AND post_type IN ({})
             ORDER BY id{}",
            placeholders,
            match limit {
                Some(n) => format!(" LIMIT {}", n),
                None => String::new(),
            }
        );
        let values = std::iter::once(marker).chain(self.post_types.iter().map(String::as_str));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(Document {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn persist(&self, doc: &Document, run_id: &str) -> Result<()> {
        if self.keep_revisions {
            let saved = self.conn.execute(
                "INSERT INTO post_revisions (post_id, run_id, content)
                 SELECT id, ?2, post_content FROM posts WHERE id = ?1",
                params![doc.id, run_id],
            )?;
            if saved == 0 {
                return Err(Error::PostNotFound(doc.id));
            }
        }
        let updated = self.conn.execute(
            "UPDATE posts SET post_content = ?2, modified_at = datetime('now') WHERE id = ?1",
            params![doc.id, doc.content],
        )?;
        if updated == 0 {
            return Err(Error::PostNotFound(doc.id));
        }
        Ok(())
    }
}

impl PostLookup for SqliteStore {
    fn post_card(&self, id: i64) -> Option<PostCard> {
        let row = self
            .conn
            .query_row(
                "SELECT post_title, permalink, thumbnail_url, author_name, category_name
                 FROM posts WHERE id = ?1",
                [id],
                |row| {
                    Ok(PostCard {
                        title: row.get(0)?,
                        permalink: row.get(1)?,
                        thumbnail: row.get(2)?,
                        author: row.get(3)?,
                        category: row.get(4)?,
                    })
                },
            )
            .optional();
        match row {
            Ok(card) => card.map(non_blank),
            Err(e) => {
                warn!(post = id, error = %e, "post lookup failed");
                None
            }
        }
    }
}

fn non_blank(card: PostCard) -> PostCard {
    let keep = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    PostCard {
        title: keep(card.title),
        permalink: keep(card.permalink),
        thumbnail: keep(card.thumbnail),
        author: keep(card.author),
        category: keep(card.category),
    }
}

pub struct RunRow {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub scanned: i64,
    pub updated: i64,
    pub failed: i64,
    pub tally: Tally,
}

impl RunRow {
    pub fn started(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.started_at)
    }

    pub fn finished(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.finished_at)
    }

    /// Wall time of the run, `None` when either timestamp is unreadable.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished()? - self.started()?)
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
pub(crate) struct NewPost<'a> {
    pub post_type: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub permalink: Option<&'a str>,
    pub thumbnail: Option<&'a str>,
}

#[cfg(test)]
impl SqliteStore {
    pub(crate) fn insert_post(&self, post: &NewPost<'_>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO posts (post_type, post_title, post_content, permalink, thumbnail_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![post.post_type, post.title, post.content, post.permalink, post.thumbnail],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn post_content(&self, id: i64) -> Result<String> {
        self.conn
            .query_row("SELECT post_content FROM posts WHERE id = ?1", [id], |r| r.get(0))
            .optional()?
            .ok_or(Error::PostNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use indicatif::ProgressBar;

    use super::*;
    use crate::batch::{self, RunOptions};
    use crate::parser::Converter;

    fn settings(keep_revisions: bool) -> Settings {
        Settings {
            db_path: PathBuf::from(":memory:"),
            namespace: "slgb".into(),
            post_types: vec!["post".into(), "page".into()],
            keep_revisions,
        }
    }

    fn post<'a>(post_type: &'a str, content: &'a str) -> NewPost<'a> {
        NewPost {
            post_type,
            title: "Untitled",
            content,
            permalink: None,
            thumbnail: None,
        }
    }

    const HEADING: &str = r#"<!-- wp:slgb/h2 {"text":"Hi"} /-->"#;

    #[test]
    fn find_filters_marker_and_post_type() {
        let store = SqliteStore::open_in_memory(&settings(true)).unwrap();
        let a = store.insert_post(&post("post", HEADING)).unwrap();
        store.insert_post(&post("post", "<p>plain</p>")).unwrap();
        store.insert_post(&post("attachment", HEADING)).unwrap();
        let d = store.insert_post(&post("page", HEADING)).unwrap();

        let ids: Vec<_> = store.find("wp:slgb/", None).unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a, d]);
        assert_eq!(store.find("wp:slgb/", Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn persist_keeps_a_revision() {
        let store = SqliteStore::open_in_memory(&settings(true)).unwrap();
        let id = store.insert_post(&post("post", HEADING)).unwrap();
        let doc = Document {
            id,
            title: "Untitled".into(),
            content: "<p>new</p>".into(),
        };
        store.persist(&doc, "run-1").unwrap();
        assert_eq!(store.post_content(id).unwrap(), "<p>new</p>");
        let kept: String = store
            .conn()
            .query_row("SELECT content FROM post_revisions WHERE run_id = 'run-1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(kept, HEADING);
    }

    #[test]
    fn persist_missing_post_fails() {
        let store = SqliteStore::open_in_memory(&settings(false)).unwrap();
        let doc = Document {
            id: 404,
            title: String::new(),
            content: String::new(),
        };
        assert!(matches!(store.persist(&doc, "run-1"), Err(Error::PostNotFound(404))));
    }

    #[test]
    fn batch_record_and_revert() {
        let store = SqliteStore::open_in_memory(&settings(true)).unwrap();
        let id = store.insert_post(&post("post", HEADING)).unwrap();
        let converter = Converter::new("slgb").with_lookup(&store);
        let report = batch::run(&store, &converter, &RunOptions::default(), &ProgressBar::hidden()).unwrap();
        assert_eq!(report.updated, 1);
        assert!(store.post_content(id).unwrap().contains("<h2>Hi</h2>"));

        store.record_run(&report).unwrap();
        let runs = store.fetch_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, report.run_id);
        assert_eq!(runs[0].updated, 1);
        assert_eq!(runs[0].tally.get("heading"), 1);
        assert!(runs[0].started().is_some());

        assert_eq!(store.revert(&report.run_id).unwrap(), 1);
        assert_eq!(store.post_content(id).unwrap(), HEADING);
    }

    #[test]
    fn revert_unknown_run() {
        let store = SqliteStore::open_in_memory(&settings(true)).unwrap();
        assert!(matches!(store.revert("run-nope"), Err(Error::RunNotFound(_))));
    }

    #[test]
    fn post_card_drops_blank_fields() {
        let store = SqliteStore::open_in_memory(&settings(true)).unwrap();
        let id = store
            .insert_post(&NewPost {
                post_type: "post",
                title: "Checklist",
                content: "",
                permalink: Some("https://blog.test/checklist"),
                thumbnail: Some(" "),
            })
            .unwrap();
        let card = store.post_card(id).unwrap();
        assert_eq!(card.title.as_deref(), Some("Checklist"));
        assert_eq!(card.permalink.as_deref(), Some("https://blog.test/checklist"));
        assert_eq!(card.thumbnail, None);
        assert!(store.post_card(id + 1).is_none());
    }

    #[test]
    fn miniature_resolves_through_store() {
        let store = SqliteStore::open_in_memory(&settings(true)).unwrap();
        let target = store
            .insert_post(&NewPost {
                post_type: "post",
                title: "Checklist",
                content: "",
                permalink: Some("https://blog.test/checklist"),
                thumbnail: None,
            })
            .unwrap();
        let text = format!(r#"<!-- wp:slgb/miniature {{"postId":{}}} /-->"#, target);
        let converted = Converter::new("slgb").with_lookup(&store).convert(&text);
        assert_eq!(converted.tally.get("miniature"), 1);
        assert!(converted.text.contains(r#"href="https://blog.test/checklist"><strong>Checklist</strong>"#));
    }
}
