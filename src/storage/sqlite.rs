//! SQLite storage backend implementation
//!
//! Pooled rusqlite connections (deadpool-sqlite); blocking statements run on
//! the pool's worker threads via `interact`.

use crate::error::{LearnPalError, Result};
use crate::storage::{schema::SCHEMA, TutorStore};
use crate::types::{
    Concept, Feedback, Learner, NewFeedback, NewLearner, Plan, Progress, ProgressSummary, Tenant,
    STARTER_CONCEPTS,
};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite storage backend
pub struct SqliteStore {
    pool: Pool,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and apply the schema
    ///
    /// # Example
    /// ```ignore
    /// let store = SqliteStore::open("learnpal.db").await?;
    /// ```
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Opening SQLite database: {}", path.display());

        let pool = Config::new(path.clone())
            .create_pool(Runtime::Tokio1)
            .map_err(|e| {
                LearnPalError::Database(format!("Failed to create connection pool: {}", e))
            })?;

        let store = Self { pool, path };
        store
            .interact(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;

        debug!("Schema applied to {}", store.path.display());
        Ok(store)
    }

    /// Database file backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on a pooled connection
    async fn interact<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.get().await.map_err(|e| {
            LearnPalError::Database(format!("Failed to get connection from pool: {}", e))
        })?;

        conn.interact(move |conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            f(conn)
        })
        .await
        .map_err(|e| LearnPalError::Database(format!("Pool interaction failed: {}", e)))?
    }
}

fn row_to_tenant(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    let plan: String = row.get("plan")?;
    Ok(Tenant {
        id: row.get("id")?,
        name: row.get("name")?,
        plan: Plan::parse(&plan),
    })
}

fn row_to_learner(row: &Row<'_>) -> rusqlite::Result<Learner> {
    Ok(Learner {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        name: row.get("name")?,
        dob: row.get("dob")?,
        persona_json: row.get("persona_json")?,
    })
}

fn row_to_concept(row: &Row<'_>) -> rusqlite::Result<Concept> {
    Ok(Concept {
        id: row.get("id")?,
        domain: row.get("domain")?,
        label: row.get("label")?,
        grade: row.get("grade")?,
    })
}

fn row_to_progress(row: &Row<'_>) -> rusqlite::Result<Progress> {
    Ok(Progress {
        learner_id: row.get("learner_id")?,
        concept_id: row.get("concept_id")?,
        correct: row.get::<_, i64>("correct")? as u64,
        attempts: row.get::<_, i64>("attempts")? as u64,
    })
}

#[async_trait]
impl TutorStore for SqliteStore {
    async fn create_tenant(&self, name: &str, plan: Plan) -> Result<Tenant> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(LearnPalError::InvalidInput(
                "tenant name must not be empty".to_string(),
            ));
        }

        self.interact(move |conn| {
            conn.execute(
                "INSERT INTO tenants (name, plan) VALUES (?1, ?2)",
                params![name, plan.as_str()],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Created tenant {}", id);
            Ok(Tenant { id, name, plan })
        })
        .await
    }

    async fn get_tenant(&self, id: i64) -> Result<Option<Tenant>> {
        self.interact(move |conn| {
            let tenant = conn
                .query_row(
                    "SELECT id, name, plan FROM tenants WHERE id = ?1",
                    params![id],
                    row_to_tenant,
                )
                .optional()?;
            Ok(tenant)
        })
        .await
    }

    async fn create_learner(&self, tenant_id: i64, learner: &NewLearner) -> Result<Learner> {
        learner.validate()?;
        let name = learner.name.trim().to_string();
        let dob = learner.dob.trim().to_string();

        self.interact(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM tenants WHERE id = ?1)",
                params![tenant_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(LearnPalError::Forbidden(format!(
                    "tenant {} does not exist",
                    tenant_id
                )));
            }

            conn.execute(
                "INSERT INTO learners (tenant_id, name, dob) VALUES (?1, ?2, ?3)",
                params![tenant_id, name, dob],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Created learner {} for tenant {}", id, tenant_id);
            Ok(Learner {
                id,
                tenant_id,
                name,
                dob,
                persona_json: "{}".to_string(),
            })
        })
        .await
    }

    async fn get_learner(&self, id: i64) -> Result<Option<Learner>> {
        self.interact(move |conn| {
            let learner = conn
                .query_row(
                    "SELECT id, tenant_id, name, dob, persona_json FROM learners WHERE id = ?1",
                    params![id],
                    row_to_learner,
                )
                .optional()?;
            Ok(learner)
        })
        .await
    }

    async fn list_learners(&self, tenant_id: i64) -> Result<Vec<Learner>> {
        self.interact(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, name, dob, persona_json FROM learners
                 WHERE tenant_id = ?1 ORDER BY id",
            )?;
            let learners = stmt
                .query_map(params![tenant_id], row_to_learner)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(learners)
        })
        .await
    }

    async fn get_concept(&self, id: i64) -> Result<Option<Concept>> {
        self.interact(move |conn| {
            let concept = conn
                .query_row(
                    "SELECT id, domain, label, grade FROM concepts WHERE id = ?1",
                    params![id],
                    row_to_concept,
                )
                .optional()?;
            Ok(concept)
        })
        .await
    }

    async fn concept_by_label(&self, label: &str) -> Result<Option<Concept>> {
        let label = label.to_string();
        self.interact(move |conn| {
            let concept = conn
                .query_row(
                    "SELECT id, domain, label, grade FROM concepts WHERE label = ?1
                     ORDER BY id LIMIT 1",
                    params![label],
                    row_to_concept,
                )
                .optional()?;
            Ok(concept)
        })
        .await
    }

    async fn ensure_concept(&self, domain: &str, label: &str, grade: &str) -> Result<Concept> {
        let (domain, label, grade) = (domain.to_string(), label.to_string(), grade.to_string());
        self.interact(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing = tx
                .query_row(
                    "SELECT id, domain, label, grade FROM concepts WHERE label = ?1
                     ORDER BY id LIMIT 1",
                    params![label],
                    row_to_concept,
                )
                .optional()?;

            let concept = match existing {
                Some(concept) => concept,
                None => {
                    tx.execute(
                        "INSERT INTO concepts (domain, label, grade) VALUES (?1, ?2, ?3)",
                        params![domain, label, grade],
                    )?;
                    info!("Bootstrapped concept {:?}", label);
                    Concept {
                        id: tx.last_insert_rowid(),
                        domain,
                        label,
                        grade,
                    }
                }
            };
            tx.commit()?;
            Ok(concept)
        })
        .await
    }

    async fn seed_concepts(&self) -> Result<usize> {
        self.interact(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let count: i64 = tx.query_row("SELECT COUNT(*) FROM concepts", [], |row| row.get(0))?;
            if count > 0 {
                return Ok(0);
            }

            for (domain, label, grade) in STARTER_CONCEPTS {
                tx.execute(
                    "INSERT INTO concepts (domain, label, grade) VALUES (?1, ?2, ?3)",
                    params![domain, label, grade],
                )?;
            }
            tx.commit()?;
            info!("Seeded {} starter concepts", STARTER_CONCEPTS.len());
            Ok(STARTER_CONCEPTS.len())
        })
        .await
    }

    async fn list_concepts(&self) -> Result<Vec<Concept>> {
        self.interact(|conn| {
            let mut stmt = conn.prepare("SELECT id, domain, label, grade FROM concepts ORDER BY id")?;
            let concepts = stmt
                .query_map([], row_to_concept)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(concepts)
        })
        .await
    }

    async fn record_attempt(
        &self,
        learner_id: i64,
        concept_id: i64,
        correct: bool,
    ) -> Result<Progress> {
        let gained = i64::from(correct);
        self.interact(move |conn| {
            let progress = conn.query_row(
                r#"
                INSERT INTO progress (learner_id, concept_id, correct, attempts)
                VALUES (?1, ?2, ?3, 1)
                ON CONFLICT(learner_id, concept_id) DO UPDATE SET
                    attempts = attempts + 1,
                    correct = correct + excluded.correct
                RETURNING learner_id, concept_id, correct, attempts
                "#,
                params![learner_id, concept_id, gained],
                row_to_progress,
            )?;
            Ok(progress)
        })
        .await
    }

    async fn get_progress(&self, learner_id: i64, concept_id: i64) -> Result<Option<Progress>> {
        self.interact(move |conn| {
            let progress = conn
                .query_row(
                    "SELECT learner_id, concept_id, correct, attempts FROM progress
                     WHERE learner_id = ?1 AND concept_id = ?2",
                    params![learner_id, concept_id],
                    row_to_progress,
                )
                .optional()?;
            Ok(progress)
        })
        .await
    }

    async fn progress_report(&self, learner_id: i64) -> Result<BTreeMap<String, ProgressSummary>> {
        self.interact(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.label, p.correct, p.attempts
                 FROM progress p JOIN concepts c ON c.id = p.concept_id
                 WHERE p.learner_id = ?1",
            )?;
            let rows = stmt.query_map(params![learner_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    ProgressSummary {
                        correct: row.get::<_, i64>(1)? as u64,
                        attempts: row.get::<_, i64>(2)? as u64,
                    },
                ))
            })?;

            let mut report = BTreeMap::new();
            for row in rows {
                let (label, summary) = row?;
                report.insert(label, summary);
            }
            Ok(report)
        })
        .await
    }

    async fn record_feedback(&self, feedback: &NewFeedback) -> Result<Feedback> {
        let (latency_ms, rating) = feedback.validate()?;
        let learner_id = feedback.learner_id;
        let created = Utc::now();

        self.interact(move |conn| {
            conn.execute(
                "INSERT INTO feedback (learner_id, latency_ms, rating, created)
                 VALUES (?1, ?2, ?3, ?4)",
                params![learner_id, latency_ms as i64, rating, created.to_rfc3339()],
            )?;
            Ok(Feedback {
                id: conn.last_insert_rowid(),
                learner_id,
                latency_ms,
                rating,
                created,
            })
        })
        .await
    }
}
