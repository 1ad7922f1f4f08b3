//! Embedded database schema
//!
//! Applied on every open; every statement is idempotent.

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Tenants Table
CREATE TABLE IF NOT EXISTS tenants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    plan TEXT NOT NULL DEFAULT 'free' CHECK(plan IN ('free', 'family', 'school'))
);

-- Learners Table
CREATE TABLE IF NOT EXISTS learners (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    dob TEXT NOT NULL,
    persona_json TEXT NOT NULL DEFAULT '{}',
    FOREIGN KEY (tenant_id) REFERENCES tenants(id)
);

-- Concepts Table
CREATE TABLE IF NOT EXISTS concepts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL,
    label TEXT NOT NULL,
    grade TEXT NOT NULL
);

-- Progress Table (one accumulator per learner and concept)
CREATE TABLE IF NOT EXISTS progress (
    learner_id INTEGER NOT NULL,
    concept_id INTEGER NOT NULL,
    correct INTEGER NOT NULL DEFAULT 0 CHECK(correct >= 0),
    attempts INTEGER NOT NULL DEFAULT 0 CHECK(attempts >= correct),
    PRIMARY KEY (learner_id, concept_id),
    FOREIGN KEY (learner_id) REFERENCES learners(id),
    FOREIGN KEY (concept_id) REFERENCES concepts(id)
);

-- Feedback Table
CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    learner_id INTEGER NOT NULL,
    latency_ms INTEGER NOT NULL CHECK(latency_ms >= 0),
    rating INTEGER NOT NULL CHECK(rating IN (-1, 1)),
    created TEXT NOT NULL,
    FOREIGN KEY (learner_id) REFERENCES learners(id)
);

CREATE INDEX IF NOT EXISTS idx_learners_tenant ON learners(tenant_id);
CREATE INDEX IF NOT EXISTS idx_concepts_label ON concepts(label);
CREATE INDEX IF NOT EXISTS idx_feedback_learner ON feedback(learner_id);
CREATE INDEX IF NOT EXISTS idx_feedback_created ON feedback(created);
"#;
