use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_initial_schema")
        // users
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email_address TEXT NOT NULL,
    password_digest TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    email_address TEXT NOT NULL,
    password_digest TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                ),
        )
        // sessions
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token TEXT NOT NULL,
    ip_address TEXT,
    user_agent TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS sessions (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token TEXT NOT NULL,
    ip_address TEXT,
    user_agent TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                ),
        )
        // sites
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    primary_url TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS sites (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    primary_url TEXT NOT NULL,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                ),
        )
        // documents - PDF metadata and the four workflow statuses
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    url TEXT NOT NULL,
    file_size INTEGER,
    source TEXT,
    document_status TEXT NOT NULL DEFAULT 'discovered',
    classification_status TEXT NOT NULL DEFAULT 'classification_pending',
    policy_review_status TEXT NOT NULL DEFAULT 'policy_pending',
    recommendation_status TEXT NOT NULL DEFAULT 'recommendation_pending',
    document_category TEXT DEFAULT 'Unknown',
    accessibility_recommendation TEXT DEFAULT 'Unknown',
    title TEXT,
    author TEXT,
    subject TEXT,
    keywords TEXT,
    creation_date TEXT,
    modification_date TEXT,
    producer TEXT,
    pdf_version TEXT,
    number_of_pages INTEGER,
    last_modified TEXT,
    recommended_category TEXT,
    category_confidence REAL,
    approved_category TEXT,
    changed_category TEXT,
    recommended_accessibility_action TEXT,
    accessibility_confidence REAL,
    approved_accessibility_action TEXT,
    changed_accessibility_action TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS documents (
    id BIGSERIAL PRIMARY KEY,
    site_id BIGINT NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    url TEXT NOT NULL,
    file_size BIGINT,
    source TEXT,
    document_status TEXT NOT NULL DEFAULT 'discovered',
    classification_status TEXT NOT NULL DEFAULT 'classification_pending',
    policy_review_status TEXT NOT NULL DEFAULT 'policy_pending',
    recommendation_status TEXT NOT NULL DEFAULT 'recommendation_pending',
    document_category TEXT DEFAULT 'Unknown',
    accessibility_recommendation TEXT DEFAULT 'Unknown',
    title TEXT,
    author TEXT,
    subject TEXT,
    keywords TEXT,
    creation_date TEXT,
    modification_date TEXT,
    producer TEXT,
    pdf_version TEXT,
    number_of_pages INTEGER,
    last_modified TEXT,
    recommended_category TEXT,
    category_confidence DOUBLE PRECISION,
    approved_category TEXT,
    changed_category TEXT,
    recommended_accessibility_action TEXT,
    accessibility_confidence DOUBLE PRECISION,
    approved_accessibility_action TEXT,
    changed_accessibility_action TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                ),
        )
        // document_workflow_histories
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE IF NOT EXISTS document_workflow_histories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    status_type TEXT NOT NULL,
    from_status TEXT NOT NULL,
    to_status TEXT NOT NULL,
    action_type TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS document_workflow_histories (
    id BIGSERIAL PRIMARY KEY,
    document_id BIGINT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
    status_type TEXT NOT NULL,
    from_status TEXT NOT NULL,
    to_status TEXT NOT NULL,
    action_type TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
                ),
        )
}
