use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0003_constraints")
        .depends_on(&["0002_document_triage"])
        .operation(AddIndex::new(
            "users",
            Index::new("idx_users_email_address")
                .column("email_address")
                .unique(),
        ))
        .operation(AddIndex::new(
            "sessions",
            Index::new("idx_sessions_token").column("token").unique(),
        ))
        .operation(AddIndex::new(
            "sessions",
            Index::new("idx_sessions_user_id").column("user_id"),
        ))
        .operation(AddIndex::new(
            "sites",
            Index::new("idx_sites_user_primary_url")
                .column("user_id")
                .column("primary_url")
                .unique(),
        ))
        .operation(AddIndex::new(
            "sites",
            Index::new("idx_sites_user_location_name")
                .column("user_id")
                .column("location")
                .column("name")
                .unique(),
        ))
        .operation(AddIndex::new(
            "documents",
            Index::new("idx_documents_site_id").column("site_id"),
        ))
        .operation(AddIndex::new(
            "documents",
            Index::new("idx_documents_site_url")
                .column("site_id")
                .column("url"),
        ))
        .operation(AddIndex::new(
            "documents",
            Index::new("idx_documents_modification_date").column("modification_date"),
        ))
        .operation(AddIndex::new(
            "document_workflow_histories",
            Index::new("idx_workflow_histories_document_id").column("document_id"),
        ))
        .operation(AddIndex::new(
            "document_workflow_histories",
            Index::new("idx_workflow_histories_user_id").column("user_id"),
        ))
}
