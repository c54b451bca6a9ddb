use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_document_triage")
        .depends_on(&["0001_initial_schema"])
        .operation(AddField::new("documents", Field::new("status", FieldType::Text)))
        .operation(AddField::new(
            "documents",
            Field::new("accessibility_action", FieldType::Text),
        ))
        .operation(AddField::new(
            "documents",
            Field::new("action_taken_on", FieldType::Text),
        ))
        .operation(AddField::new("documents", Field::new("notes", FieldType::Text)))
        .operation(AddField::new("documents", Field::new("summary", FieldType::Text)))
        // Floating point column type differs per backend
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "ALTER TABLE documents ADD COLUMN document_category_confidence REAL",
                )
                .for_backend(
                    "postgres",
                    "ALTER TABLE documents ADD COLUMN IF NOT EXISTS document_category_confidence DOUBLE PRECISION",
                ),
        )
        .operation(AddIndex::new(
            "documents",
            Index::new("idx_documents_status").column("status"),
        ))
}
