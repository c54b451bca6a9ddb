// Kept in sync with the cetane migrations under src/migrations.
// Timestamps are stored as RFC 3339 text so both backends sort them alike.

diesel::table! {
    users (id) {
        id -> BigInt,
        email_address -> Text,
        password_digest -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    sessions (id) {
        id -> BigInt,
        user_id -> BigInt,
        token -> Text,
        ip_address -> Nullable<Text>,
        user_agent -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    sites (id) {
        id -> BigInt,
        name -> Text,
        location -> Text,
        primary_url -> Text,
        user_id -> BigInt,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    documents (id) {
        id -> BigInt,
        site_id -> BigInt,
        file_name -> Text,
        url -> Text,
        file_size -> Nullable<BigInt>,
        source -> Nullable<Text>,
        document_status -> Text,
        classification_status -> Text,
        policy_review_status -> Text,
        recommendation_status -> Text,
        status -> Nullable<Text>,
        document_category -> Nullable<Text>,
        document_category_confidence -> Nullable<Double>,
        accessibility_recommendation -> Nullable<Text>,
        accessibility_action -> Nullable<Text>,
        action_taken_on -> Nullable<Text>,
        title -> Nullable<Text>,
        author -> Nullable<Text>,
        subject -> Nullable<Text>,
        keywords -> Nullable<Text>,
        creation_date -> Nullable<Text>,
        modification_date -> Nullable<Text>,
        producer -> Nullable<Text>,
        pdf_version -> Nullable<Text>,
        number_of_pages -> Nullable<Integer>,
        last_modified -> Nullable<Text>,
        recommended_category -> Nullable<Text>,
        category_confidence -> Nullable<Double>,
        approved_category -> Nullable<Text>,
        changed_category -> Nullable<Text>,
        recommended_accessibility_action -> Nullable<Text>,
        accessibility_confidence -> Nullable<Double>,
        approved_accessibility_action -> Nullable<Text>,
        changed_accessibility_action -> Nullable<Text>,
        notes -> Nullable<Text>,
        summary -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    document_workflow_histories (id) {
        id -> BigInt,
        document_id -> BigInt,
        user_id -> Nullable<BigInt>,
        status_type -> Text,
        from_status -> Text,
        to_status -> Text,
        action_type -> Text,
        metadata -> Text,
        notes -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::joinable!(sessions -> users (user_id));
diesel::joinable!(sites -> users (user_id));
diesel::joinable!(documents -> sites (site_id));
diesel::joinable!(document_workflow_histories -> documents (document_id));
diesel::joinable!(document_workflow_histories -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    document_workflow_histories,
    documents,
    sessions,
    sites,
    users,
);
