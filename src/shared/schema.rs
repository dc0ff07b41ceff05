diesel::table! {
    categories (id) {
        id -> Uuid,
        name -> Text,
        slug -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tickets (id) {
        id -> Uuid,
        user_id -> Nullable<Uuid>,
        category_id -> Uuid,
        kind -> Text,
        priority -> Text,
        status -> Text,
        name -> Text,
        email -> Text,
        subject -> Text,
        message -> Text,
        answer -> Text,
        is_answered -> Bool,
        is_anonymous -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    ticket_comments (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        author_name -> Text,
        body -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    ticket_ratings (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        score -> Int4,
        rater_name -> Text,
        comment -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Text,
        email -> Text,
        password_hash -> Text,
        is_staff -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(tickets -> categories (category_id));
diesel::joinable!(tickets -> users (user_id));
diesel::joinable!(ticket_comments -> tickets (ticket_id));
diesel::joinable!(ticket_ratings -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(
    categories,
    tickets,
    ticket_comments,
    ticket_ratings,
    users,
);
