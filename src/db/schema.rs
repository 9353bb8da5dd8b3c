diesel::table! {
    comments (id) {
        id -> Uuid,
        content -> Text,
        video_id -> Uuid,
        owner_id -> Uuid,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    likes (id) {
        id -> Uuid,
        liked_by -> Uuid,
        video_id -> Nullable<Uuid>,
        comment_id -> Nullable<Uuid>,
        tweet_id -> Nullable<Uuid>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    playlists (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Text,
        created_by -> Uuid,
        videos -> Array<Uuid>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    subscriptions (id) {
        id -> Uuid,
        subscriber_id -> Uuid,
        channel_id -> Uuid,
        created_at -> Timestamp,
    }
}

diesel::table! {
    tweets (id) {
        id -> Uuid,
        content -> Text,
        tweet_image -> Varchar,
        tweet_image_public_id -> Varchar,
        owner_id -> Uuid,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Varchar,
        full_name -> Varchar,
        avatar -> Varchar,
        avatar_public_id -> Varchar,
        cover_image -> Varchar,
        cover_image_public_id -> Varchar,
        watch_history -> Array<Uuid>,
        password -> Varchar,
        refresh_token -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    videos (id) {
        id -> Uuid,
        video_file -> Varchar,
        video_public_id -> Varchar,
        thumbnail -> Varchar,
        thumbnail_public_id -> Varchar,
        title -> Varchar,
        description -> Text,
        duration -> Float8,
        views -> Int4,
        is_published -> Bool,
        owner_id -> Uuid,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    comments,
    likes,
    playlists,
    subscriptions,
    tweets,
    users,
    videos,
);
