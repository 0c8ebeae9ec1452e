/// Database row types — these map directly to SQLite rows.
/// Distinct from waggle-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub has_pet: bool,
    pub created_at: String,
}

pub struct PetRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub species: String,
    pub age: i64,
    pub gender: Option<String>,
    pub created_at: String,
}

pub struct PhotoRow {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub storage_id: String,
    pub user_id: Option<String>,
    pub pet_id: Option<String>,
    pub uploaded_at: String,
}

pub struct MatchRow {
    pub id: String,
    pub user_lo: String,
    pub user_hi: String,
    pub confirmed: bool,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub sent_at: String,
    pub read: bool,
}
