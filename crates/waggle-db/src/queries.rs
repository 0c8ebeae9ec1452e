use crate::Database;
use crate::models::{MatchRow, MessageRow, PetRow, PhotoRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Inserts a user row. Returns false when the email is already taken —
    /// the UNIQUE constraint decides, so concurrent registrations cannot
    /// both win.
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, name, email, password) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, name, email, password_hash],
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn update_user_profile(
        &self,
        id: &str,
        name: &str,
        bio: Option<&str>,
        has_pet: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET name = ?2, bio = ?3, has_pet = ?4 WHERE id = ?1",
                rusqlite::params![id, name, bio, has_pet],
            )?;
            Ok(())
        })
    }

    pub fn set_user_has_pet(&self, id: &str, has_pet: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET has_pet = ?2 WHERE id = ?1",
                rusqlite::params![id, has_pet],
            )?;
            Ok(())
        })
    }

    /// Deletes the user row; pets, photos, swipes, matches and messages go
    /// with it via FK cascade. Blob cleanup is the caller's job beforehand.
    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn discover_candidates(
        &self,
        user_id: &str,
        excluded: &[String],
        species: Option<&str>,
    ) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| query_discover_candidates(conn, user_id, excluded, species))
    }

    // -- Pets --

    pub fn insert_pet(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
        species: &str,
        age: i64,
        gender: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO pets (id, user_id, name, species, age, gender) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, name, species, age, gender],
            )?;
            Ok(())
        })
    }

    pub fn pets_for_user(&self, user_id: &str) -> Result<Vec<PetRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, species, age, gender, created_at FROM pets
                 WHERE user_id = ?1
                 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([user_id], pet_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_pet(&self, id: &str) -> Result<Option<PetRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, name, species, age, gender, created_at FROM pets WHERE id = ?1",
                [id],
                pet_from_row,
            )
            .optional()
        })
    }

    pub fn delete_pet(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM pets WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Photos --

    pub fn insert_photo(
        &self,
        id: &str,
        file_name: &str,
        content_type: &str,
        storage_id: &str,
        user_id: Option<&str>,
        pet_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO photos (id, file_name, content_type, storage_id, user_id, pet_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, file_name, content_type, storage_id, user_id, pet_id],
            )?;
            Ok(())
        })
    }

    pub fn get_photo(&self, id: &str) -> Result<Option<PhotoRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, file_name, content_type, storage_id, user_id, pet_id, uploaded_at
                 FROM photos WHERE id = ?1",
                [id],
                photo_from_row,
            )
            .optional()
        })
    }

    pub fn photo_ids_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM photos WHERE user_id = ?1 ORDER BY rowid")?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn photo_ids_for_pet(&self, pet_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM photos WHERE pet_id = ?1 ORDER BY rowid")?;
            let rows = stmt
                .query_map([pet_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_photo(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM photos WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Storage ids of every photo owned by the user directly or through one
    /// of their pets. Collected before row deletion so blobs can be removed.
    pub fn storage_ids_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT storage_id FROM photos
                 WHERE user_id = ?1
                    OR pet_id IN (SELECT id FROM pets WHERE user_id = ?1)",
            )?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn storage_ids_for_pet(&self, pet_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT storage_id FROM photos WHERE pet_id = ?1")?;
            let rows = stmt
                .query_map([pet_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Swipes & matches --

    /// Records one swipe and evaluates its match consequences in a single
    /// transaction.
    ///
    /// On a like, the most recent reciprocal swipe decides: if it is a like,
    /// the match row for the pair is inserted (or re-confirmed) and its id
    /// returned. On a pass, a confirmed match for the pair is flipped to
    /// unconfirmed; the row is kept. `match_id` is used only if a new match
    /// row is inserted.
    pub fn apply_swipe(
        &self,
        swipe_id: &str,
        match_id: &str,
        swiper_id: &str,
        target_id: &str,
        liked: bool,
    ) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO swipes (id, swiper_id, target_id, liked) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![swipe_id, swiper_id, target_id, liked],
            )?;

            let (lo, hi) = ordered_pair(swiper_id, target_id);

            let confirmed_match_id = if liked {
                // Timestamps have second resolution; rowid breaks ties in
                // insert order.
                let reciprocal: Option<bool> = tx
                    .query_row(
                        "SELECT liked FROM swipes
                         WHERE swiper_id = ?1 AND target_id = ?2
                         ORDER BY swiped_at DESC, rowid DESC
                         LIMIT 1",
                        [target_id, swiper_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                if reciprocal == Some(true) {
                    let id: String = tx.query_row(
                        "INSERT INTO matches (id, user_lo, user_hi, confirmed) VALUES (?1, ?2, ?3, 1)
                         ON CONFLICT(user_lo, user_hi) DO UPDATE SET confirmed = 1
                         RETURNING id",
                        [match_id, lo, hi],
                        |row| row.get(0),
                    )?;
                    Some(id)
                } else {
                    None
                }
            } else {
                tx.execute(
                    "UPDATE matches SET confirmed = 0
                     WHERE user_lo = ?1 AND user_hi = ?2 AND confirmed = 1",
                    [lo, hi],
                )?;
                None
            };

            tx.commit()?;
            Ok(confirmed_match_id)
        })
    }

    /// Targets hidden from discovery: everyone this user ever liked, plus
    /// everyone passed within the last `reappear_days`.
    pub fn excluded_target_ids(&self, swiper_id: &str, reappear_days: u32) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT target_id FROM swipes
                 WHERE swiper_id = ?1
                   AND (liked = 1 OR swiped_at >= datetime('now', '-' || ?2 || ' days'))",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![swiper_id, reappear_days], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn matches_for_user(&self, user_id: &str) -> Result<Vec<MatchRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_lo, user_hi, confirmed, created_at FROM matches
                 WHERE (user_lo = ?1 OR user_hi = ?1) AND confirmed = 1
                 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([user_id], match_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_match(&self, id: &str) -> Result<Option<MatchRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_lo, user_hi, confirmed, created_at FROM matches WHERE id = ?1",
                [id],
                match_from_row,
            )
            .optional()
        })
    }

    pub fn confirmed_match_exists(&self, user_a: &str, user_b: &str) -> Result<bool> {
        let (lo, hi) = ordered_pair(user_a, user_b);
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM matches WHERE user_lo = ?1 AND user_hi = ?2 AND confirmed = 1",
                    [lo, hi],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Messages --

    /// Inserts a message with a server-assigned timestamp and returns the
    /// stored row.
    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let row = conn.query_row(
                "INSERT INTO messages (id, sender_id, recipient_id, content) VALUES (?1, ?2, ?3, ?4)
                 RETURNING id, sender_id, recipient_id, content, sent_at, read",
                rusqlite::params![id, sender_id, recipient_id, content],
                message_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn messages_between(&self, user_a: &str, user_b: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, recipient_id, content, sent_at, read FROM messages
                 WHERE (sender_id = ?1 AND recipient_id = ?2)
                    OR (sender_id = ?2 AND recipient_id = ?1)
                 ORDER BY sent_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([user_a, user_b], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, sender_id, recipient_id, content, sent_at, read FROM messages WHERE id = ?1",
                [id],
                message_from_row,
            )
            .optional()
        })
    }

    pub fn mark_message_read(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE messages SET read = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

/// Normalizes an unordered user pair to the (user_lo, user_hi) storage order.
fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a < b { (a, b) } else { (b, a) }
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, password, bio, has_pet, created_at FROM users WHERE email = ?1",
    )?;

    let row = stmt.query_row([email], user_from_row).optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, password, bio, has_pet, created_at FROM users WHERE id = ?1",
    )?;

    let row = stmt.query_row([id], user_from_row).optional()?;

    Ok(row)
}

fn query_discover_candidates(
    conn: &Connection,
    user_id: &str,
    excluded: &[String],
    species: Option<&str>,
) -> Result<Vec<UserRow>> {
    let mut sql = String::from(
        "SELECT id, name, email, password, bio, has_pet, created_at FROM users WHERE id != ?1",
    );
    let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];

    if !excluded.is_empty() {
        let placeholders: Vec<String> = (2..=excluded.len() + 1).map(|i| format!("?{}", i)).collect();
        sql.push_str(&format!(" AND id NOT IN ({})", placeholders.join(", ")));
        params.extend(excluded.iter().map(|id| id as &dyn rusqlite::types::ToSql));
    }

    if species.is_some() {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM pets
                WHERE pets.user_id = users.id AND lower(pets.species) = lower(?{}))",
            params.len() + 1
        ));
        params.push(&species);
    }

    sql.push_str(" ORDER BY rowid");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params.as_slice(), user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        bio: row.get(4)?,
        has_pet: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn pet_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PetRow> {
    Ok(PetRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        species: row.get(3)?,
        age: row.get(4)?,
        gender: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn photo_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PhotoRow> {
    Ok(PhotoRow {
        id: row.get(0)?,
        file_name: row.get(1)?,
        content_type: row.get(2)?,
        storage_id: row.get(3)?,
        user_id: row.get(4)?,
        pet_id: row.get(5)?,
        uploaded_at: row.get(6)?,
    })
}

fn match_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MatchRow> {
    Ok(MatchRow {
        id: row.get(0)?,
        user_lo: row.get(1)?,
        user_hi: row.get(2)?,
        confirmed: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        content: row.get(3)?,
        sent_at: row.get(4)?,
        read: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn open_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn add_user(db: &Database, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, name, &format!("{}@example.com", name), "hash")
            .unwrap();
        id
    }

    fn add_pet(db: &Database, user_id: &str, species: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_pet(&id, user_id, "Rex", species, 3, None).unwrap();
        id
    }

    fn swipe(db: &Database, swiper: &str, target: &str, liked: bool) -> Option<String> {
        db.apply_swipe(
            &Uuid::new_v4().to_string(),
            &Uuid::new_v4().to_string(),
            swiper,
            target,
            liked,
        )
        .unwrap()
    }

    fn send(db: &Database, sender: &str, recipient: &str, content: &str) -> MessageRow {
        db.insert_message(&Uuid::new_v4().to_string(), sender, recipient, content)
            .unwrap()
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?)
        })
        .unwrap()
    }

    #[test]
    fn mutual_like_confirms_exactly_one_match() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");

        assert_eq!(swipe(&db, &a, &b, true), None);
        let match_id = swipe(&db, &b, &a, true).expect("mutual like should confirm");
        assert_eq!(count(&db, "matches"), 1);

        // A repeat like lands on the same row.
        assert_eq!(swipe(&db, &a, &b, true), Some(match_id));
        assert_eq!(count(&db, "matches"), 1);
        assert_eq!(count(&db, "swipes"), 3);
    }

    #[test]
    fn pass_unconfirms_but_keeps_the_row() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");

        swipe(&db, &a, &b, true);
        let match_id = swipe(&db, &b, &a, true).unwrap();

        assert_eq!(swipe(&db, &a, &b, false), None);
        let row = db.get_match(&match_id).unwrap().unwrap();
        assert!(!row.confirmed);
        assert_eq!(count(&db, "matches"), 1);
        assert!(!db.confirmed_match_exists(&a, &b).unwrap());

        // A later re-like flips the same row back.
        assert_eq!(swipe(&db, &a, &b, true), Some(match_id.clone()));
        assert!(db.get_match(&match_id).unwrap().unwrap().confirmed);
        assert!(db.confirmed_match_exists(&b, &a).unwrap());
        assert_eq!(count(&db, "matches"), 1);
    }

    #[test]
    fn pass_without_match_is_a_no_op() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");

        assert_eq!(swipe(&db, &a, &b, false), None);
        assert_eq!(count(&db, "matches"), 0);
        assert_eq!(count(&db, "swipes"), 1);
    }

    #[test]
    fn latest_reciprocal_swipe_decides() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");

        swipe(&db, &b, &a, true);
        swipe(&db, &b, &a, false);

        // b's latest word on a is a pass, so a's like confirms nothing.
        assert_eq!(swipe(&db, &a, &b, true), None);

        // Once b likes again, the match confirms.
        assert!(swipe(&db, &b, &a, true).is_some());
    }

    #[test]
    fn exclusions_keep_likes_forever_and_expire_passes() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");
        let c = add_user(&db, "cleo");
        let d = add_user(&db, "dot");

        swipe(&db, &a, &b, true); // like, backdated below
        swipe(&db, &a, &c, false); // recent pass
        swipe(&db, &a, &d, false); // pass, backdated below

        db.with_conn(|conn| {
            conn.execute(
                "UPDATE swipes SET swiped_at = datetime('now', '-100 days')
                 WHERE swiper_id = ?1 AND target_id IN (?2, ?3)",
                rusqlite::params![a, b, d],
            )?;
            Ok(())
        })
        .unwrap();

        let excluded = db.excluded_target_ids(&a, 90).unwrap();
        assert!(excluded.contains(&b), "old like must still exclude");
        assert!(excluded.contains(&c), "recent pass must exclude");
        assert!(!excluded.contains(&d), "aged-out pass must reappear");
    }

    #[test]
    fn discover_candidates_filter_by_species_case_insensitively() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");
        let c = add_user(&db, "cleo");
        let d = add_user(&db, "dot");
        add_pet(&db, &b, "Dog");
        add_pet(&db, &c, "cat");

        let ids: Vec<String> = db
            .discover_candidates(&a, &[], Some("dog"))
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![b.clone()]);

        let ids: Vec<String> = db
            .discover_candidates(&a, &[], None)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![b.clone(), c.clone(), d.clone()]);

        let ids: Vec<String> = db
            .discover_candidates(&a, &[c.clone()], None)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![b, d]);
    }

    #[test]
    fn message_history_ascends_regardless_of_side() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");

        send(&db, &a, &b, "first");
        send(&db, &b, &a, "second");
        send(&db, &a, &b, "third");

        let contents: Vec<String> = db
            .messages_between(&a, &b)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);

        let flipped: Vec<String> = db
            .messages_between(&b, &a)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(flipped, contents);
    }

    #[test]
    fn mark_message_read_flips_the_flag() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");

        let message = send(&db, &a, &b, "hello");
        assert!(!message.read);

        db.mark_message_read(&message.id).unwrap();
        assert!(db.get_message(&message.id).unwrap().unwrap().read);
    }

    #[test]
    fn deleting_a_user_cascades_to_everything_they_touch() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let b = add_user(&db, "brie");
        let pet = add_pet(&db, &a, "Dog");

        db.insert_photo(
            &Uuid::new_v4().to_string(),
            "me.jpg",
            "image/jpeg",
            &Uuid::new_v4().to_string(),
            Some(&a),
            None,
        )
        .unwrap();
        db.insert_photo(
            &Uuid::new_v4().to_string(),
            "rex.png",
            "image/png",
            &Uuid::new_v4().to_string(),
            None,
            Some(&pet),
        )
        .unwrap();

        swipe(&db, &a, &b, true);
        swipe(&db, &b, &a, true);
        send(&db, &a, &b, "hi");
        send(&db, &b, &a, "hey");

        db.delete_user(&a).unwrap();

        assert_eq!(count(&db, "users"), 1);
        assert_eq!(count(&db, "pets"), 0);
        assert_eq!(count(&db, "photos"), 0);
        assert_eq!(count(&db, "swipes"), 0);
        assert_eq!(count(&db, "matches"), 0);
        assert_eq!(count(&db, "messages"), 0);
    }

    #[test]
    fn storage_ids_cover_user_and_pet_photos() {
        let (_dir, db) = open_db();
        let a = add_user(&db, "ada");
        let pet = add_pet(&db, &a, "Dog");

        let user_blob = Uuid::new_v4().to_string();
        let pet_blob = Uuid::new_v4().to_string();
        db.insert_photo(
            &Uuid::new_v4().to_string(),
            "me.jpg",
            "image/jpeg",
            &user_blob,
            Some(&a),
            None,
        )
        .unwrap();
        db.insert_photo(
            &Uuid::new_v4().to_string(),
            "rex.png",
            "image/png",
            &pet_blob,
            None,
            Some(&pet),
        )
        .unwrap();

        let mut ids = db.storage_ids_for_user(&a).unwrap();
        ids.sort();
        let mut expected = vec![user_blob, pet_blob.clone()];
        expected.sort();
        assert_eq!(ids, expected);

        assert_eq!(db.storage_ids_for_pet(&pet).unwrap(), vec![pet_blob]);
    }

    #[test]
    fn duplicate_email_is_reported_not_raised() {
        let (_dir, db) = open_db();
        let ada = add_user(&db, "ada");

        let id = Uuid::new_v4().to_string();
        assert!(
            !db.create_user(&id, "other", "ada@example.com", "hash")
                .unwrap()
        );

        // The loser leaves no trace; the original row stands.
        let row = db.get_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(row.id, ada);
        assert_eq!(count(&db, "users"), 1);
    }

    #[test]
    fn ordered_pair_is_direction_independent() {
        assert_eq!(ordered_pair("b", "a"), ("a", "b"));
        assert_eq!(ordered_pair("a", "b"), ("a", "b"));
    }
}
