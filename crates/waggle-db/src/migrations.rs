use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            bio         TEXT,
            has_pet     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS pets (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            species     TEXT NOT NULL,
            age         INTEGER NOT NULL,
            gender      TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_pets_user
            ON pets(user_id);

        CREATE TABLE IF NOT EXISTS photos (
            id           TEXT PRIMARY KEY,
            file_name    TEXT NOT NULL,
            content_type TEXT NOT NULL,
            storage_id   TEXT NOT NULL,
            user_id      TEXT REFERENCES users(id) ON DELETE CASCADE,
            pet_id       TEXT REFERENCES pets(id) ON DELETE CASCADE,
            uploaded_at  TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK ((user_id IS NULL) != (pet_id IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_photos_user
            ON photos(user_id);

        CREATE INDEX IF NOT EXISTS idx_photos_pet
            ON photos(pet_id);

        -- Append-only log: repeated swipes add rows, nothing is upserted.
        CREATE TABLE IF NOT EXISTS swipes (
            id          TEXT PRIMARY KEY,
            swiper_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            target_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            liked       INTEGER NOT NULL,
            swiped_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_swipes_swiper
            ON swipes(swiper_id, swiped_at);

        CREATE INDEX IF NOT EXISTS idx_swipes_pair
            ON swipes(swiper_id, target_id, swiped_at);

        -- One row per unordered pair; user_lo < user_hi by construction.
        CREATE TABLE IF NOT EXISTS matches (
            id          TEXT PRIMARY KEY,
            user_lo     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            user_hi     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            confirmed   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_lo, user_hi),
            CHECK (user_lo < user_hi)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id            TEXT PRIMARY KEY,
            sender_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            recipient_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content       TEXT NOT NULL,
            sent_at       TEXT NOT NULL DEFAULT (datetime('now')),
            read          INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, recipient_id, sent_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
