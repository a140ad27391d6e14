use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (khatmahs and assignments)");
        conn.execute_batch(
            "
            CREATE TABLE khatmahs (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                is_private      INTEGER NOT NULL DEFAULT 0,
                require_name    INTEGER NOT NULL DEFAULT 1,
                end_date        TEXT,
                image_url       TEXT,
                khatmah_type    TEXT NOT NULL DEFAULT 'juz'
                                CHECK (khatmah_type IN ('juz', 'surah')),
                creator_id      TEXT REFERENCES participants(id) ON DELETE SET NULL,
                creator_token   TEXT NOT NULL
            );

            CREATE TABLE participants (
                id          TEXT PRIMARY KEY,
                khatmah_id  TEXT NOT NULL REFERENCES khatmahs(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_participants_khatmah
                ON participants(khatmah_id, created_at);

            CREATE TABLE juz_assignments (
                id              TEXT PRIMARY KEY,
                juz_number      INTEGER NOT NULL CHECK (juz_number BETWEEN 1 AND 30),
                participant_id  TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
                khatmah_id      TEXT NOT NULL REFERENCES khatmahs(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL,
                completed       INTEGER NOT NULL DEFAULT 0,
                UNIQUE (juz_number, khatmah_id)
            );

            CREATE INDEX idx_juz_assignments_participant
                ON juz_assignments(participant_id);

            CREATE TABLE surah_assignments (
                id              TEXT PRIMARY KEY,
                surah_number    INTEGER NOT NULL CHECK (surah_number BETWEEN 1 AND 114),
                participant_id  TEXT NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
                khatmah_id      TEXT NOT NULL REFERENCES khatmahs(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL,
                completed       INTEGER NOT NULL DEFAULT 0,
                UNIQUE (surah_number, khatmah_id)
            );

            CREATE INDEX idx_surah_assignments_participant
                ON surah_assignments(participant_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (hijri calendar)");
        conn.execute_batch(
            "
            CREATE TABLE hijri_months (
                id                  TEXT PRIMARY KEY,
                name_ar             TEXT NOT NULL,
                name_en             TEXT NOT NULL,
                number              INTEGER NOT NULL CHECK (number BETWEEN 1 AND 12),
                year                INTEGER NOT NULL,
                gregorian_start     TEXT NOT NULL,
                gregorian_end       TEXT NOT NULL,
                moon_sighting_data  TEXT,
                calendar_data       TEXT,
                UNIQUE (number, year)
            );

            CREATE INDEX idx_hijri_months_range
                ON hijri_months(gregorian_start, gregorian_end);

            CREATE TABLE hijri_events (
                id              TEXT PRIMARY KEY,
                month_id        TEXT NOT NULL REFERENCES hijri_months(id) ON DELETE CASCADE,
                day             INTEGER NOT NULL,
                title_ar        TEXT NOT NULL,
                title_en        TEXT,
                description_ar  TEXT,
                description_en  TEXT,
                year_of_event   INTEGER,
                is_holiday      INTEGER NOT NULL DEFAULT 0,
                event_type      TEXT
            );

            CREATE INDEX idx_hijri_events_month
                ON hijri_events(month_id, day);

            CREATE TABLE astronomical_events (
                id              TEXT PRIMARY KEY,
                month_id        TEXT NOT NULL REFERENCES hijri_months(id) ON DELETE CASCADE,
                date            TEXT NOT NULL,
                time            TEXT NOT NULL,
                title_ar        TEXT NOT NULL,
                title_en        TEXT,
                description_ar  TEXT,
                description_en  TEXT
            );

            CREATE INDEX idx_astronomical_events_month
                ON astronomical_events(month_id, date);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rerun_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 2);
    }
}
