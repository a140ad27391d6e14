use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use khatmah_types::models::KhatmahType;

use crate::Database;
use crate::models::{
    AssignmentRow, Claim, Joined, KHATMAH_COLUMNS, KhatmahChanges, KhatmahRow, KhatmahSummaryRow,
    NewAssignment, ParticipantRow, uuid_at,
};

/// Table and item column holding assignments of the given kind.
fn assignment_table(kind: KhatmahType) -> (&'static str, &'static str) {
    match kind {
        KhatmahType::Juz => ("juz_assignments", "juz_number"),
        KhatmahType::Surah => ("surah_assignments", "surah_number"),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

impl Database {
    // -- Khatmahs --

    pub fn insert_khatmah(&self, khatmah: &KhatmahRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO khatmahs (id, name, created_at, is_private, require_name, end_date,
                                       image_url, khatmah_type, creator_id, creator_token)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    khatmah.id.to_string(),
                    khatmah.name,
                    khatmah.created_at,
                    khatmah.is_private,
                    khatmah.require_name,
                    khatmah.end_date,
                    khatmah.image_url,
                    khatmah.khatmah_type.as_str(),
                    khatmah.creator_id.map(|id| id.to_string()),
                    khatmah.creator_token.to_string(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_khatmah(&self, id: Uuid) -> Result<Option<KhatmahRow>> {
        self.with_conn(|conn| query_khatmah(conn, id))
    }

    /// One page of non-private khatmahs, newest first, plus the total count.
    pub fn list_public_khatmahs(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<(u64, Vec<KhatmahSummaryRow>)> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM khatmahs WHERE is_private = 0",
                [],
                |r| r.get(0),
            )?;

            let sql = format!(
                "SELECT {KHATMAH_COLUMNS},
                        (SELECT COUNT(*) FROM participants p WHERE p.khatmah_id = k.id),
                        CASE k.khatmah_type
                            WHEN 'surah' THEN (SELECT COUNT(*) FROM surah_assignments s
                                               WHERE s.khatmah_id = k.id AND s.completed = 1)
                            ELSE (SELECT COUNT(*) FROM juz_assignments j
                                  WHERE j.khatmah_id = k.id AND j.completed = 1)
                        END
                 FROM khatmahs k
                 WHERE k.is_private = 0
                 ORDER BY k.created_at DESC, k.rowid DESC
                 LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit, offset as i64], |row| {
                    Ok(KhatmahSummaryRow {
                        khatmah: KhatmahRow::from_row(row)?,
                        participant_count: row.get(10)?,
                        completed_count: row.get(11)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((total as u64, rows))
        })
    }

    /// Returns the updated row, or `None` when no khatmah has this id.
    pub fn update_khatmah(&self, id: Uuid, changes: &KhatmahChanges) -> Result<Option<KhatmahRow>> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE khatmahs SET
                    name = COALESCE(?2, name),
                    is_private = COALESCE(?3, is_private),
                    require_name = COALESCE(?4, require_name),
                    end_date = CASE WHEN ?5 THEN ?6 ELSE end_date END,
                    image_url = CASE WHEN ?7 THEN ?8 ELSE image_url END
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    changes.name,
                    changes.is_private,
                    changes.require_name,
                    changes.end_date.is_some(),
                    changes.end_date.flatten(),
                    changes.image_url.is_some(),
                    changes.image_url.clone().flatten(),
                ],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_khatmah(conn, id)
        })
    }

    /// Deletes the khatmah with its participants and assignments.
    pub fn delete_khatmah(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM khatmahs WHERE id = ?1", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    // -- Participants --

    /// Inserts the participant and, when `claim_creator` is set, records it as
    /// the khatmah's creator unless one is already recorded. Both happen in a
    /// single transaction.
    pub fn join_khatmah(&self, participant: ParticipantRow, claim_creator: bool) -> Result<Joined> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO participants (id, khatmah_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    participant.id.to_string(),
                    participant.khatmah_id.to_string(),
                    participant.name,
                    participant.created_at,
                ],
            )?;

            let became_creator = claim_creator
                && tx.execute(
                    "UPDATE khatmahs SET creator_id = ?1 WHERE id = ?2 AND creator_id IS NULL",
                    params![participant.id.to_string(), participant.khatmah_id.to_string()],
                )? == 1;

            tx.commit()?;
            Ok(Joined {
                participant,
                became_creator,
            })
        })
    }

    pub fn get_participant(&self, id: Uuid) -> Result<Option<ParticipantRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, khatmah_id, name, created_at FROM participants WHERE id = ?1",
                    [id.to_string()],
                    ParticipantRow::from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Participants in join order, optionally limited to one khatmah.
    pub fn list_participants(&self, khatmah_id: Option<Uuid>) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, khatmah_id, name, created_at FROM participants
                 WHERE ?1 IS NULL OR khatmah_id = ?1
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([khatmah_id.map(|id| id.to_string())], ParticipantRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch participants for a set of khatmahs.
    pub fn participants_for_khatmahs(&self, khatmah_ids: &[Uuid]) -> Result<Vec<ParticipantRow>> {
        if khatmah_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=khatmah_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, khatmah_id, name, created_at FROM participants
                 WHERE khatmah_id IN ({})
                 ORDER BY created_at, rowid",
                placeholders.join(", ")
            );

            let ids: Vec<String> = khatmah_ids.iter().map(Uuid::to_string).collect();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), ParticipantRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Deletes the participant together with all of its assignments.
    pub fn delete_participant(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted =
                conn.execute("DELETE FROM participants WHERE id = ?1", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    // -- Assignments --

    /// Claims an item for a participant. The existence check and the insert
    /// run under the same connection lock; the unique index catches anything
    /// else.
    pub fn claim_assignment(&self, kind: KhatmahType, new: &NewAssignment) -> Result<Claim> {
        let (table, column) = assignment_table(kind);

        self.with_conn_mut(|conn| {
            let taken: bool = conn.query_row(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM {table} WHERE khatmah_id = ?1 AND {column} = ?2)"
                ),
                params![new.khatmah_id.to_string(), new.number],
                |r| r.get(0),
            )?;
            if taken {
                return Ok(Claim::Taken);
            }

            let inserted = conn.execute(
                &format!(
                    "INSERT INTO {table} (id, {column}, participant_id, khatmah_id, created_at, completed)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0)"
                ),
                params![
                    new.id.to_string(),
                    new.number,
                    new.participant_id.to_string(),
                    new.khatmah_id.to_string(),
                    new.created_at,
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(Claim::Taken),
                Err(e) if is_foreign_key_violation(&e) => return Ok(Claim::ParticipantGone),
                Err(e) => return Err(e.into()),
            }

            let row = query_assignment(conn, kind, new.id)?
                .ok_or_else(|| anyhow!("Assignment {} missing after insert", new.id))?;
            Ok(Claim::Created(row))
        })
    }

    pub fn get_assignment(&self, kind: KhatmahType, id: Uuid) -> Result<Option<AssignmentRow>> {
        self.with_conn(|conn| query_assignment(conn, kind, id))
    }

    /// Assignments ordered by item number, optionally limited to one khatmah.
    pub fn list_assignments(
        &self,
        kind: KhatmahType,
        khatmah_id: Option<Uuid>,
    ) -> Result<Vec<AssignmentRow>> {
        let (table, column) = assignment_table(kind);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT a.id, a.{column}, a.participant_id, p.name, a.khatmah_id, a.created_at, a.completed
                 FROM {table} a
                 JOIN participants p ON p.id = a.participant_id
                 WHERE ?1 IS NULL OR a.khatmah_id = ?1
                 ORDER BY a.khatmah_id, a.{column}"
            ))?;
            let rows = stmt
                .query_map([khatmah_id.map(|id| id.to_string())], |row| {
                    assignment_from_row(kind, row)
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flips `completed`. Returns `None` when no assignment has this id.
    pub fn toggle_assignment(&self, kind: KhatmahType, id: Uuid) -> Result<Option<AssignmentRow>> {
        let (table, _) = assignment_table(kind);

        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                &format!("UPDATE {table} SET completed = NOT completed WHERE id = ?1"),
                [id.to_string()],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_assignment(conn, kind, id)
        })
    }
}

fn query_khatmah(conn: &Connection, id: Uuid) -> Result<Option<KhatmahRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {KHATMAH_COLUMNS} FROM khatmahs k WHERE k.id = ?1"),
            [id.to_string()],
            KhatmahRow::from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_assignment(
    conn: &Connection,
    kind: KhatmahType,
    id: Uuid,
) -> Result<Option<AssignmentRow>> {
    let (table, column) = assignment_table(kind);
    let row = conn
        .query_row(
            &format!(
                "SELECT a.id, a.{column}, a.participant_id, p.name, a.khatmah_id, a.created_at, a.completed
                 FROM {table} a
                 JOIN participants p ON p.id = a.participant_id
                 WHERE a.id = ?1"
            ),
            [id.to_string()],
            |row| assignment_from_row(kind, row),
        )
        .optional()?;
    Ok(row)
}

fn assignment_from_row(kind: KhatmahType, row: &Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        id: uuid_at(row, 0)?,
        kind,
        number: row.get(1)?,
        participant_id: uuid_at(row, 2)?,
        participant_name: row.get(3)?,
        khatmah_id: uuid_at(row, 4)?,
        created_at: row.get(5)?,
        completed: row.get(6)?,
    })
}
