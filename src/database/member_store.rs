use async_trait::async_trait;
use sqlx::{FromRow, MySql, MySqlPool, PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, warn};

use crate::database::manager::DatabaseError;
use crate::database::models::member::{MalformedRow, Member, SecondaryMemberRow, MEMBER_COLUMNS};

const MEMBERS_TABLE: &str = "members";

/// Reported id for a row whose `id` column itself cannot be read
const UNKNOWN_ID: &str = "<unknown>";

/// Everything read from a store in one pass. Rows that could not be
/// decoded into a [`Member`] are kept aside instead of aborting the read.
#[derive(Debug, Default)]
pub struct MemberSnapshot {
    pub members: Vec<Member>,
    pub rejected: Vec<MalformedRow>,
}

impl MemberSnapshot {
    pub fn len(&self) -> usize {
        self.members.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split per-row decode results, logging each rejected row
    pub fn from_decoded<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Result<Member, MalformedRow>>,
    {
        let mut snapshot = Self::default();
        for row in rows {
            match row {
                Ok(member) => snapshot.members.push(member),
                Err(malformed) => {
                    warn!("Skipping row: {}", malformed);
                    snapshot.rejected.push(malformed);
                }
            }
        }
        snapshot
    }
}

/// Row-oriented access to a members table
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Short name used in logs and reports
    fn label(&self) -> &str;

    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Create the members table when it does not exist yet
    async fn ensure_schema(&self) -> Result<(), DatabaseError>;

    /// Read every member row, unpaginated
    async fn fetch_all(&self) -> Result<MemberSnapshot, DatabaseError>;

    /// Insert-or-overwrite all given rows keyed by `id`, as one statement
    async fn upsert_batch(&self, members: &[Member]) -> Result<(), DatabaseError>;
}

fn column_list(quote: char) -> String {
    MEMBER_COLUMNS
        .iter()
        .map(|column| format!("{quote}{column}{quote}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The hosted PostgreSQL store; `groups` is a native `TEXT[]`
#[derive(Clone)]
pub struct PostgresMemberStore {
    pool: PgPool,
}

impl PostgresMemberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    const CREATE_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS members (
            "id" TEXT PRIMARY KEY,
            "name" TEXT NOT NULL,
            "email" TEXT,
            "phone" TEXT,
            "address" TEXT,
            "date_of_birth" DATE,
            "gender" TEXT,
            "baptized" BOOLEAN,
            "department" TEXT,
            "position" TEXT,
            "service_year" INTEGER,
            "profile_image" TEXT,
            "family_id" TEXT,
            "user_id" TEXT,
            "groups" TEXT[] NOT NULL DEFAULT '{}',
            "created_at" TIMESTAMPTZ,
            "updated_at" TIMESTAMPTZ
        )
    "#;

    fn upsert_query(members: &[Member]) -> QueryBuilder<'_, Postgres> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) ",
            MEMBERS_TABLE,
            column_list('"')
        ));
        builder.push_values(members, |mut row, member| {
            row.push_bind(&member.id)
                .push_bind(&member.name)
                .push_bind(&member.email)
                .push_bind(&member.phone)
                .push_bind(&member.address)
                .push_bind(member.date_of_birth)
                .push_bind(&member.gender)
                .push_bind(member.baptized)
                .push_bind(&member.department)
                .push_bind(&member.position)
                .push_bind(member.service_year)
                .push_bind(&member.profile_image)
                .push_bind(&member.family_id)
                .push_bind(&member.user_id)
                .push_bind(&member.groups)
                .push_bind(member.created_at)
                .push_bind(member.updated_at);
        });

        let updates = MEMBER_COLUMNS[1..]
            .iter()
            .map(|column| format!("\"{column}\" = EXCLUDED.\"{column}\""))
            .collect::<Vec<_>>()
            .join(", ");
        builder.push(format!(" ON CONFLICT (\"id\") DO UPDATE SET {}", updates));
        builder
    }
}

#[async_trait]
impl MemberStore for PostgresMemberStore {
    fn label(&self) -> &str {
        "primary"
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        sqlx::query(Self::CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<MemberSnapshot, DatabaseError> {
        let query = format!(
            "SELECT {} FROM {} ORDER BY \"id\"",
            column_list('"'),
            MEMBERS_TABLE
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        // Decode row by row so one bad row (e.g. a NULL inside groups) is
        // rejected on its own
        let snapshot = MemberSnapshot::from_decoded(rows.iter().map(|row| {
            Member::from_row(row).map_err(|err| MalformedRow {
                id: row.try_get::<String, _>("id").unwrap_or_else(|_| UNKNOWN_ID.to_string()),
                reason: err.to_string(),
            })
        }));

        debug!(
            "Read {} members from primary store ({} rejected)",
            snapshot.members.len(),
            snapshot.rejected.len()
        );
        Ok(snapshot)
    }

    async fn upsert_batch(&self, members: &[Member]) -> Result<(), DatabaseError> {
        if members.is_empty() {
            return Ok(());
        }

        Self::upsert_query(members)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|err| DatabaseError::query(format!("upsert of {} members into primary", members.len()), err))?;
        Ok(())
    }
}

/// The self-hosted MySQL store; `groups` is stored as a JSON string
#[derive(Clone)]
pub struct MySqlMemberStore {
    pool: MySqlPool,
}

impl MySqlMemberStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    const CREATE_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS members (
            `id` VARCHAR(191) NOT NULL PRIMARY KEY,
            `name` VARCHAR(255) NOT NULL,
            `email` VARCHAR(255) NULL,
            `phone` VARCHAR(64) NULL,
            `address` TEXT NULL,
            `date_of_birth` DATE NULL,
            `gender` VARCHAR(32) NULL,
            `baptized` TINYINT(1) NULL,
            `department` VARCHAR(255) NULL,
            `position` VARCHAR(255) NULL,
            `service_year` INT NULL,
            `profile_image` TEXT NULL,
            `family_id` VARCHAR(191) NULL,
            `user_id` VARCHAR(191) NULL,
            `groups` TEXT NULL,
            `created_at` DATETIME(6) NULL,
            `updated_at` DATETIME(6) NULL
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
    "#;

    /// Multi-row upsert using the `AS new` row alias (MySQL 8.0.19+)
    fn upsert_query(rows: &[SecondaryMemberRow]) -> QueryBuilder<'_, MySql> {
        let mut builder = QueryBuilder::<MySql>::new(format!(
            "INSERT INTO {} ({}) ",
            MEMBERS_TABLE,
            column_list('`')
        ));
        builder.push_values(rows, |mut row, member| {
            row.push_bind(&member.id)
                .push_bind(&member.name)
                .push_bind(&member.email)
                .push_bind(&member.phone)
                .push_bind(&member.address)
                .push_bind(member.date_of_birth)
                .push_bind(&member.gender)
                .push_bind(member.baptized)
                .push_bind(&member.department)
                .push_bind(&member.position)
                .push_bind(member.service_year)
                .push_bind(&member.profile_image)
                .push_bind(&member.family_id)
                .push_bind(&member.user_id)
                .push_bind(&member.groups)
                .push_bind(member.created_at)
                .push_bind(member.updated_at);
        });

        let updates = MEMBER_COLUMNS[1..]
            .iter()
            .map(|column| format!("`{column}` = new.`{column}`"))
            .collect::<Vec<_>>()
            .join(", ");
        builder.push(format!(" AS new ON DUPLICATE KEY UPDATE {}", updates));
        builder
    }
}

#[async_trait]
impl MemberStore for MySqlMemberStore {
    fn label(&self) -> &str {
        "secondary"
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        sqlx::query(Self::CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<MemberSnapshot, DatabaseError> {
        let query = format!(
            "SELECT {} FROM {} ORDER BY `id`",
            column_list('`'),
            MEMBERS_TABLE
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let snapshot = MemberSnapshot::from_decoded(rows.iter().map(|row| {
            SecondaryMemberRow::from_row(row)
                .map_err(|err| MalformedRow {
                    id: row.try_get::<String, _>("id").unwrap_or_else(|_| UNKNOWN_ID.to_string()),
                    reason: err.to_string(),
                })
                .and_then(Member::try_from)
        }));

        debug!(
            "Read {} members from secondary store ({} rejected)",
            snapshot.members.len(),
            snapshot.rejected.len()
        );
        Ok(snapshot)
    }

    async fn upsert_batch(&self, members: &[Member]) -> Result<(), DatabaseError> {
        if members.is_empty() {
            return Ok(());
        }

        let rows: Vec<SecondaryMemberRow> = members.iter().map(SecondaryMemberRow::from).collect();

        Self::upsert_query(&rows)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|err| DatabaseError::query(format!("upsert of {} members into secondary", rows.len()), err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_list_quotes_every_column() {
        let pg = column_list('"');
        assert!(pg.starts_with("\"id\", \"name\""));
        assert!(pg.contains("\"groups\""));

        let my = column_list('`');
        assert!(my.contains("`groups`"));
        assert_eq!(my.matches('`').count(), MEMBER_COLUMNS.len() * 2);
    }

    #[test]
    fn snapshot_counts_rejected_rows() {
        let snapshot = MemberSnapshot {
            members: vec![Member::new("m1", "Jane Doe")],
            rejected: vec![MalformedRow {
                id: "m2".into(),
                reason: "bad json".into(),
            }],
        };
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn from_decoded_keeps_good_rows_beside_bad_ones() {
        let snapshot = MemberSnapshot::from_decoded(vec![
            Ok(Member::new("m1", "Jane Doe")),
            Err(MalformedRow {
                id: "m2".into(),
                reason: "unexpected null in groups".into(),
            }),
            Ok(Member::new("m3", "John Roe")),
        ]);

        let ids: Vec<&str> = snapshot.members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert_eq!(snapshot.rejected.len(), 1);
        assert_eq!(snapshot.rejected[0].id, "m2");
    }

    #[test]
    fn secondary_timestamps_keep_microseconds() {
        let ddl = MySqlMemberStore::CREATE_TABLE;
        assert!(ddl.contains("`created_at` DATETIME(6) NULL"));
        assert!(ddl.contains("`updated_at` DATETIME(6) NULL"));
        assert!(!ddl.contains("TIMESTAMP"));
    }

    #[test]
    fn secondary_upsert_uses_row_alias() {
        let rows = vec![
            SecondaryMemberRow::from(&Member::new("m1", "Jane Doe")),
            SecondaryMemberRow::from(&Member::new("m2", "John Roe")),
        ];
        let builder = MySqlMemberStore::upsert_query(&rows);
        let sql = builder.sql();

        assert!(sql.starts_with("INSERT INTO members (`id`, `name`"));
        assert!(sql.contains(" AS new ON DUPLICATE KEY UPDATE `name` = new.`name`"));
        assert!(sql.ends_with("`updated_at` = new.`updated_at`"));
        assert!(!sql.contains("VALUES(`"));
        assert!(!sql.contains("`id` = new.`id`"));
    }

    #[test]
    fn primary_upsert_overwrites_every_column_but_id() {
        let members = vec![Member::new("m1", "Jane Doe")];
        let builder = PostgresMemberStore::upsert_query(&members);
        let sql = builder.sql();

        assert!(sql.contains("ON CONFLICT (\"id\") DO UPDATE SET \"name\" = EXCLUDED.\"name\""));
        assert!(sql.contains("\"updated_at\" = EXCLUDED.\"updated_at\""));
        assert!(!sql.contains("\"id\" = EXCLUDED"));
    }
}
