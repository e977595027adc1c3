use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub roll_no: String,
    pub name: String,
    pub group_name: Option<String>,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public attributes of a member, as shown to scanning devices and reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub roll_no: String,
    pub name: String,
    #[serde(rename = "group")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            roll_no: member.roll_no.clone(),
            name: member.name.clone(),
            group_name: member.group_name.clone(),
            photo_path: member.photo_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemberData {
    pub roll_no: String,
    pub name: String,
    #[serde(default, alias = "group")]
    pub group_name: Option<String>,
    #[serde(default)]
    pub photo_path: Option<String>,
}

/// Partial update. For the optional labels, an absent field is left alone,
/// while `null` or an empty string clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMemberData {
    pub roll_no: Option<String>,
    pub name: Option<String>,
    #[serde(default, alias = "group", deserialize_with = "present")]
    pub group_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub photo_path: Option<Option<String>>,
}

// Only called when the key is present, so `null` becomes `Some(None)`
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Filters for the member listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberFilter {
    /// Case-insensitive substring of the name or roll number
    pub search: Option<String>,
    pub group: Option<String>,
}

impl Member {
    /// Creates a new member record
    pub async fn create(pool: &PgPool, data: &CreateMemberData) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO members (roll_no, name, group_name, photo_path)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.roll_no)
        .bind(&data.name)
        .bind(&data.group_name)
        .bind(&data.photo_path)
        .fetch_one(pool)
        .await?;

        Ok(member)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Lists members ordered by name
    pub async fn list(pool: &PgPool, filter: &MemberFilter) -> Result<Vec<Self>, sqlx::Error> {
        let members = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM members
            WHERE ($1::text IS NULL
                   OR name ILIKE '%' || $1 || '%'
                   OR roll_no ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR group_name = $2)
            ORDER BY name ASC
            "#,
        )
        .bind(filter.search.as_deref())
        .bind(filter.group.as_deref())
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Applies the provided fields, leaving absent ones untouched
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: &UpdateMemberData,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, Self>(
            r#"
            UPDATE members
            SET
                roll_no = COALESCE($2, roll_no),
                name = COALESCE($3, name),
                group_name = CASE WHEN $4 THEN $5 ELSE group_name END,
                photo_path = CASE WHEN $6 THEN $7 ELSE photo_path END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.roll_no)
        .bind(&data.name)
        .bind(data.group_name.is_some())
        .bind(data.group_name.clone().flatten())
        .bind(data.photo_path.is_some())
        .bind(data.photo_path.clone().flatten())
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Hard delete; cards and attendance records go with it
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Distinct non-empty group labels
    pub async fn list_groups(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let groups = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT group_name FROM members
            WHERE group_name IS NOT NULL AND group_name <> ''
            ORDER BY group_name ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(groups)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
            .fetch_one(pool)
            .await
    }
}
