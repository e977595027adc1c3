use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::member::MemberSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RfidCard {
    pub id: Uuid,
    pub uid_code: String, // always upper-case
    pub member_id: Option<Uuid>, // None = unpaired
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A card together with its owning member, if paired
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardWithMember {
    #[serde(flatten)]
    pub card: RfidCard,
    pub member: Option<MemberSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatusFilter {
    Active,
    Inactive,
    Paired,
    Unpaired,
}

impl CardStatusFilter {
    pub fn matches(&self, card: &RfidCard) -> bool {
        match self {
            CardStatusFilter::Active => card.is_active,
            CardStatusFilter::Inactive => !card.is_active,
            CardStatusFilter::Paired => card.member_id.is_some(),
            CardStatusFilter::Unpaired => card.member_id.is_none(),
        }
    }
}

/// Trims and upper-cases a card UID. Returns `None` when nothing is left.
pub fn normalize_uid(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

#[derive(Debug, FromRow)]
struct CardRow {
    id: Uuid,
    uid_code: String,
    member_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    member_roll_no: Option<String>,
    member_name: Option<String>,
    member_group_name: Option<String>,
    member_photo_path: Option<String>,
}

impl From<CardRow> for CardWithMember {
    fn from(row: CardRow) -> Self {
        let member = match (row.member_id, row.member_roll_no, row.member_name) {
            (Some(id), Some(roll_no), Some(name)) => Some(MemberSummary {
                id,
                roll_no,
                name,
                group_name: row.member_group_name,
                photo_path: row.member_photo_path,
            }),
            _ => None,
        };

        Self {
            card: RfidCard {
                id: row.id,
                uid_code: row.uid_code,
                member_id: row.member_id,
                is_active: row.is_active,
                created_at: row.created_at,
            },
            member,
        }
    }
}

const CARD_WITH_MEMBER_SELECT: &str = r#"
    SELECT
        c.id, c.uid_code, c.member_id, c.is_active, c.created_at,
        m.roll_no AS member_roll_no,
        m.name AS member_name,
        m.group_name AS member_group_name,
        m.photo_path AS member_photo_path
    FROM rfid_cards c
    LEFT JOIN members m ON m.id = c.member_id
"#;

impl RfidCard {
    /// Registers a card. `uid_code` must already be normalized.
    pub async fn create(
        pool: &PgPool,
        uid_code: &str,
        member_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO rfid_cards (uid_code, member_id, is_active)
            VALUES ($1, $2, TRUE)
            RETURNING *
            "#,
        )
        .bind(uid_code)
        .bind(member_id)
        .fetch_one(pool)
        .await?;

        Ok(card)
    }

    /// Looks up a card and its owner by normalized UID
    pub async fn find_by_uid(
        pool: &PgPool,
        uid_code: &str,
    ) -> Result<Option<CardWithMember>, sqlx::Error> {
        let query = format!("{} WHERE c.uid_code = $1", CARD_WITH_MEMBER_SELECT);
        let row = sqlx::query_as::<_, CardRow>(&query)
            .bind(uid_code)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(CardWithMember::from))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<CardWithMember>, sqlx::Error> {
        let query = format!("{} WHERE c.id = $1", CARD_WITH_MEMBER_SELECT);
        let row = sqlx::query_as::<_, CardRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(CardWithMember::from))
    }

    /// Lists cards, newest first
    pub async fn list(
        pool: &PgPool,
        status: Option<CardStatusFilter>,
    ) -> Result<Vec<CardWithMember>, sqlx::Error> {
        let condition = match status {
            Some(CardStatusFilter::Active) => "WHERE c.is_active = TRUE",
            Some(CardStatusFilter::Inactive) => "WHERE c.is_active = FALSE",
            Some(CardStatusFilter::Paired) => "WHERE c.member_id IS NOT NULL",
            Some(CardStatusFilter::Unpaired) => "WHERE c.member_id IS NULL",
            None => "",
        };
        let query = format!(
            "{} {} ORDER BY c.created_at DESC",
            CARD_WITH_MEMBER_SELECT, condition
        );

        let rows = sqlx::query_as::<_, CardRow>(&query).fetch_all(pool).await?;

        Ok(rows.into_iter().map(CardWithMember::from).collect())
    }

    pub async fn list_by_member(pool: &PgPool, member_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let cards = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM rfid_cards
            WHERE member_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(cards)
    }

    /// Pairs the card with a member, or unpairs it when `member_id` is `None`
    pub async fn set_member(
        pool: &PgPool,
        id: Uuid,
        member_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            UPDATE rfid_cards
            SET member_id = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(member_id)
        .fetch_optional(pool)
        .await?;

        Ok(card)
    }

    pub async fn set_active(
        pool: &PgPool,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            UPDATE rfid_cards
            SET is_active = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(pool)
        .await?;

        Ok(card)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rfid_cards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
