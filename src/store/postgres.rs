use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{Attachment, Bill, BillDraft};

const COLUMNS: &str = r#"
    id,
    type,
    name,
    date,
    amount,
    vat,
    pct,
    commentary,
    file_url,
    file_name,
    status,
    comment_admin,
    email
"#;

#[derive(sqlx::FromRow)]
struct Record {
    id: Uuid,
    #[sqlx(rename = "type")]
    bill_type: String,
    name: String,
    date: NaiveDate,
    amount: f64,
    vat: String,
    pct: i32,
    commentary: Option<String>,
    file_url: Option<String>,
    file_name: Option<String>,
    status: String,
    comment_admin: Option<String>,
    email: String,
}

impl TryFrom<Record> for Bill {
    type Error = StoreError;

    fn try_from(r: Record) -> Result<Self, Self::Error> {
        let status = r.status.parse().map_err(|err| {
            log::error!("bill {}: {err}", r.id);
            StoreError::Server
        })?;

        Ok(Bill {
            id: r.id.to_string(),
            bill_type: r.bill_type,
            name: r.name,
            date: r.date,
            amount: r.amount,
            vat: r.vat,
            pct: r.pct,
            commentary: r.commentary.filter(|c| !c.is_empty()),
            file_url: r.file_url.filter(|u| !u.is_empty()),
            file_name: r.file_name.filter(|n| !n.is_empty()),
            status,
            comment_admin: r.comment_admin,
            email: r.email,
        })
    }
}

/// Bills kept in postgres, receipts written to `uploads_dir` and served
/// under `/uploads`.
pub struct PostgresStore {
    p: Pool<Postgres>,
    uploads_dir: PathBuf,
}

impl PostgresStore {
    pub async fn new(p: Pool<Postgres>, uploads_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&uploads_dir).await?;
        Ok(Self { p, uploads_dir })
    }

    /// Writes the receipt and points the draft at it. Returns the written path
    /// so a failed query can take it back.
    async fn save_receipt(
        &self,
        name: &Uuid,
        draft: &mut BillDraft,
        receipt: Option<Attachment>,
    ) -> Result<Option<PathBuf>, StoreError> {
        let Some(receipt) = receipt else {
            return Ok(None);
        };
        let stored = receipt.storage_name(name);
        let path = self.uploads_dir.join(&stored);
        tokio::fs::write(&path, &receipt.bytes).await?;
        log::debug!(
            "stored receipt '{}' ({}) as {stored}",
            receipt.file_name,
            receipt.content_type
        );

        draft.file_url = format!("/uploads/{stored}");
        draft.file_name = receipt.file_name;
        Ok(Some(path))
    }
}

/// Removes a receipt whose bill never made it to the database.
async fn discard_receipt(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("discarded receipt {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => log::warn!("cannot discard receipt {}: {err}", path.display()),
    }
}

async fn settle(
    stored: Option<PathBuf>,
    result: Result<Record, sqlx::Error>,
) -> Result<Bill, StoreError> {
    match result {
        Ok(record) => Bill::try_from(record),
        Err(err) => {
            if let Some(path) = stored {
                discard_receipt(&path).await;
            }
            Err(err.into())
        }
    }
}

fn parse_date(draft: &BillDraft) -> Result<NaiveDate, StoreError> {
    draft.date.parse::<NaiveDate>().map_err(|err| {
        log::warn!("invalid bill date '{}': {err}", draft.date);
        StoreError::Rejected("Erreur 400".to_string())
    })
}

#[async_trait]
impl Store for PostgresStore {
    async fn list(&self) -> Result<Vec<Bill>, StoreError> {
        let records = sqlx::query_as::<_, Record>(&format!("SELECT {COLUMNS} FROM bill"))
            .fetch_all(&self.p)
            .await?;

        records.into_iter().map(Bill::try_from).collect()
    }

    async fn create(
        &self,
        mut draft: BillDraft,
        receipt: Option<Attachment>,
    ) -> Result<Bill, StoreError> {
        let date = parse_date(&draft)?;
        let id = Uuid::new_v4();
        let stored = self.save_receipt(&id, &mut draft, receipt).await?;

        let result = sqlx::query_as::<_, Record>(&format!(
            r#"
            INSERT INTO bill (
                id, type, name, date, amount, vat, pct,
                commentary, file_url, file_name, status, email
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&draft.bill_type)
        .bind(&draft.name)
        .bind(date)
        .bind(draft.amount)
        .bind(&draft.vat)
        .bind(draft.pct)
        .bind(&draft.commentary)
        .bind(&draft.file_url)
        .bind(&draft.file_name)
        .bind(draft.status.as_str())
        .bind(&draft.email)
        .fetch_one(&self.p)
        .await;

        settle(stored, result).await
    }

    async fn update(
        &self,
        id: &str,
        mut draft: BillDraft,
        receipt: Option<Attachment>,
    ) -> Result<Bill, StoreError> {
        let id = Uuid::parse_str(id).map_err(|_| StoreError::NotFound)?;
        let date = parse_date(&draft)?;
        // Fresh name, so a failed update never removes the current receipt.
        let stored = self.save_receipt(&Uuid::new_v4(), &mut draft, receipt).await?;

        let result = sqlx::query_as::<_, Record>(&format!(
            r#"
            UPDATE bill SET
                type = $2,
                name = $3,
                date = $4,
                amount = $5,
                vat = $6,
                pct = $7,
                commentary = $8,
                file_url = $9,
                file_name = $10,
                status = $11,
                email = $12
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&draft.bill_type)
        .bind(&draft.name)
        .bind(date)
        .bind(draft.amount)
        .bind(&draft.vat)
        .bind(draft.pct)
        .bind(&draft.commentary)
        .bind(&draft.file_url)
        .bind(&draft.file_name)
        .bind(draft.status.as_str())
        .bind(&draft.email)
        .fetch_one(&self.p)
        .await;

        settle(stored, result).await
    }
}
