//! Document repository

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use core_kernel::DocumentId;
use domain_lending::{DigitalDocument, DigitalFormat, Document, PhysicalDocument};

use super::{for_update, money};
use crate::error::DatabaseError;

const SELECT_DOCUMENT: &str = r#"
    SELECT document_id, kind, title, shelf_mark, digital_format,
           per_diem_rate, currency, available
    FROM documents
    WHERE document_id = $1
"#;

/// Database row for a catalog document
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub document_id: Uuid,
    pub kind: String,
    pub title: String,
    pub shelf_mark: Option<String>,
    pub digital_format: Option<String>,
    pub per_diem_rate: Decimal,
    pub currency: String,
    pub available: bool,
}

impl DocumentRow {
    pub fn into_document(self) -> Result<Document, DatabaseError> {
        let id = DocumentId::from(self.document_id);
        let per_diem_rate = money(self.per_diem_rate, &self.currency)?;

        match self.kind.as_str() {
            "physical" => Ok(Document::Physical(PhysicalDocument {
                id,
                title: self.title,
                shelf_mark: self.shelf_mark.unwrap_or_default(),
                per_diem_rate,
                available: self.available,
            })),
            "digital" => {
                let format = self
                    .digital_format
                    .as_deref()
                    .and_then(DigitalFormat::parse)
                    .ok_or_else(|| {
                        DatabaseError::serialization(format!(
                            "Document {} has no valid digital format",
                            id
                        ))
                    })?;
                Ok(Document::Digital(DigitalDocument {
                    id,
                    title: self.title,
                    format,
                    per_diem_rate,
                    available: self.available,
                }))
            }
            other => Err(DatabaseError::serialization(format!(
                "Unknown document kind '{}'",
                other
            ))),
        }
    }
}

/// SQL for the `documents` table
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogRepository;

impl CatalogRepository {
    /// Loads a document, optionally locking its row
    pub async fn find(
        conn: &mut PgConnection,
        id: DocumentId,
        lock: bool,
    ) -> Result<Document, DatabaseError> {
        let sql = for_update(SELECT_DOCUMENT, lock);
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DatabaseError::not_found("Document", id))?
            .into_document()
    }

    pub async fn set_available(
        conn: &mut PgConnection,
        id: DocumentId,
        available: bool,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE documents SET available = $2, updated_at = now() WHERE document_id = $1",
        )
        .bind(Uuid::from(id))
        .bind(available)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Document", id));
        }
        Ok(())
    }

    /// Adds a document to the catalog
    pub async fn insert(conn: &mut PgConnection, document: &Document) -> Result<(), DatabaseError> {
        let (kind, shelf_mark, digital_format) = match document {
            Document::Physical(d) => ("physical", Some(d.shelf_mark.as_str()), None),
            Document::Digital(d) => ("digital", None, Some(d.format.as_str())),
        };
        let rate = document.per_diem_rate();

        sqlx::query(
            r#"
            INSERT INTO documents (
                document_id, kind, title, shelf_mark, digital_format,
                per_diem_rate, currency, available
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::from(document.id()))
        .bind(kind)
        .bind(document.title())
        .bind(shelf_mark)
        .bind(digital_format)
        .bind(rate.amount())
        .bind(rate.currency().code())
        .bind(document.is_available())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(kind: &str) -> DocumentRow {
        DocumentRow {
            document_id: Uuid::new_v4(),
            kind: kind.to_string(),
            title: "Neuromancer".to_string(),
            shelf_mark: Some("SF-GIB-1".to_string()),
            digital_format: Some("epub".to_string()),
            per_diem_rate: dec!(0.50),
            currency: "EUR".to_string(),
            available: true,
        }
    }

    #[test]
    fn test_physical_row_maps_to_physical_document() {
        let document = row("physical").into_document().unwrap();
        assert!(matches!(document, Document::Physical(ref d) if d.shelf_mark == "SF-GIB-1"));
        assert_eq!(document.per_diem_rate().amount(), dec!(0.50));
    }

    #[test]
    fn test_digital_row_needs_a_format() {
        let mut digital = row("digital");
        digital.digital_format = None;
        assert!(matches!(
            digital.into_document(),
            Err(DatabaseError::SerializationError(_))
        ));
    }

    #[test]
    fn test_unknown_currency_is_rejected() {
        let mut bad = row("physical");
        bad.currency = "XXX".to_string();
        assert!(bad.into_document().is_err());
    }
}
