//! Catalog documents as seen by the circulation core
//!
//! The core needs two things from a document: its per-diem rate and whether
//! it is on the shelf. Format-specific details ride along for display and
//! storage mapping only.

use serde::{Deserialize, Serialize};

use core_kernel::{DocumentId, Money};

/// Physical item with a shelf location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalDocument {
    pub id: DocumentId,
    pub title: String,
    pub shelf_mark: String,
    pub per_diem_rate: Money,
    pub available: bool,
}

/// Digital file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitalFormat {
    Pdf,
    Epub,
    Audio,
    Video,
}

impl DigitalFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigitalFormat::Pdf => "pdf",
            DigitalFormat::Epub => "epub",
            DigitalFormat::Audio => "audio",
            DigitalFormat::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pdf" => Some(DigitalFormat::Pdf),
            "epub" => Some(DigitalFormat::Epub),
            "audio" => Some(DigitalFormat::Audio),
            "video" => Some(DigitalFormat::Video),
            _ => None,
        }
    }
}

/// Digital item lent as a single licensed copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalDocument {
    pub id: DocumentId,
    pub title: String,
    pub format: DigitalFormat,
    pub per_diem_rate: Money,
    pub available: bool,
}

/// A lendable catalog document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Document {
    Physical(PhysicalDocument),
    Digital(DigitalDocument),
}

impl Document {
    pub fn id(&self) -> DocumentId {
        match self {
            Document::Physical(d) => d.id,
            Document::Digital(d) => d.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Document::Physical(d) => &d.title,
            Document::Digital(d) => &d.title,
        }
    }

    pub fn per_diem_rate(&self) -> Money {
        match self {
            Document::Physical(d) => d.per_diem_rate,
            Document::Digital(d) => d.per_diem_rate,
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Document::Physical(d) => d.available,
            Document::Digital(d) => d.available,
        }
    }

    pub fn set_available(&mut self, available: bool) {
        match self {
            Document::Physical(d) => d.available = available,
            Document::Digital(d) => d.available = available,
        }
    }

    /// Storage tag: "physical" or "digital"
    pub fn kind(&self) -> &'static str {
        match self {
            Document::Physical(_) => "physical",
            Document::Digital(_) => "digital",
        }
    }
}
