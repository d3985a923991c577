use serde::{Deserialize, Serialize};

/// A customer's uploaded exemption certificate.
///
/// The record is produced by the upload collaborator and replaced wholesale
/// on re-upload; deleting a certificate nulls the record without touching
/// the underlying file. Whether the record is *valid* (fields present, file
/// on disk, URL reachable) is judged by the validity rules in the engine,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Filesystem path of the stored certificate, if known.
    pub path: Option<String>,
    /// Public URL the certificate is served from.
    pub url: String,
    /// Original filename shown to humans and used for downloads.
    pub label: String,
    /// MIME type reported at upload time.
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl CertificateRecord {
    /// Create a record with every field populated.
    pub fn new(
        path: impl Into<String>,
        url: impl Into<String>,
        label: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            path: Some(path.into()),
            url: url.into(),
            label: label.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// The per-customer facts exemption status is derived from.
///
/// Each field is mutated independently (upload/delete, checkbox toggle,
/// date field); every mutation is a discrete fact change. `expiration` is a
/// Unix timestamp already normalized to 23:59:59 of the chosen calendar
/// date in the record owner's configured time zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionFacts {
    pub certificate: Option<CertificateRecord>,
    pub is_501c3: bool,
    pub expiration: Option<i64>,
}
