//! Uploaded reports and scans
//!
//! Files live on local disk under `<upload_dir>/<patient_id>/<record_id>.<ext>`;
//! only their metadata goes into the database. Photos are shrunk and
//! re-encoded as JPEG before they are written, PDFs are kept byte for byte.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, GenericImageView, ImageFormat};
use tracing::{debug, error, info, warn};

use clinic_desk_data::models::medical_record::NewMedicalRecord;
use clinic_desk_data::repository::{MedicalRecordRepositoryTrait, PatientRepositoryTrait};

use super::{validate_request, ServiceError};
use crate::entities::conversions::convert_to_domain_medical_record;
use crate::entities::medical_record::{MedicalRecord, MedicalRecordFile, UploadMedicalRecord};

/// Where uploads go and how images are optimised
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Longest edge of a stored image, in pixels
    pub image_max_dimension: u32,
    /// JPEG quality 1-100
    pub jpeg_quality: u8,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./data/uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            image_max_dimension: 1600,
            jpeg_quality: 80,
        }
    }
}

/// File types accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Jpeg,
    Png,
    Pdf,
}

impl UploadKind {
    /// Identify a file by its leading bytes
    pub fn sniff(bytes: &[u8]) -> Option<UploadKind> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(UploadKind::Jpeg)
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(UploadKind::Png)
        } else if bytes.starts_with(b"%PDF-") {
            Some(UploadKind::Pdf)
        } else {
            None
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            UploadKind::Jpeg => "image/jpeg",
            UploadKind::Png => "image/png",
            UploadKind::Pdf => "application/pdf",
        }
    }

    /// Whether a client-declared content type agrees with the sniffed one
    fn accepts_declared(&self, declared: &str) -> bool {
        let declared = declared.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        declared == self.mime()
            || declared == "application/octet-stream"
            || (*self == UploadKind::Jpeg && declared == "image/jpg")
    }
}

/// Shrink an image to fit `max_dimension` and re-encode it as JPEG
pub fn optimize_image(
    bytes: &[u8],
    kind: UploadKind,
    max_dimension: u32,
    quality: u8,
) -> Result<Vec<u8>, ServiceError> {
    let format = match kind {
        UploadKind::Jpeg => ImageFormat::Jpeg,
        UploadKind::Png => ImageFormat::Png,
        UploadKind::Pdf => return Ok(bytes.to_vec()),
    };

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ServiceError::UnsupportedMediaType(format!("Image could not be decoded: {}", e)))?;

    let (width, height) = decoded.dimensions();
    let resized = if width > max_dimension || height > max_dimension {
        debug!("Resizing {}x{} image to fit {}px", width, height, max_dimension);
        decoded.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    } else {
        decoded
    };

    let rgb = resized.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| ServiceError::Internal(format!("Failed to encode image: {}", e)))?;
    Ok(out.into_inner())
}

#[async_trait]
pub trait MedicalRecordServiceTrait: Send + Sync {
    async fn upload_record(
        &self,
        patient_id: &str,
        upload: UploadMedicalRecord,
        uploaded_by: Option<&str>,
    ) -> Result<MedicalRecord, ServiceError>;
    async fn list_records(&self, patient_id: &str) -> Result<Vec<MedicalRecord>, ServiceError>;
    async fn get_record(&self, id: &str) -> Result<MedicalRecord, ServiceError>;
    async fn download_record(&self, id: &str) -> Result<MedicalRecordFile, ServiceError>;
    /// Remove both the metadata row and the file
    async fn delete_record(&self, id: &str) -> Result<(), ServiceError>;
}

pub struct MedicalRecordService<M: MedicalRecordRepositoryTrait, P: PatientRepositoryTrait> {
    records: M,
    patients: P,
    settings: UploadSettings,
}

impl<M: MedicalRecordRepositoryTrait, P: PatientRepositoryTrait> MedicalRecordService<M, P> {
    pub fn new(records: M, patients: P, settings: UploadSettings) -> Self {
        Self {
            records,
            patients,
            settings,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Medical record with ID {} not found", id))
}

async fn remove_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => warn!("File {} was already gone", path.display()),
        Err(e) => error!("Failed to remove {}: {}", path.display(), e),
    }
}

#[async_trait]
impl<M, P> MedicalRecordServiceTrait for MedicalRecordService<M, P>
where
    M: MedicalRecordRepositoryTrait,
    P: PatientRepositoryTrait,
{
    async fn upload_record(
        &self,
        patient_id: &str,
        upload: UploadMedicalRecord,
        uploaded_by: Option<&str>,
    ) -> Result<MedicalRecord, ServiceError> {
        validate_request(&upload)?;

        if upload.bytes.is_empty() {
            return Err(ServiceError::Validation("file: Uploaded file is empty".to_string()));
        }
        if upload.bytes.len() > self.settings.max_upload_bytes {
            return Err(ServiceError::TooLarge(format!(
                "File is {} bytes, the limit is {}",
                upload.bytes.len(),
                self.settings.max_upload_bytes
            )));
        }

        let kind = UploadKind::sniff(&upload.bytes).ok_or_else(|| {
            ServiceError::UnsupportedMediaType("Only JPEG, PNG and PDF files are accepted".to_string())
        })?;
        if let Some(declared) = upload.content_type.as_deref() {
            if !kind.accepts_declared(declared) {
                return Err(ServiceError::UnsupportedMediaType(format!(
                    "Declared content type {} does not match the file ({})",
                    declared,
                    kind.mime()
                )));
            }
        }

        if self.patients.get_by_id(patient_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Patient with ID {} not found", patient_id)));
        }

        let original_size = upload.bytes.len();
        let (stored, content_type, extension) = match kind {
            UploadKind::Pdf => (upload.bytes, kind.mime(), "pdf"),
            UploadKind::Jpeg | UploadKind::Png => {
                let max_dimension = self.settings.image_max_dimension;
                let quality = self.settings.jpeg_quality;
                let bytes = upload.bytes;
                let optimized =
                    tokio::task::spawn_blocking(move || optimize_image(&bytes, kind, max_dimension, quality))
                        .await
                        .map_err(|e| ServiceError::Internal(format!("Image worker failed: {}", e)))??;
                (optimized, UploadKind::Jpeg.mime(), "jpg")
            }
        };

        let id = uuid::Uuid::new_v4().to_string();
        let directory = self.settings.upload_dir.join(patient_id);
        let path = directory.join(format!("{}.{}", id, extension));

        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| ServiceError::Internal(format!("Failed to create {}: {}", directory.display(), e)))?;
        tokio::fs::write(&path, &stored)
            .await
            .map_err(|e| ServiceError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;

        let saved = self
            .records
            .create(NewMedicalRecord {
                id,
                patient_id: patient_id.to_string(),
                record_type: upload.record_type,
                title: upload.title,
                file_name: upload.file_name,
                stored_path: path.to_string_lossy().to_string(),
                content_type: content_type.to_string(),
                size_bytes: stored.len() as u64,
                uploaded_by: uploaded_by.map(str::to_string),
            })
            .await;

        let record = match saved {
            Ok(record) => record,
            Err(e) => {
                remove_file(&path).await;
                return Err(e.into());
            }
        };

        info!(
            "Stored {} for patient {} ({} -> {} bytes)",
            record.id, patient_id, original_size, record.size_bytes
        );
        Ok(convert_to_domain_medical_record(record))
    }

    async fn list_records(&self, patient_id: &str) -> Result<Vec<MedicalRecord>, ServiceError> {
        let records = self.records.list_by_patient(patient_id).await?;
        Ok(records.into_iter().map(convert_to_domain_medical_record).collect())
    }

    async fn get_record(&self, id: &str) -> Result<MedicalRecord, ServiceError> {
        let record = self.records.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_medical_record(record))
    }

    async fn download_record(&self, id: &str) -> Result<MedicalRecordFile, ServiceError> {
        let entry = self.records.get_by_id(id).await?.ok_or_else(|| not_found(id))?;

        let bytes = match tokio::fs::read(&entry.stored_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!("File for medical record {} is missing at {}", id, entry.stored_path);
                return Err(ServiceError::NotFound(format!("File for medical record {} is missing", id)));
            }
            Err(e) => return Err(ServiceError::Internal(format!("Failed to read {}: {}", entry.stored_path, e))),
        };

        Ok(MedicalRecordFile {
            record: convert_to_domain_medical_record(entry),
            bytes,
        })
    }

    async fn delete_record(&self, id: &str) -> Result<(), ServiceError> {
        let entry = self.records.delete(id).await?.ok_or_else(|| not_found(id))?;
        remove_file(Path::new(&entry.stored_path)).await;
        info!("Deleted medical record {}", id);
        Ok(())
    }
}
