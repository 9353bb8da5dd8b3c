// src/services/upload.rs
use crate::config::StorageConfig;
use crate::error::AppError;
use actix_multipart::Multipart;
use futures::TryStreamExt;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A fully buffered `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Trimmed text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Reads the parts of `payload` named in `expected`. Parts with a filename
/// are files, the rest are UTF-8 text.
///
/// A file part under any other name is rejected. Other text parts are drained
/// unread. Each part is capped at `limits.max_file_size` and the whole body at
/// `limits.max_form_size`.
pub async fn collect_form(
    mut payload: Multipart,
    expected: &[&str],
    limits: &StorageConfig,
) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();
    let mut total = 0usize;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().map(str::to_owned);
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        let name = match name {
            Some(name) if expected.contains(&name.as_str()) => name,
            other if filename.as_deref().is_some_and(|f| !f.is_empty()) => {
                return Err(AppError::bad_request(format!(
                    "Unexpected field: {}",
                    other.unwrap_or_default()
                )));
            }
            _ => {
                while let Some(chunk) = field.try_next().await? {
                    total += chunk.len();
                    check_form_size(total, limits)?;
                }
                continue;
            }
        };
        let content_type = field.content_type().map(|m| m.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if data.len() + chunk.len() > limits.max_file_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "{name} exceeds the maximum upload size of {} bytes",
                    limits.max_file_size
                )));
            }
            total += chunk.len();
            check_form_size(total, limits)?;
            data.extend_from_slice(&chunk);
        }

        match filename {
            // Browsers send an empty file part when nothing was chosen
            Some(filename) if filename.is_empty() && data.is_empty() => {}
            Some(filename) => {
                form.files.insert(
                    name,
                    UploadedFile {
                        filename,
                        content_type,
                        data,
                    },
                );
            }
            None => {
                let text = String::from_utf8(data)
                    .map_err(|_| AppError::bad_request(format!("{name} is not valid UTF-8")))?;
                form.fields.insert(name, text);
            }
        }
    }

    Ok(form)
}

fn check_form_size(total: usize, limits: &StorageConfig) -> Result<(), AppError> {
    if total > limits.max_form_size {
        return Err(AppError::PayloadTooLarge(format!(
            "Request body exceeds {} bytes",
            limits.max_form_size
        )));
    }
    Ok(())
}
