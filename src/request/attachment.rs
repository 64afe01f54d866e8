//! File attachments carried as `multipart/form-data` parts.

// std
use std::{fs, path::PathBuf};
// self
use crate::{error::ConfigError, http::MultipartPart};

/// One file sent with a request.
///
/// Contents are held in memory, so retries re-send the same bytes without touching the disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAttachment {
	/// Form field name; a random `file-<hex>` name is generated when unset.
	pub field: Option<String>,
	/// Contents.
	pub data: Vec<u8>,
	/// File name; falls back to the path's file name, then `<field>.jpg`.
	pub filename: Option<String>,
}
impl FileAttachment {
	/// Attachment backed by in-memory bytes.
	pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
		Self { field: None, data: data.into(), filename: None }
	}

	/// Reads the file at `path` once; its file name becomes the default part file name.
	pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
		let path = path.into();
		let data = fs::read(&path).map_err(|source| ConfigError::AttachmentRead {
			path: path.clone(),
			source,
		})?;
		let filename = path.file_name().map(|name| name.to_string_lossy().into_owned());

		Ok(Self { field: None, data, filename })
	}

	/// Sets the form field name.
	pub fn with_field(mut self, field: impl Into<String>) -> Self {
		self.field = Some(field.into());

		self
	}

	/// Sets the file name.
	pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
		self.filename = Some(filename.into());

		self
	}

	/// Resolves field and file names into a multipart part.
	pub fn to_part(&self) -> MultipartPart {
		let field = self.field.clone().unwrap_or_else(random_field_name);
		let filename = self.filename.clone().unwrap_or_else(|| format!("{field}.jpg"));

		MultipartPart::file(field, filename, self.data.clone())
	}
}

/// Generates a `file-<6 hex digits>` field name.
pub fn random_field_name() -> String {
	let bytes: [u8; 3] = rand::random();

	format!("file-{:02x}{:02x}{:02x}", bytes[0], bytes[1], bytes[2])
}

#[cfg(test)]
mod tests {
	// std
	use std::env;
	// self
	use super::*;

	#[test]
	fn random_field_names_are_short_hex() {
		let name = random_field_name();

		assert_eq!(name.len(), "file-".len() + 6);
		assert!(name["file-".len()..].bytes().all(|b| b.is_ascii_hexdigit()));
	}

	#[test]
	fn path_attachments_are_read_once() {
		let path = env::temp_dir().join(format!("rest-dispatch-{}.txt", random_field_name()));

		fs::write(&path, b"hello").expect("Temporary attachment should be writable.");

		let attachment = FileAttachment::from_path(&path)
			.expect("Readable attachments should load.")
			.with_field("doc");

		fs::remove_file(&path).expect("Temporary attachment should be removable.");

		let part = attachment.to_part();

		assert_eq!(part.name, "doc");
		assert_eq!(part.filename, path.file_name().map(|name| name.to_string_lossy().into_owned()));
		assert_eq!(part.data, b"hello".to_vec());
		assert_eq!(attachment.to_part().data, b"hello".to_vec());
	}

	#[test]
	fn unnamed_bytes_fall_back_to_the_field_name() {
		let part = FileAttachment::from_bytes(b"png".to_vec()).with_field("avatar").to_part();

		assert_eq!(part.filename.as_deref(), Some("avatar.jpg"));
	}

	#[test]
	fn missing_paths_surface_config_errors() {
		let err = FileAttachment::from_path("/definitely/not/here.png")
			.expect_err("Missing files should fail.");

		assert!(matches!(err, ConfigError::AttachmentRead { .. }));
	}
}
