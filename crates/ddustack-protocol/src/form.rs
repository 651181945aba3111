//! `multipart/form-data` bodies for file uploads.
//!
//! The API only takes one kind of upload (the profile avatar), so this
//! covers a single file field and nothing else.

use std::fmt;

/// One file to send as a form field.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name the API reads the file from.
    pub field: String,
    pub filename: String,
    /// MIME type of the file itself, e.g. `image/png`.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(
        field: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Encodes the part as a complete form body delimited by `boundary`.
    ///
    /// Returns the body's own content type (which carries the boundary)
    /// and its bytes.
    pub fn encode(&self, boundary: &str) -> (String, Vec<u8>) {
        let head = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: {}\r\n\r\n",
            quoted(&self.field),
            quoted(&self.filename),
            self.content_type,
        );
        let tail = format!("\r\n--{boundary}--\r\n");

        let mut body = Vec::with_capacity(head.len() + self.bytes.len() + tail.len());
        body.extend_from_slice(head.as_bytes());
        body.extend_from_slice(&self.bytes);
        body.extend_from_slice(tail.as_bytes());

        (format!("multipart/form-data; boundary={boundary}"), body)
    }
}

// Same escaping browsers apply to form-data names.
fn quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("field", &self.field)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
