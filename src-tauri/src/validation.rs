//! Input checks for the sign-in form and for file selections.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_FILES: usize = 150;
pub const MAX_FILE_SIZE_BYTES: u64 = 25 * 1024 * 1024;
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];
pub const MIN_PASSWORD_LEN: usize = 6;

/// Name, type and size of a file the user picked, before any bytes move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

fn is_allowed_mime(mime: &str) -> bool {
    let mime = mime.trim();
    ALLOWED_MIME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(mime))
}

/// Check a selection against the type, count and size rules. The first
/// failing rule rejects the whole selection.
///
/// `existing` is the number of files already staged in the session.
pub fn validate_file_selection(files: &[FileMeta], existing: usize) -> Result<(), String> {
    let invalid: Vec<&str> = files
        .iter()
        .filter(|f| !is_allowed_mime(&f.mime_type))
        .map(|f| f.name.as_str())
        .collect();
    if !invalid.is_empty() {
        return Err(format!(
            "Invalid file types: {}. Only PNG, JPG, and JPEG files are allowed.",
            invalid.join(", ")
        ));
    }

    if files.len() > MAX_FILES {
        return Err(format!("Maximum {} files allowed per upload.", MAX_FILES));
    }

    if existing + files.len() > MAX_FILES {
        return Err(format!(
            "Cannot upload {} files. Maximum total is {} files (currently have {}).",
            files.len(),
            MAX_FILES,
            existing
        ));
    }

    if let Some(big) = files.iter().find(|f| f.size > MAX_FILE_SIZE_BYTES) {
        return Err(format!("{} exceeds the 25MB size limit.", big.name));
    }

    Ok(())
}

/// Per-field messages for the sign-in form. Empty means the form may be
/// submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginFormErrors {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginFormErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }

    /// The first message, for callers that surface a single error.
    pub fn first(&self) -> Option<&str> {
        self.email.as_deref().or(self.password.as_deref())
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email.trim())
}

pub fn validate_login_form(email: &str, password: &str) -> LoginFormErrors {
    LoginFormErrors {
        email: (!is_valid_email(email)).then(|| "Invalid email address".to_string()),
        password: (password.chars().count() < MIN_PASSWORD_LEN)
            .then(|| format!("Password must be at least {} characters", MIN_PASSWORD_LEN)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, mime: &str, size: u64) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            mime_type: mime.to_string(),
            size,
        }
    }

    fn jpegs(n: usize) -> Vec<FileMeta> {
        (0..n)
            .map(|i| meta(&format!("DJI_{:04}.JPG", i), "image/jpeg", 4_000_000))
            .collect()
    }

    #[test]
    fn test_accepts_png_jpg_jpeg() {
        let files = vec![
            meta("a.png", "image/png", 10),
            meta("b.jpg", "image/jpg", 10),
            meta("c.jpeg", "image/jpeg", 10),
            meta("d.JPG", "IMAGE/JPEG", 10),
        ];
        assert_eq!(validate_file_selection(&files, 0), Ok(()));
    }

    #[test]
    fn test_rejects_other_types_naming_each() {
        let files = vec![
            meta("notes.pdf", "application/pdf", 10),
            meta("ok.png", "image/png", 10),
            meta("clip.gif", "image/gif", 10),
        ];
        assert_eq!(
            validate_file_selection(&files, 0).unwrap_err(),
            "Invalid file types: notes.pdf, clip.gif. Only PNG, JPG, and JPEG files are allowed."
        );
    }

    #[test]
    fn test_batch_limit() {
        assert!(validate_file_selection(&jpegs(150), 0).is_ok());
        assert_eq!(
            validate_file_selection(&jpegs(151), 0).unwrap_err(),
            "Maximum 150 files allowed per upload."
        );
    }

    #[test]
    fn test_total_limit_counts_staged_files() {
        assert!(validate_file_selection(&jpegs(10), 140).is_ok());
        assert_eq!(
            validate_file_selection(&jpegs(11), 140).unwrap_err(),
            "Cannot upload 11 files. Maximum total is 150 files (currently have 140)."
        );
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let at_limit = vec![meta("edge.png", "image/png", MAX_FILE_SIZE_BYTES)];
        assert!(validate_file_selection(&at_limit, 0).is_ok());

        let over = vec![
            meta("small.png", "image/png", 100),
            meta("huge.png", "image/png", MAX_FILE_SIZE_BYTES + 1),
        ];
        assert_eq!(
            validate_file_selection(&over, 0).unwrap_err(),
            "huge.png exceeds the 25MB size limit."
        );
    }

    #[test]
    fn test_type_error_reported_before_count() {
        let mut files = jpegs(151);
        files.push(meta("x.bmp", "image/bmp", 1));
        let err = validate_file_selection(&files, 0).unwrap_err();
        assert!(err.starts_with("Invalid file types: x.bmp."));
    }

    #[test]
    fn test_login_form_messages() {
        let errors = validate_login_form("not-an-email", "12345");
        assert_eq!(errors.email.as_deref(), Some("Invalid email address"));
        assert_eq!(
            errors.password.as_deref(),
            Some("Password must be at least 6 characters")
        );
        assert_eq!(errors.first(), Some("Invalid email address"));

        assert!(validate_login_form("ranger@reef.org", "123456").is_empty());
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("  dana.reef@uq.edu.au "));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@c.com"));
        assert!(!is_valid_email(""));
    }
}
