//! Input validation for API requests.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for upload filenames: no separators, no traversal.
    static ref FILENAME_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9][A-Za-z0-9._-]*$"
    ).unwrap();
}

/// Maximum number of entries in tools/steps lists.
const MAX_LIST_ITEMS: usize = 20;
/// Maximum length of a single tools/steps entry.
const MAX_LIST_ITEM_LEN: usize = 200;

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }
    if title.len() > 200 {
        return Err("Title is too long (max 200 characters)".to_string());
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), String> {
    if description.trim().is_empty() {
        return Err("Description is required".to_string());
    }
    if description.len() > 5000 {
        return Err("Description is too long (max 5000 characters)".to_string());
    }
    Ok(())
}

pub fn validate_required_text(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    if value.len() > 5000 {
        return Err(format!("{} is too long (max 5000 characters)", label));
    }
    Ok(())
}

/// Validate a tools/steps style list
pub fn validate_string_list(items: &[String], label: &str) -> Result<(), String> {
    if items.len() > MAX_LIST_ITEMS {
        return Err(format!("{} has too many entries (max {})", label, MAX_LIST_ITEMS));
    }
    for item in items {
        if item.len() > MAX_LIST_ITEM_LEN {
            return Err(format!(
                "{} entry is too long (max {} characters)",
                label, MAX_LIST_ITEM_LEN
            ));
        }
    }
    Ok(())
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

/// Validate an upload filename
pub fn validate_filename(filename: &str) -> Result<(), String> {
    if filename.is_empty() {
        return Err("Filename is required".to_string());
    }

    if filename.len() > 128 {
        return Err("Filename is too long (max 128 characters)".to_string());
    }

    if filename.contains("..") || !FILENAME_REGEX.is_match(filename) {
        return Err("Filename may only contain letters, digits, '.', '_' and '-'".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert!(validate_title("My first automation").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("Useful context").is_ok());
        assert!(validate_description("").is_err());
        assert!(validate_description(&"x".repeat(5001)).is_err());
    }

    #[test]
    fn test_validate_string_list() {
        assert!(validate_string_list(&["ChatGPT".to_string()], "tools").is_ok());
        assert!(validate_string_list(&[], "tools").is_ok());

        let too_many: Vec<String> = (0..21).map(|i| i.to_string()).collect();
        assert!(validate_string_list(&too_many, "tools").is_err());

        let too_long = vec!["x".repeat(201)];
        assert!(validate_string_list(&too_long, "steps").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "user_id").is_ok());
        assert!(validate_uuid("", "user_id").is_err());
        assert!(validate_uuid("not-a-uuid", "user_id").is_err());
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("screenshot.png").is_ok());
        assert!(validate_filename("report_v2-final.jpg").is_ok());

        assert!(validate_filename("").is_err());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a/b.png").is_err());
        assert!(validate_filename(".hidden").is_err());
    }
}
