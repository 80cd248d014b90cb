//! Small reusable predicates used when building streams, datasets and settings.
use std::ops::RangeInclusive;
use std::path::Path;

/// Validates a stream or collection name.
///
/// Names key children inside a collection and form the segments of a stream path, so
/// they must be non-empty and may not contain the path separator.
///
/// # Returns
///
/// * `Ok(())` if the name is usable.
/// * `Err(&'static str)` describing the problem otherwise.
pub fn is_valid_stream_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Stream name cannot be empty");
    }
    if name.contains('/') {
        return Err("Stream name cannot contain '/'");
    }
    if name.contains('\0') {
        return Err("Stream name cannot contain null bytes");
    }
    Ok(())
}

/// Validates if a given path is usable as a reader or writer location.
///
/// # Arguments
///
/// * `path` - The path to validate.
///
/// # Returns
///
/// * `Ok(())` if the file path is valid.
/// * `Err(&'static str)` if the file path is invalid.
pub fn is_valid_path(path: &Path) -> Result<(), &'static str> {
    if path.as_os_str().is_empty() {
        return Err("File path cannot be empty");
    }
    if path.to_string_lossy().contains('\0') {
        return Err("File path cannot contain null bytes");
    }
    Ok(())
}

/// Validates if a given value is within a specified numeric range.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates if a given string is not empty.
pub fn is_not_empty(value: &str) -> Result<(), &'static str> {
    if !value.is_empty() {
        Ok(())
    } else {
        Err("Value cannot be empty")
    }
}

/// Validates that a URL uses the http or https scheme.
pub fn is_http_url(url: &str) -> Result<(), &'static str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or("URL must start with http:// or https://")?;
    if rest.is_empty() {
        return Err("URL has no host");
    }
    Ok(())
}
