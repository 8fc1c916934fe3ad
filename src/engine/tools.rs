//! IDs, timestamps, filename and size helpers

use chrono::{DateTime, FixedOffset, Local};
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Timestamp layout used for ctime/utime/checked. Lexically sortable within one offset.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// "Never checked" marker for ledger entries.
pub const EPOCH: &str = "1970-01-01 00:00:00+00:00";

/// Characters rejected in filenames (portable across Windows and Unix).
const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Short, stable ID for a filename: CRC32 (IEEE) rendered in uppercase base 36.
///
/// Deterministic but not collision-free; callers must check for a different filename
/// already holding the ID.
pub fn name_to_id(name: &str) -> String {
    to_base36_upper(crc32fast::hash(name.as_bytes()))
}

pub fn names_to_ids(names: &[String]) -> Vec<String> {
    names.iter().map(|n| name_to_id(n)).collect()
}

fn to_base36_upper(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(7);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

pub fn now_string() -> String {
    format_timestamp(&now())
}

pub fn format_timestamp(t: &DateTime<FixedOffset>) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Parse a stored timestamp; `None` if it does not follow [`TIME_FORMAT`].
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, TIME_FORMAT).ok()
}

pub fn check_filename(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(FORBIDDEN_FILENAME_CHARS) {
        return Err(Error::Inconsistent(format!(
            "invalid filename {name:?}: must be non-empty and must not contain \\/:*?\"<>|"
        )));
    }
    Ok(())
}

/// Human-readable size: KB below 1 MB, MB below 1 GB, GB otherwise.
pub fn file_size_to_string(size: u64, fixed: usize) -> String {
    let size_gb = size as f64 / 1024.0 / 1024.0 / 1024.0;
    if size_gb >= 1.0 {
        return format!("{size_gb:.fixed$} GB");
    }
    let size_mb = size_gb * 1024.0;
    if size_mb >= 1.0 {
        return format!("{size_mb:.fixed$} MB");
    }
    format!("{:.fixed$} KB", size_mb * 1024.0)
}

/// Names of the regular files directly inside `dir` (no recursion, symlinks skipped), sorted.
pub fn regular_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
        })?;
        if entry.file_type().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// File type from the extension: a few families get their own prefix, the rest map to MIME.
pub fn type_by_filename(filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ext.is_empty() {
        return OCTET_STREAM.to_string();
    }
    match ext.as_str() {
        "zip" | "rar" | "7z" | "gz" | "tar" | "bz" | "bz2" | "xz" => format!("compressed/{ext}"),
        "md" | "json" | "xml" | "html" | "xhtml" | "htm" | "atom" | "rss" | "yaml" | "js"
        | "ts" | "go" | "py" | "cs" | "dart" | "rb" | "c" | "h" | "cpp" | "rs" => {
            format!("text/{ext}")
        }
        "doc" | "docx" | "ppt" | "pptx" | "rtf" | "xls" | "xlsx" => format!("office/{ext}"),
        "epub" | "mobi" | "azw" | "azw3" | "djvu" => format!("ebook/{ext}"),
        _ => mime_for_ext(&ext).unwrap_or(OCTET_STREAM).to_string(),
    }
}

const OCTET_STREAM: &str = "application/octet-stream";

fn mime_for_ext(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "txt" => "text/plain",
        "css" => "text/css",
        "csv" => "text/csv",
        "gif" => "image/gif",
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "svg" | "svgz" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "bmp" => "image/x-ms-bmp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "pdf" => "application/pdf",
        "ps" | "eps" | "ai" => "application/postscript",
        "wasm" => "application/wasm",
        "jar" | "war" | "ear" => "application/java-archive",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "mid" | "midi" | "kar" => "audio/midi",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "m4a" => "audio/x-m4a",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "3gpp" | "3gp" => "video/3gpp",
        "mp4" => "video/mp4",
        "mpeg" | "mpg" => "video/mpeg",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "flv" => "video/x-flv",
        "m4v" => "video/x-m4v",
        "wmv" => "video/x-ms-wmv",
        "avi" => "video/x-msvideo",
        _ => return None,
    };
    Some(mime)
}
