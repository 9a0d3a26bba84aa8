//! Output filename derivation.

use super::batch::FileRecord;

/// Final path component of `filename` with its last extension removed.
///
/// Upload names may carry client-side directories (`C:\scans\a.jpg`); only
/// the last segment is kept.
pub fn clean_name(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    match base.rsplit_once('.') {
        Some((stem, _ext)) => stem.trim().to_string(),
        None => base.to_string(),
    }
}

/// Longest upload name kept on disk, in bytes, before the ordering prefix.
pub const MAX_STORED_NAME_BYTES: usize = 200;

/// Zero-padded ordering prefix used for anything persisted per file.
///
/// The result is always a single writable path component: control characters
/// are dropped and the name is cut to [`MAX_STORED_NAME_BYTES`], keeping the
/// extension.
pub fn ordered_name(sequence_index: usize, filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let printable: String = base.chars().filter(|c| !c.is_control()).collect();
    let printable = printable.trim();
    let base = if printable.is_empty() || printable == "." || printable == ".." {
        "upload".to_string()
    } else {
        truncate_keeping_extension(printable, MAX_STORED_NAME_BYTES)
    };
    format!("{:03}_{}", sequence_index + 1, base)
}

fn truncate_keeping_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < max_bytes / 2 => (stem, Some(ext)),
        _ => (name, None),
    };
    let budget = max_bytes - ext.map_or(0, |e| e.len() + 1);
    let mut cut = budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }

    match ext {
        Some(ext) => format!("{}.{ext}", &stem[..cut]),
        None => stem[..cut].to_string(),
    }
}

/// Suggested output stem (no extension) for a document with `page_count` pages.
///
/// - one page: the cleaned name of that file
/// - several: `<first>_and_<N-1>_more_documents`
/// - no usable record: `merged_documents_<N>_pages`
pub fn derive_output_stem(records: &[FileRecord], page_count: usize) -> String {
    let first = records
        .first()
        .map(|r| clean_name(&r.original_name))
        .filter(|name| !name.is_empty());

    match (first, page_count) {
        (Some(name), 1) => name,
        (Some(name), n) if n > 1 => format!("{name}_and_{}_more_documents", n - 1),
        _ => format!("merged_documents_{page_count}_pages"),
    }
}

/// [`derive_output_stem`] with an extension appended.
pub fn derive_output_filename(records: &[FileRecord], page_count: usize, extension: &str) -> String {
    format!("{}.{extension}", derive_output_stem(records, page_count))
}
