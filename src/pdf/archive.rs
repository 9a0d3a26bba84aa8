// 分割モード: 単一ページPDFをZIPにまとめる

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// アーカイブ内の1エントリ。
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// 重複する名前に `_2`, `_3`, ... を付けてエントリ名を一意にする。
///
/// 入力順は保持され、拡張子 `extension` が付与される。
pub fn unique_entry_names(stems: &[String], extension: &str) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(stems.len());

    for stem in stems {
        let mut candidate = format!("{stem}.{extension}");
        let mut n = 1;
        while used.contains(&candidate) {
            n += 1;
            candidate = format!("{stem}_{n}.{extension}");
        }
        used.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

/// エントリ列をDeflate圧縮のZIPとして書き出す。
pub fn write_archive(entries: &[ArchiveEntry]) -> crate::error::Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)?;
        zip.write_all(&entry.bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
