// コンテンツストリーム再符号化、FlateDecode圧縮、孤立オブジェクト除去

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::SnapMergeError;

/// 圧縮結果のサイズ情報。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionReport {
    pub original_size: usize,
    pub compressed_size: usize,
}

/// 各ページのコンテンツストリームを再エンコードし、余分な空白を除去する。
pub fn compact_page_contents(doc: &mut Document) -> crate::error::Result<()> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let raw = doc.get_page_content(page_id)?;
        let compact = Content::decode(&raw)?.encode()?;
        doc.change_page_content(page_id, compact)?;
    }
    Ok(())
}

/// ドキュメント内の未圧縮ストリームにFlateDecode圧縮を適用する。
///
/// 既にフィルターが設定されているストリームはスキップする（二重圧縮防止）。
/// 圧縮しても小さくならないストリームはそのまま残す。
pub fn compress_streams(doc: &mut Document) -> usize {
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    let mut compressed_count = 0;

    for id in ids {
        let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
            continue;
        };
        if stream.dict.get(b"Filter").is_ok() {
            continue;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        if encoder.write_all(&stream.content).is_err() {
            continue;
        }
        let Ok(compressed) = encoder.finish() else {
            continue;
        };
        if compressed.len() >= stream.content.len() {
            continue;
        }

        stream.dict.set("Filter", "FlateDecode");
        stream.set_content(compressed);
        compressed_count += 1;
    }

    compressed_count
}

/// 孤立オブジェクト（どこからも参照されていないオブジェクト）を除去する。
pub fn delete_unused_objects(doc: &mut Document) {
    doc.prune_objects();
}

/// PDFバイト列を再シリアライズして圧縮する。
///
/// ページ数が変わった場合や元より大きくなった場合はエラーを返す
/// （呼び出し側は元のPDFを使い続ける）。
pub fn compress_document(pdf: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut doc = Document::load_mem(pdf)
        .map_err(|e| SnapMergeError::compression(format!("cannot parse PDF: {e}")))?;
    let page_count = doc.get_pages().len();

    compact_page_contents(&mut doc)
        .map_err(|e| SnapMergeError::compression(format!("cannot compact content: {e}")))?;
    let streams = compress_streams(&mut doc);
    delete_unused_objects(&mut doc);

    let mut out = Vec::with_capacity(pdf.len());
    doc.save_to(&mut out)
        .map_err(|e| SnapMergeError::compression(format!("cannot save PDF: {e}")))?;

    let reloaded = Document::load_mem(&out)
        .map_err(|e| SnapMergeError::compression(format!("compressed PDF unreadable: {e}")))?;
    if reloaded.get_pages().len() != page_count {
        return Err(SnapMergeError::compression(format!(
            "page count changed from {page_count} to {}",
            reloaded.get_pages().len()
        )));
    }
    if out.len() > pdf.len() {
        return Err(SnapMergeError::compression(format!(
            "compressed size {} exceeds original {}",
            out.len(),
            pdf.len()
        )));
    }

    debug!(
        streams,
        original = pdf.len(),
        compressed = out.len(),
        "PDF compressed"
    );
    Ok(out)
}

/// ファイルを圧縮し、成功した場合のみ元のファイルを置き換える。
///
/// 圧縮結果は同じディレクトリの一時ファイルに書き出してからリネームするため、
/// 失敗時に元のPDFが壊れることはない。
pub fn compress_file_in_place(path: &Path) -> crate::error::Result<CompressionReport> {
    let original = std::fs::read(path)?;
    let compressed = compress_document(&original)?;

    let dir = path
        .parent()
        .ok_or_else(|| SnapMergeError::compression("output path has no parent directory"))?;
    let mut side = NamedTempFile::new_in(dir)?;
    side.write_all(&compressed)?;
    side.as_file().sync_all()?;
    side.persist(path)
        .map_err(|e| SnapMergeError::compression(format!("cannot replace output: {e}")))?;

    Ok(CompressionReport {
        original_size: original.len(),
        compressed_size: compressed.len(),
    })
}
