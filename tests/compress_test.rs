// Post-compression テスト

use lopdf::{Document, Object, Stream, dictionary};
use snapmerge::pdf::optimizer::{
    compress_document, compress_file_in_place, compress_streams, delete_unused_objects,
};

/// Helper: create a PDF whose pages carry large, whitespace-heavy content streams.
fn create_verbose_pdf(num_pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for i in 0..num_pages {
        let op = format!("q    1   0   0   1   {i}   0   cm    Q\n");
        let content = Stream::new(dictionary! {}, op.repeat(400).into_bytes());
        let content_id = doc.add_object(content);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {},
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test PDF");
    buf
}

/// 各ページの Contents ストリームの先頭の cm 平行移動量（ページ順の識別子）。
fn page_markers(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).expect("load");
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = doc.get_page_content(id).expect("page content");
            let text = String::from_utf8_lossy(&content).to_string();
            text.split_whitespace().nth(5).unwrap_or_default().to_string()
        })
        .collect()
}

#[test]
fn test_compress_document_shrinks_and_keeps_pages() {
    let original = create_verbose_pdf(3);
    let compressed = compress_document(&original).expect("compress");

    assert!(compressed.len() < original.len());
    let doc = Document::load_mem(&compressed).expect("load compressed");
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(page_markers(&compressed), page_markers(&original));
}

#[test]
fn test_compress_streams_sets_flate_filter() {
    let original = create_verbose_pdf(1);
    let mut doc = Document::load_mem(&original).expect("load");
    let count = compress_streams(&mut doc);
    assert!(count >= 1);

    let flate = doc.objects.values().any(|obj| {
        obj.as_stream()
            .ok()
            .and_then(|s| s.dict.get(b"Filter").ok())
            .and_then(|f| f.as_name().ok())
            == Some(b"FlateDecode".as_slice())
    });
    assert!(flate);

    // 二重圧縮しない
    assert_eq!(compress_streams(&mut doc), 0);
}

#[test]
fn test_delete_unused_objects_drops_orphans() {
    let original = create_verbose_pdf(1);
    let mut doc = Document::load_mem(&original).expect("load");
    let orphan = doc.add_object(dictionary! { "Orphan" => true });
    delete_unused_objects(&mut doc);
    assert!(doc.get_object(orphan).is_err());
}

#[test]
fn test_compress_document_rejects_garbage() {
    assert!(compress_document(b"%PDF-1.5 truncated").is_err());
}

#[test]
fn test_compress_file_in_place_replaces_on_success() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("output.pdf");
    let original = create_verbose_pdf(2);
    std::fs::write(&path, &original).expect("write");

    let report = compress_file_in_place(&path).expect("compress in place");
    assert_eq!(report.original_size, original.len());

    let on_disk = std::fs::read(&path).expect("read back");
    assert_eq!(on_disk.len(), report.compressed_size);
    assert!(on_disk.len() < original.len());
    // 一時ファイルは残らない
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_compress_file_in_place_leaves_original_on_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("output.pdf");
    let junk = b"not a pdf at all".to_vec();
    std::fs::write(&path, &junk).expect("write");

    assert!(compress_file_in_place(&path).is_err());
    assert_eq!(std::fs::read(&path).unwrap(), junk);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
