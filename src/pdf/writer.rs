// 画像XObject構築、ページ配置、コンテンツストリーム組立

use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use tracing::debug;

use crate::error::SnapMergeError;
use crate::imaging::DecodedImage;
use crate::imaging::jpeg::encode_rgb_to_jpeg;

/// ページ内で画像を参照するXObject名
const IMAGE_NAME: &str = "Im0";

/// 固定ページサイズと余白（単位: pt）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageLayout {
    pub fn usable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn usable_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

/// ページ上の画像の配置（左下原点, pt）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// 画像を余白内に収まるよう縦横比を保って拡縮し、中央に配置する。
///
/// `scale = min(usable_w / img_w, usable_h / img_h)`。切り取りも歪みも発生しない。
pub fn fit_to_page(img_width: u32, img_height: u32, layout: &PageLayout) -> Placement {
    let usable_w = layout.usable_width();
    let usable_h = layout.usable_height();
    let scale = f32::min(
        usable_w / img_width.max(1) as f32,
        usable_h / img_height.max(1) as f32,
    );
    let width = img_width as f32 * scale;
    let height = img_height as f32 * scale;
    Placement {
        x: layout.margin + (usable_w - width) / 2.0,
        y: layout.margin + (usable_h - height) / 2.0,
        width,
        height,
    }
}

/// 1ページ1画像でPDFを組み立てる。
pub struct PageWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    layout: PageLayout,
    quality: u8,
}

impl PageWriter {
    pub fn new(layout: PageLayout, quality: u8) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            layout,
            quality,
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// JPEG画像XObjectを追加する。
    ///
    /// 戻り値はXObjectのオブジェクトID。
    pub fn add_image_xobject(&mut self, jpeg_data: Vec<u8>, width: u32, height: u32) -> ObjectId {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let stream = Stream::new(dict, jpeg_data);
        self.doc.add_object(Object::Stream(stream))
    }

    /// 配置情報から画像描画用のコンテンツストリームを生成する。
    ///
    /// `q <w> 0 0 <h> <x> <y> cm /<name> Do Q`
    pub fn build_image_content_stream(name: &str, placement: &Placement) -> Vec<u8> {
        format!(
            "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /{} Do Q",
            placement.width, placement.height, placement.x, placement.y, name
        )
        .into_bytes()
    }

    /// 画像を固定品質でJPEG再エンコードし、新しいページとして追加する。
    pub fn add_image_page(&mut self, image: &DecodedImage) -> crate::error::Result<ObjectId> {
        let (width, height) = image.dimensions();
        let jpeg = encode_rgb_to_jpeg(image.pixels(), self.quality)?;
        let image_id = self.add_image_xobject(jpeg, width, height);

        let placement = fit_to_page(width, height, &self.layout);
        let content = Self::build_image_content_stream(IMAGE_NAME, &placement);
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.layout.width),
                Object::Real(self.layout.height),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_NAME => image_id,
                },
            },
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());

        debug!(
            page = self.kids.len(),
            width,
            height,
            placement = ?placement,
            "page added"
        );
        Ok(page_id)
    }

    /// Pagesノードとカタログを設定し、ドキュメントを確定する。
    pub fn finish(mut self) -> crate::error::Result<Document> {
        if self.kids.is_empty() {
            return Err(SnapMergeError::pdf_creation("document has no pages"));
        }

        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        Ok(self.doc)
    }
}

/// PDFドキュメントをバイト列として出力する。
pub fn save_to_bytes(mut doc: Document) -> crate::error::Result<Vec<u8>> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| SnapMergeError::pdf_creation(e.to_string()))?;
    Ok(buf)
}

/// 画像列を順番通りに1ページずつ配置したPDFを生成する。
pub fn render_document(
    images: &[DecodedImage],
    layout: PageLayout,
    quality: u8,
) -> crate::error::Result<Vec<u8>> {
    let mut writer = PageWriter::new(layout, quality);
    for image in images {
        writer.add_image_page(image)?;
    }
    save_to_bytes(writer.finish()?)
}
