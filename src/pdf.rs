use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::{errors::AppError, items::DisplayItem};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const TOP: f32 = 270.0;
const BOTTOM: f32 = 20.0;
const LINE_STEP: f32 = 8.0;

fn mm(value: f32) -> Mm {
    Mm(value.into())
}

/// Everything the PDF layout needs about one receipt.
pub struct ReceiptDocument<'a> {
    pub business_name: &'a str,
    pub client_name: &'a str,
    pub date: &'a str,
    pub receipt_id: Option<i64>,
    pub items: &'a [DisplayItem],
    pub total: &'a str,
}

struct LineWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    y: f32,
}

impl<'a> LineWriter<'a> {
    fn write(&mut self, text: &str, size: f32, bold: bool) {
        if self.y < BOTTOM {
            let (page, layer) = self.doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
        let font = if bold { self.bold } else { self.regular };
        self.layer
            .use_text(text, size.into(), mm(MARGIN_LEFT), mm(self.y), font);
        self.y -= LINE_STEP;
    }

    fn skip(&mut self) {
        self.y -= LINE_STEP / 2.0;
    }
}

/// Lays the receipt out as a single-column PDF and returns the byte stream.
pub fn render_receipt_pdf(receipt: &ReceiptDocument) -> Result<Vec<u8>, AppError> {
    let (doc, page, layer) = PdfDocument::new("Receipt", mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::PdfError(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::PdfError(e.to_string()))?;

    let mut writer = LineWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        regular: &regular,
        bold: &bold,
        y: TOP,
    };

    writer.write(receipt.business_name, 18.0, true);
    match receipt.receipt_id {
        Some(id) => writer.write(&format!("Receipt #{} - {}", id, receipt.date), 11.0, false),
        None => writer.write(&format!("Receipt - {}", receipt.date), 11.0, false),
    }
    writer.write(&format!("Billed to: {}", receipt.client_name), 11.0, false);
    writer.skip();

    writer.write("Item    Qty    Unit price    Total", 11.0, true);
    for item in receipt.items {
        writer.write(
            &format!(
                "{}    {}    {}    {}",
                item.name, item.quantity, item.price, item.total
            ),
            11.0,
            false,
        );
    }
    writer.skip();
    writer.write(&format!("Grand total: {}", receipt.total), 13.0, true);

    doc.save_to_bytes()
        .map_err(|e| AppError::PdfError(e.to_string()))
}
