//! Boundary Tests for cardsheet
//!
//! シートの端や空の領域、不正なファイルなどの境界条件を、実際のXLSXを通して検証します。

use cardsheet::{
    parse_sheet, Anomaly, AnomalyKind, DeckCardMap, ImportError, ReplacementTable, SheetLayout,
    TextNormalizer, WorkbookReader,
};
use rust_xlsxwriter::*;
use std::io::Cursor;

// Helper module for generating boundary test fixtures
mod fixtures {
    use super::*;

    /// Generate a workbook with an empty sheet (no cells)
    pub fn generate_empty_sheet() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("EmptySheet")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 使用範囲がA1から始まらないシート
    pub fn generate_offset_sheet() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(2, 1, "PAX")?;
        worksheet.write_string(3, 1, "Tentacles.")?;
        worksheet.write_string(5, 1, "Bees?")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 見出しのない列、空白だけの見出し、宣言範囲外の列を含むシート
    pub fn generate_irregular_columns() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Base")?;
        worksheet.write_string(0, 1, "   ")?;
        worksheet.write_string(1, 0, "A card.")?;
        worksheet.write_string(1, 2, "No heading here.")?;
        worksheet.write_string(1, 1, "Blank heading.")?;
        worksheet.write_string(1, 5, "Far away")?;
        worksheet.write_string(2, 0, "     ")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// 非常に長いセル内容
    pub fn generate_long_cell() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        // Excelのセル上限は32,767文字
        let mut long_text = String::from("Pick ");
        for _ in 0..2_000 {
            long_text.push_str("__________ and ");
        }
        long_text.push_str("done.");

        worksheet.write_string(0, 0, "Long")?;
        worksheet.write_string(1, 0, &long_text)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a corrupted/invalid Excel file
    pub fn generate_corrupted_file() -> Vec<u8> {
        b"This is not a valid Excel file content".to_vec()
    }

    /// ZIPヘッダーだけを持つ不正な構造
    pub fn generate_invalid_structure() -> Vec<u8> {
        let mut data = vec![0x50, 0x4B, 0x03, 0x04];
        data.extend_from_slice(b"INVALID_CONTENT");
        data
    }
}

fn parse_first_sheet(data: Vec<u8>, layout: SheetLayout) -> (DeckCardMap, Vec<Anomaly>) {
    let mut reader = WorkbookReader::open(Cursor::new(data)).unwrap();
    let name = reader.sheet_names()[0].clone();
    let rows = reader.read_sheet(&name).unwrap();

    let mut normalizer = TextNormalizer::new(ReplacementTable::empty(), true);
    let mut anomalies: Vec<Anomaly> = Vec::new();
    let cards = parse_sheet(&name, &rows, layout, &mut normalizer, &mut anomalies);
    (cards, anomalies)
}

#[test]
fn test_empty_sheet() {
    let data = fixtures::generate_empty_sheet().unwrap();
    let mut reader = WorkbookReader::open(Cursor::new(data.clone())).unwrap();
    assert!(reader.read_sheet("EmptySheet").unwrap().is_empty());

    let (cards, anomalies) = parse_first_sheet(data, SheetLayout::new(2, 1).unwrap());
    assert!(cards.is_empty());
    assert!(anomalies.is_empty());
}

#[test]
fn test_offset_range_keeps_absolute_positions() {
    let data = fixtures::generate_offset_sheet().unwrap();
    let mut reader = WorkbookReader::open(Cursor::new(data.clone())).unwrap();
    let rows = reader.read_sheet("Sheet1").unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].index, 2);
    assert_eq!(rows[2].index, 5);
    assert_eq!(rows[0].cells[0].col, 1);

    // B列は見出し2列の2列目
    let (cards, anomalies) = parse_first_sheet(data, SheetLayout::new(2, 0).unwrap());
    let pax = cards.get("PAX").unwrap();
    assert_eq!(pax.len(), 2);
    assert!(pax.contains("Tentacles."));
    assert!(anomalies.is_empty());
}

#[test]
fn test_irregular_columns() {
    let data = fixtures::generate_irregular_columns().unwrap();
    let (cards, anomalies) = parse_first_sheet(data, SheetLayout::new(3, 0).unwrap());

    assert_eq!(cards.len(), 1);
    assert_eq!(cards.card_count(), 1);
    assert!(cards.get("Base").unwrap().contains("A card."));

    let missing: Vec<_> = anomalies
        .iter()
        .filter(|a| a.kind == AnomalyKind::MissingHeading)
        .filter_map(|a| a.text.as_deref())
        .collect();
    assert_eq!(missing, vec!["Blank heading.", "No heading here."]);

    let ambiguous: Vec<_> = anomalies
        .iter()
        .filter(|a| a.kind == AnomalyKind::AmbiguousColumn)
        .collect();
    assert_eq!(ambiguous.len(), 1);
    assert_eq!(ambiguous[0].location.as_ref().unwrap().to_string(), "Sheet1!F2");
}

#[test]
fn test_very_long_cell_content() {
    let data = fixtures::generate_long_cell().unwrap();
    let (cards, anomalies) = parse_first_sheet(data, SheetLayout::new(1, 0).unwrap());

    let long = cards.get("Long").unwrap().iter().next().unwrap().clone();
    assert!(!long.contains("_____"));
    assert!(long.starts_with("Pick ____ and ____ and "));
    assert!(long.ends_with("and done."));
    assert_eq!(cardsheet::prompt::pick(&long), 2_000);
    assert_eq!(cardsheet::prompt::draw(&long), 1_999);
    assert!(anomalies.is_empty());
}

#[test]
fn test_corrupted_file() {
    let result = WorkbookReader::open(Cursor::new(fixtures::generate_corrupted_file()));
    assert!(result.is_err(), "Corrupted file should produce an error");

    match result {
        Err(ImportError::Zip(_)) | Err(ImportError::Parse(_)) | Err(ImportError::Io(_)) => {}
        Err(e) => panic!("Expected Zip, Parse or Io error for corrupted file, got {:?}", e),
        Ok(_) => unreachable!(),
    }
}

#[test]
fn test_invalid_structure() {
    let result = WorkbookReader::open(Cursor::new(fixtures::generate_invalid_structure()));
    assert!(result.is_err(), "Invalid structure should produce an error");
}
