//! XML Rich Text Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得できないリッチテキストのラン情報を抽出するモジュール。
//!
//! - `xl/sharedStrings.xml`: 共有文字列（`<si>`）ごとのラン列
//! - `xl/workbook.xml` + `xl/_rels/workbook.xml.rels`: シート名 → ワークシートパート
//! - `xl/worksheets/*.xml`: 共有文字列を参照するセル（`t="s"`）とインライン文字列（`<is>`）

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::ImportError;
use crate::security::SecurityConfig;
use crate::types::{RunStyle, StyledRun};

/// セル座標（行, 列）→ ラン列
type RichCells = HashMap<(u32, u32), Vec<StyledRun>>;

/// ワークブック内のリッチテキスト索引
///
/// 書式付きのランを1つ以上含むセルのみを保持します。
/// 書式のないセルはcalamineの値をそのまま使用します。
#[derive(Debug, Clone, Default)]
pub(crate) struct RichTextIndex {
    /// 共有文字列インデックス順のラン列
    shared_strings: Vec<Vec<StyledRun>>,
    /// シート名 → 書式付きセル
    sheets: HashMap<String, RichCells>,
}

impl RichTextIndex {
    /// XLSXアーカイブからリッチテキスト情報を解析
    ///
    /// # 引数
    ///
    /// * `xlsx_reader` - XLSXファイルを読み込むためのリーダー
    /// * `security` - アーカイブに適用するセキュリティ制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(RichTextIndex)` - 解析に成功した場合
    /// * `Err(ImportError)` - アーカイブが不正、またはセキュリティ制限に違反した場合
    pub fn new<R: Read + Seek>(
        xlsx_reader: R,
        security: &SecurityConfig,
    ) -> Result<Self, ImportError> {
        let mut archive = ZipArchive::new(xlsx_reader)?;
        security.check_archive(&mut archive)?;

        let shared_strings = match security.read_part(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let relationships = match security.read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let declared_sheets = match security.read_part(&mut archive, "xl/workbook.xml")? {
            Some(xml) => parse_workbook_sheets(&xml)?,
            None => Vec::new(),
        };

        let mut sheets = HashMap::new();
        for (name, relationship_id) in declared_sheets {
            let part = relationships
                .get(&relationship_id)
                .map(|target| resolve_workbook_target(target));

            if let Some(part) = part {
                if let Some(xml) = security.read_part(&mut archive, &part)? {
                    let cells = parse_worksheet(&xml, &shared_strings)?;
                    log::trace!("Sheet '{}' ({}) has {} rich text cells", name, part, cells.len());
                    if !cells.is_empty() {
                        sheets.insert(name, cells);
                    }
                }
            }
        }

        Ok(Self {
            shared_strings,
            sheets,
        })
    }

    /// 指定セルのラン列（書式付きのランを含むセルのみ）
    pub fn runs(&self, sheet_name: &str, row: u32, col: u32) -> Option<&[StyledRun]> {
        self.sheets
            .get(sheet_name)
            .and_then(|cells| cells.get(&(row, col)))
            .map(|runs| runs.as_slice())
    }

    pub fn shared_string_count(&self) -> usize {
        self.shared_strings.len()
    }
}

/// xl/sharedStrings.xml の解析
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<Vec<StyledRun>>, ImportError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(ImportError::xml)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                strings.push(read_string_item(&mut reader, b"si")?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                strings.push(Vec::new());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// `<si>`または`<is>`の内容をラン列として読み込む
///
/// 呼び出し時点でリーダーは開始タグの直後にあり、対応する終了タグまで消費します。
/// `<rPh>`（ふりがな）の内容は無視します。
fn read_string_item(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<Vec<StyledRun>, ImportError> {
    let mut buf = Vec::new();
    let mut runs = Vec::new();
    let mut text = String::new();
    let mut style: Option<RunStyle> = None;
    let mut in_run = false;
    let mut in_props = false;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(ImportError::xml)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"rPh" => phonetic_depth += 1,
                _ if phonetic_depth > 0 => {}
                b"r" => {
                    in_run = true;
                    text.clear();
                    style = None;
                }
                b"rPr" if in_run => {
                    in_props = true;
                    style = Some(RunStyle::default());
                }
                b"t" => in_text = true,
                tag if in_props => apply_run_property(&mut style, tag, &e)?,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                _ if phonetic_depth > 0 => {}
                b"rPr" if in_run => style = Some(RunStyle::default()),
                tag if in_props => apply_run_property(&mut style, tag, &e)?,
                _ => {}
            },
            Event::Text(e) => {
                if in_text && phonetic_depth == 0 {
                    text.push_str(&e.unescape().map_err(ImportError::xml)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ if phonetic_depth > 0 => {}
                b"t" => in_text = false,
                b"rPr" => in_props = false,
                b"r" if in_run => {
                    runs.push(StyledRun::new(std::mem::take(&mut text), style.take()));
                    in_run = false;
                }
                tag if tag == end => break,
                _ => {}
            },
            Event::Eof => {
                return Err(ImportError::Xml(format!(
                    "Unexpected end of document inside <{}>",
                    String::from_utf8_lossy(end)
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    // <r>を持たない単純な文字列
    if runs.is_empty() && !text.is_empty() {
        runs.push(StyledRun::plain(text));
    }

    Ok(runs)
}

/// `<rPr>`の子要素を書式記述子に反映する
fn apply_run_property(
    style: &mut Option<RunStyle>,
    tag: &[u8],
    element: &BytesStart<'_>,
) -> Result<(), ImportError> {
    let flags = style.get_or_insert_with(RunStyle::default);
    match tag {
        b"b" => flags.bold = is_toggle_on(attribute_value(element, b"val")?.as_deref()),
        b"i" => flags.italic = is_toggle_on(attribute_value(element, b"val")?.as_deref()),
        b"u" => flags.underline = attribute_value(element, b"val")?.as_deref() != Some("none"),
        _ => {}
    }
    Ok(())
}

/// `<b/>`、`<b val="1"/>`は有効、`val="0"`、`val="false"`は無効
fn is_toggle_on(value: Option<&str>) -> bool {
    !matches!(value, Some("0") | Some("false"))
}

fn attribute_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ImportError> {
    for attr in element.attributes() {
        let attr = attr.map_err(ImportError::xml)?;
        if attr.key.local_name().as_ref() == key {
            let raw = std::str::from_utf8(&attr.value)?;
            return Ok(Some(unescape(raw).map_err(ImportError::xml)?.into_owned()));
        }
    }
    Ok(None)
}

/// リレーションシップファイルの解析（Id → Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, ImportError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(ImportError::xml)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attribute_value(&e, b"Id")?;
                let target = attribute_value(&e, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    relationships.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// xl/workbook.xml の`<sheet>`要素を文書順に解析（シート名, リレーションシップID）
fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>, ImportError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(ImportError::xml)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute_value(&e, b"name")?;
                // `r:id`のローカル名
                let id = attribute_value(&e, b"id")?;
                if let (Some(name), Some(id)) = (name, id) {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// ワークブックからの相対ターゲットをアーカイブ内パスに変換
/// （"worksheets/sheet1.xml" → "xl/worksheets/sheet1.xml"）
fn resolve_workbook_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// ワークシートXMLから書式付き文字列セルを抽出
fn parse_worksheet(xml: &[u8], shared_strings: &[Vec<StyledRun>]) -> Result<RichCells, ImportError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut cells = RichCells::new();

    // `r`属性のない行は直前の行の次（最初の行は0）
    let mut last_row: Option<u32> = None;
    let mut next_col: u32 = 0;
    let mut cell: Option<(u32, u32)> = None;
    let mut cell_type: Option<String> = None;
    let mut in_value = false;
    let mut value = String::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(ImportError::xml)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    let row = match attribute_value(&e, b"r")? {
                        Some(r) => parse_one_based(&r)?,
                        None => last_row.map_or(0, |r| r + 1),
                    };
                    last_row = Some(row);
                    next_col = 0;
                }
                b"c" => {
                    let coord = cell_coordinate(&e, last_row.unwrap_or(0), next_col)?;
                    next_col = coord.1 + 1;
                    cell = Some(coord);
                    cell_type = attribute_value(&e, b"t")?;
                    value.clear();
                }
                b"v" if cell.is_some() => in_value = true,
                b"is" => {
                    let runs = read_string_item(&mut reader, b"is")?;
                    if let Some(coord) = cell {
                        if has_styled_run(&runs) {
                            cells.insert(coord, runs);
                        }
                    }
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let coord = cell_coordinate(&e, last_row.unwrap_or(0), next_col)?;
                next_col = coord.1 + 1;
            }
            Event::Text(e) => {
                if in_value {
                    value.push_str(&e.unescape().map_err(ImportError::xml)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"c" => {
                    if let (Some(coord), Some("s")) = (cell.take(), cell_type.as_deref()) {
                        let runs = value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|index| shared_strings.get(index));
                        if let Some(runs) = runs {
                            if has_styled_run(runs) {
                                cells.insert(coord, runs.clone());
                            }
                        }
                    }
                    cell_type = None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

fn has_styled_run(runs: &[StyledRun]) -> bool {
    runs.iter().any(|r| r.style.is_some())
}

/// `<c>`の`r`属性から座標を得る（属性がなければ直前のセルの次の列）
fn cell_coordinate(
    element: &BytesStart<'_>,
    current_row: u32,
    next_col: u32,
) -> Result<(u32, u32), ImportError> {
    match attribute_value(element, b"r")? {
        Some(reference) => parse_cell_ref(&reference).ok_or_else(|| {
            ImportError::Xml(format!("Invalid cell reference: {}", reference))
        }),
        None => Ok((current_row, next_col)),
    }
}

/// 1始まりの行番号を0始まりに変換
fn parse_one_based(value: &str) -> Result<u32, ImportError> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| ImportError::Xml(format!("Invalid row number: {}", value)))
}

/// セル参照文字列を座標に変換（例: "A1" -> (0, 0), "$B$3" -> (2, 1)）
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters.chars().try_fold(0u32, |acc, ch| {
        let value = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        acc.checked_mul(26)?.checked_add(value)
    })?;
    let row = digits.parse::<u32>().ok()?.checked_sub(1)?;

    Some((row, col - 1))
}
