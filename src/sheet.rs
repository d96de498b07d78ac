//! Sheet Parser Module
//!
//! シートの行を走査し、デッキ名 → カードテキスト集合のマッピングを構築します。
//!
//! # 列の分類
//!
//! ```text
//! 列:     0 .. H-1 | H, H+1 | H+2, H+3 | ... | H+2P ..
//!         見出し命名 | テキスト,デッキ名 のペア × P | 範囲外
//! ```
//!
//! - 見出し命名領域: 最初の見出し行の各セルがその列のデッキ名、以降の行は1セル1カード
//! - 隣接列命名領域: ペアの1列目がカードテキスト、2列目がその行のデッキ名（見出し行なし）
//! - 範囲外: 値があれば異常として報告

use std::collections::BTreeMap;

use crate::diagnostics::{Anomaly, AnomalyKind, DiagnosticsSink};
use crate::error::ImportError;
use crate::normalizer::TextNormalizer;
use crate::types::{CellLocation, DeckCardMap, SheetCell, SheetRow};

/// シートの列構成
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    heading_named_count: u32,
    next_column_named_count: u32,
}

/// 列の所属領域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRegion {
    /// 見出し命名列
    Heading,
    /// 隣接列ペアのカードテキスト列
    PairText,
    /// 隣接列ペアのデッキ名列
    PairDeck,
    /// どちらの領域にも属さない列
    OutOfScope,
}

impl SheetLayout {
    /// # 引数
    ///
    /// * `heading_named_count` - 見出し命名列の数（H）
    /// * `next_column_named_count` - 隣接列命名ペアの数（P）
    ///
    /// # 戻り値
    ///
    /// * `Err(ImportError::Config)` - H + P が0、または H + 2P が`u32`に収まらない場合
    pub fn new(heading_named_count: u32, next_column_named_count: u32) -> Result<Self, ImportError> {
        if heading_named_count == 0 && next_column_named_count == 0 {
            return Err(ImportError::Config(
                "Heading named column count plus next column named count must be positive"
                    .to_string(),
            ));
        }

        next_column_named_count
            .checked_mul(2)
            .and_then(|pairs| pairs.checked_add(heading_named_count))
            .ok_or_else(|| {
                ImportError::Config(format!(
                    "Column counts are too large (heading named: {}, next column named: {})",
                    heading_named_count, next_column_named_count
                ))
            })?;

        Ok(Self {
            heading_named_count,
            next_column_named_count,
        })
    }

    pub fn heading_named_count(&self) -> u32 {
        self.heading_named_count
    }

    pub fn next_column_named_count(&self) -> u32 {
        self.next_column_named_count
    }

    /// 宣言された列の総数（H + 2P）
    pub fn column_span(&self) -> u32 {
        self.heading_named_count + 2 * self.next_column_named_count
    }

    /// 列がどの領域に属するかを判定する
    pub fn region_of(&self, col: u32) -> ColumnRegion {
        if col < self.heading_named_count {
            ColumnRegion::Heading
        } else if col < self.column_span() {
            if (col - self.heading_named_count) % 2 == 0 {
                ColumnRegion::PairText
            } else {
                ColumnRegion::PairDeck
            }
        } else {
            ColumnRegion::OutOfScope
        }
    }
}

/// 1シートを解析してデッキ→カードのマッピングを返す
///
/// 行は上から順に、各行のセルは列順に処理されます。カードの種類（黒/白）は
/// 呼び出し側の設定で決まり、ここでは判定しません。
///
/// # 引数
///
/// * `sheet` - 異常の位置情報に使うシート名
/// * `rows` - 行の並び（各行のセルは列順、空セルは含まない）
/// * `layout` - 列構成
/// * `normalizer` - カードテキストの正規化に使う変換器
/// * `sink` - 異常の報告先
pub fn parse_sheet<'a, I>(
    sheet: &str,
    rows: I,
    layout: SheetLayout,
    normalizer: &mut TextNormalizer,
    sink: &mut dyn DiagnosticsSink,
) -> DeckCardMap
where
    I: IntoIterator<Item = &'a SheetRow>,
{
    let mut cards = DeckCardMap::new();
    let mut headings: BTreeMap<u32, String> = BTreeMap::new();
    let mut headings_seen = false;

    for row in rows {
        let heading_row = !headings_seen
            && row
                .cells
                .iter()
                .any(|c| layout.region_of(c.col) == ColumnRegion::Heading && !c.content.is_empty());

        for cell in &row.cells {
            if cell.content.is_empty() {
                continue;
            }

            let location = CellLocation::new(sheet, row.index, cell.col);
            match layout.region_of(cell.col) {
                ColumnRegion::Heading if heading_row => {
                    let deck = cell.content.plain_text().trim().to_string();
                    if !deck.is_empty() {
                        log::debug!("Found deck heading '{}' at {}", deck, location);
                        cards.open_deck(deck.as_str());
                        headings.insert(cell.col, deck);
                    }
                }
                ColumnRegion::Heading => {
                    let text = normalizer.normalize_cell(&cell.content, Some(&location), sink);
                    if text.is_empty() {
                        continue;
                    }
                    match headings.get(&cell.col) {
                        Some(deck) => {
                            cards.insert(deck.as_str(), text);
                        }
                        None => sink.report(
                            Anomaly::new(
                                AnomalyKind::MissingHeading,
                                format!("Card '{}' is in a column without a deck heading.", text),
                            )
                            .with_text(text)
                            .with_location(location),
                        ),
                    }
                }
                ColumnRegion::PairText => {
                    let text = normalizer.normalize_cell(&cell.content, Some(&location), sink);
                    if text.is_empty() {
                        continue;
                    }
                    let deck = paired_deck_name(row, cell);
                    if deck.is_empty() {
                        sink.report(
                            Anomaly::new(
                                AnomalyKind::OrphanedCardText,
                                format!("Card '{}' has no deck name in the next column.", text),
                            )
                            .with_text(text)
                            .with_location(location),
                        );
                    } else {
                        cards.insert(deck, text);
                    }
                }
                // 対応するテキスト列側で処理済み
                ColumnRegion::PairDeck => {}
                ColumnRegion::OutOfScope => {
                    let raw = cell.content.plain_text();
                    if !raw.trim().is_empty() {
                        sink.report(
                            Anomaly::new(
                                AnomalyKind::AmbiguousColumn,
                                format!(
                                    "Value '{}' is outside the declared columns; ignoring.",
                                    raw.trim()
                                ),
                            )
                            .with_text(raw)
                            .with_location(location),
                        );
                    }
                }
            }
        }

        if heading_row {
            headings_seen = true;
        }
    }

    log::debug!(
        "Parsed sheet '{}': {} decks, {} cards",
        sheet,
        cards.len(),
        cards.card_count()
    );
    cards
}

/// ペアの2列目からデッキ名を読む（書式は無視、前後空白除去、セルがなければ空）
fn paired_deck_name(row: &SheetRow, text_cell: &SheetCell) -> String {
    row.cell(text_cell.col + 1)
        .map(|c| c.content.plain_text().trim().to_string())
        .unwrap_or_default()
}
