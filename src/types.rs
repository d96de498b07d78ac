//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// テキストランの書式記述子
///
/// 認識する書式は太字・斜体・下線の3種類のみです。
/// それ以外の書式（フォント、色など）しか持たないランは、
/// すべてのフラグが`false`の記述子として表現されます。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RunStyle {
    /// 太字かどうか
    pub bold: bool,
    /// 斜体かどうか
    pub italic: bool,
    /// 下線かどうか
    pub underline: bool,
}

impl RunStyle {
    /// 太字のみの記述子
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    /// 斜体のみの記述子
    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::default()
        }
    }

    /// 下線のみの記述子
    pub fn underline() -> Self {
        Self {
            underline: true,
            ..Self::default()
        }
    }

    /// 認識可能な書式が1つでも設定されているか
    pub fn is_recognized(&self) -> bool {
        self.bold || self.italic || self.underline
    }
}

/// 同じ書式を共有する連続したテキスト区間
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    /// テキスト内容
    pub text: String,
    /// 書式記述子（`None`は書式なしのラン）
    pub style: Option<RunStyle>,
}

impl StyledRun {
    /// 書式付きのランを生成
    pub fn new(text: impl Into<String>, style: Option<RunStyle>) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// 書式なしのランを生成
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }

    /// 書式記述子付きのランを生成
    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self::new(text, Some(style))
    }
}

/// セルの内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    /// プレーン文字列（数値などもここに文字列化して格納）
    Plain(String),
    /// リッチテキスト（文書順のラン列）
    Styled(Vec<StyledRun>),
}

impl CellContent {
    /// 書式を無視したテキスト全体
    pub fn plain_text(&self) -> String {
        match self {
            CellContent::Plain(s) => s.clone(),
            CellContent::Styled(runs) => runs.iter().map(|r| r.text.as_str()).collect(),
        }
    }

    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        match self {
            CellContent::Plain(s) => s.is_empty(),
            CellContent::Styled(runs) => runs.iter().all(|r| r.text.is_empty()),
        }
    }
}

/// 行内の1セル（列インデックスは0始まりの絶対位置）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCell {
    pub col: u32,
    pub content: CellContent,
}

impl SheetCell {
    pub fn plain(col: u32, text: impl Into<String>) -> Self {
        Self {
            col,
            content: CellContent::Plain(text.into()),
        }
    }

    pub fn styled(col: u32, runs: Vec<StyledRun>) -> Self {
        Self {
            col,
            content: CellContent::Styled(runs),
        }
    }
}

/// シートの1行
///
/// `cells`は列順に並び、値のないセルは含まれません（疎な表現）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    /// 行インデックス（0始まり）
    pub index: u32,
    pub cells: Vec<SheetCell>,
}

impl SheetRow {
    pub fn new(index: u32, cells: Vec<SheetCell>) -> Self {
        Self { index, cells }
    }

    /// プレーン文字列の並びから行を生成する（空文字列のセルは省略）
    pub fn from_texts<S: AsRef<str>>(index: u32, texts: &[S]) -> Self {
        let cells = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.as_ref().is_empty())
            .map(|(col, t)| SheetCell::plain(col as u32, t.as_ref()))
            .collect();
        Self { index, cells }
    }

    /// 指定列のセルを取得
    pub fn cell(&self, col: u32) -> Option<&SheetCell> {
        self.cells
            .binary_search_by_key(&col, |c| c.col)
            .ok()
            .map(|i| &self.cells[i])
    }
}

/// カードの種類
///
/// 黒カード（お題カード）と白カード（回答カード）。
/// シートごとの設定値であり、パーサーが推測することはありません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    Black,
    White,
}

impl fmt::Display for CardColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardColor::Black => write!(f, "black"),
            CardColor::White => write!(f, "white"),
        }
    }
}

/// デッキ名 → カードテキスト集合のマッピング
///
/// カードテキストは集合として保持されるため、同じテキストの重複挿入は無視されます。
/// 反復順序はデッキ名・テキストの辞書順で決定的です。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckCardMap {
    decks: BTreeMap<String, BTreeSet<String>>,
}

impl DeckCardMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// デッキの空集合を用意する（既に存在する場合は何もしない）
    pub fn open_deck(&mut self, deck: impl Into<String>) {
        self.decks.entry(deck.into()).or_default();
    }

    /// カードを追加する。新規に追加された場合は`true`
    pub fn insert(&mut self, deck: impl Into<String>, text: impl Into<String>) -> bool {
        self.decks.entry(deck.into()).or_default().insert(text.into())
    }

    /// カード集合をデッキに合併する
    pub fn union_into<I>(&mut self, deck: impl Into<String>, cards: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.decks.entry(deck.into()).or_default().extend(cards);
    }

    pub fn get(&self, deck: &str) -> Option<&BTreeSet<String>> {
        self.decks.get(deck)
    }

    pub fn contains_deck(&self, deck: &str) -> bool {
        self.decks.contains_key(deck)
    }

    pub fn decks(&self) -> impl Iterator<Item = &str> {
        self.decks.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.decks.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// デッキ数
    pub fn len(&self) -> usize {
        self.decks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }

    /// 全デッキのカード枚数の合計
    pub fn card_count(&self) -> usize {
        self.decks.values().map(|s| s.len()).sum()
    }
}

impl IntoIterator for DeckCardMap {
    type Item = (String, BTreeSet<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, BTreeSet<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.decks.into_iter()
    }
}

impl<D, T> FromIterator<(D, T)> for DeckCardMap
where
    D: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (D, T)>>(iter: I) -> Self {
        let mut map = DeckCardMap::new();
        for (deck, text) in iter {
            map.insert(deck, text);
        }
        map
    }
}

/// 異常の発生位置（0始まり）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLocation {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
}

impl CellLocation {
    pub fn new(sheet: impl Into<String>, row: u32, col: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    pub fn to_a1_notation(&self) -> String {
        format!("{}{}", col_index_to_letter(self.col), self.row + 1)
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.to_a1_notation())
    }
}

/// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
fn col_index_to_letter(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_style_recognized() {
        assert!(!RunStyle::default().is_recognized());
        assert!(RunStyle::bold().is_recognized());
        assert!(RunStyle::italic().is_recognized());
        assert!(RunStyle::underline().is_recognized());
    }

    #[test]
    fn test_cell_content_plain_text() {
        let content = CellContent::Styled(vec![
            StyledRun::plain("You said "),
            StyledRun::styled("what", RunStyle::bold()),
            StyledRun::plain("?"),
        ]);
        assert_eq!(content.plain_text(), "You said what?");
        assert!(!content.is_empty());
        assert!(CellContent::Plain(String::new()).is_empty());
    }

    #[test]
    fn test_sheet_row_from_texts_skips_empty() {
        let row = SheetRow::from_texts(3, &["a", "", "c"]);
        assert_eq!(row.index, 3);
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.cells[1].col, 2);
        assert!(row.cell(1).is_none());
        assert_eq!(row.cell(2).map(|c| c.content.plain_text()), Some("c".to_string()));
    }

    #[test]
    fn test_deck_card_map_deduplicates() {
        let mut map = DeckCardMap::new();
        assert!(map.insert("Red", "card"));
        assert!(!map.insert("Red", "card"));
        map.open_deck("Blue");

        assert_eq!(map.len(), 2);
        assert_eq!(map.card_count(), 1);
        assert!(map.get("Blue").unwrap().is_empty());
    }

    #[test]
    fn test_deck_card_map_from_iter() {
        let map: DeckCardMap = vec![("A", "x"), ("A", "y"), ("B", "x")].into_iter().collect();
        assert_eq!(map.decks().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(map.get("A").unwrap().len(), 2);
    }

    #[test]
    fn test_card_color_serde() {
        let color: CardColor = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(color, CardColor::Black);
        assert!(serde_json::from_str::<CardColor>("\"green\"").is_err());
        assert_eq!(CardColor::White.to_string(), "white");
    }

    #[test]
    fn test_cell_location_a1() {
        assert_eq!(CellLocation::new("S", 0, 0).to_a1_notation(), "A1");
        assert_eq!(CellLocation::new("S", 9, 26).to_a1_notation(), "AA10");
        assert_eq!(CellLocation::new("Whites", 1, 1).to_string(), "Whites!B2");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_a1_notation_row_part(row in 0u32..10000, col in 0u32..10000) {
                let a1 = CellLocation::new("S", row, col).to_a1_notation();
                prop_assert!(a1.chars().next().unwrap().is_ascii_uppercase());
                let row_part: String = a1.chars().filter(|c| c.is_ascii_digit()).collect();
                prop_assert_eq!(row_part.parse::<u32>().unwrap(), row + 1);
            }
        }
    }
}
