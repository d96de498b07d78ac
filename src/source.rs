//! Card Source Module
//!
//! カードの読み込み元を表す型を定義するモジュール。
//!
//! 読み込み元は「検証」と「解析」の2つの操作を持ちます。インポーターは
//! すべての読み込み元を検証してから解析を始めるため、設定の誤りは
//! カードを1枚も処理しないうちに報告されます。

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::api::SheetRef;
use crate::diagnostics::DiagnosticsSink;
use crate::error::ImportError;
use crate::normalizer::TextNormalizer;
use crate::parser::WorkbookReader;
use crate::security::SecurityConfig;
use crate::sheet::{parse_sheet, SheetLayout};
use crate::types::{CardColor, DeckCardMap};

/// カードの読み込み元
///
/// 設定ファイルでは`"type"`フィールドで種類を指定します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
#[non_exhaustive]
pub enum Source {
    /// Excelワークブック
    Excel(ExcelSource),
}

/// 1シート分の解析結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSheet {
    /// ワークブック内のシート名
    pub sheet: String,
    pub color: CardColor,
    pub cards: DeckCardMap,
}

impl Source {
    /// ログ出力用の名前
    pub fn describe(&self) -> String {
        match self {
            Source::Excel(excel) => format!("excel:{}", excel.path.display()),
        }
    }

    /// I/Oを伴わない設定値の検証
    pub fn check_settings(&self) -> Result<(), ImportError> {
        match self {
            Source::Excel(excel) => excel.check_settings(),
        }
    }

    /// 読み込み元が利用可能か検証する
    pub fn validate(&self, security: &SecurityConfig) -> Result<(), ImportError> {
        match self {
            Source::Excel(excel) => excel.validate(security),
        }
    }

    /// 読み込み元を解析し、シートごとのデッキマッピングを返す
    pub fn parse(
        &self,
        normalizer: &mut TextNormalizer,
        security: &SecurityConfig,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Vec<ParsedSheet>, ImportError> {
        match self {
            Source::Excel(excel) => excel.parse(normalizer, security, sink),
        }
    }

    /// 相対パスを基準ディレクトリからのパスに置き換える
    pub(crate) fn rebase(&mut self, base: &Path) {
        match self {
            Source::Excel(excel) => {
                if excel.path.is_relative() {
                    excel.path = base.join(&excel.path);
                }
            }
        }
    }
}

/// Excelワークブックの読み込み元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcelSource {
    pub path: PathBuf,
    pub sheets: Vec<SheetConfig>,
}

/// シートごとの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// 対象シート（省略時は`sheets`配列内の位置をインデックスとして使用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<SheetRef>,
    pub color: CardColor,
    #[serde(default)]
    pub heading_named_count: u32,
    #[serde(default)]
    pub next_column_named_count: u32,
}

impl SheetConfig {
    pub fn new(color: CardColor, heading_named_count: u32, next_column_named_count: u32) -> Self {
        Self {
            sheet: None,
            color,
            heading_named_count,
            next_column_named_count,
        }
    }

    pub fn with_sheet(mut self, sheet: SheetRef) -> Self {
        self.sheet = Some(sheet);
        self
    }

    pub fn layout(&self) -> Result<SheetLayout, ImportError> {
        SheetLayout::new(self.heading_named_count, self.next_column_named_count)
    }

    fn sheet_ref(&self, position: usize) -> SheetRef {
        self.sheet.clone().unwrap_or(SheetRef::Index(position))
    }
}

impl ExcelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheets: Vec::new(),
        }
    }

    pub fn with_sheet(mut self, sheet: SheetConfig) -> Self {
        self.sheets.push(sheet);
        self
    }

    fn check_settings(&self) -> Result<(), ImportError> {
        if self.sheets.is_empty() {
            return Err(ImportError::Config(format!(
                "Sheet count must be positive for {}",
                self.path.display()
            )));
        }

        for (position, sheet) in self.sheets.iter().enumerate() {
            sheet.layout().map_err(|e| {
                ImportError::Config(format!(
                    "Sheet {} of {}: {}",
                    sheet.sheet_ref(position),
                    self.path.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }

    fn validate(&self, security: &SecurityConfig) -> Result<(), ImportError> {
        self.check_settings()?;

        File::open(&self.path).map_err(|e| {
            ImportError::Config(format!(
                "File {} cannot be read: {}",
                self.path.display(),
                e
            ))
        })?;

        let reader = WorkbookReader::open_path(&self.path, security)?;
        if self.sheets.len() > reader.sheet_count() {
            return Err(ImportError::Config(format!(
                "Sheet count {} is greater than the number of sheets in {} ({})",
                self.sheets.len(),
                self.path.display(),
                reader.sheet_count()
            )));
        }

        for (position, sheet) in self.sheets.iter().enumerate() {
            reader.resolve_sheet(&sheet.sheet_ref(position))?;
        }

        Ok(())
    }

    fn parse(
        &self,
        normalizer: &mut TextNormalizer,
        security: &SecurityConfig,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Vec<ParsedSheet>, ImportError> {
        log::info!("Reading {}", self.path.display());
        let mut reader = WorkbookReader::open_path(&self.path, security)?;

        let mut parsed = Vec::with_capacity(self.sheets.len());
        for (position, sheet) in self.sheets.iter().enumerate() {
            let name = reader.resolve_sheet(&sheet.sheet_ref(position))?;
            let layout = sheet.layout()?;
            let rows = reader.read_sheet(&name)?;

            let cards = parse_sheet(&name, &rows, layout, normalizer, sink);
            log::debug!(
                "Sheet '{}' ({} cards): {} decks, {} cards",
                name,
                sheet.color,
                cards.len(),
                cards.card_count()
            );

            parsed.push(ParsedSheet {
                sheet: name,
                color: sheet.color,
                cards,
            });
        }

        Ok(parsed)
    }
}
