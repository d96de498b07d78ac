//! Workbook Reader Module
//!
//! calamineでセル値を、[`RichTextIndex`]でリッチテキストのランを読み込み、
//! シートの行を[`SheetRow`]の並びとして提供します。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets, Xlsx};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use crate::api::SheetRef;
use crate::error::ImportError;
use crate::parser::RichTextIndex;
use crate::security::SecurityConfig;
use crate::types::{SheetCell, SheetRow};

/// ワークブックリーダー
///
/// calamineのラッパーとして、シート単位の行データを提供します。
/// XLSX形式のみサポートします。
pub struct WorkbookReader {
    /// calamineのワークブック
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// セル座標 → ラン列（書式付きセルのみ）
    rich_text: RichTextIndex,
}

impl WorkbookReader {
    /// ファイルパスからワークブックを開く
    pub fn open_path(path: impl AsRef<Path>, security: &SecurityConfig) -> Result<Self, ImportError> {
        let file = File::open(path.as_ref())?;
        Self::open_with_security(BufReader::new(file), security)
    }

    /// デフォルトのセキュリティ設定でワークブックを開く
    pub fn open<R: Read + Seek>(reader: R) -> Result<Self, ImportError> {
        Self::open_with_security(reader, &SecurityConfig::default())
    }

    /// ワークブックを開き、リッチテキスト情報も解析する
    ///
    /// # 引数
    ///
    /// * `reader` - Excelファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    /// * `security` - 入力とアーカイブに適用するセキュリティ制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookReader)` - ワークブックとリッチテキストの読み込みに成功した場合
    /// * `Err(ImportError)` - エラーが発生した場合
    pub fn open_with_security<R: Read + Seek>(
        reader: R,
        security: &SecurityConfig,
    ) -> Result<Self, ImportError> {
        // 上限+1バイトまで読み込み、超過を検出する
        let mut buffer = Vec::new();
        reader
            .take(security.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)?;
        security.check_input_size(buffer.len() as u64)?;

        // calamineより先にアーカイブを検証する
        let rich_text = RichTextIndex::new(Cursor::new(buffer.as_slice()), security)?;

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer)).map_err(ImportError::Parse)?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(ImportError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        log::debug!(
            "Opened workbook with {} sheets and {} shared strings",
            workbook.sheet_names().len(),
            rich_text.shared_string_count()
        );

        Ok(Self {
            workbook,
            rich_text,
        })
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    pub fn sheet_count(&self) -> usize {
        self.workbook.sheet_names().len()
    }

    /// シート指定をシート名に解決する
    pub fn resolve_sheet(&self, sheet: &SheetRef) -> Result<String, ImportError> {
        let names = self.sheet_names();
        sheet.resolve(&names).map(|s| s.to_string())
    }

    /// シートの行を読み込む
    ///
    /// 行・列のインデックスはシート上の絶対位置（0始まり）です。値のないセルと
    /// セルを1つも持たない行は含まれません。書式付きのランを持つ文字列セルは
    /// [`CellContent::Styled`](crate::CellContent::Styled)、それ以外は
    /// 値を文字列化した[`CellContent::Plain`](crate::CellContent::Plain)になります。
    ///
    /// # 引数
    ///
    /// * `sheet_name` - 読み込むシート名
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<SheetRow>)` - 行の並び（行順、各行のセルは列順）
    /// * `Err(ImportError::Parse)` - シートの読み込みに失敗した場合
    pub fn read_sheet(&mut self, sheet_name: &str) -> Result<Vec<SheetRow>, ImportError> {
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| ImportError::Parse(e.into()))?;

        // 使用範囲の左上を基準とした相対位置を絶対位置に戻す
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));

        let mut rows = Vec::new();
        for (row_idx, row) in range.rows().enumerate() {
            let index = row_offset + row_idx as u32;
            let mut cells = Vec::new();

            for (col_idx, value) in row.iter().enumerate() {
                let col = col_offset + col_idx as u32;

                if let Some(runs) = self.rich_text.runs(sheet_name, index, col) {
                    cells.push(SheetCell::styled(col, runs.to_vec()));
                    continue;
                }

                match value {
                    Data::Empty => {}
                    Data::String(s) if s.is_empty() => {}
                    Data::String(s) => cells.push(SheetCell::plain(col, s.as_str())),
                    other => cells.push(SheetCell::plain(col, other.to_string())),
                }
            }

            if !cells.is_empty() {
                rows.push(SheetRow::new(index, cells));
            }
        }

        log::debug!("Read {} rows from sheet '{}'", rows.len(), sheet_name);
        Ok(rows)
    }
}

// テストは統合テスト（tests/）で実装します。
// 実際のXLSXファイルが必要なため、単体テストではなく統合テストとして実装します。
