//! Parser Module
//!
//! calamineとquick-xmlを使用したExcelファイル解析の実装。
//! セル値とリッチテキストのランを組み合わせ、シートの行データを抽出します。

mod metadata;
mod workbook;

pub(crate) use metadata::RichTextIndex;
pub use workbook::WorkbookReader;
