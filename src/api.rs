//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ImportError;

/// シート指定方式
///
/// 設定ファイルでは数値（0始まりのインデックス）または文字列（シート名）として記述します。
///
/// ```rust
/// use cardsheet::SheetRef;
///
/// let by_index: SheetRef = serde_json::from_str("2").unwrap();
/// let by_name: SheetRef = serde_json::from_str("\"Whites\"").unwrap();
///
/// assert_eq!(by_index, SheetRef::Index(2));
/// assert_eq!(by_name, SheetRef::Name("Whites".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    /// インデックス指定（0始まり）
    ///
    /// 例: `SheetRef::Index(0)` は最初のシートを選択
    Index(usize),

    /// シート名指定
    ///
    /// 例: `SheetRef::Name("Blacks".to_string())`
    Name(String),
}

impl SheetRef {
    /// ブック内のシート名一覧からシート名を解決する
    ///
    /// # 戻り値
    ///
    /// * `Ok(&str)` - 解決されたシート名
    /// * `Err(ImportError::Config)` - シートが見つからない、またはインデックスが範囲外の場合
    pub fn resolve<'a>(&self, sheet_names: &'a [String]) -> Result<&'a str, ImportError> {
        match self {
            SheetRef::Index(index) => sheet_names
                .get(*index)
                .map(|s| s.as_str())
                .ok_or_else(|| {
                    ImportError::Config(format!(
                        "Sheet index {} is out of range (total: {})",
                        index,
                        sheet_names.len()
                    ))
                }),
            SheetRef::Name(name) => sheet_names
                .iter()
                .find(|s| *s == name)
                .map(|s| s.as_str())
                .ok_or_else(|| ImportError::Config(format!("Sheet '{}' not found", name))),
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetRef::Index(index) => write!(f, "#{}", index),
            SheetRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// 出力フォーマット
///
/// インポート結果を出力する際の形式を指定します。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutputFormat {
    /// テキスト形式（デフォルト）
    ///
    /// デッキ一覧と、デッキごとのカード一覧を出力します。
    /// 黒カードには回答枚数と追加ドロー枚数が付きます。
    ///
    /// # 出力例
    ///
    /// ```text
    /// Decks:
    /// >Base Set (black: 1, white: 1)
    /// White cards:
    /// >Base Set
    /// >>A windmill full of corpses.
    /// Black cards:
    /// >Base Set
    /// >>Why can't I sleep at night? ____ [pick 1, draw 0]
    /// ```
    #[default]
    Text,

    /// JSON形式
    ///
    /// デッキ名順の配列として出力します。
    ///
    /// # 出力例
    ///
    /// ```json
    /// {
    ///   "decks": [
    ///     {
    ///       "name": "Base Set",
    ///       "watermark": "BS",
    ///       "weight": 1,
    ///       "black_cards": [{"text": "____ + ____", "pick": 2, "draw": 0}],
    ///       "white_cards": [{"text": "A card."}]
    ///     }
    ///   ]
    /// }
    /// ```
    Json,
}

impl FromStr for OutputFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ImportError::Config(format!(
                "Unknown output format '{}' (expected 'text' or 'json')",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["Blacks".to_string(), "Whites".to_string()]
    }

    #[test]
    fn test_sheet_ref_resolve() {
        let names = names();
        assert_eq!(SheetRef::Index(1).resolve(&names).unwrap(), "Whites");
        assert_eq!(
            SheetRef::Name("Blacks".to_string()).resolve(&names).unwrap(),
            "Blacks"
        );
    }

    #[test]
    fn test_sheet_ref_resolve_errors() {
        let names = names();
        match SheetRef::Index(2).resolve(&names) {
            Err(ImportError::Config(msg)) => assert!(msg.contains("out of range")),
            _ => panic!("Expected Config error"),
        }
        assert!(SheetRef::Name("Missing".to_string()).resolve(&names).is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("markdown".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}
