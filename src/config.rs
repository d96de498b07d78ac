//! Importer Configuration
//!
//! JSON形式のインポーター設定ファイルを読み込むモジュール。
//!
//! ```json
//! {
//!   "format_text": true,
//!   "replacements": [{"from": "...", "to": "…"}],
//!   "decks": [{"id": "BASE", "name": "Base Set", "watermark": "BS", "weight": 1}],
//!   "sources": [
//!     {"type": "excel", "path": "cards.xlsx",
//!      "sheets": [{"color": "black", "heading_named_count": 3}]}
//!   ]
//! }
//! ```
//!
//! `sources`内の相対パスは設定ファイルのあるディレクトリを基準に解決されます。

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use crate::aggregate::DeckInfo;
use crate::error::ImportError;
use crate::source::Source;

fn default_format_text() -> bool {
    true
}

/// 置換ルール1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

/// インポーター設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImporterConfig {
    /// 書式マークアップ（`<b>`等）を出力するか
    #[serde(default = "default_format_text")]
    pub format_text: bool,

    /// 記述順に適用される置換ルール
    #[serde(default)]
    pub replacements: Vec<Replacement>,

    /// デッキ情報
    #[serde(default)]
    pub decks: Vec<DeckInfo>,

    pub sources: Vec<Source>,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            format_text: true,
            replacements: Vec::new(),
            decks: Vec::new(),
            sources: Vec::new(),
        }
    }
}

impl ImporterConfig {
    /// 設定ファイルを読み込む
    ///
    /// # 引数
    ///
    /// * `path` - JSON設定ファイルのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(ImporterConfig)` - 読み込みに成功した場合（相対パスは解決済み）
    /// * `Err(ImportError::Config)` - ファイルが読めない場合
    /// * `Err(ImportError::Json)` - JSONとして不正な場合
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ImportError::Config(format!(
                "Configuration file {} cannot be read: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_reader(BufReader::new(file))?;
        if let Some(base) = path.parent() {
            for source in &mut config.sources {
                source.rebase(base);
            }
        }

        log::debug!(
            "Loaded configuration from {} ({} sources, {} decks)",
            path.display(),
            config.sources.len(),
            config.decks.len()
        );
        Ok(config)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ImportError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// 置換ルールを`(from, to)`の組として取得
    pub fn replacement_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.replacements
            .iter()
            .map(|r| (r.from.as_str(), r.to.as_str()))
    }
}

impl FromStr for ImporterConfig {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}
