//! Output Format Module
//!
//! Strategy Patternによる出力フォーマットの抽象化を提供するモジュール。

mod formatters;

use crate::builder::ImportResult;
use crate::error::ImportError;
use std::io::Write;

pub use formatters::*;

/// 出力フォーマッター（Strategy Pattern）
///
/// 各出力フォーマット（テキスト, JSON）をenumとして表現します。
#[derive(Debug, Clone, Copy)]
pub enum OutputFormatter {
    Text,
    Json,
}

impl OutputFormatter {
    /// 出力フォーマットからフォーマッターを生成
    pub fn from_format(format: crate::api::OutputFormat) -> Self {
        match format {
            crate::api::OutputFormat::Text => OutputFormatter::Text,
            crate::api::OutputFormat::Json => OutputFormatter::Json,
        }
    }

    /// インポート結果を指定されたフォーマットで出力する
    ///
    /// # 引数
    ///
    /// * `result` - 出力するインポート結果
    /// * `writer` - 出力先のライター
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 出力に成功した場合
    /// * `Err(ImportError)` - エラーが発生した場合
    pub fn render<W: Write>(&self, result: &ImportResult, writer: &mut W) -> Result<(), ImportError> {
        match self {
            OutputFormatter::Text => TextFormatter.render(result, writer),
            OutputFormatter::Json => JsonFormatter.render(result, writer),
        }
    }
}
