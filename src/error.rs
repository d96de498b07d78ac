//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! ここで扱うのは処理を中断すべき致命的なエラーのみです。
//! セル単位の不整合（未知の書式、デッキ名の欠落など）は
//! [`Anomaly`](crate::Anomaly)として診断シンクに報告され、処理は継続されます。

use thiserror::Error;

/// cardsheetクレート全体で使用するエラー型
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（ファイル読み込み失敗など）
/// - `Parse`: Excelファイルの解析中に発生したエラー（calamine由来）
/// - `Config`: 設定の検証に失敗したエラー（シート数、列数の不整合など）
/// - `SecurityViolation`: アーカイブのセキュリティ制限に違反したエラー
///
/// # 使用例
///
/// ```rust,no_run
/// use cardsheet::ImportError;
/// use std::fs::File;
///
/// fn open_workbook(path: &str) -> Result<(), ImportError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     // ... 処理 ...
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum ImportError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー
    ///
    /// calamineクレートがワークブックを解析する際に発生したエラーです。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XLSX内部XMLの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 設定ファイル（JSON）の解析エラー
    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    /// 設定の検証に失敗したエラー
    ///
    /// `ImporterBuilder::build()`または`Source::validate()`で検出されます。
    /// 例えば、シートの見出し列数と隣接列ペア数の合計が0の場合や、
    /// 置換テーブルの順序が不正な場合などです。
    ///
    /// # 例
    ///
    /// ```rust
    /// use cardsheet::{ImportError, SheetLayout};
    ///
    /// match SheetLayout::new(0, 0) {
    ///     Err(ImportError::Config(msg)) => println!("設定エラー: {}", msg),
    ///     _ => unreachable!(),
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl ImportError {
    /// quick-xmlのエラーを`Xml`バリアントに変換するヘルパー
    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        ImportError::Xml(err.to_string())
    }
}

impl From<zip::result::ZipError> for ImportError {
    fn from(err: zip::result::ZipError) -> Self {
        ImportError::Zip(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: ImportError = io_err.into();

        match error {
            ImportError::Io(e) => {
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
                assert_eq!(e.to_string(), "File not found");
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_parse_error_display() {
        let parse_err = calamine::Error::Msg("Corrupted file");
        let error: ImportError = parse_err.into();

        let error_msg = error.to_string();
        assert!(error_msg.contains("Failed to parse Excel file"));
        assert!(error_msg.contains("Corrupted file"));
    }

    #[test]
    fn test_config_error_display() {
        let error = ImportError::Config("Sheet count must be positive".to_string());
        let error_msg = error.to_string();

        assert!(error_msg.starts_with("Configuration error"));
        assert!(error_msg.contains("Sheet count must be positive"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: ImportError = json_err.into();

        assert!(matches!(error, ImportError::Json(_)));
        assert!(error.to_string().starts_with("Invalid configuration file"));
    }

    #[test]
    fn test_zip_error_conversion() {
        let error: ImportError = zip::result::ZipError::FileNotFound.into();
        match error {
            ImportError::Zip(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Zip error"),
        }
    }

    // エラー変換のテスト（?演算子の動作確認）
    #[test]
    fn test_error_conversion_with_question_mark() {
        fn io_operation() -> Result<(), ImportError> {
            let _file = std::fs::File::open("nonexistent_cards.xlsx")?;
            Ok(())
        }

        match io_operation() {
            Err(ImportError::Io(_)) => {}
            _ => panic!("Expected Io error from ? operator"),
        }
    }

    #[test]
    fn test_all_error_formats() {
        let xml_err = ImportError::xml("unexpected end");
        assert!(xml_err.to_string().starts_with("XML parse error"));

        let security_err = ImportError::SecurityViolation("too big".to_string());
        assert!(security_err.to_string().starts_with("Security violation"));

        let utf8_err: ImportError = std::str::from_utf8(&[0xff, 0xfe]).unwrap_err().into();
        assert!(utf8_err.to_string().starts_with("UTF-8 conversion error"));
    }
}
