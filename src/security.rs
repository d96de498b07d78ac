//! Security Module
//!
//! ワークブック（ZIPアーカイブ）を開く際のセキュリティ制限を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃、巨大ファイルへの対策を提供します。

use std::io::{Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ImportError;

/// セキュリティ設定
///
/// ワークブック処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

impl SecurityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入力サイズを検証する
    pub(crate) fn check_input_size(&self, size: u64) -> Result<(), ImportError> {
        if size > self.max_input_file_size {
            return Err(ImportError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// アーカイブ全体を検証する
    ///
    /// エントリ数、各エントリのパスと宣言サイズ、展開後の合計サイズを確認します。
    pub(crate) fn check_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(), ImportError> {
        if archive.len() > self.max_file_count {
            return Err(ImportError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_file_count
            )));
        }

        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;

            let file_name = file.name();
            validate_zip_path(file_name).map_err(|e| {
                ImportError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let file_size = file.size();
            if file_size > self.max_file_size {
                return Err(ImportError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, self.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size
                .checked_add(file_size)
                .ok_or_else(|| {
                    ImportError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;

            if total_decompressed_size > self.max_decompressed_size {
                return Err(ImportError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, self.max_decompressed_size
                )));
            }
        }

        Ok(())
    }

    /// アーカイブ内のパートを読み込む
    ///
    /// 宣言サイズを偽装したエントリに備え、実際に展開したバイト数も上限で打ち切ります。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(bytes))` - パートが存在する場合
    /// * `Ok(None)` - パートが存在しない場合
    pub(crate) fn read_part<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        name: &str,
    ) -> Result<Option<Vec<u8>>, ImportError> {
        validate_zip_path(name)
            .map_err(|e| ImportError::SecurityViolation(format!("Invalid ZIP path: {}", e)))?;

        let file = match archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut content = Vec::new();
        file.take(self.max_file_size + 1).read_to_end(&mut content)?;
        if content.len() as u64 > self.max_file_size {
            return Err(ImportError::SecurityViolation(format!(
                "File '{}' exceeds maximum size when decompressed (max: {} bytes)",
                name, self.max_file_size
            )));
        }

        Ok(Some(content))
    }
}

/// ファイルパスの検証
///
/// パストラバーサル攻撃を防ぐため、ファイルパスを検証します。
///
/// # 引数
///
/// * `path` - 検証するファイルパス
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - パスが危険な場合（`..`や絶対パスを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // Windows形式の`C:\`やUnix形式の`/`で始まるパス
    if path.starts_with('/') || path.starts_with("C:\\") || path.starts_with("c:\\") {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.contains("..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn archive_with(entries: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        let cursor = writer.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn test_validate_zip_path_valid() {
        assert!(validate_zip_path("xl/workbook.xml").is_ok());
        assert!(validate_zip_path("xl/worksheets/sheet1.xml").is_ok());
        assert!(validate_zip_path("xl/sharedStrings.xml").is_ok());
    }

    #[test]
    fn test_validate_zip_path_rejects_unsafe() {
        assert!(validate_zip_path("").is_err());
        assert!(validate_zip_path("/etc/passwd").is_err());
        assert!(validate_zip_path("C:\\Windows\\system32").is_err());
        assert!(validate_zip_path("xl/../../etc/passwd").is_err());
        assert!(validate_zip_path("xl\\workbook.xml").is_err());
    }

    #[test]
    fn test_check_input_size() {
        let config = SecurityConfig {
            max_input_file_size: 10,
            ..SecurityConfig::default()
        };
        assert!(config.check_input_size(10).is_ok());
        assert!(matches!(
            config.check_input_size(11),
            Err(ImportError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_check_archive_file_count() {
        let mut archive = archive_with(&[("a.xml", &b"a"[..]), ("b.xml", &b"b"[..])]);
        let config = SecurityConfig {
            max_file_count: 1,
            ..SecurityConfig::default()
        };
        match config.check_archive(&mut archive) {
            Err(ImportError::SecurityViolation(msg)) => assert!(msg.contains("too many files")),
            _ => panic!("Expected SecurityViolation"),
        }
    }

    #[test]
    fn test_check_archive_total_size() {
        let mut archive = archive_with(&[("a.xml", &[b'a'; 64][..]), ("b.xml", &[b'b'; 64][..])]);
        let config = SecurityConfig {
            max_decompressed_size: 100,
            ..SecurityConfig::default()
        };
        assert!(config.check_archive(&mut archive).is_err());
        assert!(SecurityConfig::default().check_archive(&mut archive).is_ok());
    }

    #[test]
    fn test_read_part() {
        let mut archive = archive_with(&[("xl/sharedStrings.xml", &b"<sst/>"[..])]);
        let config = SecurityConfig::default();

        assert_eq!(
            config.read_part(&mut archive, "xl/sharedStrings.xml").unwrap(),
            Some(b"<sst/>".to_vec())
        );
        assert_eq!(config.read_part(&mut archive, "xl/missing.xml").unwrap(), None);
        assert!(config.read_part(&mut archive, "../escape.xml").is_err());
    }

    #[test]
    fn test_read_part_enforces_size() {
        let mut archive = archive_with(&[("big.xml", &[b'x'; 32][..])]);
        let config = SecurityConfig {
            max_file_size: 16,
            ..SecurityConfig::default()
        };
        assert!(matches!(
            config.read_part(&mut archive, "big.xml"),
            Err(ImportError::SecurityViolation(_))
        ));
    }
}
