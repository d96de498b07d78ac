//! Diagnostics Module
//!
//! 処理を中断しない不整合（Anomaly）の表現と、その報告先となるシンクを定義します。
//! 手作業で保守された大きなスプレッドシートには小さな不整合が必ず含まれるため、
//! コアの処理はセル単位の問題でエラーを返さず、すべてここへ報告します。

use crate::types::CellLocation;
use std::fmt;

/// 異常の重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// 異常の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    /// 太字・斜体・下線のいずれでもない書式が付いたラン
    UnknownFormatting,
    /// 置換後も受け入れ範囲外の文字が残っている
    UnhandledCharacter,
    /// 隣接列命名領域でデッキ名が空のカードテキスト
    OrphanedCardText,
    /// 見出し命名にも隣接列命名にも該当しない列の値
    AmbiguousColumn,
    /// 見出し命名列に見出し（デッキ名）がないカード
    MissingHeading,
    /// 同じ生テキストが以前と異なる結果に正規化された
    InconsistentNormalization,
    /// デッキ情報（エイリアス）が見つからない
    MissingDeckInfo,
}

impl AnomalyKind {
    /// 既定の重要度
    pub fn default_severity(&self) -> Severity {
        Severity::Warning
    }
}

/// 処理を中断しない不整合の記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub message: String,
    /// 問題のあるテキスト（存在する場合）
    pub text: Option<String>,
    /// 発生位置（判明している場合）
    pub location: Option<CellLocation>,
}

impl Anomaly {
    pub fn new(kind: AnomalyKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            text: None,
            location: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_location(mut self, location: CellLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "[{}] ", location)?;
        }
        write!(f, "{}", self.message)
    }
}

/// 異常の報告先
///
/// コアはプロセスを終了させることはなく、報告後の扱い（ログ出力、集計、
/// 終了コードの決定）は呼び出し側の責任です。
pub trait DiagnosticsSink {
    fn report(&mut self, anomaly: Anomaly);
}

impl DiagnosticsSink for Vec<Anomaly> {
    fn report(&mut self, anomaly: Anomaly) {
        self.push(anomaly);
    }
}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for &mut S {
    fn report(&mut self, anomaly: Anomaly) {
        (**self).report(anomaly);
    }
}

/// `log`ファサードへ転送するシンク
///
/// 転送した件数を種類別に数えるため、CLIが終了コードを決める際に利用できます。
#[derive(Debug, Default)]
pub struct LogSink {
    reported: Vec<AnomalyKind>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 報告された異常の総数
    pub fn count(&self) -> usize {
        self.reported.len()
    }

    /// 指定種類の異常の件数
    pub fn count_of(&self, kind: AnomalyKind) -> usize {
        self.reported.iter().filter(|k| **k == kind).count()
    }
}

impl DiagnosticsSink for LogSink {
    fn report(&mut self, anomaly: Anomaly) {
        match anomaly.severity {
            Severity::Warning => log::warn!("{}", anomaly),
            Severity::Info => log::info!("{}", anomaly),
        }
        self.reported.push(anomaly.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_builder() {
        let anomaly = Anomaly::new(AnomalyKind::OrphanedCardText, "blank deck name")
            .with_text("card")
            .with_location(CellLocation::new("Sheet1", 2, 4));

        assert_eq!(anomaly.severity, Severity::Warning);
        assert_eq!(anomaly.text.as_deref(), Some("card"));
        assert_eq!(anomaly.to_string(), "[Sheet1!E3] blank deck name");
    }

    #[test]
    fn test_vec_sink_collects() {
        fn report_through<S: DiagnosticsSink>(mut sink: S) {
            sink.report(Anomaly::new(AnomalyKind::AmbiguousColumn, "a"));
        }

        let mut sink: Vec<Anomaly> = Vec::new();
        report_through(&mut sink);
        sink.report(Anomaly::new(AnomalyKind::MissingDeckInfo, "b"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].kind, AnomalyKind::AmbiguousColumn);
    }

    #[test]
    fn test_log_sink_counts() {
        let mut sink = LogSink::new();
        sink.report(Anomaly::new(AnomalyKind::UnhandledCharacter, "x"));
        sink.report(Anomaly::new(AnomalyKind::UnhandledCharacter, "y"));
        sink.report(
            Anomaly::new(AnomalyKind::MissingDeckInfo, "z").with_severity(Severity::Info),
        );

        assert_eq!(sink.count(), 3);
        assert_eq!(sink.count_of(AnomalyKind::UnhandledCharacter), 2);
        assert_eq!(sink.count_of(AnomalyKind::OrphanedCardText), 0);
    }
}
