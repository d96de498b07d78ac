//! Builder Module
//!
//! Fluent Builder APIを提供し、`Importer`インスタンスを段階的に構築する。

use rayon::prelude::*;
use std::io::{BufWriter, Write};

use crate::aggregate::{self, DeckAliases, DeckInfo, DeckSummary, MergedCards};
use crate::api::OutputFormat;
use crate::config::ImporterConfig;
use crate::diagnostics::{Anomaly, DiagnosticsSink};
use crate::error::ImportError;
use crate::normalizer::{NormalizationMemo, ReplacementTable, TextNormalizer};
use crate::output::OutputFormatter;
use crate::prompt::PromptMetrics;
use crate::security::SecurityConfig;
use crate::source::{ParsedSheet, Source};

/// Fluent Builder APIを提供する構造体
///
/// `Importer`インスタンスを段階的に構築するためのビルダーです。
/// 設定の検証は`build()`でまとめて行われます。
///
/// # 使用例
///
/// ```rust,no_run
/// use cardsheet::{CardColor, ExcelSource, ImporterBuilder, SheetConfig, Source};
///
/// # fn main() -> Result<(), cardsheet::ImportError> {
/// let importer = ImporterBuilder::new()
///     .with_replacement("&", "&amp;")
///     .with_source(Source::Excel(
///         ExcelSource::new("cards.xlsx").with_sheet(SheetConfig::new(CardColor::White, 3, 0)),
///     ))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ImporterBuilder {
    replacements: Vec<(String, String)>,
    decks: Vec<DeckInfo>,
    sources: Vec<Source>,
    format_text: bool,
    security: SecurityConfig,
}

impl Default for ImporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImporterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 置換ルール: なし
    /// - デッキ情報: なし
    /// - 書式マークアップ: 出力する
    /// - セキュリティ制限: [`SecurityConfig::default`]
    pub fn new() -> Self {
        Self {
            replacements: Vec::new(),
            decks: Vec::new(),
            sources: Vec::new(),
            format_text: true,
            security: SecurityConfig::default(),
        }
    }

    /// 設定ファイルの内容からビルダーを生成する
    pub fn from_config(config: ImporterConfig) -> Self {
        let replacements = config
            .replacement_pairs()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        Self {
            replacements,
            decks: config.decks,
            sources: config.sources,
            format_text: config.format_text,
            security: SecurityConfig::default(),
        }
    }

    /// 置換ルールを1件追加する（追加順に適用）
    pub fn with_replacement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replacements.push((from.into(), to.into()));
        self
    }

    /// 置換ルールをまとめて追加する
    pub fn with_replacements<I, F, T>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, T)>,
        F: Into<String>,
        T: Into<String>,
    {
        self.replacements
            .extend(pairs.into_iter().map(|(from, to)| (from.into(), to.into())));
        self
    }

    pub fn with_deck_info(mut self, info: DeckInfo) -> Self {
        self.decks.push(info);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// 書式マークアップを出力するか
    ///
    /// `false`の場合、太字等のランも装飾なしのテキストとして連結されます。
    pub fn format_text(mut self, format_text: bool) -> Self {
        self.format_text = format_text;
        self
    }

    pub fn with_security_config(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// ビルダーから`Importer`を構築する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Importer)`: 設定が有効な場合
    /// * `Err(ImportError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * 置換ルールの置換元が空文字列、または適用順が不正
    /// * デッキIDが空文字列
    /// * 読み込み元が1つもない
    /// * シート数やカラム数が不正（ファイルの存在はここでは確認しません）
    pub fn build(self) -> Result<Importer, ImportError> {
        // 1. 置換ルールの検証
        let replacements = ReplacementTable::new(self.replacements)?;

        // 2. デッキ情報の検証
        if let Some(position) = self.decks.iter().position(|d| d.id.trim().is_empty()) {
            return Err(ImportError::Config(format!(
                "Deck id must not be empty (deck #{})",
                position
            )));
        }

        // 3. 読み込み元の検証
        if self.sources.is_empty() {
            return Err(ImportError::Config(
                "At least one source must be configured".to_string(),
            ));
        }
        for source in &self.sources {
            source.check_settings()?;
        }

        Ok(Importer {
            replacements,
            aliases: DeckAliases::from_infos(&self.decks),
            sources: self.sources,
            format_text: self.format_text,
            security: self.security,
        })
    }
}

/// インポート処理のファサード
///
/// `ImporterBuilder`で構築された設定に基づき、すべての読み込み元を解析して
/// デッキごとのカードに統合します。
#[derive(Debug)]
pub struct Importer {
    replacements: ReplacementTable,
    aliases: DeckAliases,
    sources: Vec<Source>,
    format_text: bool,
    security: SecurityConfig,
}

/// 1つの読み込み元を処理したワーカーの成果
struct SourceOutcome {
    sheets: Vec<ParsedSheet>,
    anomalies: Vec<Anomaly>,
    memo: NormalizationMemo,
}

impl Importer {
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// インポートを実行する
    ///
    /// # 引数
    ///
    /// * `sink` - 検出された異常の報告先
    ///
    /// # 戻り値
    ///
    /// * `Ok(ImportResult)` - 統合されたカード
    /// * `Err(ImportError)` - 読み込み元の検証または読み込みに失敗した場合
    ///
    /// # 処理フロー
    ///
    /// 1. すべての読み込み元を検証（1つでも不正なら解析を始めない）
    /// 2. 読み込み元ごとに並列に解析（ワーカーごとに正規化器と異常バッファを持つ）
    /// 3. ワーカーの正規化メモと異常を読み込み元の順に集約
    /// 4. デッキ情報で正規化しながら統合
    pub fn run(&self, sink: &mut dyn DiagnosticsSink) -> Result<ImportResult, ImportError> {
        // 1. 検証
        for source in &self.sources {
            source.validate(&self.security)?;
        }

        // 2. 並列解析（collectは入力順を保持する）
        let outcomes: Result<Vec<SourceOutcome>, ImportError> = self
            .sources
            .par_iter()
            .map(|source| -> Result<SourceOutcome, ImportError> {
                let mut normalizer = TextNormalizer::new(self.replacements.clone(), self.format_text);
                let mut anomalies: Vec<Anomaly> = Vec::new();
                let sheets = source.parse(&mut normalizer, &self.security, &mut anomalies)?;

                log::debug!(
                    "{}: {} sheets, {} anomalies",
                    source.describe(),
                    sheets.len(),
                    anomalies.len()
                );

                Ok(SourceOutcome {
                    sheets,
                    anomalies,
                    memo: normalizer.into_memo(),
                })
            })
            .collect();

        // 3. 集約
        let mut memo = NormalizationMemo::new();
        let mut maps = Vec::new();
        for outcome in outcomes? {
            for anomaly in outcome.anomalies {
                sink.report(anomaly);
            }
            memo.absorb(outcome.memo, sink);
            maps.extend(outcome.sheets.into_iter().map(|s| (s.color, s.cards)));
        }

        // 4. 統合
        let cards = aggregate::merge(maps, &self.aliases, sink);
        for summary in cards.summary() {
            log::info!(
                ">{} (black: {}, white: {})",
                summary.name,
                summary.black,
                summary.white
            );
        }

        Ok(ImportResult {
            cards,
            aliases: self.aliases.clone(),
        })
    }
}

/// 黒カード1枚分の回答枚数・追加ドロー枚数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlackCardMetrics<'a> {
    pub deck: &'a str,
    pub text: &'a str,
    pub metrics: PromptMetrics,
}

/// インポート結果
#[derive(Debug, Clone)]
pub struct ImportResult {
    cards: MergedCards,
    aliases: DeckAliases,
}

impl ImportResult {
    pub fn cards(&self) -> &MergedCards {
        &self.cards
    }

    pub fn into_cards(self) -> MergedCards {
        self.cards
    }

    pub fn summary(&self) -> Vec<DeckSummary> {
        self.cards.summary()
    }

    /// 正規のデッキ名からデッキ情報を取得する
    pub fn deck_info(&self, deck: &str) -> Option<&DeckInfo> {
        self.aliases.info(deck)
    }

    /// すべての黒カードの回答枚数・追加ドロー枚数（デッキ名順、カード順）
    pub fn black_card_metrics(&self) -> Vec<BlackCardMetrics<'_>> {
        self.cards
            .black
            .iter()
            .flat_map(|(deck, cards)| {
                cards.iter().map(move |text| BlackCardMetrics {
                    deck,
                    text: text.as_str(),
                    metrics: PromptMetrics::of(text),
                })
            })
            .collect()
    }

    /// 結果を指定フォーマットで書き出す
    ///
    /// # 引数
    ///
    /// * `format` - 出力フォーマット
    /// * `output` - 出力先のライター（Writeトレイトを実装）
    pub fn write_to<W: Write>(&self, format: OutputFormat, mut output: W) -> Result<(), ImportError> {
        let mut writer = BufWriter::new(&mut output);
        OutputFormatter::from_format(format).render(self, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// 結果を指定フォーマットの文字列として取得する
    pub fn render_to_string(&self, format: OutputFormat) -> Result<String, ImportError> {
        let mut buffer = Vec::new();
        self.write_to(format, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| ImportError::Utf8(e.utf8_error()))
    }
}
