//! Text Normalizer Module
//!
//! リッチテキストのラン列を、HTML風マークアップ付きの平坦な文字列に変換します。
//!
//! # 処理フロー
//!
//! 1. ランごとに置換テーブルをテーブル順に適用（`&` → `&amp;` など）
//! 2. 書式付きのランを `<b>`、`<i>`、`<u>` で囲む（閉じタグは逆順）
//! 3. ランを連結し、前後の空白を除去
//! 4. 5文字以上連続するアンダースコアを4文字（空欄マーカー）に縮める
//! 5. 受け入れ範囲外の文字が残っていれば異常として報告
//! 6. 同じ生テキストが以前と異なる結果になった場合は異常として報告

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::diagnostics::{Anomaly, AnomalyKind, DiagnosticsSink};
use crate::error::ImportError;
use crate::types::{CellContent, CellLocation, RunStyle, StyledRun};

/// 置換後にこの文字より大きい文字が残っていれば異常として報告する
const LAST_ACCEPTED_CHARACTER: char = '~';

/// 空欄マーカー
pub const BLANK_MARKER: &str = "____";

fn long_blank_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("_{5,}").expect("valid blank regex"))
}

/// 5文字以上連続するアンダースコアを4文字に縮める
///
/// 冪等な変換です: `collapse_blanks(collapse_blanks(t)) == collapse_blanks(t)`
pub fn collapse_blanks(text: &str) -> String {
    long_blank_regex().replace_all(text, BLANK_MARKER).into_owned()
}

/// 順序付き置換テーブル
///
/// 先頭のエントリから順に適用されます。エスケープ文字（`&`など）の置換は
/// 最初に置く必要があり、後続エントリが先行エントリの挿入したテキストに
/// 再マッチするような並びは構築時に拒否されます。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementTable {
    entries: Vec<(String, String)>,
}

impl ReplacementTable {
    /// 置換ペアの並びからテーブルを構築する
    ///
    /// # 戻り値
    ///
    /// * `Ok(ReplacementTable)` - テーブルが有効な場合
    /// * `Err(ImportError::Config)` - 置換元が空、または順序が不正な場合
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use cardsheet::ReplacementTable;
    ///
    /// let table = ReplacementTable::new(vec![("&", "&amp;"), ("<", "&lt;")]).unwrap();
    /// assert_eq!(table.apply("a&b<c"), "a&amp;b&lt;c");
    ///
    /// // "&lt;"が後続の"&"に再マッチしてしまうため拒否される
    /// assert!(ReplacementTable::new(vec![("<", "&lt;"), ("&", "&amp;")]).is_err());
    /// ```
    pub fn new<I, F, T>(pairs: I) -> Result<Self, ImportError>
    where
        I: IntoIterator<Item = (F, T)>,
        F: Into<String>,
        T: Into<String>,
    {
        let entries: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .collect();

        for (index, (from, _)) in entries.iter().enumerate() {
            if from.is_empty() {
                return Err(ImportError::Config(format!(
                    "Special character replacement index {} is empty",
                    index
                )));
            }
        }

        for (i, (earlier_from, earlier_to)) in entries.iter().enumerate() {
            for (later_from, _) in &entries[i + 1..] {
                if earlier_to.contains(later_from.as_str()) {
                    return Err(ImportError::Config(format!(
                        "Replacement '{}' -> '{}' inserts '{}', which a later replacement would match again; reorder the table",
                        earlier_from, earlier_to, later_from
                    )));
                }
            }
        }

        Ok(Self { entries })
    }

    /// 空のテーブル
    pub fn empty() -> Self {
        Self::default()
    }

    /// テーブル順に置換を適用する
    pub fn apply(&self, text: &str) -> String {
        let mut replaced = text.to_string();
        for (from, to) in &self.entries {
            if replaced.contains(from.as_str()) {
                replaced = replaced.replace(from.as_str(), to);
            }
        }
        replaced
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, t)| (f.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 生テキスト（前後空白除去済み）→ 正規化結果のメモ
///
/// 1回のインポート実行（または並列ワーカー1つ）の間だけ保持されます。
#[derive(Debug, Clone, Default)]
pub struct NormalizationMemo {
    entries: BTreeMap<String, String>,
}

impl NormalizationMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 結果を記録する
    ///
    /// 同じ生テキストが以前に異なる結果へ正規化されていた場合、その以前の結果を返します。
    /// 最初に記録された結果が保持されます。
    pub fn record(&mut self, raw: &str, normalized: &str) -> Option<String> {
        match self.entries.get(raw) {
            Some(previous) if previous != normalized => Some(previous.clone()),
            Some(_) => None,
            None => {
                self.entries.insert(raw.to_string(), normalized.to_string());
                None
            }
        }
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 別ワーカーのメモを取り込む
    ///
    /// キーの辞書順に処理するため、結果と報告順は決定的です。
    pub fn absorb(&mut self, other: NormalizationMemo, sink: &mut dyn DiagnosticsSink) {
        for (raw, normalized) in other.entries {
            if let Some(previous) = self.record(&raw, &normalized) {
                sink.report(inconsistent(&raw, &normalized, &previous));
            }
        }
    }
}

fn inconsistent(raw: &str, normalized: &str, previous: &str) -> Anomaly {
    Anomaly::new(
        AnomalyKind::InconsistentNormalization,
        format!(
            "Input string '{}' formatted to '{}', but previously formatted to '{}'",
            raw, normalized, previous
        ),
    )
    .with_text(raw)
}

/// リッチテキスト → 正規化文字列の変換器
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    replacements: ReplacementTable,
    apply_style_markup: bool,
    memo: NormalizationMemo,
}

impl TextNormalizer {
    /// # 引数
    ///
    /// * `replacements` - 順序付き置換テーブル
    /// * `apply_style_markup` - `false`の場合、書式は無視されテキストのみ出力される
    pub fn new(replacements: ReplacementTable, apply_style_markup: bool) -> Self {
        Self {
            replacements,
            apply_style_markup,
            memo: NormalizationMemo::new(),
        }
    }

    pub fn replacements(&self) -> &ReplacementTable {
        &self.replacements
    }

    pub fn applies_style_markup(&self) -> bool {
        self.apply_style_markup
    }

    pub fn memo(&self) -> &NormalizationMemo {
        &self.memo
    }

    /// メモを取り出す（並列ワーカーの結果を統合する際に使用）
    pub fn into_memo(self) -> NormalizationMemo {
        self.memo
    }

    /// ラン列を正規化する
    pub fn normalize(&mut self, runs: &[StyledRun], sink: &mut dyn DiagnosticsSink) -> String {
        self.normalize_runs(runs, None, sink)
    }

    /// セル内容を正規化する（プレーン文字列は書式なしの1ランとして扱う）
    pub fn normalize_cell(
        &mut self,
        content: &CellContent,
        location: Option<&CellLocation>,
        sink: &mut dyn DiagnosticsSink,
    ) -> String {
        match content {
            CellContent::Plain(text) => {
                self.normalize_runs(&[StyledRun::plain(text.as_str())], location, sink)
            }
            CellContent::Styled(runs) => self.normalize_runs(runs, location, sink),
        }
    }

    fn normalize_runs(
        &mut self,
        runs: &[StyledRun],
        location: Option<&CellLocation>,
        sink: &mut dyn DiagnosticsSink,
    ) -> String {
        let raw: String = runs.iter().map(|r| r.text.as_str()).collect();
        let has_formatting = runs.iter().any(|r| r.style.is_some());

        let formatted = if has_formatting {
            log::trace!("Processing formatting for {}", raw);
            let mut builder = String::with_capacity(raw.len() + 16);
            for run in runs {
                let replaced = self.replacements.apply(&run.text);
                let segment = replaced.trim();
                if segment.is_empty() {
                    continue;
                }

                match run.style {
                    Some(style) => {
                        if !style.is_recognized() {
                            sink.report(with_location(
                                Anomaly::new(
                                    AnomalyKind::UnknownFormatting,
                                    format!(
                                        "Unknown formatting applied to segment '{}' of card '{}'.",
                                        segment, raw
                                    ),
                                )
                                .with_text(raw.as_str()),
                                location,
                            ));
                        }
                        if self.apply_style_markup {
                            push_with_markup(&mut builder, style, segment);
                        } else {
                            builder.push_str(segment);
                        }
                    }
                    None => builder.push_str(segment),
                }

                // 隣接するテキストとマークアップが衝突しないよう、ランごとに区切りを入れる
                builder.push(' ');
            }
            builder
        } else {
            self.replacements.apply(&raw)
        };

        let done = collapse_blanks(&formatted).trim().to_string();
        let trimmed_raw = raw.trim();
        if done != trimmed_raw {
            log::trace!("Adjusted input string '{}' to '{}'.", raw, done);
        }

        for ch in done.chars().filter(|c| *c > LAST_ACCEPTED_CHARACTER) {
            sink.report(with_location(
                Anomaly::new(
                    AnomalyKind::UnhandledCharacter,
                    format!("Unhandled special character '{}' in string '{}'.", ch, raw),
                )
                .with_text(raw.as_str()),
                location,
            ));
        }

        if let Some(previous) = self.memo.record(trimmed_raw, &done) {
            sink.report(with_location(
                inconsistent(trimmed_raw, &done, &previous),
                location,
            ));
        }

        done
    }
}

fn with_location(anomaly: Anomaly, location: Option<&CellLocation>) -> Anomaly {
    match location {
        Some(loc) => anomaly.with_location(loc.clone()),
        None => anomaly,
    }
}

/// 開始タグは太字→斜体→下線の順、閉じタグはその逆順で出力する
fn push_with_markup(builder: &mut String, style: RunStyle, segment: &str) {
    if style.bold {
        builder.push_str("<b>");
    }
    if style.italic {
        builder.push_str("<i>");
    }
    if style.underline {
        builder.push_str("<u>");
    }

    builder.push_str(segment);

    if style.underline {
        builder.push_str("</u>");
    }
    if style.italic {
        builder.push_str("</i>");
    }
    if style.bold {
        builder.push_str("</b>");
    }
}
