//! Result Aggregator Module
//!
//! シート単位・ソース単位のデッキマッピングを、デッキ情報（エイリアス）で
//! 正規のデッキ名に解決しながら黒カード・白カードごとに統合します。
//!
//! 統合は集合の和なので、入力の順序は結果に影響しません。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::{Anomaly, AnomalyKind, DiagnosticsSink};
use crate::types::{CardColor, DeckCardMap};

/// デッキ情報
///
/// 設定ファイルの`decks`配列の1要素。`id`と`name`のどちらでもシート上の
/// デッキ名から参照できます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckInfo {
    pub id: String,
    /// 表示名（省略時は`id`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub watermark: String,
    #[serde(default)]
    pub weight: i32,
}

impl DeckInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            watermark: String::new(),
            weight: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_watermark(mut self, watermark: impl Into<String>) -> Self {
        self.watermark = watermark.into();
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// 正規のデッキ名
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// 生のデッキ名 → 正規のデッキ名の対応表
///
/// ID表を先に、表示名表を後に参照します。同じIDや表示名が重複した場合は
/// 後から登録されたものが優先されます。
#[derive(Debug, Clone, Default)]
pub struct DeckAliases {
    by_id: BTreeMap<String, String>,
    by_name: BTreeMap<String, String>,
    infos: BTreeMap<String, DeckInfo>,
}

impl DeckAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_infos<'a, I>(infos: I) -> Self
    where
        I: IntoIterator<Item = &'a DeckInfo>,
    {
        let mut aliases = Self::new();
        for info in infos {
            aliases.insert(info.clone());
        }
        aliases
    }

    pub fn insert(&mut self, info: DeckInfo) {
        let canonical = info.display_name().to_string();
        self.by_id.insert(info.id.clone(), canonical.clone());
        self.by_name.insert(canonical.clone(), canonical.clone());
        self.infos.insert(canonical, info);
    }

    /// 生のデッキ名を解決する
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.by_id
            .get(raw)
            .or_else(|| self.by_name.get(raw))
            .map(|s| s.as_str())
    }

    /// 正規のデッキ名からデッキ情報を取得する
    pub fn info(&self, canonical: &str) -> Option<&DeckInfo> {
        self.infos.get(canonical)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

/// 統合結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedCards {
    pub black: DeckCardMap,
    pub white: DeckCardMap,
    /// 黒・白の両方で出現した正規デッキ名
    pub decks: BTreeSet<String>,
}

/// デッキごとの枚数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckSummary {
    pub name: String,
    pub black: usize,
    pub white: usize,
}

impl MergedCards {
    pub fn cards(&self, color: CardColor) -> &DeckCardMap {
        match color {
            CardColor::Black => &self.black,
            CardColor::White => &self.white,
        }
    }

    /// デッキ名順の枚数一覧
    pub fn summary(&self) -> Vec<DeckSummary> {
        self.decks
            .iter()
            .map(|deck| DeckSummary {
                name: deck.clone(),
                black: self.black.get(deck).map_or(0, |s| s.len()),
                white: self.white.get(deck).map_or(0, |s| s.len()),
            })
            .collect()
    }
}

/// 種類付きのデッキマッピング群を統合する
///
/// エイリアスが見つからないデッキ名は、`MissingDeckInfo`を報告した上で
/// 生の名前のまま使用します（マッピング1つにつき1回報告）。
///
/// # 使用例
///
/// ```rust
/// use cardsheet::{aggregate, CardColor, DeckAliases, DeckCardMap, DeckInfo};
///
/// let aliases = DeckAliases::from_infos(&[DeckInfo::new("base").with_name("Base Set")]);
/// let sheet: DeckCardMap = vec![("base", "A card")].into_iter().collect();
///
/// let mut anomalies: Vec<cardsheet::Anomaly> = Vec::new();
/// let merged = aggregate::merge(vec![(CardColor::White, sheet)], &aliases, &mut anomalies);
///
/// assert!(merged.white.get("Base Set").unwrap().contains("A card"));
/// assert!(anomalies.is_empty());
/// ```
pub fn merge<I>(maps: I, aliases: &DeckAliases, sink: &mut dyn DiagnosticsSink) -> MergedCards
where
    I: IntoIterator<Item = (CardColor, DeckCardMap)>,
{
    let mut merged = MergedCards::default();

    for (color, map) in maps {
        for (raw, cards) in map {
            let canonical = match aliases.resolve(&raw) {
                Some(name) => name.to_string(),
                None => {
                    sink.report(
                        Anomaly::new(
                            AnomalyKind::MissingDeckInfo,
                            format!("Deck info not found for deck {}.", raw),
                        )
                        .with_text(raw.as_str()),
                    );
                    raw
                }
            };

            merged.decks.insert(canonical.clone());
            let target = match color {
                CardColor::Black => &mut merged.black,
                CardColor::White => &mut merged.white,
            };
            target.union_into(canonical, cards);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> DeckAliases {
        DeckAliases::from_infos(&[
            DeckInfo::new("base").with_name("Base Set").with_weight(1),
            DeckInfo::new("xmas").with_watermark("X"),
        ])
    }

    fn map(entries: &[(&str, &str)]) -> DeckCardMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_deck_info_defaults() {
        let info: DeckInfo = serde_json::from_str(r#"{"id": "base"}"#).unwrap();
        assert_eq!(info.display_name(), "base");
        assert_eq!(info.watermark, "");
        assert_eq!(info.weight, 0);
    }

    #[test]
    fn test_resolve_by_id_then_name() {
        let aliases = aliases();
        assert_eq!(aliases.resolve("base"), Some("Base Set"));
        assert_eq!(aliases.resolve("Base Set"), Some("Base Set"));
        assert_eq!(aliases.resolve("xmas"), Some("xmas"));
        assert_eq!(aliases.resolve("unknown"), None);
        assert_eq!(aliases.info("Base Set").map(|i| i.weight), Some(1));
    }

    #[test]
    fn test_id_wins_over_name() {
        let aliases = DeckAliases::from_infos(&[
            DeckInfo::new("first").with_name("shared"),
            DeckInfo::new("shared").with_name("Second"),
        ]);
        assert_eq!(aliases.resolve("shared"), Some("Second"));
    }

    #[test]
    fn test_merge_unions_aliases() {
        let mut sink: Vec<Anomaly> = Vec::new();
        let merged = merge(
            vec![
                (CardColor::Black, map(&[("base", "Q1"), ("Base Set", "Q2")])),
                (CardColor::Black, map(&[("base", "Q1")])),
                (CardColor::White, map(&[("xmas", "A1")])),
            ],
            &aliases(),
            &mut sink,
        );

        assert!(sink.is_empty());
        assert_eq!(merged.black.get("Base Set").unwrap().len(), 2);
        assert_eq!(merged.white.get("xmas").unwrap().len(), 1);
        assert_eq!(
            merged.decks.iter().cloned().collect::<Vec<_>>(),
            vec!["Base Set", "xmas"]
        );
    }

    #[test]
    fn test_missing_deck_info_uses_raw_name() {
        let mut sink: Vec<Anomaly> = Vec::new();
        let merged = merge(
            vec![
                (CardColor::White, map(&[("Homebrew", "A")])),
                (CardColor::Black, map(&[("Homebrew", "Q")])),
            ],
            &aliases(),
            &mut sink,
        );

        assert_eq!(sink.len(), 2);
        assert!(sink.iter().all(|a| a.kind == AnomalyKind::MissingDeckInfo));
        assert!(sink[0].message.contains("Homebrew"));
        assert!(merged.white.contains_deck("Homebrew"));
        assert!(merged.black.contains_deck("Homebrew"));
    }

    #[test]
    fn test_summary_counts() {
        let mut sink: Vec<Anomaly> = Vec::new();
        let merged = merge(
            vec![
                (CardColor::Black, map(&[("base", "Q1")])),
                (CardColor::White, map(&[("base", "A1"), ("base", "A2"), ("xmas", "A3")])),
            ],
            &aliases(),
            &mut sink,
        );

        assert_eq!(
            merged.summary(),
            vec![
                DeckSummary {
                    name: "Base Set".to_string(),
                    black: 1,
                    white: 2
                },
                DeckSummary {
                    name: "xmas".to_string(),
                    black: 0,
                    white: 1
                },
            ]
        );
    }

    #[test]
    fn test_empty_deck_survives_merge() {
        let mut empty = DeckCardMap::new();
        empty.open_deck("xmas");
        let mut sink: Vec<Anomaly> = Vec::new();
        let merged = merge(vec![(CardColor::White, empty)], &aliases(), &mut sink);

        assert!(merged.white.get("xmas").unwrap().is_empty());
        assert!(merged.decks.contains("xmas"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn tagged_map() -> impl Strategy<Value = (CardColor, DeckCardMap)> {
            (
                prop_oneof![Just(CardColor::Black), Just(CardColor::White)],
                prop::collection::vec(("(base|xmas|Base Set|other)", "[a-d]{1,3}"), 0..6),
            )
                .prop_map(|(color, entries)| {
                    let map: DeckCardMap = entries.into_iter().collect();
                    (color, map)
                })
        }

        proptest! {
            #[test]
            fn test_merge_is_order_independent(
                maps in prop::collection::vec(tagged_map(), 0..6)
            ) {
                let aliases = aliases();
                let mut forward_sink: Vec<Anomaly> = Vec::new();
                let mut reverse_sink: Vec<Anomaly> = Vec::new();

                let forward = merge(maps.clone(), &aliases, &mut forward_sink);
                let reversed: Vec<_> = maps.into_iter().rev().collect();
                let backward = merge(reversed, &aliases, &mut reverse_sink);

                prop_assert_eq!(forward, backward);
                prop_assert_eq!(forward_sink.len(), reverse_sink.len());
            }

            #[test]
            fn test_merge_is_idempotent(map in tagged_map()) {
                let aliases = aliases();
                let mut sink: Vec<Anomaly> = Vec::new();
                let once = merge(vec![map.clone()], &aliases, &mut sink);
                let twice = merge(vec![map.clone(), map], &aliases, &mut sink);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
