//! Output Formatters Implementation
//!
//! 各出力フォーマットの実装を提供するモジュール。

use serde::Serialize;
use std::io::Write;

use crate::builder::ImportResult;
use crate::error::ImportError;
use crate::prompt::PromptMetrics;

/// テキスト形式のフォーマッター
///
/// デッキ一覧、白カード、黒カードの順に出力します。
pub struct TextFormatter;

impl TextFormatter {
    pub fn render<W: Write>(&self, result: &ImportResult, writer: &mut W) -> Result<(), ImportError> {
        writeln!(writer, "Decks:")?;
        for summary in result.summary() {
            writeln!(
                writer,
                ">{} (black: {}, white: {})",
                summary.name, summary.black, summary.white
            )?;
        }

        writeln!(writer, "White cards:")?;
        for (deck, cards) in result.cards().white.iter() {
            writeln!(writer, ">{}", deck)?;
            for card in cards {
                writeln!(writer, ">>{}", card)?;
            }
        }

        writeln!(writer, "Black cards:")?;
        for (deck, cards) in result.cards().black.iter() {
            writeln!(writer, ">{}", deck)?;
            for card in cards {
                let metrics = PromptMetrics::of(card);
                writeln!(
                    writer,
                    ">>{} [pick {}, draw {}]",
                    card, metrics.pick, metrics.draw
                )?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    decks: Vec<JsonDeck<'a>>,
}

#[derive(Serialize)]
struct JsonDeck<'a> {
    name: &'a str,
    watermark: &'a str,
    weight: i32,
    black_cards: Vec<JsonBlackCard<'a>>,
    white_cards: Vec<JsonWhiteCard<'a>>,
}

#[derive(Serialize)]
struct JsonBlackCard<'a> {
    text: &'a str,
    #[serde(flatten)]
    metrics: PromptMetrics,
}

#[derive(Serialize)]
struct JsonWhiteCard<'a> {
    text: &'a str,
}

/// JSON形式のフォーマッター
///
/// デッキ名順の`decks`配列を出力します。デッキ情報のないデッキは
/// 透かし`""`・重み`0`になります。
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn render<W: Write>(&self, result: &ImportResult, writer: &mut W) -> Result<(), ImportError> {
        let cards = result.cards();

        let decks = cards
            .decks
            .iter()
            .map(|name| {
                let info = result.deck_info(name);
                JsonDeck {
                    name: name.as_str(),
                    watermark: info.map_or("", |i| i.watermark.as_str()),
                    weight: info.map_or(0, |i| i.weight),
                    black_cards: cards
                        .black
                        .get(name)
                        .into_iter()
                        .flatten()
                        .map(|text| JsonBlackCard {
                            text: text.as_str(),
                            metrics: PromptMetrics::of(text),
                        })
                        .collect(),
                    white_cards: cards
                        .white
                        .get(name)
                        .into_iter()
                        .flatten()
                        .map(|text| JsonWhiteCard {
                            text: text.as_str(),
                        })
                        .collect(),
                }
            })
            .collect();

        serde_json::to_writer_pretty(&mut *writer, &JsonOutput { decks })?;
        writeln!(writer)?;
        writer.flush()?;

        Ok(())
    }
}
