//! Prompt Metrics Module
//!
//! 黒カード（お題カード）の正規化済みテキストから、
//! 回答枚数（pick）と追加ドロー枚数（draw）を算出します。

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// 空欄として扱う最短のアンダースコア連続
fn blank_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("_{4,}").expect("valid blank regex"))
}

/// 空欄数の判定前に取り除く句読点
const IGNORED_PUNCTUATION: [char; 3] = ['!', '?', '.'];

/// 回答に必要な白カードの枚数
///
/// `!`、`?`、`.`を取り除いた後、4文字以上のアンダースコア連続を空欄として数えます。
/// 空欄がない場合は1（カード全体が質問）です。
///
/// # 使用例
///
/// ```rust
/// use cardsheet::prompt;
///
/// assert_eq!(prompt::pick("What is my favorite thing?"), 1);
/// assert_eq!(prompt::pick("____ and ____."), 2);
/// assert_eq!(prompt::pick("___ is not a blank"), 1);
/// ```
pub fn pick(text: &str) -> u32 {
    let stripped: String = text
        .chars()
        .filter(|c| !IGNORED_PUNCTUATION.contains(c))
        .collect();
    let blanks = blank_regex().find_iter(&stripped).count() as u32;
    blanks.max(1)
}

/// 回答前に追加で引く白カードの枚数
pub fn draw(text: &str) -> u32 {
    draw_for_pick(pick(text))
}

/// pickからdrawを求める（pickが3以上の場合のみpick - 1）
pub fn draw_for_pick(pick: u32) -> u32 {
    if pick > 2 {
        pick - 1
    } else {
        0
    }
}

/// 黒カード1枚分のメトリクス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromptMetrics {
    pub pick: u32,
    pub draw: u32,
}

impl PromptMetrics {
    pub fn of(text: &str) -> Self {
        let pick = pick(text);
        Self {
            pick,
            draw: draw_for_pick(pick),
        }
    }
}
