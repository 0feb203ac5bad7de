//! デバッグイベントログ
//!
//! 記録済みセッションを1行1イベントで表します。
//!
//! ```text
//! module <name>
//! break <address> <original-byte> <line> <filename>
//! hit <address>
//! ```
//!
//! `#` で始まる行と空行は無視します。

use crate::errors::EventParseError;

/// デバッグイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// モジュールのロード
    Module(String),
    /// 計装可能な命令の発見
    Break {
        address: u64,
        original_byte: u8,
        line: u32,
        filename: String,
    },
    /// ブレークポイントのヒット
    Hit(u64),
}

impl Event {
    /// 1行をパースする
    ///
    /// 空行とコメント行は `Ok(None)` になります。
    pub fn parse(input: &str) -> Result<Option<Self>, EventParseError> {
        let input = input.trim();
        if input.is_empty() || input.starts_with('#') {
            return Ok(None);
        }

        let (keyword, rest) = match input.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim_start()),
            None => (input, ""),
        };

        let event = match keyword {
            "module" => {
                if rest.is_empty() {
                    return Err(missing("module", "name"));
                }
                Event::Module(rest.to_string())
            }
            "break" => {
                // ファイル名は空白を含みうるので残り全体
                let mut rest = rest;
                let address = parse_number(next_field(&mut rest), "break", "address")?;
                let original_byte =
                    parse_number(next_field(&mut rest), "break", "original byte")?;
                let line = parse_number(next_field(&mut rest), "break", "line")?;
                let filename = Some(rest.trim())
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| missing("break", "filename"))?;

                Event::Break {
                    address,
                    original_byte: u8::try_from(original_byte)
                        .map_err(|_| EventParseError::InvalidNumber(original_byte.to_string()))?,
                    line: u32::try_from(line)
                        .map_err(|_| EventParseError::InvalidNumber(line.to_string()))?,
                    filename: filename.to_string(),
                }
            }
            "hit" => Event::Hit(parse_number(Some(rest).filter(|r| !r.is_empty()), "hit", "address")?),
            other => return Err(EventParseError::UnknownEvent(other.to_string())),
        };

        Ok(Some(event))
    }
}

/// ログ全体をパースする
///
/// 最初に失敗した行の行番号（1始まり）をエラーに含めます。
pub fn parse_log(text: &str) -> Result<Vec<Event>, EventParseError> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match Event::parse(line) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(source) => {
                return Err(EventParseError::AtLine {
                    line: index + 1,
                    source: Box::new(source),
                })
            }
        }
    }
    Ok(events)
}

/// 先頭の空白を読み飛ばし、次の空白までを1フィールドとして切り出す
fn next_field<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let trimmed = rest.trim_start();
    if trimmed.is_empty() {
        *rest = trimmed;
        return None;
    }
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (field, remainder) = trimmed.split_at(end);
    *rest = remainder;
    Some(field)
}

fn missing(event: &'static str, field: &'static str) -> EventParseError {
    EventParseError::MissingField { event, field }
}

fn parse_number(
    field: Option<&str>,
    event: &'static str,
    name: &'static str,
) -> Result<u64, EventParseError> {
    let field = field.map(str::trim).ok_or_else(|| missing(event, name))?;
    let parsed = match field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => field.parse::<u64>(),
    };
    parsed.map_err(|_| EventParseError::InvalidNumber(field.to_string()))
}
