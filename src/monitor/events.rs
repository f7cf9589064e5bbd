use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::io::BufRead;

/// One decoded line of an agent's stream-json log.
///
/// Records are tagged by their `type` field. Anything that is not a
/// `system`, `result` or `assistant` record decodes to [`LogEvent::Ignored`]
/// so newer record kinds never break the dashboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// Session bootstrap record emitted once the agent is up
    System {
        #[serde(default, deserialize_with = "lenient_string")]
        session_id: Option<String>,
    },
    /// Terminal record carrying the run totals
    Result {
        #[serde(default, deserialize_with = "lenient_count")]
        num_turns: u64,
        #[serde(default, deserialize_with = "lenient_cost")]
        total_cost_usd: f64,
        #[serde(default, deserialize_with = "lenient_count")]
        duration_ms: u64,
        #[serde(default, deserialize_with = "lenient_flag")]
        is_error: bool,
    },
    /// Assistant turn with text and tool invocations
    Assistant {
        #[serde(default, deserialize_with = "lenient")]
        message: AssistantMessage,
    },
    #[serde(other)]
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssistantMessage {
    #[serde(default, deserialize_with = "lenient_blocks")]
    pub content: Vec<ContentBlock>,
}

/// A fragment of an assistant message
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        name: String,
    },
    #[serde(other)]
    Other,
}

/// Decode a single log line. Blank, torn or otherwise undecodable lines
/// yield `None`.
pub fn parse_line(line: &str) -> Option<LogEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Lazily decode a newline-delimited record stream, skipping bad lines.
///
/// Lines are split on raw bytes so a non-UTF-8 line only loses itself.
/// A read error ends the stream.
pub fn parse_events<R: BufRead>(reader: R) -> impl Iterator<Item = LogEvent> {
    reader
        .split(b'\n')
        .map_while(Result::ok)
        .filter_map(|bytes| std::str::from_utf8(&bytes).ok().and_then(parse_line))
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_blocks<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    let blocks = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(blocks)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

// Counts arrive as JSON numbers that may carry a fractional part.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| n as u64)
        .unwrap_or(0))
}

fn lenient_cost<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .filter(|n| n.is_finite() && *n > 0.0)
        .unwrap_or(0.0))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(false))
}
