use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::records::ProjectRecord;

const TEMPLATE: &str = include_str!("report.html");

const TITLE_PLACEHOLDER: &str = "__REPORT_TITLE__";
const GENERATED_AT_PLACEHOLDER: &str = "__GENERATED_AT__";
const CONFIG_PLACEHOLDER: &str = "__REPORT_CONFIG__";
const DATA_PLACEHOLDER: &str = "__PIPELINE_DATA__";

/// Inputs of the HTML report besides the project data.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    pub threshold_days: u32,
    /// Each tag gets a "Hide" checkbox matching pipeline names and folders.
    pub exclusion_tags: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Settings read by the report script, kept separate from the data block.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptConfig<'a> {
    threshold_days: u32,
    exclusion_tags: &'a [String],
    generated_at: DateTime<Utc>,
}

/// Renders the self-contained interactive report.
///
/// Pure: no I/O happens here, writing the document is up to the caller.
pub fn render_html(projects: &[ProjectRecord], options: &RenderOptions) -> Result<String> {
    let data = script_safe_json(projects)?;
    let config = script_safe_json(&ScriptConfig {
        threshold_days: options.threshold_days,
        exclusion_tags: &options.exclusion_tags,
        generated_at: options.generated_at,
    })?;
    let title = escape_html(&options.title);
    let generated_at = options
        .generated_at
        .format("%Y-%m-%d %H:%M UTC")
        .to_string();

    Ok(fill_template(
        TEMPLATE,
        &[
            (TITLE_PLACEHOLDER, title.as_str()),
            (GENERATED_AT_PLACEHOLDER, generated_at.as_str()),
            (CONFIG_PLACEHOLDER, config.as_str()),
            (DATA_PLACEHOLDER, data.as_str()),
        ],
    ))
}

/// Serializes `value` so it can sit inside a `<script>` element.
///
/// `<`, `>` and `&` only ever occur inside JSON strings, so replacing them
/// with `\u` escapes keeps the JSON equivalent while making `</script>` and
/// `<!--` impossible. U+2028 and U+2029 are escaped for older JS parsers.
fn script_safe_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            _ => escaped.push(c),
        }
    }
    Ok(escaped)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Single left-to-right pass over the template. Substituted values are
/// never rescanned, so data containing a placeholder name stays intact.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let next = values
            .iter()
            .filter_map(|(key, value)| rest.find(key).map(|at| (at, *key, *value)))
            .min_by_key(|(at, _, _)| *at);

        match next {
            Some((at, key, value)) => {
                output.push_str(&rest[..at]);
                output.push_str(value);
                rest = &rest[at + key.len()..];
            }
            None => {
                output.push_str(rest);
                return output;
            }
        }
    }
}
