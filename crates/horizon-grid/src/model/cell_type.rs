//! Column cell types and their capability table.
//!
//! Every [`CellType`] maps to a static [`CellCapabilities`] entry holding the
//! coercion, comparison and display behaviour for values of that type. Views
//! and edit sessions look the entry up once per column and then apply it to
//! every cell, instead of branching on the type per cell.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::value::{CellValue, format_number};

/// The declared semantic kind of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellType {
    /// Single-line text.
    #[default]
    Text,
    /// A finite number.
    Number,
    /// One of the column's declared options.
    Select,
    /// A boolean flag.
    Checkbox,
    /// A calendar date.
    Date,
    /// An inclusive pair of calendar dates.
    DateRange,
    /// Whole stars from 0 to [`RATING_MAX`].
    Rating,
    /// Percentage complete, 0 to 100.
    Progress,
    /// A `#rrggbb` color.
    Color,
    /// A list of attached file names.
    Files,
    /// A list of `{text, done}` items.
    Checklist,
    /// A free-form place description.
    Location,
    /// Text that may span lines.
    MultilineText,
    /// An absolute link.
    Url,
}

/// Highest value a rating cell accepts.
pub const RATING_MAX: u8 = 5;

impl CellType {
    /// All cell types, in declaration order.
    pub const ALL: [CellType; 14] = [
        CellType::Text,
        CellType::Number,
        CellType::Select,
        CellType::Checkbox,
        CellType::Date,
        CellType::DateRange,
        CellType::Rating,
        CellType::Progress,
        CellType::Color,
        CellType::Files,
        CellType::Checklist,
        CellType::Location,
        CellType::MultilineText,
        CellType::Url,
    ];

    /// Returns the kebab-case name used in serialized column definitions.
    pub fn name(self) -> &'static str {
        match self {
            CellType::Text => "text",
            CellType::Number => "number",
            CellType::Select => "select",
            CellType::Checkbox => "checkbox",
            CellType::Date => "date",
            CellType::DateRange => "date-range",
            CellType::Rating => "rating",
            CellType::Progress => "progress",
            CellType::Color => "color",
            CellType::Files => "files",
            CellType::Checklist => "checklist",
            CellType::Location => "location",
            CellType::MultilineText => "multiline-text",
            CellType::Url => "url",
        }
    }

    /// Returns the capability table entry for this type.
    pub fn capabilities(self) -> &'static CellCapabilities {
        match self {
            CellType::Text => &TEXT,
            CellType::Number => &NUMBER,
            CellType::Select => &SELECT,
            CellType::Checkbox => &CHECKBOX,
            CellType::Date => &DATE,
            CellType::DateRange => &DATE_RANGE,
            CellType::Rating => &RATING,
            CellType::Progress => &PROGRESS,
            CellType::Color => &COLOR,
            CellType::Files => &FILES,
            CellType::Checklist => &CHECKLIST,
            CellType::Location => &LOCATION,
            CellType::MultilineText => &MULTILINE_TEXT,
            CellType::Url => &URL,
        }
    }

    /// Whether values of this type sort numerically.
    pub fn is_numeric(self) -> bool {
        self.capabilities().numeric
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coerces a raw value into the canonical form. The slice holds the
/// column's select options.
pub type CoerceFn = fn(&CellValue, &[String]) -> Result<CellValue, String>;

/// Renders a value as the string used for display, search and filtering.
pub type DisplayFn = fn(&CellValue) -> String;

/// Behaviour shared by every value of one [`CellType`].
pub struct CellCapabilities {
    /// Validate and normalize an incoming value.
    pub coerce: CoerceFn,
    /// Stringify a stored value.
    pub display: DisplayFn,
    /// Compare numerically instead of lexically.
    pub numeric: bool,
}

impl CellCapabilities {
    /// Coerce `value`, treating null and blank text as clearing the cell.
    pub fn coerce(&self, value: &CellValue, options: &[String]) -> Result<CellValue, String> {
        if value.is_blank() {
            return Ok(CellValue::Null);
        }
        (self.coerce)(value, options)
    }

    /// Display string for `value`.
    pub fn display(&self, value: &CellValue) -> String {
        (self.display)(value)
    }

    /// Build the key used to order `value` among its siblings.
    pub fn sort_key(&self, value: Option<&CellValue>) -> SortKey {
        match value {
            None => SortKey::Empty,
            Some(v) if v.is_blank() => SortKey::Empty,
            Some(v) if self.numeric => match numeric_of(v) {
                Some(n) => SortKey::Number(n),
                None => SortKey::Text(self.display(v).to_lowercase()),
            },
            Some(v) => SortKey::Text(self.display(v).to_lowercase()),
        }
    }

    /// Compare two cell values with this type's ordering.
    pub fn compare(&self, a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
        self.sort_key(a).cmp(&self.sort_key(b))
    }
}

/// A precomputed ordering key for one cell.
///
/// Empty cells order first, then numbers, then text.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// No value.
    Empty,
    /// A numeric value.
    Number(f64),
    /// A lowercased display string.
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Empty => 0,
            SortKey::Number(_) => 1,
            SortKey::Text(_) => 2,
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

static TEXT: CellCapabilities = CellCapabilities {
    coerce: coerce_text,
    display: display_plain,
    numeric: false,
};
static NUMBER: CellCapabilities = CellCapabilities {
    coerce: coerce_number,
    display: display_plain,
    numeric: true,
};
static SELECT: CellCapabilities = CellCapabilities {
    coerce: coerce_select,
    display: display_plain,
    numeric: false,
};
static CHECKBOX: CellCapabilities = CellCapabilities {
    coerce: coerce_checkbox,
    display: display_plain,
    numeric: false,
};
static DATE: CellCapabilities = CellCapabilities {
    coerce: coerce_date,
    display: display_plain,
    numeric: false,
};
static DATE_RANGE: CellCapabilities = CellCapabilities {
    coerce: coerce_date_range,
    display: display_date_range,
    numeric: false,
};
static RATING: CellCapabilities = CellCapabilities {
    coerce: coerce_rating,
    display: display_plain,
    numeric: true,
};
static PROGRESS: CellCapabilities = CellCapabilities {
    coerce: coerce_progress,
    display: display_plain,
    numeric: true,
};
static COLOR: CellCapabilities = CellCapabilities {
    coerce: coerce_color,
    display: display_plain,
    numeric: false,
};
static FILES: CellCapabilities = CellCapabilities {
    coerce: coerce_files,
    display: display_plain,
    numeric: false,
};
static CHECKLIST: CellCapabilities = CellCapabilities {
    coerce: coerce_checklist,
    display: display_checklist,
    numeric: false,
};
static LOCATION: CellCapabilities = CellCapabilities {
    coerce: coerce_location,
    display: display_plain,
    numeric: false,
};
static MULTILINE_TEXT: CellCapabilities = CellCapabilities {
    coerce: coerce_multiline,
    display: display_plain,
    numeric: false,
};
static URL: CellCapabilities = CellCapabilities {
    coerce: coerce_url,
    display: display_plain,
    numeric: false,
};

// ============================================================================
// Display
// ============================================================================

fn display_plain(value: &CellValue) -> String {
    value.to_display_string()
}

fn display_date_range(value: &CellValue) -> String {
    match value.as_list() {
        Some([start, end]) => format!("{}..{}", start.to_display_string(), end.to_display_string()),
        _ => value.to_display_string(),
    }
}

fn display_checklist(value: &CellValue) -> String {
    let Some(items) = value.as_list() else {
        return value.to_display_string();
    };
    items
        .iter()
        .map(|item| match item.as_record() {
            Some(fields) => {
                let done = fields.get("done").and_then(CellValue::as_bool).unwrap_or(false);
                let text = fields.get("text").map(CellValue::to_display_string).unwrap_or_default();
                format!("[{}] {text}", if done { 'x' } else { ' ' })
            }
            None => item.to_display_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Coercion
// ============================================================================

fn numeric_of(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn scalar_text(value: &CellValue) -> Result<String, String> {
    match value {
        CellValue::Text(s) => Ok(s.clone()),
        CellValue::Number(_) | CellValue::Bool(_) => Ok(value.to_display_string()),
        other => Err(format!("expected text, got '{}'", other.to_display_string())),
    }
}

fn coerce_text(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let text = scalar_text(value)?;
    if text.contains(['\n', '\r']) {
        return Err("line breaks are only allowed in multiline text".into());
    }
    Ok(CellValue::Text(text))
}

fn coerce_multiline(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let text = scalar_text(value)?;
    Ok(CellValue::Text(text.replace("\r\n", "\n")))
}

fn coerce_location(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let text = scalar_text(value)?;
    Ok(CellValue::Text(text.trim().to_string()))
}

fn coerce_number(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    match value {
        CellValue::Number(n) if n.is_finite() => Ok(CellValue::Number(*n)),
        CellValue::Text(s) => parse_number(s)
            .map(CellValue::Number)
            .ok_or_else(|| format!("not a number: '{s}'")),
        other => Err(format!("not a number: '{}'", other.to_display_string())),
    }
}

fn coerce_select(value: &CellValue, options: &[String]) -> Result<CellValue, String> {
    let text = scalar_text(value)?;
    let text = text.trim();
    if options.is_empty() {
        return Ok(CellValue::Text(text.to_string()));
    }
    let wanted = text.to_lowercase();
    options
        .iter()
        .find(|option| option.to_lowercase() == wanted)
        .map(|option| CellValue::Text(option.clone()))
        .ok_or_else(|| format!("'{text}' is not one of: {}", options.join(", ")))
}

fn coerce_checkbox(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    match value {
        CellValue::Bool(b) => Ok(CellValue::Bool(*b)),
        CellValue::Number(n) if *n == 0.0 => Ok(CellValue::Bool(false)),
        CellValue::Number(n) if *n == 1.0 => Ok(CellValue::Bool(true)),
        CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" | "checked" | "x" => Ok(CellValue::Bool(true)),
            "false" | "no" | "off" | "0" | "unchecked" => Ok(CellValue::Bool(false)),
            _ => Err(format!("not a checkbox state: '{s}'")),
        },
        other => Err(format!("not a checkbox state: '{}'", other.to_display_string())),
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| format!("not a date: '{text}'"))
}

fn iso(date: NaiveDate) -> CellValue {
    CellValue::Text(date.format("%Y-%m-%d").to_string())
}

fn coerce_date(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    match value {
        CellValue::Text(s) => parse_date(s).map(iso),
        other => Err(format!("not a date: '{}'", other.to_display_string())),
    }
}

fn coerce_date_range(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let (start, end) = match value {
        CellValue::List(items) => match items.as_slice() {
            [CellValue::Text(a), CellValue::Text(b)] => (parse_date(a)?, parse_date(b)?),
            _ => return Err("a date range needs exactly a start and an end date".into()),
        },
        CellValue::Text(s) => {
            let (a, b) = ["..", " to ", " - "]
                .iter()
                .find_map(|sep| s.split_once(sep))
                .ok_or_else(|| format!("not a date range: '{s}'"))?;
            (parse_date(a)?, parse_date(b)?)
        }
        other => return Err(format!("not a date range: '{}'", other.to_display_string())),
    };
    if start > end {
        return Err(format!("range starts after it ends: {start} > {end}"));
    }
    Ok(CellValue::List(vec![iso(start), iso(end)]))
}

fn coerce_rating(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let n = numeric_of(value).ok_or_else(|| format!("not a rating: '{}'", value.to_display_string()))?;
    if n.fract() != 0.0 || n < 0.0 || n > f64::from(RATING_MAX) {
        return Err(format!("rating must be a whole number from 0 to {RATING_MAX}, got {}", format_number(n)));
    }
    Ok(CellValue::Number(n))
}

fn coerce_progress(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let n = match value {
        CellValue::Text(s) => parse_number(s.trim().trim_end_matches('%')),
        other => numeric_of(other),
    }
    .ok_or_else(|| format!("not a percentage: '{}'", value.to_display_string()))?;
    if !(0.0..=100.0).contains(&n) {
        return Err(format!("progress must be between 0 and 100, got {}", format_number(n)));
    }
    Ok(CellValue::Number(n))
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("color pattern is valid")
    })
}

fn coerce_color(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let text = scalar_text(value)?;
    let captures = color_pattern()
        .captures(text.trim())
        .ok_or_else(|| format!("not a hex color: '{text}'"))?;
    let hex = captures[1].to_lowercase();
    let hex = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex
    };
    Ok(CellValue::Text(format!("#{hex}")))
}

fn coerce_files(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let names: Vec<String> = match value {
        CellValue::Text(s) => s.split(',').map(str::to_string).collect(),
        CellValue::List(items) => items
            .iter()
            .map(|item| match item {
                CellValue::Text(s) => Ok(s.clone()),
                other => Err(format!("not a file name: '{}'", other.to_display_string())),
            })
            .collect::<Result<_, _>>()?,
        other => return Err(format!("not a file list: '{}'", other.to_display_string())),
    };
    Ok(CellValue::List(
        names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(CellValue::from)
            .collect(),
    ))
}

fn checklist_item(text: &str, done: bool) -> CellValue {
    let mut fields = BTreeMap::new();
    fields.insert("done".to_string(), CellValue::Bool(done));
    fields.insert("text".to_string(), CellValue::Text(text.trim().to_string()));
    CellValue::Record(fields)
}

fn parse_checklist_line(line: &str) -> Option<CellValue> {
    let line = line.trim();
    let line = line.strip_prefix("- ").unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    let item = if let Some(rest) = line.strip_prefix("[x]").or_else(|| line.strip_prefix("[X]")) {
        checklist_item(rest, true)
    } else if let Some(rest) = line.strip_prefix("[ ]") {
        checklist_item(rest, false)
    } else {
        checklist_item(line, false)
    };
    Some(item)
}

fn checklist_entry(item: &CellValue) -> Result<CellValue, String> {
    match item {
        CellValue::Text(s) => Ok(checklist_item(s, false)),
        CellValue::Record(fields) => {
            let text = fields
                .get("text")
                .and_then(CellValue::as_str)
                .ok_or_else(|| "checklist item is missing its text".to_string())?;
            let done = match fields.get("done") {
                None | Some(CellValue::Null) => false,
                Some(CellValue::Bool(b)) => *b,
                Some(other) => {
                    return Err(format!("'done' must be a boolean, got '{}'", other.to_display_string()));
                }
            };
            Ok(checklist_item(text, done))
        }
        other => Err(format!("not a checklist item: '{}'", other.to_display_string())),
    }
}

fn coerce_checklist(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    match value {
        CellValue::Text(s) => Ok(CellValue::List(s.lines().filter_map(parse_checklist_line).collect())),
        CellValue::List(items) => items
            .iter()
            .map(checklist_entry)
            .collect::<Result<Vec<_>, _>>()
            .map(CellValue::List),
        other => Err(format!("not a checklist: '{}'", other.to_display_string())),
    }
}

fn coerce_url(value: &CellValue, _options: &[String]) -> Result<CellValue, String> {
    let text = scalar_text(value)?;
    let text = text.trim();
    let candidate = if text.contains("://") || text.starts_with("mailto:") {
        text.to_string()
    } else {
        format!("https://{text}")
    };
    let parsed = url::Url::parse(&candidate).map_err(|e| format!("not a link: '{text}' ({e})"))?;
    match parsed.scheme() {
        "http" | "https" | "mailto" => Ok(CellValue::Text(parsed.to_string())),
        scheme => Err(format!("unsupported link scheme '{scheme}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coerce(ty: CellType, value: impl Into<CellValue>) -> Result<CellValue, String> {
        ty.capabilities().coerce(&value.into(), &[])
    }

    #[test]
    fn test_blank_clears_every_type() {
        for ty in CellType::ALL {
            assert_eq!(coerce(ty, "  "), Ok(CellValue::Null), "{ty}");
            assert_eq!(ty.capabilities().coerce(&CellValue::Null, &[]), Ok(CellValue::Null));
        }
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(coerce(CellType::Number, " 1,234.50 "), Ok(CellValue::Number(1234.5)));
        assert_eq!(coerce(CellType::Number, 7), Ok(CellValue::Number(7.0)));
        assert!(coerce(CellType::Number, "12abc").is_err());
        assert!(coerce(CellType::Number, f64::NAN).is_err());
        assert!(coerce(CellType::Number, true).is_err());
    }

    #[test]
    fn test_select_uses_canonical_option() {
        let options = vec!["Matched".to_string(), "Unmatched".to_string()];
        let caps = CellType::Select.capabilities();
        assert_eq!(caps.coerce(&"matched".into(), &options), Ok("Matched".into()));
        assert!(caps.coerce(&"pending".into(), &options).is_err());
        assert_eq!(caps.coerce(&"anything".into(), &[]), Ok("anything".into()));
    }

    #[test]
    fn test_checkbox_coercion() {
        assert_eq!(coerce(CellType::Checkbox, "Yes"), Ok(CellValue::Bool(true)));
        assert_eq!(coerce(CellType::Checkbox, 0), Ok(CellValue::Bool(false)));
        assert!(coerce(CellType::Checkbox, "maybe").is_err());
        assert!(coerce(CellType::Checkbox, 2).is_err());
    }

    #[test]
    fn test_dates() {
        assert_eq!(coerce(CellType::Date, "03/15/2024"), Ok("2024-03-15".into()));
        assert_eq!(coerce(CellType::Date, "2024/3/5"), Ok("2024-03-05".into()));
        assert!(coerce(CellType::Date, "2024-02-30").is_err());

        assert_eq!(
            coerce(CellType::DateRange, "2024-01-01 to 2024-01-05"),
            Ok(CellValue::from(vec!["2024-01-01", "2024-01-05"]))
        );
        assert!(coerce(CellType::DateRange, "2024-02-01..2024-01-01").is_err());
        assert!(coerce(CellType::DateRange, vec!["2024-01-01"]).is_err());

        let range = coerce(CellType::DateRange, vec!["2024-01-01", "2024-01-05"]).unwrap();
        assert_eq!(CellType::DateRange.capabilities().display(&range), "2024-01-01..2024-01-05");
    }

    #[test]
    fn test_rating_and_progress_bounds() {
        assert_eq!(coerce(CellType::Rating, "4"), Ok(CellValue::Number(4.0)));
        assert!(coerce(CellType::Rating, 6).is_err());
        assert!(coerce(CellType::Rating, 2.5).is_err());

        assert_eq!(coerce(CellType::Progress, "45%"), Ok(CellValue::Number(45.0)));
        assert!(coerce(CellType::Progress, 101).is_err());
        assert!(coerce(CellType::Progress, -1).is_err());
    }

    #[test]
    fn test_color_normalization() {
        assert_eq!(coerce(CellType::Color, "#ABC"), Ok("#aabbcc".into()));
        assert_eq!(coerce(CellType::Color, "12AB9f"), Ok("#12ab9f".into()));
        assert!(coerce(CellType::Color, "#12345").is_err());
        assert!(coerce(CellType::Color, "red").is_err());
    }

    #[test]
    fn test_files_and_checklist() {
        assert_eq!(
            coerce(CellType::Files, "statement.pdf, , receipt.png"),
            Ok(CellValue::from(vec!["statement.pdf", "receipt.png"]))
        );

        let checklist = coerce(CellType::Checklist, "[x] Upload statement\n[ ] Match deposits\nSign off").unwrap();
        assert_eq!(checklist.as_list().map(<[CellValue]>::len), Some(3));
        assert_eq!(
            CellType::Checklist.capabilities().display(&checklist),
            "[x] Upload statement, [ ] Match deposits, [ ] Sign off"
        );
    }

    #[test]
    fn test_text_and_url() {
        assert!(coerce(CellType::Text, "two\nlines").is_err());
        assert_eq!(coerce(CellType::MultilineText, "two\r\nlines"), Ok("two\nlines".into()));
        assert_eq!(coerce(CellType::Text, 12), Ok("12".into()));

        assert_eq!(coerce(CellType::Url, "example.com/docs"), Ok("https://example.com/docs".into()));
        assert!(coerce(CellType::Url, "ftp://example.com").is_err());
    }

    #[test]
    fn test_sort_keys() {
        let number = CellType::Number.capabilities();
        assert_eq!(number.compare(Some(&9.into()), Some(&10.into())), Ordering::Less);
        assert_eq!(number.compare(None, Some(&(-5).into())), Ordering::Less);

        let text = CellType::Text.capabilities();
        assert_eq!(text.compare(Some(&"b".into()), Some(&"A".into())), Ordering::Greater);
        // "10" < "9" lexically.
        assert_eq!(text.compare(Some(&"10".into()), Some(&"9".into())), Ordering::Less);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&CellType::DateRange).unwrap(), r#""date-range""#);
        let ty: CellType = serde_json::from_str(r#""multiline-text""#).unwrap();
        assert_eq!(ty, CellType::MultilineText);
        for ty in CellType::ALL {
            assert_eq!(serde_json::to_string(&ty).unwrap(), format!("\"{}\"", ty.name()));
        }
    }
}
