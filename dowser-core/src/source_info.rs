use crate::{DataError, Result, RowLabeled, Value};
use once_cell::sync::OnceCell;
use regex::Regex;

/// How the backend relates GROUP BY columns to the select list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GroupByBehavior {
    #[default]
    Unknown,
    NotSupported,
    Unrelated,
    MustContainAll,
    ExactMatch,
}

impl From<i64> for GroupByBehavior {
    fn from(value: i64) -> Self {
        match value {
            1 => GroupByBehavior::NotSupported,
            2 => GroupByBehavior::Unrelated,
            3 => GroupByBehavior::MustContainAll,
            4 => GroupByBehavior::ExactMatch,
            _ => GroupByBehavior::Unknown,
        }
    }
}

/// Case folding the backend applies to identifiers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierCase {
    #[default]
    Unknown,
    Insensitive,
    Sensitive,
}

impl From<i64> for IdentifierCase {
    fn from(value: i64) -> Self {
        match value {
            1 => IdentifierCase::Insensitive,
            2 => IdentifierCase::Sensitive,
            _ => IdentifierCase::Unknown,
        }
    }
}

/// Join operators the backend reports support for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SupportedJoinOperators(i64);

impl SupportedJoinOperators {
    pub const NONE: SupportedJoinOperators = SupportedJoinOperators(0);
    pub const INNER: SupportedJoinOperators = SupportedJoinOperators(1);
    pub const LEFT_OUTER: SupportedJoinOperators = SupportedJoinOperators(2);
    pub const RIGHT_OUTER: SupportedJoinOperators = SupportedJoinOperators(4);
    pub const FULL_OUTER: SupportedJoinOperators = SupportedJoinOperators(8);

    pub fn contains(&self, other: SupportedJoinOperators) -> bool {
        self.0 & other.0 == other.0
    }
}

impl From<i64> for SupportedJoinOperators {
    fn from(value: i64) -> Self {
        SupportedJoinOperators(value)
    }
}

/// Syntactic conventions of one backend, read from the single row of its
/// `data-source-information` schema collection.
///
/// Immutable after construction. The derived values are computed lazily and
/// memoized exactly once; racing first computations produce the same result,
/// so no locking beyond the cells is needed.
#[derive(Debug, Default)]
pub struct SourceInfo {
    pub composite_identifier_separator_pattern: String,
    pub data_source_product_name: String,
    pub data_source_product_version: String,
    pub group_by_behavior: GroupByBehavior,
    pub identifier_case: IdentifierCase,
    pub identifier_pattern: String,
    pub order_by_columns_in_select: bool,
    pub parameter_marker_format: String,
    pub parameter_marker_pattern: String,
    pub parameter_name_max_length: usize,
    pub parameter_name_pattern: String,
    pub quoted_identifier_case: IdentifierCase,
    pub quoted_identifier_pattern: String,
    pub statement_separator_pattern: String,
    pub string_literal_pattern: String,
    pub supported_join_operators: SupportedJoinOperators,
    parameter_marker: OnceCell<String>,
    named_parameter_marker: OnceCell<String>,
    parameter_name_regex: OnceCell<Regex>,
}

impl SourceInfo {
    /// Builds the descriptor from the provider's metadata rows. The
    /// collection is expected to hold exactly one row; an empty collection is
    /// a configuration error.
    pub fn from_rows(rows: &[RowLabeled]) -> Result<Self> {
        let Some(row) = rows.first() else {
            return Err(DataError::configuration(
                "data source information collection does not contain a valid row",
            ));
        };
        let mut info = SourceInfo::default();
        for (label, value) in row.labels.iter().zip(row.values.iter()) {
            if value.is_null() {
                continue;
            }
            match label.as_str() {
                "CompositeIdentifierSeparatorPattern" => {
                    info.composite_identifier_separator_pattern = string(value)
                }
                "DataSourceProductName" => info.data_source_product_name = string(value),
                "DataSourceProductVersion" => info.data_source_product_version = string(value),
                "GroupByBehavior" => info.group_by_behavior = integer(value).into(),
                "IdentifierCase" => info.identifier_case = integer(value).into(),
                "IdentifierPattern" => info.identifier_pattern = string(value),
                "OrderByColumnsInSelect" => {
                    info.order_by_columns_in_select = value.as_bool().unwrap_or(false)
                }
                "ParameterMarkerFormat" => info.parameter_marker_format = string(value),
                "ParameterMarkerPattern" => info.parameter_marker_pattern = string(value),
                "ParameterNameMaxLength" => {
                    info.parameter_name_max_length = integer(value).max(0) as usize
                }
                "ParameterNamePattern" => info.parameter_name_pattern = string(value),
                "QuotedIdentifierCase" => info.quoted_identifier_case = integer(value).into(),
                "QuotedIdentifierPattern" => info.quoted_identifier_pattern = string(value),
                "StatementSeparatorPattern" => info.statement_separator_pattern = string(value),
                "StringLiteralPattern" => info.string_literal_pattern = string(value),
                "SupportedJoinOperators" => info.supported_join_operators = integer(value).into(),
                _ => {}
            }
        }
        Ok(info)
    }

    /// The string placed in front of a parameter name.
    ///
    /// Backends that report a maximum parameter name length use named markers
    /// and the marker is the first character of the marker pattern; the rest
    /// fall back to the raw marker format (positional `?` providers).
    pub fn parameter_marker(&self) -> &str {
        self.parameter_marker.get_or_init(|| {
            if self.parameter_name_max_length != 0 {
                self.parameter_marker_pattern
                    .chars()
                    .next()
                    .map(|c| c.to_string())
                    .unwrap_or_default()
            } else {
                self.parameter_marker_format.clone()
            }
        })
    }

    /// The named-parameter marker, extracted as the character preceding the
    /// marker pattern's character-class opening bracket. Empty when the
    /// pattern carries no character class.
    pub fn named_parameter_marker(&self) -> &str {
        self.named_parameter_marker.get_or_init(|| {
            self.parameter_marker_pattern
                .find('[')
                .and_then(|i| self.parameter_marker_pattern[..i].chars().next_back())
                .map(|c| c.to_string())
                .unwrap_or_default()
        })
    }

    /// Compiled form of the backend's parameter naming rule.
    pub fn parameter_name_regex(&self) -> Result<&Regex> {
        self.parameter_name_regex.get_or_try_init(|| {
            Regex::new(&self.parameter_name_pattern).map_err(|e| {
                DataError::configuration(format!(
                    "invalid parameter name pattern `{}`: {}",
                    self.parameter_name_pattern, e
                ))
            })
        })
    }
}

fn string(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

fn integer(value: &Value) -> i64 {
    value.as_i64().unwrap_or(0)
}
