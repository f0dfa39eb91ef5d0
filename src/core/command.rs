//! Commands and named parameter binding
//!
//! A [`Command`] is SQL text plus the ordered parameters discovered in it.
//! Placeholders are `:name` or `@name` tokens; callers supply one value per
//! distinct name, in order of first appearance.

use super::config::BindOptions;
use super::error::{DatabaseError, Result};
use super::value::DatabaseValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Storage type the driver should use for a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DbType {
    /// Let the driver infer the type from the value
    #[default]
    Any,
    /// Date/time storage
    DateTime,
}

/// A named bind slot of a [`Command`]
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    prefix: char,
    value: DatabaseValue,
    db_type: DbType,
}

impl Parameter {
    /// Create a parameter bound to SQL NULL
    pub fn new(prefix: char, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix,
            value: DatabaseValue::Null,
            db_type: DbType::Any,
        }
    }

    /// Name as written in the SQL text, without the sigil
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sigil (`:` or `@`) the placeholder was written with
    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Placeholder text as it appears in SQL, e.g. `:id`
    pub fn placeholder(&self) -> String {
        format!("{}{}", self.prefix, self.name)
    }

    pub fn value(&self) -> &DatabaseValue {
        &self.value
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    /// Assign a caller value, applying the binding coercions
    ///
    /// Booleans become the configured literal strings, date/times switch the
    /// storage type to [`DbType::DateTime`], everything else passes through.
    pub fn assign(&mut self, value: DatabaseValue, options: &BindOptions) {
        self.value = match value {
            DatabaseValue::Bool(b) => DatabaseValue::String(options.literal(b).to_string()),
            DatabaseValue::DateTime(dt) => {
                self.db_type = DbType::DateTime;
                DatabaseValue::DateTime(dt)
            }
            other => other,
        };
    }
}

/// A placeholder found in SQL text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub prefix: char,
    pub name: String,
}

fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    // The `no` branch consumes exact quoted tokens like ':x' so they never bind;
    // `yes` requires start of text or a separator that is not part of `::` / `@@`.
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"(?P<no>'[:@]\w+')|(?:^|[^\w:@])(?P<yes>[:@]\w+)")
            .expect("placeholder pattern is valid")
    })
}

/// Scan SQL text for placeholders
///
/// Returns distinct placeholders in order of first occurrence. Names compare
/// ASCII case-insensitively; the first spelling wins.
pub fn discover_placeholders(sql: &str) -> Vec<Placeholder> {
    let mut found: Vec<Placeholder> = Vec::new();
    for caps in placeholder_pattern().captures_iter(sql) {
        let Some(token) = caps.name("yes") else {
            continue;
        };
        let mut chars = token.as_str().chars();
        let Some(prefix) = chars.next() else {
            continue;
        };
        let name = chars.as_str();
        if found.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
            continue;
        }
        found.push(Placeholder {
            prefix,
            name: name.to_string(),
        });
    }
    found
}

/// SQL text plus its ordered parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    text: String,
    parameters: Vec<Parameter>,
}

impl Command {
    /// Create a command with no parameters declared yet
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    /// Build a command from SQL text and positional values
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ParameterCountMismatch`] if the number of
    /// distinct placeholders differs from `values.len()`.
    pub fn build(
        text: impl Into<String>,
        values: &[DatabaseValue],
        options: &BindOptions,
    ) -> Result<Self> {
        let mut command = Self::new(text);
        command.bind_parameters_from_text();
        command.assign_values(values, options)?;
        Ok(command)
    }

    /// Declare a NULL parameter for every placeholder not yet declared
    ///
    /// Returns the number of parameters added.
    pub fn bind_parameters_from_text(&mut self) -> usize {
        let before = self.parameters.len();
        for placeholder in discover_placeholders(&self.text) {
            if self.parameter(&placeholder.name).is_none() {
                self.parameters
                    .push(Parameter::new(placeholder.prefix, placeholder.name));
            }
        }
        self.parameters.len() - before
    }

    /// Assign positional values to the declared parameters in order
    ///
    /// Nothing is assigned unless the counts match.
    pub fn assign_values(&mut self, values: &[DatabaseValue], options: &BindOptions) -> Result<()> {
        if self.parameters.len() != values.len() {
            return Err(DatabaseError::parameter_count_mismatch(
                self.parameters.len(),
                values.len(),
            ));
        }
        for (parameter, value) in self.parameters.iter_mut().zip(values) {
            parameter.assign(value.clone(), options);
        }
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    /// Look up a parameter by name, ignoring ASCII case
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Mutable lookup by name, ignoring ASCII case
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Reject commands that cannot be sent to a driver
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(DatabaseError::invalid_command("command text is empty"));
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn names(sql: &str) -> Vec<String> {
        discover_placeholders(sql).into_iter().map(|p| p.name).collect()
    }

    #[test]
    fn test_repeated_placeholder_binds_once() {
        let command = Command::build(
            "SELECT * FROM T WHERE A=:x AND B=:y AND C=:x",
            &[DatabaseValue::Int(1), DatabaseValue::from("two")],
            &BindOptions::default(),
        )
        .unwrap();

        let params = command.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name(), "x");
        assert_eq!(params[0].value(), &DatabaseValue::Int(1));
        assert_eq!(params[1].name(), "y");
        assert_eq!(params[1].value(), &DatabaseValue::from("two"));
    }

    #[test]
    fn test_quoted_placeholder_is_not_a_parameter() {
        assert_eq!(names("SELECT ':x' AS literal FROM T WHERE id = :id"), vec!["id"]);
        assert_eq!(names("UPDATE T SET tag = '@tag'"), Vec::<String>::new());
        // Only the exact quoted form is excluded
        assert_eq!(names("SELECT ':x y' FROM T"), vec!["x"]);
    }

    #[test]
    fn test_both_sigils_and_boundaries() {
        let found = discover_placeholders(":first, @second,(:third)");
        let rendered: Vec<String> = found.iter().map(|p| format!("{}{}", p.prefix, p.name)).collect();
        assert_eq!(rendered, vec![":first", "@second", ":third"]);

        assert!(names("SELECT a::int FROM T").is_empty());
        assert!(names("SELECT @@ROWCOUNT").is_empty());
        assert!(names("WHERE email = 'user@example.com'").is_empty());
    }

    #[test]
    fn test_duplicate_detection_ignores_case() {
        assert_eq!(names("WHERE a = :Id OR b = :ID OR c = :id"), vec!["Id"]);
    }

    #[test]
    fn test_count_mismatch_fails_before_binding() {
        let err = Command::build(
            "SELECT * FROM T WHERE A = :a AND B = :b",
            &[DatabaseValue::Int(1)],
            &BindOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::ParameterCountMismatch {
                expected: 2,
                actual: 1
            }
        ));

        let mut command = Command::new("SELECT :a");
        command.bind_parameters_from_text();
        assert!(command
            .assign_values(&[DatabaseValue::Int(1), DatabaseValue::Int(2)], &BindOptions::default())
            .is_err());
        assert!(command.parameters()[0].value().is_null());
    }

    #[test]
    fn test_value_coercions() {
        let stamp = NaiveDate::from_ymd_opt(2023, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 0))
            .unwrap();
        let command = Command::build(
            "INSERT INTO T VALUES (:flag, :off, :at, :n, :missing)",
            &[
                DatabaseValue::Bool(true),
                DatabaseValue::Bool(false),
                DatabaseValue::DateTime(stamp),
                DatabaseValue::Long(9),
                DatabaseValue::Null,
            ],
            &BindOptions::default(),
        )
        .unwrap();

        let params = command.parameters();
        assert_eq!(params[0].value(), &DatabaseValue::from("True"));
        assert_eq!(params[1].value(), &DatabaseValue::from("False"));
        assert_eq!(params[2].value(), &DatabaseValue::DateTime(stamp));
        assert_eq!(params[2].db_type(), DbType::DateTime);
        assert_eq!(params[3].db_type(), DbType::Any);
        assert!(params[4].value().is_null());
    }

    #[test]
    fn test_bind_from_text_is_idempotent() {
        let mut command = Command::new("SELECT :a, :b");
        assert_eq!(command.bind_parameters_from_text(), 2);
        assert_eq!(command.bind_parameters_from_text(), 0);
        assert_eq!(command.parameter("A").map(|p| p.placeholder()), Some(":a".to_string()));
    }

    #[test]
    fn test_blank_text_is_invalid() {
        assert!(matches!(
            Command::new("   ").validate(),
            Err(DatabaseError::InvalidCommand(_))
        ));
        assert!(Command::new("SELECT 1").validate().is_ok());
    }
}
