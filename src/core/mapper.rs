//! Record-to-object mapping
//!
//! Each mappable type declares its fields once in a [`FieldMap`], usually
//! through the [`data_object!`](crate::data_object) macro. Columns match
//! fields by name, ignoring ASCII case:
//!
//! - fields without a column keep their value, columns without a field are ignored;
//! - a NULL column never overwrites a field;
//! - `Option<T>` fields convert as `T` and are stored as `Some`;
//! - booleans accept flag spellings such as `Y`/`N` or `1`/`0`;
//! - enumerations declared with [`enum_field!`](crate::enum_field) parse by member name.
//!
//! The reverse direction, [`copy_fields_into_parameters`], fills already
//! declared command parameters from an object.

use super::command::Command;
use super::config::BindOptions;
use super::error::{DatabaseError, Result};
use super::record::Record;
use super::value::DatabaseValue;
use chrono::{NaiveDate, NaiveDateTime};
use std::result::Result as StdResult;

/// A type that can live in a mapped field
pub trait FieldValue: Sized {
    /// Name used in mapping errors
    fn type_name() -> &'static str;

    /// Convert a non-NULL column value
    fn from_value(value: &DatabaseValue) -> StdResult<Self, String>;

    /// Value to bind when copying into a parameter
    fn to_value(&self) -> DatabaseValue;
}

fn unconvertible(value: &DatabaseValue, target: &str) -> String {
    format!(
        "cannot convert {} value '{}' to {}",
        value.type_name(),
        value.as_string(),
        target
    )
}

macro_rules! numeric_field {
    ($ty:ty, $name:literal, $accessor:ident, $variant:ident) => {
        impl FieldValue for $ty {
            fn type_name() -> &'static str {
                $name
            }

            fn from_value(value: &DatabaseValue) -> StdResult<Self, String> {
                value.$accessor().ok_or_else(|| unconvertible(value, $name))
            }

            fn to_value(&self) -> DatabaseValue {
                DatabaseValue::$variant(*self)
            }
        }
    };
}

numeric_field!(i32, "i32", as_int, Int);
numeric_field!(i64, "i64", as_long, Long);
numeric_field!(f32, "f32", as_float, Float);
numeric_field!(f64, "f64", as_double, Double);

impl FieldValue for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn from_value(value: &DatabaseValue) -> StdResult<Self, String> {
        value.as_bool().ok_or_else(|| unconvertible(value, "bool"))
    }

    fn to_value(&self) -> DatabaseValue {
        DatabaseValue::Bool(*self)
    }
}

impl FieldValue for String {
    fn type_name() -> &'static str {
        "String"
    }

    fn from_value(value: &DatabaseValue) -> StdResult<Self, String> {
        match value {
            DatabaseValue::Bytes(bytes) => {
                String::from_utf8(bytes.clone()).map_err(|e| e.to_string())
            }
            other => Ok(other.as_string()),
        }
    }

    fn to_value(&self) -> DatabaseValue {
        DatabaseValue::String(self.clone())
    }
}

impl FieldValue for Vec<u8> {
    fn type_name() -> &'static str {
        "Vec<u8>"
    }

    fn from_value(value: &DatabaseValue) -> StdResult<Self, String> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| unconvertible(value, "Vec<u8>"))
    }

    fn to_value(&self) -> DatabaseValue {
        DatabaseValue::Bytes(self.clone())
    }
}

impl FieldValue for NaiveDateTime {
    fn type_name() -> &'static str {
        "NaiveDateTime"
    }

    fn from_value(value: &DatabaseValue) -> StdResult<Self, String> {
        value
            .as_datetime()
            .ok_or_else(|| unconvertible(value, "NaiveDateTime"))
    }

    fn to_value(&self) -> DatabaseValue {
        DatabaseValue::DateTime(*self)
    }
}

impl FieldValue for NaiveDate {
    fn type_name() -> &'static str {
        "NaiveDate"
    }

    fn from_value(value: &DatabaseValue) -> StdResult<Self, String> {
        value
            .as_datetime()
            .map(|dt| dt.date())
            .ok_or_else(|| unconvertible(value, "NaiveDate"))
    }

    fn to_value(&self) -> DatabaseValue {
        self.and_hms_opt(0, 0, 0)
            .map_or(DatabaseValue::Null, DatabaseValue::DateTime)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn type_name() -> &'static str {
        T::type_name()
    }

    fn from_value(value: &DatabaseValue) -> StdResult<Self, String> {
        T::from_value(value).map(Some)
    }

    fn to_value(&self) -> DatabaseValue {
        self.as_ref().map_or(DatabaseValue::Null, T::to_value)
    }
}

type Setter<T> = Box<dyn Fn(&mut T, &DatabaseValue) -> StdResult<(), String> + Send + Sync>;
type Getter<T> = Box<dyn Fn(&T) -> DatabaseValue + Send + Sync>;

/// One mapped field
pub struct FieldBinding<T> {
    name: &'static str,
    type_name: &'static str,
    set: Setter<T>,
    get: Getter<T>,
}

impl<T> FieldBinding<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Static column-to-field table for a type
pub struct FieldMap<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T: 'static> FieldMap<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a field matched by `name`
    pub fn field<V: FieldValue + 'static>(
        mut self,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.fields.push(FieldBinding {
            name,
            type_name: V::type_name(),
            set: Box::new(move |object, value| {
                *get_mut(object) = V::from_value(value)?;
                Ok(())
            }),
            get: Box::new(move |object| get(object).to_value()),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldBinding<T>] {
        &self.fields
    }

    /// Field matching `name`, ignoring ASCII case
    pub fn find(&self, name: &str) -> Option<&FieldBinding<T>> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

impl<T: 'static> Default for FieldMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A type populated from records
pub trait DataObject: Sized + 'static {
    fn field_map() -> &'static FieldMap<Self>;
}

/// Copy matching, non-NULL columns of `record` into `object`
///
/// # Errors
///
/// [`DatabaseError::Mapping`] if a value cannot be converted to its field's
/// type. Fields mapped before the failing one keep their new values.
pub fn map_record_into_object<T: DataObject>(record: &Record, object: &mut T) -> Result<()> {
    for binding in T::field_map().fields() {
        let Some(index) = record.index_of_ignore_case(binding.name) else {
            continue;
        };
        let Some(value) = record.get_index(index) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        (binding.set)(object, value).map_err(|message| {
            let column = record.column_name(index).unwrap_or(binding.name);
            DatabaseError::mapping(column, binding.type_name, message)
        })?;
    }
    Ok(())
}

/// Fill declared parameters of `command` from fields of `object`
///
/// Parameters without a matching field, or whose field is `None`, keep their
/// current value. Values go through the same coercions as positional binding.
pub fn copy_fields_into_parameters<T: DataObject>(
    command: &mut Command,
    object: &T,
    options: &BindOptions,
) {
    let map = T::field_map();
    for parameter in command.parameters_mut() {
        let Some(binding) = map.find(parameter.name()) else {
            continue;
        };
        let value = (binding.get)(object);
        if !value.is_null() {
            parameter.assign(value, options);
        }
    }
}

/// Implement [`DataObject`] for a struct, matching each listed field by its own name
///
/// ```
/// use rust_data_access::data_object;
///
/// #[derive(Default)]
/// struct Block {
///     id: String,
///     idx: i32,
///     name: Option<String>,
/// }
///
/// data_object!(Block { id, idx, name });
/// ```
#[macro_export]
macro_rules! data_object {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::core::mapper::DataObject for $ty {
            fn field_map() -> &'static $crate::core::mapper::FieldMap<Self> {
                static MAP: ::std::sync::OnceLock<$crate::core::mapper::FieldMap<$ty>> =
                    ::std::sync::OnceLock::new();
                MAP.get_or_init(|| {
                    $crate::core::mapper::FieldMap::new()
                        $(.field(
                            stringify!($field),
                            |object: &$ty| &object.$field,
                            |object: &mut $ty| &mut object.$field,
                        ))*
                })
            }
        }
    };
}

/// Implement [`FieldValue`] for a fieldless enum, parsed by member name
///
/// ```
/// use rust_data_access::enum_field;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Shift {
///     Day,
///     Night,
/// }
///
/// enum_field!(Shift { Day, Night });
/// ```
#[macro_export]
macro_rules! enum_field {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::core::mapper::FieldValue for $ty {
            fn type_name() -> &'static str {
                stringify!($ty)
            }

            fn from_value(
                value: &$crate::core::value::DatabaseValue,
            ) -> ::std::result::Result<Self, ::std::string::String> {
                let text = value.as_string();
                let text = text.trim();
                $(
                    if text == stringify!($variant) {
                        return ::std::result::Result::Ok($ty::$variant);
                    }
                )+
                ::std::result::Result::Err(::std::format!(
                    "'{}' is not a member of {}",
                    text,
                    stringify!($ty)
                ))
            }

            fn to_value(&self) -> $crate::core::value::DatabaseValue {
                match self {
                    $($ty::$variant => $crate::core::value::DatabaseValue::from(stringify!($variant)),)+
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    enum Status {
        #[default]
        Pending,
        Active,
        Retired,
    }

    crate::enum_field!(Status { Pending, Active, Retired });

    #[derive(Debug, Default, PartialEq)]
    struct Employee {
        id: i64,
        name: String,
        active: bool,
        status: Status,
        manager_id: Option<i32>,
        hired: Option<NaiveDateTime>,
        nickname: String,
    }

    crate::data_object!(Employee {
        id,
        name,
        active,
        status,
        manager_id,
        hired,
        nickname,
    });

    fn record(columns: &[&str], values: Vec<DatabaseValue>) -> Record {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect::<Vec<_>>().into();
        Record::new(columns, values)
    }

    #[test]
    fn test_case_insensitive_match() {
        for column in ["name", "NAME", "Name"] {
            let mut employee = Employee::default();
            map_record_into_object(&record(&[column], vec!["Grace".into()]), &mut employee).unwrap();
            assert_eq!(employee.name, "Grace");
        }
    }

    #[test]
    fn test_null_never_overwrites() {
        let mut employee = Employee {
            name: "Grace".to_string(),
            manager_id: Some(3),
            ..Default::default()
        };
        let row = record(
            &["NAME", "MANAGER_ID", "ID"],
            vec![DatabaseValue::Null, DatabaseValue::Null, DatabaseValue::Long(8)],
        );
        map_record_into_object(&row, &mut employee).unwrap();
        assert_eq!(employee.name, "Grace");
        assert_eq!(employee.manager_id, Some(3));
        assert_eq!(employee.id, 8);
    }

    #[test]
    fn test_unmatched_fields_and_columns() {
        let mut employee = Employee {
            nickname: "amazing".to_string(),
            ..Default::default()
        };
        let row = record(&["ID", "SALARY"], vec![DatabaseValue::Long(1), DatabaseValue::Double(10.5)]);
        map_record_into_object(&row, &mut employee).unwrap();
        assert_eq!(employee.id, 1);
        assert_eq!(employee.nickname, "amazing");
    }

    #[test]
    fn test_coercions() {
        let mut employee = Employee::default();
        let row = record(
            &["ACTIVE", "STATUS", "MANAGER_ID", "HIRED", "ID"],
            vec![
                "Y".into(),
                "Active".into(),
                DatabaseValue::Long(12),
                "2021-06-01 09:00:00".into(),
                "42".into(),
            ],
        );
        map_record_into_object(&row, &mut employee).unwrap();
        assert!(employee.active);
        assert_eq!(employee.status, Status::Active);
        assert_eq!(employee.manager_id, Some(12));
        assert_eq!(
            employee.hired,
            NaiveDate::from_ymd_opt(2021, 6, 1).and_then(|d| d.and_hms_opt(9, 0, 0))
        );
        assert_eq!(employee.id, 42);
    }

    #[test]
    fn test_unknown_enum_member_fails() {
        let mut employee = Employee::default();
        let err = map_record_into_object(&record(&["STATUS"], vec!["Fired".into()]), &mut employee)
            .unwrap_err();
        match err {
            DatabaseError::Mapping { column, target, .. } => {
                assert_eq!(column, "STATUS");
                assert_eq!(target, "Status");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unconvertible_value_fails() {
        let mut employee = Employee::default();
        let err = map_record_into_object(&record(&["ID"], vec!["forty-two".into()]), &mut employee)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Mapping { .. }));

        let err = map_record_into_object(&record(&["MANAGER_ID"], vec![DatabaseValue::Long(1 << 40)]), &mut employee)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Mapping { .. }));
    }

    #[test]
    fn test_out_of_range_float_fails() {
        let mut employee = Employee::default();
        let err = map_record_into_object(&record(&["MANAGER_ID"], vec![DatabaseValue::Double(1e20)]), &mut employee)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Mapping { ref target, .. } if target == "i32"));
        assert_eq!(employee.manager_id, None);

        let err = map_record_into_object(&record(&["ID"], vec![DatabaseValue::Double(f64::NAN)]), &mut employee)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Mapping { ref target, .. } if target == "i64"));
        assert_eq!(employee.id, 0);

        map_record_into_object(&record(&["ID"], vec![DatabaseValue::Double(42.0)]), &mut employee).unwrap();
        assert_eq!(employee.id, 42);
    }

    #[test]
    fn test_copy_fields_into_parameters() {
        let employee = Employee {
            id: 5,
            active: true,
            status: Status::Retired,
            manager_id: None,
            ..Default::default()
        };
        let mut command =
            Command::new("UPDATE emp SET status = :Status, active = :ACTIVE, mgr = :manager_id, x = :unknown WHERE id = :id");
        command.bind_parameters_from_text();
        copy_fields_into_parameters(&mut command, &employee, &BindOptions::default());

        assert_eq!(command.parameter("status").unwrap().value(), &DatabaseValue::from("Retired"));
        assert_eq!(command.parameter("active").unwrap().value(), &DatabaseValue::from("True"));
        assert!(command.parameter("manager_id").unwrap().value().is_null());
        assert!(command.parameter("unknown").unwrap().value().is_null());
        assert_eq!(command.parameter("id").unwrap().value(), &DatabaseValue::Long(5));
    }

    #[test]
    fn test_field_map_lookup() {
        let map = Employee::field_map();
        assert_eq!(map.len(), 7);
        assert_eq!(map.find("MANAGER_ID").map(FieldBinding::type_name), Some("i32"));
        assert!(map.find("salary").is_none());
    }
}
