//! Type promotion and array type mapping

use cypher_pgsql::pgsql::{value_to_data_type, DataType, Value};
use test_case::test_case;

#[test_case(DataType::Int2, DataType::Int4 => Some(DataType::Int4) ; "int2 widens to int4")]
#[test_case(DataType::Int4, DataType::Int2 => Some(DataType::Int4) ; "int4 absorbs int2")]
#[test_case(DataType::Int4, DataType::Int8 => Some(DataType::Int8) ; "int4 widens to int8")]
#[test_case(DataType::Int2, DataType::Int8 => Some(DataType::Int8) ; "int2 widens to int8")]
#[test_case(DataType::Float4, DataType::Float8 => Some(DataType::Float8) ; "float4 widens to float8")]
#[test_case(DataType::Int8, DataType::Float8 => None ; "no int float cross conversion")]
#[test_case(DataType::Float4, DataType::Int4 => None ; "no float int cross conversion")]
#[test_case(DataType::Text, DataType::Int8 => None ; "text and int are unrelated")]
#[test_case(DataType::Unknown, DataType::Boolean => Some(DataType::Boolean) ; "unknown defers left")]
#[test_case(DataType::Jsonb, DataType::Unknown => Some(DataType::Jsonb) ; "unknown defers right")]
fn test_convert(left: DataType, right: DataType) -> Option<DataType> {
    left.convert(right)
}

#[test_case(DataType::Int2)]
#[test_case(DataType::Int4)]
#[test_case(DataType::Int8)]
#[test_case(DataType::Float4)]
#[test_case(DataType::Float8)]
#[test_case(DataType::Text)]
#[test_case(DataType::Boolean)]
#[test_case(DataType::Jsonb)]
#[test_case(DataType::NodeComposite)]
fn test_convert_is_reflexive(data_type: DataType) {
    assert_eq!(data_type.convert(data_type), Some(data_type));
}

#[test_case(DataType::Int2)]
#[test_case(DataType::Int4)]
#[test_case(DataType::Int8)]
#[test_case(DataType::Float4)]
#[test_case(DataType::Float8)]
#[test_case(DataType::Text)]
#[test_case(DataType::NodeComposite)]
#[test_case(DataType::EdgeComposite)]
fn test_array_type_round_trip(base: DataType) {
    let array = base.to_array_type().unwrap();
    assert!(array.is_array());
    assert_eq!(array.array_base_type().unwrap(), base);
}

#[test]
fn test_scalar_types_without_arrays() {
    assert!(DataType::Boolean.to_array_type().is_err());
    assert!(DataType::Jsonb.to_array_type().is_err());
    assert!(DataType::Text.array_base_type().is_err());
}

#[test]
fn test_parameter_value_types() {
    assert_eq!(value_to_data_type(&Value::from(1i64)), Ok(DataType::Int8));
    assert_eq!(value_to_data_type(&Value::from("bob")), Ok(DataType::Text));
    assert_eq!(value_to_data_type(&Value::from(true)), Ok(DataType::Boolean));
    assert_eq!(
        value_to_data_type(&Value::from(vec![1i64, 2])),
        Ok(DataType::Int8Array)
    );
}
