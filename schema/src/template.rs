use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};
use serde_json::{Map, Value};

/// Produce a shape-accurate example JSON value for a message descriptor,
/// keyed by declared field names.
pub fn template(descriptor: &MessageDescriptor) -> Value {
    let mut visited = Vec::new();
    message_template(descriptor, &mut visited)
}

fn message_template(descriptor: &MessageDescriptor, visited: &mut Vec<String>) -> Value {
    // Cyclic message types terminate by emitting null on revisit.
    if visited.iter().any(|name| name == descriptor.full_name()) {
        return Value::Null;
    }
    visited.push(descriptor.full_name().to_string());

    let mut template = Map::new();
    for field in descriptor.fields() {
        template.insert(field.name().to_string(), example_value(&field, visited));
    }

    visited.pop();
    Value::Object(template)
}

fn example_value(field: &FieldDescriptor, visited: &mut Vec<String>) -> Value {
    if field.is_map() {
        let value_field = match field.kind() {
            Kind::Message(entry) => entry.map_entry_value_field(),
            _ => return Value::Null,
        };
        let mut map = Map::new();
        map.insert("key".to_string(), example_value(&value_field, visited));
        return Value::Object(map);
    }
    if field.is_list() {
        return Value::Array(vec![single_example(field, visited)]);
    }
    single_example(field, visited)
}

fn single_example(field: &FieldDescriptor, visited: &mut Vec<String>) -> Value {
    match field.kind() {
        Kind::String => Value::String("example_string".to_string()),
        Kind::Int32
        | Kind::Int64
        | Kind::Uint32
        | Kind::Uint64
        | Kind::Sint32
        | Kind::Sint64
        | Kind::Fixed32
        | Kind::Fixed64
        | Kind::Sfixed32
        | Kind::Sfixed64 => Value::from(0),
        Kind::Float | Kind::Double => Value::from(0),
        Kind::Bool => Value::Bool(false),
        Kind::Bytes => Value::String(String::new()),
        Kind::Enum(en) => {
            let name = en
                .get_value(0)
                .or_else(|| en.values().next())
                .map(|v| v.name().to_string())
                .unwrap_or_else(|| "UNKNOWN".to_string());
            Value::String(name)
        }
        Kind::Message(message) => message_template(&message, visited),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;
    use prost_types::{
        field_descriptor_proto, DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto,
        FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    };
    use serde_json::json;

    fn field(
        name: &str,
        number: i32,
        ty: field_descriptor_proto::Type,
        type_name: Option<&str>,
        repeated: bool,
    ) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            r#type: Some(ty as i32),
            type_name: type_name.map(str::to_string),
            label: Some(if repeated {
                field_descriptor_proto::Label::Repeated as i32
            } else {
                field_descriptor_proto::Label::Optional as i32
            }),
            ..Default::default()
        }
    }

    fn registry() -> Registry {
        use field_descriptor_proto::Type;
        let set = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("tmpl.proto".to_string()),
                package: Some("tmpl".to_string()),
                syntax: Some("proto3".to_string()),
                message_type: vec![
                    DescriptorProto {
                        name: Some("Sample".to_string()),
                        field: vec![
                            field("title", 1, Type::String, None, false),
                            field("count", 2, Type::Int64, None, false),
                            field("enabled", 3, Type::Bool, None, false),
                            field("tags", 4, Type::String, None, true),
                            field("kind", 5, Type::Enum, Some(".tmpl.Kind"), false),
                            field("child", 6, Type::Message, Some(".tmpl.Child"), false),
                        ],
                        ..Default::default()
                    },
                    DescriptorProto {
                        name: Some("Child".to_string()),
                        field: vec![field("note", 1, Type::String, None, false)],
                        ..Default::default()
                    },
                    DescriptorProto {
                        name: Some("Loop".to_string()),
                        field: vec![field("next", 1, Type::Message, Some(".tmpl.Loop"), false)],
                        ..Default::default()
                    },
                ],
                enum_type: vec![EnumDescriptorProto {
                    name: Some("Kind".to_string()),
                    value: vec![
                        EnumValueDescriptorProto {
                            name: Some("KIND_UNSPECIFIED".to_string()),
                            number: Some(0),
                            ..Default::default()
                        },
                        EnumValueDescriptorProto {
                            name: Some("KIND_OTHER".to_string()),
                            number: Some(1),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        Registry::from_file_descriptor_set(set).unwrap()
    }

    #[test]
    fn template_covers_scalars_lists_enums_and_messages() {
        let registry = registry();
        let desc = registry.find_message("tmpl.Sample").unwrap();
        assert_eq!(
            template(&desc),
            json!({
                "title": "example_string",
                "count": 0,
                "enabled": false,
                "tags": ["example_string"],
                "kind": "KIND_UNSPECIFIED",
                "child": {"note": "example_string"}
            })
        );
    }

    #[test]
    fn self_referential_messages_terminate_with_null() {
        let registry = registry();
        let desc = registry.find_message("tmpl.Loop").unwrap();
        assert_eq!(template(&desc), json!({"next": null}));
    }
}
