use prost_types::{
    field_descriptor_proto, DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto,
    FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet, MessageOptions,
    OneofDescriptorProto,
};
use serde_json::Value;

/// Parse a Protobuf-JSON encoded `FileDescriptorSet`.
///
/// Both camelCase and snake_case keys are accepted and unknown keys are
/// discarded, matching the lenient JSON image readers used by buf tooling.
pub(crate) fn parse(data: &[u8]) -> Result<FileDescriptorSet, String> {
    let root: Value =
        serde_json::from_slice(data).map_err(|e| format!("invalid JSON: {e}"))?;
    let obj = root.as_object().ok_or("top-level value is not an object")?;

    let mut set = FileDescriptorSet::default();
    for file in list(obj, "file") {
        set.file.push(parse_file(file)?);
    }
    if set.file.is_empty() {
        return Err("descriptor set contains no files".to_string());
    }
    Ok(set)
}

fn parse_file(value: &Value) -> Result<FileDescriptorProto, String> {
    let obj = value.as_object().ok_or("file entry is not an object")?;
    let mut file = FileDescriptorProto {
        name: string(obj, "name"),
        package: string(obj, "package"),
        syntax: string(obj, "syntax"),
        ..Default::default()
    };
    for dep in list(obj, "dependency") {
        if let Some(name) = dep.as_str() {
            file.dependency.push(name.to_string());
        }
    }
    for message in keyed_list(obj, "message_type", "messageType") {
        file.message_type.push(parse_message(message)?);
    }
    for en in keyed_list(obj, "enum_type", "enumType") {
        file.enum_type.push(parse_enum(en)?);
    }
    Ok(file)
}

fn parse_message(value: &Value) -> Result<DescriptorProto, String> {
    let obj = value.as_object().ok_or("message entry is not an object")?;
    let mut message = DescriptorProto {
        name: string(obj, "name"),
        ..Default::default()
    };
    for field in list(obj, "field") {
        message.field.push(parse_field(field)?);
    }
    for nested in keyed_list(obj, "nested_type", "nestedType") {
        message.nested_type.push(parse_message(nested)?);
    }
    for en in keyed_list(obj, "enum_type", "enumType") {
        message.enum_type.push(parse_enum(en)?);
    }
    for oneof in keyed_list(obj, "oneof_decl", "oneofDecl") {
        let oneof = oneof.as_object().ok_or("oneof entry is not an object")?;
        message.oneof_decl.push(OneofDescriptorProto {
            name: string(oneof, "name"),
            ..Default::default()
        });
    }
    if let Some(options) = obj.get("options").and_then(Value::as_object) {
        let map_entry = keyed(options, "map_entry", "mapEntry").and_then(Value::as_bool);
        if map_entry.is_some() {
            message.options = Some(MessageOptions {
                map_entry,
                ..Default::default()
            });
        }
    }
    Ok(message)
}

fn parse_field(value: &Value) -> Result<FieldDescriptorProto, String> {
    let obj = value.as_object().ok_or("field entry is not an object")?;
    Ok(FieldDescriptorProto {
        name: string(obj, "name"),
        number: integer(obj, "number").map(|n| n as i32),
        label: keyed(obj, "label", "label").and_then(parse_label),
        r#type: keyed(obj, "type", "type").and_then(parse_type),
        type_name: keyed(obj, "type_name", "typeName")
            .and_then(Value::as_str)
            .map(str::to_string),
        json_name: keyed(obj, "json_name", "jsonName")
            .and_then(Value::as_str)
            .map(str::to_string),
        oneof_index: keyed(obj, "oneof_index", "oneofIndex")
            .and_then(Value::as_i64)
            .map(|n| n as i32),
        proto3_optional: keyed(obj, "proto3_optional", "proto3Optional").and_then(Value::as_bool),
        ..Default::default()
    })
}

fn parse_enum(value: &Value) -> Result<EnumDescriptorProto, String> {
    let obj = value.as_object().ok_or("enum entry is not an object")?;
    let mut en = EnumDescriptorProto {
        name: string(obj, "name"),
        ..Default::default()
    };
    for entry in list(obj, "value") {
        let entry = entry.as_object().ok_or("enum value is not an object")?;
        en.value.push(EnumValueDescriptorProto {
            name: string(entry, "name"),
            number: integer(entry, "number").map(|n| n as i32),
            ..Default::default()
        });
    }
    Ok(en)
}

fn parse_label(value: &Value) -> Option<i32> {
    use field_descriptor_proto::Label;
    if let Some(n) = value.as_i64() {
        return Some(n as i32);
    }
    let label = match value.as_str()? {
        "LABEL_OPTIONAL" => Label::Optional,
        "LABEL_REQUIRED" => Label::Required,
        "LABEL_REPEATED" => Label::Repeated,
        _ => return None,
    };
    Some(label as i32)
}

fn parse_type(value: &Value) -> Option<i32> {
    use field_descriptor_proto::Type;
    if let Some(n) = value.as_i64() {
        return Some(n as i32);
    }
    let ty = match value.as_str()? {
        "TYPE_DOUBLE" => Type::Double,
        "TYPE_FLOAT" => Type::Float,
        "TYPE_INT64" => Type::Int64,
        "TYPE_UINT64" => Type::Uint64,
        "TYPE_INT32" => Type::Int32,
        "TYPE_FIXED64" => Type::Fixed64,
        "TYPE_FIXED32" => Type::Fixed32,
        "TYPE_BOOL" => Type::Bool,
        "TYPE_STRING" => Type::String,
        "TYPE_GROUP" => Type::Group,
        "TYPE_MESSAGE" => Type::Message,
        "TYPE_BYTES" => Type::Bytes,
        "TYPE_UINT32" => Type::Uint32,
        "TYPE_ENUM" => Type::Enum,
        "TYPE_SFIXED32" => Type::Sfixed32,
        "TYPE_SFIXED64" => Type::Sfixed64,
        "TYPE_SINT32" => Type::Sint32,
        "TYPE_SINT64" => Type::Sint64,
        _ => return None,
    };
    Some(ty as i32)
}

fn keyed<'a>(
    obj: &'a serde_json::Map<String, Value>,
    snake: &str,
    camel: &str,
) -> Option<&'a Value> {
    obj.get(snake).or_else(|| obj.get(camel))
}

fn keyed_list<'a>(
    obj: &'a serde_json::Map<String, Value>,
    snake: &str,
    camel: &str,
) -> impl Iterator<Item = &'a Value> {
    keyed(obj, snake, camel)
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .unwrap_or_default()
}

fn list<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Value> {
    keyed_list(obj, key, key)
}

fn string(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn integer(obj: &serde_json::Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_i64)
}
