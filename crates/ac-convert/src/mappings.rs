use ac_core::{ValueType, REGISTRY_TYPE};

/// Names understood by the type converter out of the box.
pub fn default_type_mappings() -> Vec<(&'static str, ValueType)> {
    let any = || ValueType::Any;
    vec![
        ("short", ValueType::Short),
        ("int", ValueType::Int),
        ("integer", ValueType::Int),
        ("long", ValueType::Long),
        ("float", ValueType::Float),
        ("double", ValueType::Double),
        ("decimal", ValueType::Decimal),
        ("bigdecimal", ValueType::Decimal),
        ("byte", ValueType::Byte),
        ("boolean", ValueType::Bool),
        ("string", ValueType::Text),
        ("class", ValueType::Type),
        ("type", ValueType::Type),
        ("uuid", ValueType::Uuid),
        ("date", ValueType::Date),
        ("registry", ValueType::named(REGISTRY_TYPE)),
        ("operation", ValueType::named("operation-template")),
        ("map", ValueType::map(any(), any())),
        ("hashmap", ValueType::map(any(), any())),
        ("linkedhashmap", ValueType::map(any(), any())),
        ("collection", ValueType::collection(any())),
        ("list", ValueType::list(any())),
        ("arraylist", ValueType::list(any())),
        ("linkedlist", ValueType::list(any())),
        ("set", ValueType::set(any())),
        ("hashset", ValueType::set(any())),
        ("linkedhashset", ValueType::set(any())),
    ]
}

/// Parses `name` or `name<arg, ...>` using `lookup` for every bare name.
/// Generic arguments replace the element (or key and value) types of a
/// container mapping.
pub fn parse_type_expression(
    text: &str,
    lookup: &dyn Fn(&str) -> Option<ValueType>,
) -> Option<ValueType> {
    let text = text.trim();
    let Some(open) = text.find('<') else {
        return lookup(&text.to_lowercase());
    };
    if !text.ends_with('>') {
        return None;
    }
    let base = lookup(&text[..open].trim().to_lowercase())?;
    let arguments = split_generic_arguments(&text[open + 1..text.len() - 1])?
        .into_iter()
        .map(|argument| parse_type_expression(argument, lookup))
        .collect::<Option<Vec<_>>>()?;

    match (base, arguments.as_slice()) {
        (ValueType::List(_), [element]) => Some(ValueType::list(element.clone())),
        (ValueType::Set(_), [element]) => Some(ValueType::set(element.clone())),
        (ValueType::Collection(_), [element]) => Some(ValueType::collection(element.clone())),
        (ValueType::Map(_, _), [key, value]) => Some(ValueType::map(key.clone(), value.clone())),
        _ => None,
    }
}

fn split_generic_arguments(text: &str) -> Option<Vec<&str>> {
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, ch) in text.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                arguments.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    arguments.push(text[start..].trim());
    if arguments.iter().any(|argument| argument.is_empty()) {
        return None;
    }
    Some(arguments)
}

#[cfg(test)]
mod mappings_tests {
    use super::*;

    fn lookup(name: &str) -> Option<ValueType> {
        default_type_mappings()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, ty)| ty)
    }

    #[test]
    fn bare_names_are_case_insensitive() {
        assert_eq!(parse_type_expression("Integer", &lookup), Some(ValueType::Int));
        assert_eq!(parse_type_expression("nope", &lookup), None);
    }

    #[test]
    fn generic_arguments_fill_container_types() {
        assert_eq!(
            parse_type_expression("list<int>", &lookup),
            Some(ValueType::list(ValueType::Int))
        );
        assert_eq!(
            parse_type_expression("map<string, list<long>>", &lookup),
            Some(ValueType::map(ValueType::Text, ValueType::list(ValueType::Long)))
        );
    }

    #[test]
    fn malformed_generics_are_rejected() {
        assert_eq!(parse_type_expression("list<int", &lookup), None);
        assert_eq!(parse_type_expression("int<string>", &lookup), None);
        assert_eq!(parse_type_expression("map<string>", &lookup), None);
        assert_eq!(parse_type_expression("list<>", &lookup), None);
    }
}
