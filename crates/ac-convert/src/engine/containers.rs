impl ConversionEngine {
    /// Produces a sequence or set of `requested` (a `List`, `Set` or
    /// `Collection` type). Existing containers whose cached element type fits
    /// are returned as-is; others are rebuilt, dropping elements that fail to
    /// convert. Text is split on spaces and commas; any other scalar becomes
    /// a single element.
    pub fn convert_to_collection(
        &self,
        input: Option<&DataValue>,
        requested: &ValueType,
        empty_if_null: bool,
    ) -> Option<DataValue> {
        let element_type = requested.element_type()?.clone();
        let input = input.and_then(DataValue::dereferenced);

        if let Some(input) = input {
            if input.is_collection() {
                if self.collection_is_cached(&input, requested, &element_type) {
                    return Some(input);
                }
                let elements = input.elements().unwrap_or_default();
                return Some(self.build_collection(elements, requested, &element_type));
            }

            if let Some(text) = input.as_text() {
                let tokens: Vec<DataValue> = split_on_spaces_and_commas(text)
                    .into_iter()
                    .map(DataValue::Text)
                    .collect();
                let built = self.build_collection(tokens, requested, &element_type);
                if !built.is_empty() {
                    return Some(built);
                }
            } else if input.as_map().is_none() {
                let built = self.build_collection(vec![input], requested, &element_type);
                if !built.is_empty() {
                    return Some(built);
                }
            }
        }

        if empty_if_null {
            Some(self.build_collection(Vec::new(), requested, &element_type))
        } else {
            None
        }
    }

    fn collection_is_cached(
        &self,
        input: &DataValue,
        requested: &ValueType,
        element_type: &ValueType,
    ) -> bool {
        let same_kind = matches!(
            (input, requested),
            (DataValue::List(_), ValueType::List(_))
                | (DataValue::Set(_), ValueType::Set(_))
                | (_, ValueType::Collection(_))
        );
        match self.cache.get(input) {
            Some(CacheTag::Elements(cached)) => same_kind && self.is_assignable(&cached, element_type),
            _ => false,
        }
    }

    fn build_collection(
        &self,
        elements: Vec<DataValue>,
        requested: &ValueType,
        element_type: &ValueType,
    ) -> DataValue {
        let referencable = self.is_referencable(element_type);
        let converted = elements.iter().filter_map(|element| {
            match self.convert(element, element_type) {
                Ok(value) => Some(value),
                Err(error) => {
                    debug!(
                        element = %element.to_text(),
                        code = %error.code,
                        "dropped element during collection conversion"
                    );
                    None
                }
            }
        });

        let built = match requested {
            ValueType::Set(_) => {
                let set: IndexSet<DataKey> = converted
                    .filter_map(|value| DataKey::from_value(&value))
                    .collect();
                DataValue::set(set)
            }
            _ => DataValue::list(
                converted
                    .map(|value| {
                        if !referencable {
                            return value;
                        }
                        value
                            .as_object()
                            .and_then(|object| object.reference())
                            .unwrap_or(value)
                    })
                    .collect(),
            ),
        };
        self.cache.set(&built, CacheTag::Elements(element_type.clone()));
        built
    }

    /// Produces a mapping of `requested` (a `Map` type). Existing maps with
    /// fitting cached key and value types are returned as-is; other maps and
    /// holder objects are rebuilt entry by entry. Text reads as `key=value`
    /// tokens, optionally wrapped in braces.
    pub fn convert_to_map(
        &self,
        input: Option<&DataValue>,
        requested: &ValueType,
        empty_if_null: bool,
    ) -> Option<DataValue> {
        let (key_type, value_type) = requested.key_value_types()?;
        let (key_type, value_type) = (key_type.clone(), value_type.clone());
        let input = input.and_then(DataValue::dereferenced);

        if let Some(input) = input {
            if let Some(map) = input.as_map() {
                if let Some(CacheTag::Entries(cached_key, cached_value)) = self.cache.get(&input) {
                    if self.is_assignable(&cached_key, &key_type)
                        && self.is_assignable(&cached_value, &value_type)
                    {
                        return Some(input);
                    }
                }
                let entries: Vec<(DataValue, DataValue)> = map
                    .borrow()
                    .iter()
                    .map(|(key, value)| (key.to_value(), value.clone()))
                    .collect();
                return Some(self.build_map(entries, &key_type, &value_type));
            }

            if let Some(holder) = input.as_holder() {
                let entries = holder
                    .contents()
                    .into_iter()
                    .map(|(key, value)| (DataValue::Text(key), value))
                    .collect();
                return Some(self.build_map(entries, &key_type, &value_type));
            }

            if let Some(text) = input.as_text() {
                let trimmed = text.trim();
                let body = trimmed
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                    .unwrap_or(trimmed);
                let entries: Vec<(DataValue, DataValue)> = split_on_spaces_and_commas(body)
                    .into_iter()
                    .filter_map(|token| {
                        let parts: Vec<&str> = token.split('=').collect();
                        match parts.as_slice() {
                            [key, value] => Some((DataValue::from(*key), DataValue::from(*value))),
                            _ => None,
                        }
                    })
                    .collect();
                let built = self.build_map(entries, &key_type, &value_type);
                if !built.is_empty() {
                    return Some(built);
                }
            }
        }

        if empty_if_null {
            Some(self.build_map(Vec::new(), &key_type, &value_type))
        } else {
            None
        }
    }

    fn build_map(
        &self,
        entries: Vec<(DataValue, DataValue)>,
        key_type: &ValueType,
        value_type: &ValueType,
    ) -> DataValue {
        let mut map = IndexMap::new();
        for (key, value) in entries {
            let converted = self
                .convert(&key, key_type)
                .and_then(|key| {
                    DataKey::from_value(&key).ok_or_else(|| {
                        AdminError::conversion(
                            "CONVERT_UNHASHABLE_KEY",
                            format!("{} cannot be used as a key.", key.to_text()),
                        )
                    })
                })
                .and_then(|key| Ok((key, self.convert(&value, value_type)?)));
            match converted {
                Ok((key, value)) => {
                    map.insert(key, value);
                }
                Err(error) => debug!(
                    key = %key.to_text(),
                    code = %error.code,
                    "dropped entry during map conversion"
                ),
            }
        }
        let built = DataValue::map(map);
        self.cache.set(
            &built,
            CacheTag::Entries(key_type.clone(), value_type.clone()),
        );
        built
    }
}
