impl ConversionEngine {
    /// Engine without any converter or mapping installed.
    pub fn empty() -> Self {
        Self {
            converters: RefCell::new(HashMap::new()),
            super_converters: RefCell::new(HashMap::new()),
            overrides: RefCell::new(Vec::new()),
            type_parents: RefCell::new(HashMap::new()),
            enums: RefCell::new(HashMap::new()),
            referencable: RefCell::new(HashSet::new()),
            mappings: RefCell::new(HashMap::new()),
            cache: TypeCache::default(),
        }
    }

    /// Engine with the built-in scalar converters, the enum and collection
    /// family converters and the default type mappings.
    pub fn new() -> Self {
        let engine = Self::empty();
        engine.register_converter(Rc::new(DecimalConverter));
        engine.register_converter(Rc::new(BoolConverter));
        for ty in [ValueType::Byte, ValueType::Short, ValueType::Int, ValueType::Long] {
            engine.register_converter(Rc::new(IntegerConverter::new(ty)));
        }
        engine.register_converter(Rc::new(FloatConverter::new(ValueType::Float)));
        engine.register_converter(Rc::new(FloatConverter::new(ValueType::Double)));
        engine.register_converter(Rc::new(TextConverter));
        engine.register_converter(Rc::new(UuidConverter));
        engine.register_converter(Rc::new(TypeConverter));
        engine.register_converter(Rc::new(DateConverter));
        engine.register_super_type_converter(Rc::new(EnumConverter));
        engine.register_super_type_converter(Rc::new(CollectionConverter));
        for (name, ty) in default_type_mappings() {
            engine.add_type_mapping(name, ty);
        }
        engine
    }

    /// At most one converter per target type; later registrations are refused.
    pub fn register_converter(&self, converter: Rc<dyn Converter>) -> bool {
        let key = converter.target().type_id();
        let mut converters = self.converters.borrow_mut();
        if converters.contains_key(&key) {
            return false;
        }
        debug!(target_type = %key, "registered converter");
        converters.insert(key, converter);
        true
    }

    pub fn unregister_converter(&self, ty: &ValueType) -> bool {
        self.converters.borrow_mut().remove(&ty.type_id()).is_some()
    }

    pub fn register_super_type_converter(&self, converter: Rc<dyn SuperTypeConverter>) -> bool {
        let family = converter.family().to_string();
        let mut converters = self.super_converters.borrow_mut();
        if converters.contains_key(&family) {
            return false;
        }
        debug!(family = %family, "registered super type converter");
        converters.insert(family, converter);
        true
    }

    pub fn unregister_super_type_converter(&self, family: &str) -> bool {
        self.super_converters.borrow_mut().remove(family).is_some()
    }

    pub fn register_override(&self, converter: Rc<dyn ConversionOverride>) {
        self.overrides.borrow_mut().push(converter);
    }

    pub fn unregister_override(&self, converter: &Rc<dyn ConversionOverride>) -> bool {
        let mut overrides = self.overrides.borrow_mut();
        let before = overrides.len();
        overrides.retain(|existing| !Rc::ptr_eq(existing, converter));
        overrides.len() != before
    }

    pub fn has_converter(&self, ty: &ValueType) -> bool {
        self.converters.borrow().contains_key(&ty.type_id())
    }

    pub fn has_super_type_converter(&self, family: &str) -> bool {
        self.super_converters.borrow().contains_key(family)
    }

    /// Declares `parents` as supertypes of the named type `name`.
    pub fn declare_type(&self, name: &str, parents: &[&str]) {
        let mut hierarchy = self.type_parents.borrow_mut();
        let entry = hierarchy.entry(name.to_string()).or_default();
        for parent in parents {
            if !entry.iter().any(|existing| existing == parent) {
                entry.push(parent.to_string());
            }
        }
    }

    /// Declares an enum type. Variants are stored upper-cased.
    pub fn register_enum(&self, name: &str, variants: &[&str]) {
        self.declare_type(name, &[ENUM_FAMILY]);
        self.enums.borrow_mut().insert(
            name.to_string(),
            variants.iter().map(|variant| variant.to_uppercase()).collect(),
        );
    }

    pub fn enum_variants(&self, name: &str) -> Option<Vec<String>> {
        self.enums.borrow().get(name).cloned()
    }

    /// Values of this named type are stored as live references inside
    /// converted sequences.
    pub fn mark_referencable(&self, name: &str) {
        self.referencable.borrow_mut().insert(name.to_string());
    }

    pub fn is_referencable(&self, ty: &ValueType) -> bool {
        match ty {
            ValueType::Named(name) => {
                let referencable = self.referencable.borrow();
                self.lineage(name).iter().any(|name| referencable.contains(name))
            }
            _ => false,
        }
    }

    pub fn add_type_mapping(&self, name: &str, ty: ValueType) {
        self.mappings
            .borrow_mut()
            .entry(name.to_lowercase())
            .or_insert(ty);
    }

    pub fn type_mapping(&self, name: &str) -> Option<ValueType> {
        self.mappings.borrow().get(&name.to_lowercase()).cloned()
    }

    /// Resolves a type name, including generic forms such as `map<string,int>`.
    pub fn parse_type(&self, text: &str) -> Option<ValueType> {
        parse_type_expression(text, &|name| self.type_mapping(name))
    }

    /// The named type itself followed by every declared ancestor, breadth first.
    pub fn lineage(&self, name: &str) -> Vec<String> {
        let hierarchy = self.type_parents.borrow();
        let mut seen = vec![name.to_string()];
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(current) = queue.pop_front() {
            for parent in hierarchy.get(&current).into_iter().flatten() {
                if !seen.contains(parent) {
                    seen.push(parent.clone());
                    queue.push_back(parent.clone());
                }
            }
        }
        seen
    }

    pub fn is_subtype(&self, name: &str, ancestor: &str) -> bool {
        ancestor == ANY_TYPE || self.lineage(name).iter().any(|entry| entry == ancestor)
    }

    /// Whether values of type `cached` may be handed out for requests of
    /// type `requested` without conversion.
    pub fn is_assignable(&self, cached: &ValueType, requested: &ValueType) -> bool {
        match (cached, requested) {
            (_, ValueType::Any) => true,
            (ValueType::Named(cached), ValueType::Named(requested)) => {
                self.is_subtype(cached, requested)
            }
            (ValueType::List(cached), ValueType::List(requested))
            | (ValueType::Set(cached), ValueType::Set(requested))
            | (ValueType::List(cached), ValueType::Collection(requested))
            | (ValueType::Set(cached), ValueType::Collection(requested))
            | (ValueType::Collection(cached), ValueType::Collection(requested)) => {
                self.is_assignable(cached, requested)
            }
            (ValueType::Map(ck, cv), ValueType::Map(rk, rv)) => {
                self.is_assignable(ck, rk) && self.is_assignable(cv, rv)
            }
            (cached, requested) => cached == requested,
        }
    }

    /// Whether `value` can be returned unchanged for `requested`. Container
    /// element types are not inspected here.
    pub fn satisfies(&self, value: &DataValue, requested: &ValueType) -> bool {
        match (value, requested) {
            (_, ValueType::Any) => true,
            (DataValue::Bool(_), ValueType::Bool) => true,
            (DataValue::Integer(number), ty) if ty.is_integer() => ty
                .integer_bounds()
                .is_some_and(|(min, max)| (min..=max).contains(number)),
            (DataValue::Float(_), ValueType::Float | ValueType::Double) => true,
            (DataValue::Decimal(_), ValueType::Decimal) => true,
            (DataValue::Text(_), ValueType::Text) => true,
            (DataValue::Uuid(_), ValueType::Uuid) => true,
            (DataValue::Date(_), ValueType::Date) => true,
            (DataValue::Type(_), ValueType::Type) => true,
            (DataValue::List(_), ValueType::List(_) | ValueType::Collection(_)) => true,
            (DataValue::Set(_), ValueType::Set(_) | ValueType::Collection(_)) => true,
            (DataValue::Map(_), ValueType::Map(_, _)) => true,
            (DataValue::Symbol(symbol), ValueType::Named(name)) => {
                self.is_subtype(&symbol.type_name, name)
            }
            (DataValue::Object(object), ValueType::Named(name)) => {
                (name == HOLDER_TYPE && object.as_holder().is_some())
                    || object.is_a(name)
                    || self.is_subtype(object.type_name(), name)
            }
            _ => false,
        }
    }

    /// Converts `input` into `requested`: overrides first, then identity,
    /// then the exact converter, then the nearest family converter.
    pub fn convert(&self, input: &DataValue, requested: &ValueType) -> AdminResult<DataValue> {
        let overrides: Vec<Rc<dyn ConversionOverride>> = self.overrides.borrow().clone();
        for converter in overrides {
            if let Some(value) = converter.convert(self, input, requested) {
                return Ok(value);
            }
        }

        let follows_references = requested != &ValueType::named(REFERENCE_TYPE);
        let input = if follows_references {
            input.dereferenced().ok_or_else(|| {
                AdminError::conversion(
                    "CONVERT_DANGLING_REFERENCE",
                    "The referenced data is no longer available.",
                )
            })?
        } else {
            input.clone()
        };

        if self.satisfies(&input, requested) {
            return Ok(input);
        }

        let exact = self.converters.borrow().get(&requested.type_id()).cloned();
        if let Some(converter) = exact {
            return converter.convert(self, &input, requested);
        }

        if let Some(converter) = self.find_super_type_converter(requested) {
            return converter.convert(self, &input, requested);
        }

        Err(AdminError::conversion(
            "CONVERT_NO_CONVERTER",
            format!("Did not find any Converter for type: {}", requested),
        ))
    }

    /// Convenience for callers that only care about success.
    pub fn try_convert(&self, input: &DataValue, requested: &ValueType) -> Option<DataValue> {
        self.convert(input, requested).ok()
    }

    fn find_super_type_converter(&self, requested: &ValueType) -> Option<Rc<dyn SuperTypeConverter>> {
        let converters = self.super_converters.borrow();
        let mut candidates = match requested {
            ValueType::Named(name) => self.lineage(name),
            other => vec![other.type_id()],
        };
        candidates.extend(requested.builtin_families().iter().map(ToString::to_string));
        candidates
            .iter()
            .find_map(|family| converters.get(family).cloned())
    }

    pub fn cached_tag(&self, value: &DataValue) -> Option<CacheTag> {
        self.cache.get(value)
    }

    pub fn tag_container(&self, value: &DataValue, tag: CacheTag) {
        self.cache.set(value, tag);
    }

    pub fn forget_container(&self, value: &DataValue) {
        self.cache.forget(value);
    }
}
