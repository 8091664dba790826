use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::DataValue;

/// An opaque value living inside the data graph: registries, storage nodes,
/// operation templates, commands, users and path references.
pub trait DataObject: Any {
    fn type_name(&self) -> &str;

    fn is_a(&self, type_name: &str) -> bool {
        self.type_name() == type_name
    }

    fn type_description(&self) -> String {
        self.type_name().to_string()
    }

    fn describe(&self) -> String;

    fn as_holder(&self) -> Option<&dyn DataHolder> {
        None
    }

    /// Live references answer `Some(current value)`; `Some(None)` means the
    /// referenced data is gone. Plain objects answer `None`.
    fn dereference(&self) -> Option<Option<DataValue>> {
        None
    }

    /// Registered objects hand out a live reference to themselves.
    fn reference(&self) -> Option<DataValue> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

pub type ObjectRef = Rc<dyn DataObject>;

impl fmt::Debug for dyn DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.describe())
    }
}

pub fn downcast_object<T: DataObject>(object: &ObjectRef) -> Option<Rc<T>> {
    if !object.as_any().is::<T>() {
        return None;
    }
    object.clone().into_any().downcast::<T>().ok()
}

pub fn same_object(left: &ObjectRef, right: &ObjectRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(left), Rc::as_ptr(right))
}

/// Key to value lookup by abstract key plus coercion of text into that key.
pub trait DataHolder {
    fn get_value(&self, key: &DataValue) -> Option<DataValue>;

    fn convert_key(&self, text: &str) -> Option<DataValue>;

    fn contents(&self) -> IndexMap<String, DataValue>;

    fn value_description(&self) -> String {
        "Value".to_string()
    }
}
