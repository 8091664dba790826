use std::rc::Rc;

use ac_core::{AdminError, AdminResult, DataValue, ValueType};

use super::unwrap_single;
use crate::compare::{ComparisonOperator, COMPARISON_OPERATOR_TYPE};
use crate::operation::{Operation, OperationContext, OperationResponse};
use crate::storage::Storage;

struct Operands {
    left: DataValue,
    operator: ComparisonOperator,
    right: DataValue,
}

impl Operands {
    fn read(storage: &Storage) -> AdminResult<Self> {
        let sides = ValueType::list(ValueType::Any);
        let left = storage.get_and_assert_collection("left", &sides, 1)?;
        let right = storage.get_and_assert_collection("right", &sides, 1)?;
        let operator = storage.get_and_assert("operator", &ValueType::named(COMPARISON_OPERATOR_TYPE))?;
        let operator = operator
            .as_symbol()
            .and_then(ComparisonOperator::from_symbol)
            .ok_or_else(|| {
                AdminError::invalid_input(
                    "INPUT_UNCONVERTIBLE",
                    format!("{} is not a comparison operator.", operator.describe()),
                )
            })?;
        Ok(Self {
            left: unwrap_single(left),
            operator,
            right: unwrap_single(right),
        })
    }
}

struct ComparisonOperation {
    operands: Operands,
}

impl Operation for ComparisonOperation {
    fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        let Operands {
            left,
            operator,
            right,
        } = &self.operands;
        Ok(OperationResponse::of(operator.compare(left, right)))
    }
}

pub(super) fn comparison(
    _context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    Ok(Box::new(ComparisonOperation {
        operands: Operands::read(storage)?,
    }))
}

struct ElementOfOperation {
    operands: Operands,
    inverted: bool,
}

impl Operation for ElementOfOperation {
    fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        let Operands {
            left,
            operator,
            right,
        } = &self.operands;
        Ok(OperationResponse::of(
            operator.element_of(left, right) != self.inverted,
        ))
    }
}

pub(super) fn element_of(
    _context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    Ok(Box::new(ElementOfOperation {
        operands: Operands::read(storage)?,
        inverted: storage.get_bool("inverted").unwrap_or(false),
    }))
}
