//! Postfix program executor.
//!
//! Execution is iterative over a value stack, so evaluation cost is linear in
//! program length and independent of nesting.

use super::EvalError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Instr {
    Push(f64),
    Neg,
    Add,
    Sub,
    Mul,
    Div,
}

pub(crate) fn execute(program: &[Instr]) -> Result<f64, EvalError> {
    let mut stack: Vec<f64> = Vec::with_capacity(program.len());

    for instr in program {
        let value = match *instr {
            Instr::Push(value) => value,
            Instr::Neg => -pop(&mut stack)?,
            Instr::Add | Instr::Sub | Instr::Mul | Instr::Div => {
                let rhs = pop(&mut stack)?;
                let lhs = pop(&mut stack)?;
                match instr {
                    Instr::Add => lhs + rhs,
                    Instr::Sub => lhs - rhs,
                    Instr::Mul => lhs * rhs,
                    _ => {
                        if rhs == 0.0 {
                            return Err(EvalError::DivisionByZero);
                        }
                        lhs / rhs
                    }
                }
            }
        };
        if !value.is_finite() {
            return Err(EvalError::Overflow);
        }
        stack.push(value);
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(value), true) => Ok(value),
        _ => Err(EvalError::syntax(0, "malformed expression program")),
    }
}

fn pop(stack: &mut Vec<f64>) -> Result<f64, EvalError> {
    stack
        .pop()
        .ok_or_else(|| EvalError::syntax(0, "malformed expression program"))
}

#[cfg(test)]
mod tests {
    use super::{execute, Instr};
    use crate::eval::EvalError;

    #[test]
    fn executes_postfix_arithmetic() {
        let program = [
            Instr::Push(2.0),
            Instr::Push(3.0),
            Instr::Push(4.0),
            Instr::Mul,
            Instr::Add,
            Instr::Neg,
        ];
        assert_eq!(execute(&program).unwrap(), -14.0);
    }

    #[test]
    fn division_by_zero_is_reported() {
        let program = [Instr::Push(1.0), Instr::Push(0.0), Instr::Div];
        assert_eq!(execute(&program), Err(EvalError::DivisionByZero));

        let negative_zero = [Instr::Push(1.0), Instr::Push(0.0), Instr::Neg, Instr::Div];
        assert_eq!(execute(&negative_zero), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn non_finite_values_are_overflow() {
        let literal = [Instr::Push(f64::INFINITY)];
        assert_eq!(execute(&literal), Err(EvalError::Overflow));

        let product = [Instr::Push(1e200), Instr::Push(1e200), Instr::Mul];
        assert_eq!(execute(&product), Err(EvalError::Overflow));
    }

    #[test]
    fn unbalanced_program_is_rejected_without_panicking() {
        assert!(matches!(
            execute(&[Instr::Add]),
            Err(EvalError::Syntax { .. })
        ));
        assert!(matches!(
            execute(&[Instr::Push(1.0), Instr::Push(2.0)]),
            Err(EvalError::Syntax { .. })
        ));
        assert!(matches!(execute(&[]), Err(EvalError::Syntax { .. })));
    }
}
