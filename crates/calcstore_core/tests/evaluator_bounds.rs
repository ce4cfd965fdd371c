use calcstore_core::eval::{MAX_EXPRESSION_LEN, MAX_NESTING_DEPTH};
use calcstore_core::{evaluate, EvalError, FaultKind};

#[test]
fn deep_nesting_is_rejected_not_overflowed() {
    let depth = 100_000;
    let nested = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    // Oversized input is refused before parsing.
    assert!(matches!(evaluate(&nested), Err(EvalError::Syntax { .. })));

    let within_len = format!(
        "{}1{}",
        "(".repeat(MAX_NESTING_DEPTH * 10),
        ")".repeat(MAX_NESTING_DEPTH * 10)
    );
    assert!(within_len.len() <= MAX_EXPRESSION_LEN);
    assert_eq!(evaluate(&within_len).unwrap_err().kind(), FaultKind::Syntax);
}

#[test]
fn long_flat_expressions_stay_within_bounds() {
    let chain = vec!["1"; MAX_EXPRESSION_LEN / 2].join("-");
    let result = evaluate(&chain).unwrap();
    assert_eq!(result.text, format!("{}", 2 - (MAX_EXPRESSION_LEN as i64 / 2)));
}

#[test]
fn adversarial_inputs_fault_without_panicking() {
    let inputs = [
        "(",
        ")",
        "((1)",
        "1)(",
        "*1",
        "1**2",
        "1 / / 2",
        "NaN",
        "inf",
        "1e",
        "1e+",
        "..5",
        "٣+1",
        "1 + 2\u{0}",
        "🙂",
        "1_000",
        "0x10",
    ];
    for input in inputs {
        let err = evaluate(input).unwrap_err();
        assert_eq!(err.kind(), FaultKind::Syntax, "{input:?} -> {err}");
    }
}

#[test]
fn oversized_numbers_are_evaluation_faults() {
    let digits = "9".repeat(400);
    assert_eq!(evaluate(&digits).unwrap_err(), EvalError::Overflow);
    assert_eq!(evaluate("1e309").unwrap_err(), EvalError::Overflow);
    assert_eq!(evaluate("-1e308 - 1e308").unwrap_err(), EvalError::Overflow);
    assert_eq!(evaluate("(1-1)/(2-2)").unwrap_err(), EvalError::DivisionByZero);
}

#[test]
fn whitespace_and_unary_operators() {
    assert_eq!(evaluate(" \t2 *\n-3 ").unwrap().text, "-6");
    assert_eq!(evaluate("+-+4").unwrap().text, "-4");
    assert_eq!(evaluate("2.").unwrap().text, "2");
    assert_eq!(evaluate(".25*4").unwrap().text, "1");
}
