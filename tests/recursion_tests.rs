// Recursive grammars through indirection slots: nesting, mutual recursion,
// left recursion and the recursion depth bound.

use bitpeg::{EngineConfig, FailureKind, Grammar, GrammarBuilder, ParserId, SlotId, Value};

// ---
// Test Setup
// ---

/// `parens := '(' parens ')' parens | epsilon`, anchored at end of input.
fn balanced_parens() -> (Grammar, ParserId) {
    let mut g = GrammarBuilder::new();
    let parens = g.indirect();
    let open = g.ch(b'(');
    let close = g.ch(b')');
    let nested = g.sequence(&[open, parens, close, parens]).unwrap();
    let empty = g.epsilon_p();
    let body = g.choice(&[nested, empty]).unwrap();
    g.bind_indirect(parens, body).unwrap();
    let end = g.end_p();
    let root = g.left(parens, end).unwrap();
    (g.finish().unwrap(), root)
}

fn nested(depth: usize) -> Vec<u8> {
    let mut input = vec![b'('; depth];
    input.extend(std::iter::repeat(b')').take(depth));
    input
}

mod nesting_tests {
    use super::*;

    #[test]
    fn balanced_parens_match() {
        let (grammar, root) = balanced_parens();
        let good: [&[u8]; 4] = [b"", b"()", b"(())()", b"((()())())"];
        let bad: [&[u8]; 4] = [b"(", b")", b"(()", b"())("];
        for input in good {
            assert!(grammar.parse(root, input).unwrap().is_success(), "{:?}", input);
        }
        for input in bad {
            assert!(!grammar.parse(root, input).unwrap().is_success(), "{:?}", input);
        }
    }

    #[test]
    fn nesting_within_the_bound_succeeds() {
        let (grammar, root) = balanced_parens();
        let (result, stats) = bitpeg::Engine::new(&grammar)
            .run_with_stats(root, &nested(50))
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.bytes_consumed(), Some(100));
        assert!(stats.max_depth > 50);
    }

    #[test]
    fn exceeding_the_bound_is_a_recursion_limit_failure() {
        let (grammar, root) = balanced_parens();
        let config = EngineConfig::new().with_max_recursion_depth(10);
        let result = grammar.parse_with(root, &nested(20), config).unwrap();
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::RecursionLimit { limit: 10 });
        assert!(failure.kind.is_fatal());

        // The same input fits a larger bound.
        let config = EngineConfig::new().with_max_recursion_depth(64);
        assert!(grammar.parse_with(root, &nested(20), config).unwrap().is_success());
    }

    #[test]
    fn default_bound_holds_on_a_spawned_thread() {
        let (grammar, root) = balanced_parens();
        let deep = std::thread::spawn(move || {
            let within = grammar.parse(root, &nested(999)).unwrap();
            let beyond = grammar.parse(root, &nested(5000)).unwrap();
            (within, beyond)
        })
        .join()
        .unwrap();

        let (within, beyond) = deep;
        assert_eq!(within.bytes_consumed(), Some(1998));
        assert_eq!(
            beyond.failure().map(|f| f.kind.clone()),
            Some(FailureKind::RecursionLimit {
                limit: bitpeg::config::DEFAULT_MAX_RECURSION_DEPTH
            })
        );
    }

    #[test]
    fn mutual_recursion() {
        // a := 'x' b | epsilon ; b := 'y' a
        let mut g = GrammarBuilder::new();
        let a = g.indirect();
        let b = g.indirect();
        let x = g.ch(b'x');
        let y = g.ch(b'y');
        let xb = g.sequence(&[x, b]).unwrap();
        let eps = g.epsilon_p();
        let a_body = g.choice(&[xb, eps]).unwrap();
        let b_body = g.sequence(&[y, a]).unwrap();
        g.bind_indirect(a, a_body).unwrap();
        g.bind_indirect(b, b_body).unwrap();
        let grammar = g.finish().unwrap();

        assert_eq!(grammar.parse(a, b"xyxy").unwrap().bytes_consumed(), Some(4));
        assert_eq!(grammar.parse(a, b"xyx").unwrap().bytes_consumed(), Some(2));
    }

    #[test]
    fn arithmetic_expressions() {
        // expr := term (('+' | '-') term)* ; term := digit | '(' expr ')'
        let mut g = GrammarBuilder::new();
        let expr = g.indirect();
        let digit = g.ch_range(b'0', b'9').unwrap();
        let open = g.ch(b'(');
        let close = g.ch(b')');
        let group = g.middle(open, expr, close).unwrap();
        let term = g.choice(&[digit, group]).unwrap();
        let plus = g.ch(b'+');
        let minus = g.ch(b'-');
        let op = g.choice(&[plus, minus]).unwrap();
        let tail = g.sequence(&[op, term]).unwrap();
        let tails = g.many(tail).unwrap();
        let body = g.sequence(&[term, tails]).unwrap();
        g.bind_indirect(expr, body).unwrap();
        let end = g.end_p();
        let root = g.left(expr, end).unwrap();
        let grammar = g.finish().unwrap();

        assert!(grammar.parse(root, b"1+(2-3)+4").unwrap().is_success());
        assert!(!grammar.parse(root, b"1+(2-3").unwrap().is_success());
    }
}

mod left_recursion_tests {
    use super::*;

    #[test]
    fn left_recursion_is_detected_not_overflowed() {
        // expr := expr '+' digit | digit
        let mut g = GrammarBuilder::new();
        let expr = g.indirect();
        let slot: SlotId = g.slot_of(expr).unwrap();
        let digit = g.ch_range(b'0', b'9').unwrap();
        let plus = g.ch(b'+');
        let sum = g.sequence(&[expr, plus, digit]).unwrap();
        let body = g.choice(&[sum, digit]).unwrap();
        g.bind_indirect(expr, body).unwrap();
        let grammar = g.finish().unwrap();

        let result = grammar.parse(expr, b"1+2").unwrap();
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::LeftRecursion { slot });
    }

    #[test]
    fn fatal_failures_pass_through_optional_and_many() {
        let mut g = GrammarBuilder::new();
        let loop_ = g.indirect();
        let opt = g.optional(loop_).unwrap();
        let many = g.many(opt).unwrap();
        g.bind_indirect(loop_, many).unwrap();
        let grammar = g.finish().unwrap();

        let failure = grammar.parse(loop_, b"abc").unwrap().failure().cloned().unwrap();
        assert!(matches!(failure.kind, FailureKind::LeftRecursion { .. }));
    }

    #[test]
    fn right_recursion_is_fine() {
        // list := digit list | digit
        let mut g = GrammarBuilder::new();
        let list = g.indirect();
        let digit = g.ch_range(b'0', b'9').unwrap();
        let more = g.sequence(&[digit, list]).unwrap();
        let body = g.choice(&[more, digit]).unwrap();
        g.bind_indirect(list, body).unwrap();
        let grammar = g.finish().unwrap();

        let result = grammar.parse(list, b"123").unwrap();
        assert_eq!(result.bytes_consumed(), Some(3));
        assert_eq!(
            result.value(),
            Some(&Value::from(vec![
                Value::uint(u64::from(b'1'), 8),
                Value::from(vec![
                    Value::uint(u64::from(b'2'), 8),
                    Value::uint(u64::from(b'3'), 8),
                ]),
            ]))
        );
    }
}
