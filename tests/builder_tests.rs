// Grammar construction: argument validation, indirection lifecycle and
// error diagnostics.

use bitpeg::{Charset, ErrorCategory, GrammarBuilder, GrammarError, Node, SlotId};
use miette::Diagnostic;

mod validation_tests {
    use super::*;

    #[test]
    fn empty_sequence_and_choice_are_rejected() {
        let mut g = GrammarBuilder::new();
        assert_eq!(
            g.sequence(&[]),
            Err(GrammarError::EmptyChildren {
                combinator: "sequence"
            })
        );
        assert_eq!(
            g.choice(&[]),
            Err(GrammarError::EmptyChildren { combinator: "choice" })
        );
    }

    #[test]
    fn ranges_and_widths_are_checked() {
        let mut g = GrammarBuilder::new();
        assert_eq!(
            g.ch_range(b'z', b'a'),
            Err(GrammarError::InvalidCharRange { low: b'z', high: b'a' })
        );
        assert!(g.ch_range(b'a', b'a').is_ok());
        assert_eq!(g.bits(0, false), Err(GrammarError::ZeroBitWidth));
        assert_eq!(g.bits(65, true), Err(GrammarError::BitWidthTooLarge { width: 65 }));
        assert!(g.bits(64, true).is_ok());

        let byte = g.uint8();
        assert_eq!(
            g.int_range(byte, 5, 1),
            Err(GrammarError::InvalidIntRange { low: 5, high: 1 })
        );
    }

    #[test]
    fn integer_producing_parsers_are_required() {
        let mut g = GrammarBuilder::new();
        let tok = g.token("ab");
        let seq = g.sequence(&[tok]).unwrap();
        assert!(matches!(
            g.int_range(tok, 0, 1),
            Err(GrammarError::NotIntegerProducing {
                combinator: "int_range",
                ..
            })
        ));
        assert!(matches!(
            g.length_value(seq, tok),
            Err(GrammarError::NotIntegerProducing {
                combinator: "length_value",
                ..
            })
        ));

        let byte = g.uint8();
        let even = g.attr_bool(byte, |v| Ok(v.as_u64().is_some_and(|n| n % 2 == 0))).unwrap();
        assert!(g.length_value(even, tok).is_ok());
    }

    #[test]
    fn foreign_parsers_are_rejected() {
        let mut a = GrammarBuilder::new();
        let mut b = GrammarBuilder::new();
        let from_a = a.ch(b'x');
        let from_b = b.ch(b'y');
        let err = b.sequence(&[from_b, from_a]).unwrap_err();
        assert_eq!(err, GrammarError::ForeignParser { parser: from_a });
        assert_eq!(err.category(), ErrorCategory::Construction);
    }

    #[test]
    fn nodes_are_inspectable() {
        let mut g = GrammarBuilder::new();
        let vowels = g.charset_in(b"aeiou");
        let word = g.many1(vowels).unwrap();
        assert!(matches!(g.node(word), Some(Node::Many1(inner)) if *inner == vowels));
        match g.node(vowels) {
            Some(Node::CharsetIn(set)) => assert_eq!(*set, Charset::from_bytes(b"aeiou")),
            other => panic!("unexpected node {:?}", other),
        }
        let grammar = g.finish().unwrap();
        assert_eq!(grammar.len(), 2);
        assert_eq!(grammar.node(word).map(Node::kind), Some("many1"));
    }
}

mod indirection_tests {
    use super::*;

    #[test]
    fn unbound_slots_block_finish() {
        let mut g = GrammarBuilder::new();
        let first = g.indirect();
        let second = g.indirect();
        let x = g.ch(b'x');
        g.bind_indirect(second, x).unwrap();

        let slot = g.slot_of(first).unwrap();
        assert_eq!(g.unbound_slots(), vec![slot]);
        assert!(!g.all_bound());

        let err = g.finish().unwrap_err();
        assert_eq!(err, GrammarError::UnboundSlot { slot });
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn rebinding_is_an_error() {
        let mut g = GrammarBuilder::new();
        let slot_parser = g.indirect();
        let x = g.ch(b'x');
        let y = g.ch(b'y');
        g.bind_indirect(slot_parser, x).unwrap();
        let err = g.bind_indirect(slot_parser, y).unwrap_err();
        assert!(matches!(err, GrammarError::AlreadyBound { .. }));
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(g.all_bound());
    }

    #[test]
    fn only_placeholders_can_be_bound() {
        let mut g = GrammarBuilder::new();
        let x = g.ch(b'x');
        assert_eq!(
            g.bind_indirect(x, x),
            Err(GrammarError::NotIndirect { parser: x })
        );
    }

    #[test]
    fn frozen_grammar_resolves_slots() {
        let mut g = GrammarBuilder::new();
        let placeholder = g.indirect();
        let x = g.ch(b'x');
        g.bind_indirect(placeholder, x).unwrap();
        let slot = g.slot_of(placeholder).unwrap();
        assert_eq!(g.slot_target(slot), Some(x));
        let grammar = g.finish().unwrap();
        assert_eq!(grammar.resolve(slot), Some(x));
        assert!(grammar.parse(placeholder, b"x").unwrap().is_success());
    }

    #[test]
    fn unknown_slots_do_not_resolve() {
        let mut g = GrammarBuilder::new();
        let placeholder = g.indirect();
        let x = g.ch(b'x');
        g.bind_indirect(placeholder, x).unwrap();
        let grammar = g.finish().unwrap();

        let stray: SlotId = serde_json::from_str("99").unwrap();
        assert_eq!(grammar.resolve(stray), None);
    }
}

mod diagnostic_tests {
    use super::*;

    #[test]
    fn errors_carry_codes_and_help() {
        let err = GrammarError::UnboundSlot {
            slot: {
                let mut g = GrammarBuilder::new();
                let p = g.indirect();
                g.slot_of(p).unwrap()
            },
        };
        assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some("bitpeg::grammar::unbound"));
        assert!(err.help().is_some());
        assert_eq!(err.to_string(), "indirect slot 0 was never bound");
    }
}
