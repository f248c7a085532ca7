// Packrat memoization, run statistics and concurrent runs.

use std::thread;

use bitpeg::{Engine, EngineConfig, Grammar, GrammarBuilder, MatchStats, ParserId};

// ---
// Test Setup
// ---

/// `s := x 'a' | x 'b' | x 'c'` with `x := digit+`: every alternative
/// re-reads the same prefix.
fn shared_prefix() -> (Grammar, ParserId) {
    let mut g = GrammarBuilder::new();
    let digit = g.ch_range(b'0', b'9').unwrap();
    let x = g.many1(digit).unwrap();
    let alts: Vec<ParserId> = [b'a', b'b', b'c']
        .iter()
        .map(|&c| {
            let suffix = g.ch(c);
            g.sequence(&[x, suffix]).unwrap()
        })
        .collect();
    let root = g.choice(&alts).unwrap();
    (g.finish().unwrap(), root)
}

fn run(grammar: &Grammar, root: ParserId, input: &[u8], config: EngineConfig) -> MatchStats {
    Engine::with_config(grammar, config)
        .run_with_stats(root, input)
        .unwrap()
        .1
}

mod memo_tests {
    use super::*;

    #[test]
    fn reruns_are_identical() {
        let (grammar, root) = shared_prefix();
        let engine = Engine::new(&grammar);
        let (first, first_stats) = engine.run_with_stats(root, b"12345c").unwrap();
        let (second, second_stats) = engine.run_with_stats(root, b"12345c").unwrap();
        assert_eq!(first, second);
        assert_eq!(first_stats, second_stats);
        assert_eq!(first.bytes_consumed(), Some(6));
    }

    #[test]
    fn each_node_position_pair_is_evaluated_once() {
        let (grammar, root) = shared_prefix();
        let stats = run(&grammar, root, b"12345c", EngineConfig::default());
        assert_eq!(stats.evaluations, stats.cache_entries);
        // `x` at position 0 is served from the cache for the 2nd and 3rd alternatives.
        assert!(stats.cache_hits >= 2);
    }

    #[test]
    fn disabling_memoization_keeps_results() {
        let (grammar, root) = shared_prefix();
        let off = EngineConfig::new().with_memoize(false);

        let memoized = grammar.parse(root, b"12345c").unwrap();
        let plain = grammar.parse_with(root, b"12345c", off).unwrap();
        assert_eq!(memoized, plain);

        let with = run(&grammar, root, b"12345c", EngineConfig::default());
        let without = run(&grammar, root, b"12345c", off);
        assert_eq!(without.cache_hits, 0);
        assert_eq!(without.cache_entries, 0);
        assert!(without.evaluations > with.evaluations);
    }

    #[test]
    fn failures_are_cached_too() {
        let (grammar, root) = shared_prefix();
        let engine = Engine::new(&grammar);
        let (result, stats) = engine.run_with_stats(root, b"123z").unwrap();
        assert!(!result.is_success());
        assert_eq!(stats.evaluations, stats.cache_entries);
    }
}

mod sharing_tests {
    use super::*;

    #[test]
    fn right_recursive_values_are_shared_with_the_cache() {
        // list := digit list | digit
        let mut g = GrammarBuilder::new();
        let list = g.indirect();
        let digit = g.ch_range(b'0', b'9').unwrap();
        let more = g.sequence(&[digit, list]).unwrap();
        let body = g.choice(&[more, digit]).unwrap();
        g.bind_indirect(list, body).unwrap();
        let grammar = g.finish().unwrap();

        let input = vec![b'7'; 400];
        let (result, stats) = Engine::new(&grammar).run_with_stats(list, &input).unwrap();
        assert_eq!(result.bytes_consumed(), Some(400));
        assert!(stats.cache_entries <= 4 * 401);

        // The tail of the value is the cached result one byte further on.
        let value = result.value().unwrap();
        let tail = value.get(1).and_then(|v| v.get(1)).unwrap();
        assert_eq!(tail.get(0).and_then(bitpeg::Value::as_u64), Some(u64::from(b'7')));
    }
}

mod concurrency_tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn grammar_is_shareable() {
        assert_send_sync::<Grammar>();
        assert_send_sync::<bitpeg::ParseResult>();
    }

    #[test]
    fn concurrent_runs_are_independent() {
        let (grammar, root) = shared_prefix();
        let inputs: Vec<Vec<u8>> = (0..8)
            .map(|i| {
                let mut input = format!("{}", 10_000 + i).into_bytes();
                input.push([b'a', b'b', b'c'][i % 3]);
                input
            })
            .collect();

        thread::scope(|s| {
            for input in &inputs {
                let grammar = &grammar;
                s.spawn(move || {
                    let result = grammar.parse(root, input).unwrap();
                    assert_eq!(result.bytes_consumed(), Some(input.len()));
                });
            }
        });
    }
}
