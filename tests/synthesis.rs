use std::time::Duration;

use enumsynth::arith::{ArithEvaluator, Env};
use enumsynth::search::{Search, SearchContext, SearchStep};
use enumsynth::synth::bottom_up::BottomUp;
use enumsynth::synth::top_down::TopDown;
use enumsynth::{
    synthesize, Example, Grammar, GrammarBuilder, RuleSpec, SearchLimits, Strategy, SynthResult,
};

pub const EASY_SIZE_LIMIT: usize = 9;
pub const EASY_SEARCH_LIMIT: usize = 100_000;

pub struct SynthChallenge {
    name: &'static str,
    rules: Vec<RuleSpec>,
    examples: Vec<Example<Env, i64>>,
}

impl SynthChallenge {
    pub fn perform_tests(
        tests: impl IntoIterator<Item = SynthChallenge>,
        strategy: Strategy,
    ) {
        let limits = SearchLimits {
            max_size: EASY_SIZE_LIMIT,
            max_steps: Some(EASY_SEARCH_LIMIT),
            time_limit: None,
        };

        tests.into_iter().for_each(|x| x.perform(strategy, &limits));
    }

    fn perform(self, strategy: Strategy, limits: &SearchLimits) {
        let grammar = GrammarBuilder::from_rules("E", &self.rules).unwrap();
        let evaluator = ArithEvaluator::new(&grammar).unwrap();

        let res = synthesize(&grammar, &self.examples, &evaluator, strategy, limits).unwrap();
        let SynthResult::Program(program) = res else {
            panic!("{}: expected a program, got {res:?}", self.name);
        };

        // Fact check the answer independently of the search
        let ctx = SearchContext::new(&grammar, &self.examples, &evaluator);
        assert!(ctx.check(program.root()).unwrap(), "{}: {}", self.name, program.display(&grammar));
        assert!(grammar.well_typed(program.root()));
        assert!(program.size() <= EASY_SIZE_LIMIT || strategy == Strategy::TopDown);
    }
}

pub fn init_logging() {
    let _ = colog::default_builder()
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn rule(ret: &str, op: &str, args: &[&str]) -> RuleSpec {
    RuleSpec::new(ret, op, args)
}

fn env(vars: &[(&str, i64)]) -> Env {
    vars.iter().map(|(name, val)| (name.to_string(), *val)).collect()
}

fn example(vars: &[(&str, i64)], output: i64) -> Example<Env, i64> {
    Example { input: env(vars), output }
}

fn plus_grammar() -> Grammar {
    GrammarBuilder::from_rules("E", &[
        rule("E", "x", &[]),
        rule("E", "plus", &["E", "E"]),
    ]).unwrap()
}

fn arith_rules() -> Vec<RuleSpec> {
    vec![
        rule("E", "x", &[]),
        rule("E", "y", &[]),
        rule("E", "1", &[]),
        rule("E", "2", &[]),
        rule("E", "Add", &["E", "E"]),
        rule("E", "Multiply", &["E", "E"]),
        rule("E", "Ite", &["B", "E", "E"]),
        rule("B", "Lt", &["E", "E"]),
        rule("B", "Eq", &["E", "E"]),
        rule("B", "And", &["B", "B"]),
        rule("B", "Or", &["B", "B"]),
        rule("B", "Not", &["B"]),
    ]
}

pub fn simple_challenges() -> Vec<SynthChallenge> {
    vec![
        SynthChallenge {
            name: "identity",
            rules: arith_rules(),
            examples: vec![
                example(&[("x", 1), ("y", 5)], 1),
                example(&[("x", 7), ("y", 2)], 7),
            ],
        },
        SynthChallenge {
            name: "increment",
            rules: arith_rules(),
            examples: vec![
                example(&[("x", 1), ("y", 0)], 2),
                example(&[("x", 10), ("y", 0)], 11),
            ],
        },
        SynthChallenge {
            name: "sum",
            rules: arith_rules(),
            examples: vec![
                example(&[("x", 1), ("y", 2)], 3),
                example(&[("x", 5), ("y", 8)], 13),
                example(&[("x", -4), ("y", 4)], 0),
            ],
        },
        SynthChallenge {
            name: "max",
            rules: arith_rules(),
            examples: vec![
                example(&[("x", 1), ("y", 2)], 2),
                example(&[("x", 9), ("y", 3)], 9),
                example(&[("x", 4), ("y", 4)], 4),
                example(&[("x", -3), ("y", 0)], 0),
            ],
        },
    ]
}

pub fn harder_challenges() -> Vec<SynthChallenge> {
    vec![
        SynthChallenge {
            name: "affine",
            rules: arith_rules(),
            examples: vec![
                example(&[("x", 0), ("y", 1)], 1),
                example(&[("x", 3), ("y", 2)], 8),
                example(&[("x", 5), ("y", 0)], 10),
            ],
        },
        SynthChallenge {
            name: "clamp above zero",
            rules: {
                let mut rules = arith_rules();
                rules.push(rule("E", "0", &[]));
                rules
            },
            examples: vec![
                example(&[("x", -5), ("y", 0)], 0),
                example(&[("x", 3), ("y", 0)], 3),
                example(&[("x", 0), ("y", 0)], 0),
                example(&[("x", 12), ("y", 0)], 12),
            ],
        },
    ]
}

#[test]
fn test_bottom_up_simple_challenges() {
    init_logging();
    SynthChallenge::perform_tests(simple_challenges(), Strategy::BottomUp);
}

#[test]
fn test_bottom_up_harder_challenges() {
    init_logging();
    SynthChallenge::perform_tests(harder_challenges(), Strategy::BottomUp);
}

#[test]
fn test_top_down_simple_challenges() {
    init_logging();
    SynthChallenge::perform_tests(simple_challenges(), Strategy::TopDown);
}

#[test]
fn test_plus_x_x_found_at_size_three() {
    init_logging();

    let grammar = plus_grammar();
    let evaluator = ArithEvaluator::new(&grammar).unwrap();
    let examples = vec![example(&[("x", 1)], 2)];
    let ctx = SearchContext::new(&grammar, &examples, &evaluator);
    let mut search = Search::<_, BottomUp<i64>>::new(ctx, &SearchLimits::with_max_size(3));

    // Size 1: `x` alone gives 1
    assert!(matches!(search.step().unwrap(), Some(SearchStep::Round { size: 1, frontier: 1 })));
    // Size 2: nothing fits
    assert!(matches!(search.step().unwrap(), Some(SearchStep::Round { size: 2, frontier: 0 })));

    let Some(SearchStep::CorrectSample { program }) = search.step().unwrap() else {
        panic!("plus(x, x) not found at size 3");
    };
    assert_eq!(program.display(&grammar).to_string(), "plus(x, x)");
    assert_eq!(program.size(), 3);
}

#[test]
fn test_plus_x_x_not_found_at_size_one() {
    init_logging();

    let grammar = plus_grammar();
    let evaluator = ArithEvaluator::new(&grammar).unwrap();
    let examples = vec![example(&[("x", 1)], 2)];

    let res = synthesize(
        &grammar,
        &examples,
        &evaluator,
        Strategy::BottomUp,
        &SearchLimits::with_max_size(1),
    ).unwrap();
    assert_eq!(res, SynthResult::ProgramNotFound);

    let res = synthesize(
        &grammar,
        &examples,
        &evaluator,
        Strategy::BottomUp,
        &SearchLimits::with_max_size(3),
    ).unwrap();
    let SynthResult::Program(program) = res else {
        panic!("expected a program, got {res:?}");
    };
    assert_eq!(program.display(&grammar).to_string(), "plus(x, x)");
}

#[test]
fn test_top_down_finds_plus_x_x() {
    init_logging();

    let grammar = plus_grammar();
    let evaluator = ArithEvaluator::new(&grammar).unwrap();
    let examples = vec![example(&[("x", 1)], 2)];
    let ctx = SearchContext::new(&grammar, &examples, &evaluator);
    let mut search = Search::<_, TopDown>::new(ctx, &SearchLimits::default());

    let res = search.run(&SearchLimits::default()).unwrap();
    let SynthResult::Program(program) = res else {
        panic!("expected a program, got {res:?}");
    };
    assert_eq!(program.display(&grammar).to_string(), "plus(x, x)");
    // E, x, plus(E, E), plus(x, E), plus(plus(E, E), E), plus(x, x)
    assert_eq!(search.steps(), 6);
}

#[test]
fn test_unreachable_category_terminates() {
    init_logging();

    let grammar = GrammarBuilder::from_rules("E", &[
        rule("E", "x", &[]),
        rule("E", "Neg", &["E"]),
        rule("U", "y", &[]),
        rule("U", "Multiply", &["U", "U"]),
    ]).unwrap();
    let evaluator = ArithEvaluator::new(&grammar).unwrap();
    // Only `y` could produce this
    let examples = vec![example(&[("x", 1), ("y", 7)], 7)];

    let res = synthesize(
        &grammar,
        &examples,
        &evaluator,
        Strategy::BottomUp,
        &SearchLimits::with_max_size(6),
    ).unwrap();
    assert_eq!(res, SynthResult::ProgramNotFound);

    let limits = SearchLimits {
        max_steps: Some(500),
        ..SearchLimits::default()
    };
    let res = synthesize(&grammar, &examples, &evaluator, Strategy::TopDown, &limits).unwrap();
    assert_eq!(res, SynthResult::ProgramNotFound);
}

#[test]
fn test_top_down_exhausts_finite_language() {
    init_logging();

    let grammar = GrammarBuilder::from_rules("E", &[
        rule("E", "Add", &["C", "C"]),
        rule("C", "1", &[]),
        rule("C", "x", &[]),
    ]).unwrap();
    let evaluator = ArithEvaluator::new(&grammar).unwrap();
    let examples = vec![example(&[("x", 3)], 100)];

    let res = synthesize(&grammar, &examples, &evaluator, Strategy::TopDown, &SearchLimits::default())
        .unwrap();
    assert_eq!(res, SynthResult::ProgramNotFound);
}

#[test]
fn test_rejected_candidates_do_not_stop_the_search() {
    init_logging();

    let grammar = GrammarBuilder::from_rules("E", &[
        rule("E", "x", &[]),
        rule("E", "0", &[]),
        rule("E", "2", &[]),
        rule("E", "Div", &["E", "E"]),
    ]).unwrap();
    let evaluator = ArithEvaluator::new(&grammar).unwrap();
    let examples = vec![
        example(&[("x", 4)], 2),
        example(&[("x", 9)], 4),
    ];

    for strategy in [Strategy::BottomUp, Strategy::TopDown] {
        let res = synthesize(&grammar, &examples, &evaluator, strategy, &SearchLimits::default())
            .unwrap();
        let SynthResult::Program(program) = res else {
            panic!("{strategy:?}: expected a program, got {res:?}");
        };
        assert_eq!(program.display(&grammar).to_string(), "Div(x, 2)");
    }
}

#[test]
fn test_time_limit() {
    init_logging();

    let grammar = plus_grammar();
    let evaluator = ArithEvaluator::new(&grammar).unwrap();
    let examples = vec![example(&[("x", 1)], 2)];
    let limits = SearchLimits {
        time_limit: Some(Duration::ZERO),
        ..SearchLimits::default()
    };

    for strategy in [Strategy::BottomUp, Strategy::TopDown] {
        let res = synthesize(&grammar, &examples, &evaluator, strategy, &limits).unwrap();
        assert_eq!(res, SynthResult::Timeout);
    }
}
