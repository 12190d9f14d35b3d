//! Backtracking matcher binding a token stream to one signature.
//!
//! The search walks the logic tree in continuation-passing style: every node
//! receives the rest of the match as `next`, so a later failure can fall back
//! into an earlier OR subset or XOR branch. The remaining choices are
//! committed:
//!
//! - an optional group is absent only if none of its leaves can match when the
//!   group is tried on its own; once it begins it must complete,
//! - arrays consume greedily and are never shortened to make room for later
//!   arguments.
//!
//! A full match consumes every positional token and every keyword token.
//!
//! An OR chain of `n` members tries up to `2^n` subsets before it fails, so
//! the cost of a non-matching call grows exponentially with the chain length.

use std::cell::Cell;

use tracing::debug;

use crate::registry::TypeRegistry;
use crate::settings::EffectiveSettings;
use crate::tokenize::{KeywordMap, TokenStream};
use crate::types::{
    ArgumentKind, ArgumentSpec, ArrayShape, Combinator, Group, NativeType, Node, Signature,
    TypeDescriptor, Value,
};

/// Partial match threaded through the search.
#[derive(Debug, Clone, Default)]
struct State {
    cursor: usize,
    values: Vec<(usize, Value)>,
    keywords: usize,
}

type Next<'n> = &'n dyn Fn(State) -> Option<State>;

/// Solver for one signature against one input.
pub struct Matcher<'a> {
    signature: &'a Signature,
    positional: &'a [String],
    keywords: KeywordMap<'a>,
    types: &'a TypeRegistry,
    settings: &'a EffectiveSettings<'a>,
    /// Set whenever a leaf succeeds; read by optional groups to tell "absent"
    /// from "started and failed".
    began: Cell<bool>,
}

impl<'a> Matcher<'a> {
    pub fn new(
        signature: &'a Signature,
        stream: &'a TokenStream,
        types: &'a TypeRegistry,
        settings: &'a EffectiveSettings<'a>,
    ) -> Self {
        Self {
            signature,
            positional: &stream.positional,
            keywords: KeywordMap::resolve(stream, signature),
            types,
            settings,
            began: Cell::new(false),
        }
    }

    /// Finds the first binding in search order, as `(argument index, value)`
    /// pairs in binding order.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_signature_core::{compile, EffectiveSettings, Matcher, TokenStream, TypeRegistry, Value};
    ///
    /// let signature = compile("(int) count [--loud]").unwrap();
    /// let stream = TokenStream::parse("--loud 3");
    /// let registry = TypeRegistry::new();
    /// let settings = EffectiveSettings::default();
    ///
    /// let values = Matcher::new(&signature, &stream, &registry, &settings).solve().unwrap();
    /// assert_eq!(values, vec![(0, Value::Int(3)), (1, Value::Bool(true))]);
    /// ```
    pub fn solve(&self) -> Option<Vec<(usize, Value)>> {
        if let Some(stray) = self.keywords.stray().first() {
            debug!(
                signature = self.signature.source(),
                keyword = *stray,
                "keyword does not belong to signature"
            );
            return None;
        }

        let finish = |state: State| {
            let complete =
                state.cursor == self.positional.len() && state.keywords == self.keywords.len();
            complete.then_some(state)
        };
        self.group(self.signature.root(), State::default(), false, &finish)
            .map(|state| state.values)
    }

    fn node(&self, node: &Node, state: State, optional: bool, next: Next<'_>) -> Option<State> {
        match node {
            Node::Leaf(index) => {
                let state = self.leaf(*index, state, optional)?;
                next(state)
            }
            Node::Group(group) => self.group(group, state, optional, next),
        }
    }

    fn group(&self, group: &Group, state: State, optional: bool, next: Next<'_>) -> Option<State> {
        if group.required {
            return self.body(group, state, optional, next);
        }
        if !self.can_begin(group, &state) {
            return next(state);
        }
        self.body(group, state, true, next)
    }

    /// Tries the group body in isolation and reports whether any leaf in it
    /// matched along the way.
    fn can_begin(&self, group: &Group, state: &State) -> bool {
        let outer = self.began.replace(false);
        let _ = self.body(group, state.clone(), true, &|state| Some(state));
        let began = self.began.get();
        self.began.set(outer || began);
        began
    }

    fn body(&self, group: &Group, state: State, optional: bool, next: Next<'_>) -> Option<State> {
        match group.combinator {
            Combinator::And => {
                let children = group.children.iter().collect::<Vec<_>>();
                self.sequence(&children, state, optional, next)
            }
            Combinator::Or => subsets(group.children.len())
                .into_iter()
                .find_map(|subset| {
                    let chosen = subset
                        .iter()
                        .map(|&idx| &group.children[idx])
                        .collect::<Vec<_>>();
                    self.sequence(&chosen, state.clone(), optional, next)
                }),
            Combinator::Xor => group
                .children
                .iter()
                .find_map(|child| self.node(child, state.clone(), optional, next)),
        }
    }

    fn sequence(&self, nodes: &[&Node], state: State, optional: bool, next: Next<'_>) -> Option<State> {
        match nodes.split_first() {
            None => next(state),
            Some((first, rest)) => self.node(first, state, optional, &|state| {
                self.sequence(rest, state, optional, next)
            }),
        }
    }

    fn leaf(&self, index: usize, mut state: State, optional: bool) -> Option<State> {
        let spec = &self.signature.arguments()[index];
        let value = match spec.kind {
            ArgumentKind::Positional => {
                let (value, used) = self.positional_value(spec, state.cursor)?;
                state.cursor += used;
                value
            }
            ArgumentKind::Keyword => {
                let value = self.keyword_value(spec, index)?;
                state.keywords += 1;
                Some(value)
            }
        };

        match value {
            Some(value) => {
                state.values.push((index, value));
                self.began.set(true);
            }
            // Empty greedy array.
            None if optional => {}
            None => return None,
        }
        Some(state)
    }

    /// Consumes positional tokens at `cursor`. `Some((None, 0))` is an empty
    /// greedy array.
    fn positional_value(&self, spec: &ArgumentSpec, cursor: usize) -> Option<(Option<Value>, usize)> {
        let rest = &self.positional[cursor..];
        match spec.array {
            ArrayShape::Scalar => {
                let token = rest.first()?;
                Some((Some(self.cast(&spec.ty, token)?), 1))
            }
            ArrayShape::Fixed(count) => {
                let tokens = rest.get(..count)?;
                let ty = self.uniform_type(&spec.ty, Some(tokens[0].as_str()));
                let values = tokens
                    .iter()
                    .map(|token| self.cast(&ty, token))
                    .collect::<Option<Vec<_>>>()?;
                Some((Some(Value::List(values)), count))
            }
            ArrayShape::Greedy => {
                let values = rest
                    .iter()
                    .map_while(|token| self.cast(&spec.ty, token))
                    .collect::<Vec<_>>();
                if values.is_empty() {
                    return Some((None, 0));
                }
                let used = values.len();
                Some((Some(Value::List(values)), used))
            }
        }
    }

    fn keyword_value(&self, spec: &ArgumentSpec, index: usize) -> Option<Value> {
        let occurrences = self.keywords.get(index)?;
        match spec.array {
            ArrayShape::Scalar => match occurrences {
                [single] => self.keyword_cast(&spec.ty, *single),
                _ => None,
            },
            ArrayShape::Fixed(count) if occurrences.len() != count => None,
            ArrayShape::Fixed(_) => {
                let ty = self.uniform_type(&spec.ty, occurrences[0]);
                self.keyword_list(&ty, occurrences)
            }
            ArrayShape::Greedy => self.keyword_list(&spec.ty, occurrences),
        }
    }

    fn keyword_list(&self, ty: &TypeDescriptor, occurrences: &[Option<&str>]) -> Option<Value> {
        occurrences
            .iter()
            .map(|text| self.keyword_cast(ty, *text))
            .collect::<Option<Vec<_>>>()
            .map(Value::List)
    }

    /// A bare `--flag` is `true` for `bool` and `any`, and fails otherwise.
    fn keyword_cast(&self, ty: &TypeDescriptor, text: Option<&str>) -> Option<Value> {
        match text {
            Some(text) => self.cast(ty, text),
            None => matches!(
                ty,
                TypeDescriptor::Any | TypeDescriptor::Native(NativeType::Bool)
            )
            .then_some(Value::Bool(true)),
        }
    }

    /// Fixed arrays of `any` take the type inferred from their first element.
    fn uniform_type(&self, ty: &TypeDescriptor, first: Option<&str>) -> TypeDescriptor {
        match (ty, first) {
            (TypeDescriptor::Any, Some(token)) => self.types.infer(token, self.settings).0,
            (TypeDescriptor::Any, None) => TypeDescriptor::Native(NativeType::Bool),
            _ => ty.clone(),
        }
    }

    fn cast(&self, ty: &TypeDescriptor, token: &str) -> Option<Value> {
        self.types.cast(ty, token, self.settings)
    }
}

/// Nonempty subsets of `0..len`: largest first, lexicographic within a size.
fn subsets(len: usize) -> Vec<Vec<usize>> {
    fn extend(start: usize, len: usize, size: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == size {
            out.push(current.clone());
            return;
        }
        for idx in start..len {
            current.push(idx);
            extend(idx + 1, len, size, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    for size in (1..=len).rev() {
        extend(0, len, size, &mut Vec::with_capacity(size), &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::compile;
    use crate::settings::Settings;

    fn bind_with(source: &str, input: &str, settings: &Settings) -> Option<BTreeMap<String, Value>> {
        let signature = compile(source).unwrap();
        let stream = TokenStream::parse(input);
        let registry = TypeRegistry::new();
        let effective = settings.effective();
        let matcher = Matcher::new(&signature, &stream, &registry, &effective);
        matcher.solve().map(|values| {
            values
                .into_iter()
                .map(|(index, value)| (signature.arguments()[index].name.clone(), value))
                .collect()
        })
    }

    fn bind(source: &str, input: &str) -> Option<BTreeMap<String, Value>> {
        bind_with(source, input, &Settings::default())
    }

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    #[test]
    fn test_subset_order() {
        assert_eq!(
            subsets(3),
            vec![
                vec![0, 1, 2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
                vec![0],
                vec![1],
                vec![2],
            ]
        );
        assert_eq!(subsets(1), vec![vec![0]]);
    }

    #[test]
    fn test_keyword_order_is_irrelevant() {
        let a = bind("(int) --foo (int) --bar", "--foo=1 --bar=2").unwrap();
        let b = bind("(int) --foo (int) --bar", "--bar=2 --foo=1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a["foo"], Value::Int(1));
        assert_eq!(a["bar"], Value::Int(2));

        let flags = bind("--foo --bar", "--bar --foo").unwrap();
        assert_eq!(flags["foo"], Value::Bool(true));
    }

    #[test]
    fn test_keyword_placement_is_irrelevant() {
        let a = bind("foo bar --baz", "foo bar --baz").unwrap();
        let b = bind("foo bar --baz", "foo --baz bar").unwrap();
        let c = bind("foo bar --baz", "--baz foo bar").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a["bar"], s("bar"));
        assert_eq!(a["baz"], Value::Bool(true));
    }

    #[test]
    fn test_optional_group_all_or_nothing() {
        let bare = bind("foo [bar baz]", "foo").unwrap();
        assert_eq!(bare.len(), 1);

        let full = bind("foo [bar baz]", "foo bar baz").unwrap();
        assert_eq!(full["baz"], s("baz"));

        assert!(bind("foo [bar baz]", "foo bar").is_none());
    }

    #[test]
    fn test_started_optional_group_is_not_abandoned() {
        // The optional group consumes "5", so `b` has nothing left.
        assert!(bind("[(int) a] (int) b", "5").is_none());
        assert!(bind("[(int) a] (int) b", "5 6").is_some());
        // A group that cannot begin is skipped.
        let skipped = bind("[(int) a] b", "x").unwrap();
        assert_eq!(skipped["b"], s("x"));
    }

    #[test]
    fn test_or_chain_accepts_every_subset() {
        let source = "--foo / --bar / --baz";
        for input in [
            "--foo",
            "--bar",
            "--baz",
            "--foo --bar",
            "--foo --baz",
            "--bar --baz",
            "--foo --bar --baz",
        ] {
            let bound = bind(source, input).unwrap_or_else(|| panic!("{input} should match"));
            assert_eq!(bound.len(), input.split_whitespace().count());
        }
        assert!(bind(source, "bar foo").is_none());
        assert!(bind(source, "").is_none());
    }

    #[test]
    fn test_or_chain_preserves_positional_order() {
        let source = "(int) foo / (bool) bar / (float) baz";
        assert!(bind(source, "1 yes 2.5").is_some());
        assert!(bind(source, "yes 2.5").is_some());
        assert!(bind(source, "1 2.5").is_some());
        let only_bar = bind(source, "no").unwrap();
        assert_eq!(only_bar["bar"], Value::Bool(false));
        assert!(bind(source, "yes 1").is_none());
        assert!(bind(source, "2.5 1").is_none());
    }

    #[test]
    fn test_xor_chain_accepts_exactly_one() {
        let source = "--foo | --bar | --baz";
        for input in ["--foo", "--bar", "--baz"] {
            assert!(bind(source, input).is_some(), "{input} should match");
        }
        assert!(bind(source, "--foo --bar").is_none());
        assert!(bind(source, "--foo --bar --baz").is_none());

        let positional = "foo | bar | baz";
        let one = bind(positional, "x").unwrap();
        assert_eq!(one["foo"], s("x"));
        assert!(bind(positional, "foo bar").is_none());
    }

    #[test]
    fn test_alternatives_backtrack_into_later_siblings() {
        // The full OR subset takes both ints and starves `c`; the search then
        // retries with `{a}` alone.
        let bound = bind("<(int) a / (int) b> (int) c", "1 2").unwrap();
        assert_eq!(bound["a"], Value::Int(1));
        assert_eq!(bound["c"], Value::Int(2));
        assert!(!bound.contains_key("b"));
    }

    #[test]
    fn test_one_literal_inference_follows_truthy_set() {
        let default = bind("value", "1").unwrap();
        assert_eq!(default["value"], Value::Int(1));

        let settings = Settings::default().with_truthy(["1", "true"]);
        let custom = bind_with("value", "1", &settings).unwrap();
        assert_eq!(custom["value"], Value::Bool(true));
    }

    #[test]
    fn test_greedy_any_starves_following_arguments() {
        let source = "(any[]) foo (int) bar";
        for input in ["", "1", "1 2", "a 1", "1.5 2", "yes 3"] {
            assert!(bind(source, input).is_none(), "{input:?} should not match");
        }
    }

    #[test]
    fn test_greedy_typed_array_stops_at_first_failure() {
        let bound = bind("(int[]) nums rest", "1 2 3 x").unwrap();
        assert_eq!(
            bound["nums"],
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(bound["rest"], s("x"));

        assert!(bind("(int[]) nums", "x").is_none());
        assert!(bind("(int[]) nums", "").is_none());
    }

    #[test]
    fn test_empty_greedy_array_inside_optional_group() {
        let bound = bind("[(int[]) nums --v]", "--v").unwrap();
        assert!(!bound.contains_key("nums"));
        assert_eq!(bound["v"], Value::Bool(true));

        let empty = bind("name [(int[]) nums]", "x").unwrap();
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_fixed_bool_array() {
        let source = "(bool[3]) x";
        let bound = bind(source, "yes no on").unwrap();
        assert_eq!(
            bound["x"],
            Value::List(vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)])
        );
        assert!(bind(source, "yes no").is_none());
        assert!(bind(source, "yes no on off").is_none());
        assert!(bind(source, "yes no 1").is_none());
    }

    #[test]
    fn test_fixed_any_array_is_uniform() {
        let bound = bind("(any[2]) pair", "1 2").unwrap();
        assert_eq!(bound["pair"], Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert!(bind("(any[2]) pair", "1 x").is_none());
        let strings = bind("(any[2]) pair", "x 1").unwrap();
        assert_eq!(strings["pair"], Value::List(vec![s("x"), s("1")]));
    }

    #[test]
    fn test_keyword_values_and_flags() {
        let bound = bind("(str) --name [(int) --count]", "--name=bob").unwrap();
        assert_eq!(bound["name"], s("bob"));
        assert!(!bound.contains_key("count"));

        // A valueless keyword only satisfies bool and any.
        assert!(bind("(str) --name", "--name").is_none());
        assert_eq!(bind("(any) --x", "--x").unwrap()["x"], Value::Bool(true));
        assert_eq!(bind("--x", "--x=off").unwrap()["x"], Value::Bool(false));
        assert!(bind("--x", "--x=maybe").is_none());

        // Repeated scalar keywords are ambiguous.
        assert!(bind("(int) --n", "--n=1 --n=2").is_none());
    }

    #[test]
    fn test_keyword_arrays_collect_occurrences() {
        let bound = bind("(int[]) --tag", "--tag=1 --tag=2").unwrap();
        assert_eq!(bound["tag"], Value::List(vec![Value::Int(1), Value::Int(2)]));

        assert!(bind("(int[2]) --tag", "--tag=1").is_none());
        assert!(bind("(int[2]) --tag", "--tag=1 --tag=2").is_some());
    }

    #[test]
    fn test_unknown_keyword_or_extra_positional_fails() {
        assert!(bind("foo", "x --other").is_none());
        assert!(bind("foo", "x y").is_none());
        assert!(bind("foo", "").is_none());
    }

    #[test]
    fn test_optional_root() {
        assert!(bind("[foo]", "").is_some());
        assert!(bind("[foo]", "x").is_some());
        assert!(bind("[foo]", "x y").is_none());
    }

    #[test]
    fn test_required_keyword_missing_fails() {
        assert!(bind("name --force", "x").is_none());
        assert!(bind("name [--force]", "x").is_some());
    }
}
