//! Data model for compiled signatures and match results.
//!
//! A [`Signature`] owns its argument table and a logic tree of [`Node`]s whose
//! leaves index into that table. The tree is built once by the compiler and is
//! never mutated afterwards, so it can be shared read-only between concurrent
//! dispatches. [`Value`] and [`Binding`] are the per-call results.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Prefix that marks a keyword argument in both signatures and input.
pub const KEYWORD_MARKER: &str = "--";

/// Description attached to arguments that were never described.
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";

/// Built-in value types.
///
/// # Examples
///
/// ```
/// use command_signature_core::NativeType;
///
/// assert_eq!(NativeType::from_name("int"), Some(NativeType::Int));
/// assert_eq!(NativeType::from_name("string"), Some(NativeType::String));
/// assert_eq!(NativeType::from_name("hex"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeType {
    Bool,
    Int,
    Float,
    String,
}

impl NativeType {
    /// Order in which native types are tried when inferring an `any` value.
    pub const INFERENCE_ORDER: [NativeType; 4] = [
        NativeType::Bool,
        NativeType::Int,
        NativeType::Float,
        NativeType::String,
    ];

    /// Looks up a native type by its annotation name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "str" | "string" => Some(Self::String),
            _ => None,
        }
    }

    /// Canonical annotation name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "str",
        }
    }
}

/// Declared type of an argument, resolved once at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TypeDescriptor {
    /// Inferred per token (custom types first, then native order).
    #[default]
    Any,
    Native(NativeType),
    /// A custom type registered under this symbol.
    Custom(String),
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Native(native) => f.write_str(native.name()),
            Self::Custom(symbol) => f.write_str(symbol),
        }
    }
}

/// How many tokens an argument takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArrayShape {
    /// A single value.
    #[default]
    Scalar,
    /// As many matching tokens as are available (`type[]`).
    Greedy,
    /// Exactly this many tokens (`type[n]`).
    Fixed(usize),
}

/// Whether an argument is matched by position or by `--name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    Positional,
    Keyword,
}

type ValidatorFn = dyn Fn(&Value) -> Result<bool, String> + Send + Sync;

/// Per-argument check run after a successful match.
///
/// Returning `Ok(false)` or `Err(reason)` rejects the bound value.
///
/// # Examples
///
/// ```
/// use command_signature_core::{Validator, Value};
///
/// let positive = Validator::new(|value| Ok(value.as_int().is_some_and(|n| n > 0)));
/// assert_eq!(positive.check(&Value::Int(3)), Ok(true));
/// assert_eq!(positive.check(&Value::Int(-3)), Ok(false));
/// ```
#[derive(Clone)]
pub struct Validator(Arc<ValidatorFn>);

impl Validator {
    pub fn new(check: impl Fn(&Value) -> Result<bool, String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(check))
    }

    pub fn check(&self, value: &Value) -> Result<bool, String> {
        (self.0)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A declared argument of one signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentSpec {
    /// Name without the keyword marker. Unique within its signature.
    pub name: String,
    pub kind: ArgumentKind,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    pub array: ArrayShape,
    /// Alternative names, unique within the signature.
    pub aliases: Vec<String>,
    #[serde(skip)]
    pub validator: Option<Validator>,
    pub description: String,
}

impl ArgumentSpec {
    pub fn new(name: &str, kind: ArgumentKind, ty: TypeDescriptor, array: ArrayShape) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ty,
            array,
            aliases: Vec::new(),
            validator: None,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind == ArgumentKind::Keyword
    }

    /// Renders the argument the way it is written in a signature.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_signature_core::{ArgumentKind, ArgumentSpec, ArrayShape, NativeType, TypeDescriptor};
    ///
    /// let spec = ArgumentSpec::new(
    ///     "ids",
    ///     ArgumentKind::Keyword,
    ///     TypeDescriptor::Native(NativeType::Int),
    ///     ArrayShape::Fixed(3),
    /// );
    /// assert_eq!(spec.usage(), "(int[3]) --ids");
    /// ```
    pub fn usage(&self) -> String {
        let marker = if self.is_keyword() { KEYWORD_MARKER } else { "" };
        let array = match self.array {
            ArrayShape::Scalar => String::new(),
            ArrayShape::Greedy => "[]".to_string(),
            ArrayShape::Fixed(count) => format!("[{count}]"),
        };
        format!("({}{array}) {marker}{}", self.ty, self.name)
    }
}

/// Logical operator joining the children of a [`Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    /// Implicit juxtaposition: every child, in order.
    And,
    /// `/`: any nonempty subset, relative order preserved.
    Or,
    /// `|`: exactly one child.
    Xor,
}

impl Combinator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        }
    }
}

/// A node of the compiled logic tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    /// Index into [`Signature::arguments`].
    Leaf(usize),
    Group(Group),
}

/// Children joined by one combinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub children: Vec<Node>,
    pub combinator: Combinator,
    /// `false` for `[...]` groups, which may resolve to absent.
    pub required: bool,
}

impl Group {
    pub fn new(children: Vec<Node>, combinator: Combinator, required: bool) -> Self {
        Self {
            children,
            combinator,
            required,
        }
    }
}

/// One compiled overload of a command.
///
/// Built by [`compile`](crate::compile); immutable afterwards.
///
/// # Examples
///
/// ```
/// use command_signature_core::{compile, Combinator};
///
/// let signature = compile("(int) count [--verbose]").unwrap();
/// assert_eq!(signature.root().combinator, Combinator::And);
/// assert_eq!(signature.arguments().len(), 2);
/// assert!(signature.argument("verbose").unwrap().is_keyword());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Signature {
    pub(crate) source: String,
    pub(crate) root: Group,
    pub(crate) arguments: Vec<ArgumentSpec>,
    #[serde(skip)]
    pub(crate) lookup: HashMap<String, usize>,
}

impl Signature {
    /// The DSL text this signature was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Arguments in declaration order.
    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    /// Resolves a name or alias to an index into [`arguments`](Self::arguments).
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Finds an argument by name or alias.
    pub fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.resolve(name).map(|index| &self.arguments[index])
    }

    /// Renders the logic tree as indented text, one node per line.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_group(&self.root, 0, &mut out);
        out
    }

    fn render_group(&self, group: &Group, depth: usize, out: &mut String) {
        let presence = if group.required { "required" } else { "optional" };
        out.push_str(&format!(
            "{}{} ({presence})\n",
            "  ".repeat(depth),
            group.combinator.symbol()
        ));
        for child in &group.children {
            match child {
                Node::Leaf(index) => {
                    out.push_str(&"  ".repeat(depth + 1));
                    out.push_str(&self.arguments[*index].usage());
                    out.push('\n');
                }
                Node::Group(inner) => self.render_group(inner, depth + 1, out),
            }
        }
    }
}

/// Two signatures are equal when their trees and argument tables are equal;
/// the source text is ignored.
impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.arguments == other.arguments
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A typed value produced by casting a token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Output of a custom type's cast function.
    Custom {
        symbol: String,
        data: serde_json::Value,
    },
    /// Array arguments.
    List(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    /// Name of the type this value was cast to.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Custom { symbol, .. } => symbol,
            Self::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
            Self::Custom { data, .. } => write!(f, "{data}"),
            Self::List(values) => {
                f.write_str("[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Successful match result: argument name to cast value.
///
/// Optional arguments that were not supplied are simply absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    command: String,
    signature: usize,
    source: String,
    values: BTreeMap<String, Value>,
}

impl Binding {
    pub(crate) fn new(
        command: &str,
        signature: usize,
        source: &str,
        values: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            command: command.to_string(),
            signature,
            source: source.to_string(),
            values,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Registration index of the signature that matched.
    pub fn signature_index(&self) -> usize {
        self.signature
    }

    /// Source text of the signature that matched.
    pub fn signature_source(&self) -> &str {
        &self.source
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> BTreeMap<String, Value> {
        self.values
    }
}
