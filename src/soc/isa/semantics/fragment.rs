//! Text generators for program instructions.
//!
//! Each helper returns a source fragment; composing them yields statements for
//! [`Program::instructions`](super::program::Program). Identifiers that cannot be written with
//! dot syntax fall back to bracket indexing with a quoted key, so any property name is
//! expressible.

/// Root of the machine context inside a program.
pub const CONTEXT: &str = "ctx";
/// Root of the decoded operand array inside a program.
pub const OPERANDS: &str = "ops";

const KEYWORDS: [&str; 5] = ["if", "else", "new", "true", "false"];

/// A literal value renderable by [`con`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(i64),
    Bool(bool),
    Str(String),
}

macro_rules! int_constant {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Constant {
            fn from(value: $ty) -> Self {
                Constant::Int(i64::from(value))
            }
        })*
    };
}

int_constant!(u8, u16, u32, i8, i16, i32, i64);

impl From<bool> for Constant {
    fn from(value: bool) -> Self {
        Constant::Bool(value)
    }
}

impl From<&str> for Constant {
    fn from(value: &str) -> Self {
        Constant::Str(value.to_string())
    }
}

impl From<String> for Constant {
    fn from(value: String) -> Self {
        Constant::Str(value)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Canonical non-negative integer text, as used for array positions.
fn as_index(prop: &str) -> Option<i64> {
    let canonical = !prop.is_empty()
        && prop.bytes().all(|b| b.is_ascii_digit())
        && (prop == "0" || !prop.starts_with('0'));
    if canonical { prop.parse().ok() } else { None }
}

/// `base.a.b`, `base[3]`, or `base["odd name"]` per property.
pub fn reference<I>(base: &str, props: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut text = base.to_string();
    for prop in props {
        let prop = prop.as_ref();
        if let Some(index) = as_index(prop) {
            text.push_str(&format!("[{index}]"));
        } else if is_identifier(prop) && !is_keyword(prop) {
            text.push('.');
            text.push_str(prop);
        } else {
            text.push('[');
            text.push_str(&quote(prop));
            text.push(']');
        }
    }
    text
}

/// `base[index]` with a computed index expression.
pub fn subscript(base: &str, index: &str) -> String {
    format!("{base}[{index}]")
}

pub fn assign(target: &str, value: &str) -> String {
    format!("{target} = {value}")
}

/// Reference to a library binding; `lib("add8")` is `$add8`.
pub fn lib(name: &str) -> String {
    format!("${name}")
}

pub fn call<I>(callee: &str, args: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    format!("{callee}({})", join_args(args))
}

pub fn construct<I>(class: &str, args: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    format!("new {class}({})", join_args(args))
}

pub fn con(value: impl Into<Constant>) -> String {
    match value.into() {
        Constant::Int(i64::MIN) => "(-9223372036854775807 - 1)".into(),
        Constant::Int(value) if value < 0 => format!("({value})"),
        Constant::Int(value) => value.to_string(),
        Constant::Bool(value) => value.to_string(),
        Constant::Str(value) => quote(&value),
    }
}

/// Double-quoted string literal with escapes the lexer understands.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            ch if ch.is_control() => quoted.push_str(&format!("\\u{{{:x}}}", ch as u32)),
            ch => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

fn join_args<I>(args: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    args.into_iter()
        .map(|arg| arg.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
