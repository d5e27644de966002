//! Structural parsing of sprint files.
//!
//! The extractor does not look at syntax trees directly. It consumes a
//! [`SuiteOutline`]: the group declarations (`describe(...)`) and test
//! declarations (`it(...)`) of a file, each with its byte span, its title
//! expression and, for tests, the enclosing group. [`SuiteParser`] is the
//! seam; [`TypeScriptParser`] implements it with tree-sitter.
//!
//! # Spans
//!
//! A test declaration's span covers the whole statement (including a trailing
//! `;`) plus the whitespace and comments in front of it, back to the end of
//! the previous token. Deleting the span therefore removes clean lines. Test
//! declarations are never descended into, so spans never nest or overlap.

use std::fmt;
use std::ops::Range;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::title::{RefTarget, Reference, TitleExpression, TitlePart};

/// Callee names that open a group.
const GROUP_CALLEES: &[&str] = &["describe", "context"];

/// Callee names that declare a test.
const TEST_CALLEES: &[&str] = &["it", "specify"];

// ---------------------------------------------------------------------------
// Outline types
// ---------------------------------------------------------------------------

/// `describe`-style call: a named scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDecl {
    /// Byte range of the call expression.
    pub span: Range<usize>,
    /// Title argument, if it is a string or template literal.
    pub title: Option<TitleExpression>,
    /// Index of the enclosing group in [`SuiteOutline::groups`].
    pub parent: Option<usize>,
    /// 1-based line of the call.
    pub line: usize,
}

/// `it`-style call: one test declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestDecl {
    /// Byte range of the declaration including leading trivia.
    pub span: Range<usize>,
    /// Byte range of the callee (`it`, `it.only`, ...).
    pub callee: Range<usize>,
    /// Callee base name (`it` or `specify`).
    pub base: String,
    /// `.only` / `.skip` modifier on the callee.
    pub modifier: Modifier,
    /// Title argument, if it is a string or template literal.
    pub title: Option<TitleExpression>,
    /// Index of the innermost enclosing group in [`SuiteOutline::groups`].
    pub group: Option<usize>,
    /// True when the call is a statement of its own inside a block or at the
    /// top level, so removing it leaves the surrounding code intact. A test
    /// that is the whole body of an `if`, `else`, loop or label is not.
    pub standalone: bool,
    /// 1-based line of the call.
    pub line: usize,
}

/// Declaration variant selected by the callee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// Plain `it(...)`.
    None,
    /// Exclusive `it.only(...)`.
    Only,
    /// Inert `it.skip(...)`.
    Skip,
}

impl Modifier {
    fn from_property(name: &str) -> Option<Self> {
        match name {
            "only" => Some(Self::Only),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// The declarations found in one file, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuiteOutline {
    /// Group declarations, outer groups before inner ones.
    pub groups: Vec<GroupDecl>,
    /// Test declarations, including ones outside any group.
    pub tests: Vec<TestDecl>,
}

/// A file could not be turned into a clean syntax tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    /// Human-readable description, with the first error location.
    pub detail: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for SyntaxError {}

/// Parse-and-query interface used by the extractor.
pub trait SuiteParser {
    /// Parse `source` and list its group and test declarations.
    ///
    /// # Errors
    /// Returns [`SyntaxError`] if the source does not parse cleanly.
    fn outline(&self, source: &str) -> Result<SuiteOutline, SyntaxError>;
}

// ---------------------------------------------------------------------------
// tree-sitter implementation
// ---------------------------------------------------------------------------

/// [`SuiteParser`] for TypeScript/JavaScript test files.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypeScriptParser;

impl SuiteParser for TypeScriptParser {
    fn outline(&self, source: &str) -> Result<SuiteOutline, SyntaxError> {
        let tree = parse_typescript(source)?;
        let mut collector = Collector {
            src: source,
            outline: SuiteOutline::default(),
        };
        collector.visit(tree.root_node(), None);
        Ok(collector.outline)
    }
}

fn typescript() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

/// Parse TypeScript source, rejecting trees that contain error nodes.
///
/// # Errors
/// Returns [`SyntaxError`] if the parser cannot be set up or the tree has
/// errors; the detail names the first error position.
pub fn parse_typescript(source: &str) -> Result<Tree, SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(&typescript())
        .map_err(|e| SyntaxError {
            detail: format!("parser setup failed: {e}"),
        })?;
    let tree = parser.parse(source, None).ok_or_else(|| SyntaxError {
        detail: "parser returned no tree".to_owned(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let detail = first_error(root).map_or_else(
            || "syntax error".to_owned(),
            |node| {
                let pos = node.start_position();
                let what = if node.is_missing() {
                    format!("missing `{}`", node.kind())
                } else {
                    "syntax error".to_owned()
                };
                format!("{what} at line {}, column {}", pos.row + 1, pos.column + 1)
            },
        );
        return Err(SyntaxError { detail });
    }
    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

struct Collector<'s> {
    src: &'s str,
    outline: SuiteOutline,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Group,
    Test,
}

impl Collector<'_> {
    fn visit(&mut self, node: Node<'_>, group: Option<usize>) {
        if node.kind() == "call_expression" && self.visit_call(node, group) {
            return;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child, group);
        }
    }

    /// Record a group or test declaration. Returns false if `node` is some
    /// other call, which the caller then walks generically.
    fn visit_call(&mut self, node: Node<'_>, group: Option<usize>) -> bool {
        let Some(function) = node.child_by_field_name("function") else {
            return false;
        };
        let Some((kind, base, modifier)) = classify_callee(function, self.src) else {
            return false;
        };
        let Some(arguments) = node
            .child_by_field_name("arguments")
            .filter(|a| a.kind() == "arguments")
        else {
            return false;
        };
        let args = argument_nodes(arguments);
        let line = node.start_position().row + 1;

        match kind {
            CallKind::Group if args.len() >= 2 => {
                let index = self.outline.groups.len();
                self.outline.groups.push(GroupDecl {
                    span: node.byte_range(),
                    title: title_expression(args[0], self.src),
                    parent: group,
                    line,
                });
                for arg in &args[1..] {
                    self.visit(*arg, Some(index));
                }
                true
            }
            CallKind::Test if !args.is_empty() => {
                let statement = node
                    .parent()
                    .filter(|p| p.kind() == "expression_statement");
                let standalone = statement
                    .and_then(|s| s.parent())
                    .is_some_and(|p| matches!(p.kind(), "statement_block" | "program"));
                let anchor = statement.unwrap_or(node);
                self.outline.tests.push(TestDecl {
                    span: leading_trivia_start(anchor)..anchor.end_byte(),
                    callee: function.byte_range(),
                    base: base.to_owned(),
                    modifier,
                    title: title_expression(args[0], self.src),
                    group,
                    standalone,
                    line,
                });
                true
            }
            _ => false,
        }
    }
}

fn classify_callee<'s>(function: Node<'_>, src: &'s str) -> Option<(CallKind, &'s str, Modifier)> {
    let (name_node, modifier) = match function.kind() {
        "identifier" => (function, Modifier::None),
        "member_expression" => {
            let object = function.child_by_field_name("object")?;
            let property = function.child_by_field_name("property")?;
            if object.kind() != "identifier" {
                return None;
            }
            (object, Modifier::from_property(node_text(property, src))?)
        }
        _ => return None,
    };
    let name = node_text(name_node, src);
    if GROUP_CALLEES.contains(&name) {
        Some((CallKind::Group, name, modifier))
    } else if TEST_CALLEES.contains(&name) {
        Some((CallKind::Test, name, modifier))
    } else {
        None
    }
}

fn argument_nodes(arguments: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Start of the trivia in front of `node`: the end of the previous
/// non-comment token, or the start of the parent if there is none.
fn leading_trivia_start(node: Node<'_>) -> usize {
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        if sibling.kind() != "comment" {
            return sibling.end_byte();
        }
        prev = sibling.prev_sibling();
    }
    match node.parent() {
        Some(parent) if parent.parent().is_some() => parent.start_byte(),
        _ => 0,
    }
}

/// Source text of a node.
#[must_use]
pub fn node_text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    src.get(node.byte_range()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

/// The title expression of a string or template literal node; `None` for
/// any other expression.
#[must_use]
pub fn title_expression(node: Node<'_>, src: &str) -> Option<TitleExpression> {
    match node.kind() {
        "string" => Some(TitleExpression::Text(unescape(literal_body(node, src)))),
        "template_string" => Some(template_expression(node, src)),
        _ => None,
    }
}

/// Cooked value of a string literal or a template literal without
/// substitutions.
#[must_use]
pub fn string_value(node: Node<'_>, src: &str) -> Option<String> {
    match title_expression(node, src)? {
        TitleExpression::Text(text) => Some(text),
        TitleExpression::Template(_) => None,
    }
}

/// Text between the opening and closing quote of a literal node.
fn literal_body<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    let range = node.byte_range();
    if range.len() < 2 {
        return "";
    }
    src.get(range.start + 1..range.end - 1).unwrap_or("")
}

fn template_expression(node: Node<'_>, src: &str) -> TitleExpression {
    let range = node.byte_range();
    let body_end = range.end.saturating_sub(1);
    let mut cursor_pos = range.start + 1;
    let mut parts = Vec::new();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "template_substitution" {
            continue;
        }
        let raw = src.get(cursor_pos..child.start_byte()).unwrap_or("");
        if !raw.is_empty() {
            parts.push(TitlePart::Literal(unescape(raw)));
        }
        parts.push(TitlePart::Reference(substitution_reference(child, src)));
        cursor_pos = child.end_byte();
    }

    if parts.is_empty() {
        return TitleExpression::Text(unescape(literal_body(node, src)));
    }
    let tail = src.get(cursor_pos..body_end).unwrap_or("");
    if !tail.is_empty() {
        parts.push(TitlePart::Literal(unescape(tail)));
    }
    TitleExpression::Template(parts)
}

fn substitution_reference(substitution: Node<'_>, src: &str) -> Reference {
    let mut cursor = substitution.walk();
    let expr = substitution
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    let Some(expr) = expr else {
        return Reference::opaque("");
    };
    let source = node_text(expr, src).trim().to_owned();
    let target = match expr.kind() {
        "identifier" => RefTarget::Bare(source.clone()),
        "member_expression" => member_target(expr, src).unwrap_or(RefTarget::Opaque),
        "subscript_expression" => subscript_target(expr, src).unwrap_or(RefTarget::Opaque),
        _ => RefTarget::Opaque,
    };
    Reference { target, source }
}

fn member_target(expr: Node<'_>, src: &str) -> Option<RefTarget> {
    let object = expr.child_by_field_name("object")?;
    let property = expr.child_by_field_name("property")?;
    (object.kind() == "identifier" && property.kind() == "property_identifier").then(|| {
        RefTarget::Member {
            symbol: node_text(object, src).to_owned(),
            member: node_text(property, src).to_owned(),
        }
    })
}

fn subscript_target(expr: Node<'_>, src: &str) -> Option<RefTarget> {
    let object = expr.child_by_field_name("object")?;
    let index = expr.child_by_field_name("index")?;
    if object.kind() != "identifier" {
        return None;
    }
    Some(RefTarget::Member {
        symbol: node_text(object, src).to_owned(),
        member: string_value(index, src)?,
    })
}

/// Decode JavaScript string escape sequences.
///
/// Malformed `\x`/`\u` sequences are kept as written.
#[must_use]
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex, 2, "\\x");
            }
            Some('u') if chars.peek() == Some(&'{') => {
                chars.next();
                let hex: String = chars.by_ref().take_while(|&h| h != '}').collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u{");
                        out.push_str(&hex);
                        out.push('}');
                    }
                }
            }
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                push_code_point(&mut out, &hex, 4, "\\u");
            }
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n' | '\u{2028}' | '\u{2029}') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str, width: usize, prefix: &str) {
    let decoded = (hex.len() == width)
        .then(|| u32::from_str_radix(hex, 16).ok())
        .flatten()
        .and_then(char::from_u32);
    match decoded {
        Some(ch) => out.push(ch),
        None => {
            out.push_str(prefix);
            out.push_str(hex);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
