//! Symbol table loading.
//!
//! Test titles interpolate named constants (`${ClientModules.Dashboard}`).
//! The configured symbol sources are loaded once per run and merged into a
//! single [`SymbolTable`]:
//!
//! - `.json` files: a flat object of name → string, registered under the
//!   configured symbol name; nested objects are registered under their own
//!   key.
//! - TypeScript/JavaScript modules: exported `enum` declarations, exported
//!   `const X = { ... }` objects and exported `const X = "..."` strings, each
//!   registered under its exported name. Exports may be inline
//!   (`export enum X`) or listed (`export { X, Y as Z }`). An
//!   `export default { ... }` object goes under the configured symbol name.
//!
//! Missing or unreadable sources are skipped with a warning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use tree_sitter::Node;

use crate::error::CleanerError;
use crate::syntax::{node_text, parse_typescript, string_value};

/// A resolved symbol: either a plain value or a table of members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolValue {
    /// `export const Name = "value"`.
    Text(String),
    /// An enum or object of member → value.
    Members(BTreeMap<String, String>),
}

/// All symbols usable inside interpolated titles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: BTreeMap<String, SymbolValue>,
}

impl SymbolTable {
    /// Value of `symbol.member`, if both exist.
    #[must_use]
    pub fn member(&self, symbol: &str, member: &str) -> Option<&str> {
        match self.entries.get(symbol)? {
            SymbolValue::Members(members) => members.get(member).map(String::as_str),
            SymbolValue::Text(_) => None,
        }
    }

    /// Value of a bare `name`, if it is a plain value.
    #[must_use]
    pub fn bare(&self, name: &str) -> Option<&str> {
        match self.entries.get(name)? {
            SymbolValue::Text(value) => Some(value),
            SymbolValue::Members(_) => None,
        }
    }

    fn get(&self, name: &str) -> Option<&SymbolValue> {
        self.entries.get(name)
    }

    fn insert(&mut self, name: &str, value: SymbolValue) {
        self.entries.insert(name.to_owned(), value);
    }

    /// Register (or replace) a member table.
    pub fn insert_members(&mut self, name: &str, members: BTreeMap<String, String>) {
        self.entries
            .insert(name.to_owned(), SymbolValue::Members(members));
    }

    /// Register (or replace) a plain value.
    pub fn insert_text(&mut self, name: &str, value: &str) {
        self.entries
            .insert(name.to_owned(), SymbolValue::Text(value.to_owned()));
    }

    /// Merge `other` into `self`; entries in `other` win on collision.
    pub fn merge(&mut self, other: Self) {
        for (name, value) in other.entries {
            if self.entries.insert(name.clone(), value).is_some() {
                debug!(symbol = %name, "symbol redefined by a later source");
            }
        }
    }

    /// Number of symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no symbols are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Symbol names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and merge every configured symbol source.
///
/// Sources are merged in key order; a later source overwrites symbols of the
/// same name. Sources that are missing or fail to load are skipped.
#[must_use]
pub fn load_symbols(sources: &BTreeMap<String, PathBuf>) -> SymbolTable {
    let mut table = SymbolTable::default();
    for (name, path) in sources {
        if !path.is_file() {
            warn!(symbol = %name, path = %path.display(), "symbol source not found, skipping");
            continue;
        }
        match load_source(name, path) {
            Ok(loaded) => {
                debug!(symbol = %name, path = %path.display(), count = loaded.len(), "loaded symbols");
                table.merge(loaded);
            }
            Err(e) => warn!(symbol = %name, error = %e, "failed to load symbol source, skipping"),
        }
    }
    table
}

/// Load one symbol source file.
///
/// # Errors
/// Returns [`CleanerError::Io`] if the file cannot be read and
/// [`CleanerError::Parse`] if its contents cannot be interpreted.
pub fn load_source(name: &str, path: &Path) -> Result<SymbolTable, CleanerError> {
    let text =
        std::fs::read_to_string(path).map_err(|e| CleanerError::io(path.to_owned(), e))?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let parsed = if is_json {
        parse_json_symbols(name, &text)
    } else {
        parse_module_symbols(name, &text)
    };
    parsed.map_err(|detail| CleanerError::Parse {
        path: path.to_owned(),
        detail,
    })
}

/// Interpret a JSON symbol source.
///
/// # Errors
/// Returns a description if the text is not a JSON object.
pub fn parse_json_symbols(name: &str, text: &str) -> Result<SymbolTable, String> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let serde_json::Value::Object(object) = value else {
        return Err("expected a JSON object of name/value pairs".to_owned());
    };

    let mut table = SymbolTable::default();
    let mut flat = BTreeMap::new();
    for (key, value) in object {
        match value {
            serde_json::Value::Object(nested) => {
                let members = nested
                    .into_iter()
                    .filter_map(|(k, v)| json_scalar(&v).map(|s| (k, s)))
                    .collect();
                table.insert_members(&key, members);
            }
            other => {
                if let Some(s) = json_scalar(&other) {
                    flat.insert(key, s);
                }
            }
        }
    }
    if !flat.is_empty() {
        table.insert_members(name, flat);
    }
    Ok(table)
}

fn json_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Interpret a TypeScript/JavaScript module's exported constants.
///
/// `name` is the configured symbol name; a default-exported object is
/// registered under it.
///
/// # Errors
/// Returns a description if the module does not parse.
pub fn parse_module_symbols(name: &str, text: &str) -> Result<SymbolTable, String> {
    let tree = parse_typescript(text).map_err(|e| e.detail)?;
    let root = tree.root_node();
    let mut table = SymbolTable::default();

    // Every top-level declaration, exported or not, so export lists can
    // refer back to them.
    let mut declared = SymbolTable::default();
    let mut exports = Vec::new();

    let mut cursor = root.walk();
    for item in root.named_children(&mut cursor) {
        match item.kind() {
            "export_statement" => {
                if let Some(decl) = item.child_by_field_name("declaration") {
                    collect_declaration(decl, text, &mut table);
                    collect_declaration(decl, text, &mut declared);
                } else {
                    exports.push(item);
                }
            }
            _ => collect_declaration(item, text, &mut declared),
        }
    }

    for item in exports {
        if let Some(value) = item.child_by_field_name("value") {
            default_export(name, unwrap_expression(value), text, &declared, &mut table);
        } else if item.child_by_field_name("source").is_none() {
            list_exports(item, text, &declared, &mut table);
        }
    }
    Ok(table)
}

/// `export default { ... }` or `export default Name`.
fn default_export(
    name: &str,
    value: Node<'_>,
    src: &str,
    declared: &SymbolTable,
    table: &mut SymbolTable,
) {
    match value.kind() {
        "object" => table.insert_members(name, object_members(value, src)),
        "identifier" => match declared.get(node_text(value, src)) {
            Some(found) => table.insert(name, found.clone()),
            None => debug!(symbol = %name, "default export refers to an unknown declaration"),
        },
        _ => {
            if let Some(text) = scalar_value(value, src) {
                table.insert_text(name, &text);
            }
        }
    }
}

/// `export { A, B as C };` against the module's own declarations.
fn list_exports(item: Node<'_>, src: &str, declared: &SymbolTable, table: &mut SymbolTable) {
    let mut cursor = item.walk();
    let Some(clause) = item
        .named_children(&mut cursor)
        .find(|n| n.kind() == "export_clause")
    else {
        return;
    };
    let mut cursor = clause.walk();
    for specifier in clause.named_children(&mut cursor) {
        if specifier.kind() != "export_specifier" {
            continue;
        }
        let Some(local) = specifier.child_by_field_name("name") else {
            continue;
        };
        let local = node_text(local, src);
        let exported = specifier
            .child_by_field_name("alias")
            .map_or(local, |alias| node_text(alias, src));
        match declared.get(local) {
            Some(found) => table.insert(exported, found.clone()),
            None => debug!(symbol = %local, "exported name has no declaration in this module"),
        }
    }
}

fn collect_declaration(decl: Node<'_>, src: &str, table: &mut SymbolTable) {
    match decl.kind() {
        "enum_declaration" => {
            let (Some(name), Some(body)) = (
                decl.child_by_field_name("name"),
                decl.child_by_field_name("body"),
            ) else {
                return;
            };
            table.insert_members(node_text(name, src), enum_members(body, src));
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = decl.walk();
            for declarator in decl.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let (Some(name), Some(value)) = (
                    declarator.child_by_field_name("name"),
                    declarator.child_by_field_name("value"),
                ) else {
                    continue;
                };
                if name.kind() != "identifier" {
                    continue;
                }
                let name = node_text(name, src);
                let value = unwrap_expression(value);
                if value.kind() == "object" {
                    table.insert_members(name, object_members(value, src));
                } else if let Some(text) = scalar_value(value, src) {
                    table.insert_text(name, &text);
                }
            }
        }
        _ => {}
    }
}

/// Members of an enum body. Members without an initializer continue the
/// numeric sequence from the previous numeric member.
fn enum_members(body: Node<'_>, src: &str) -> BTreeMap<String, String> {
    let mut members = BTreeMap::new();
    // `None` once the sequence runs past `i64::MAX`.
    let mut next: Option<i64> = Some(0);
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "enum_assignment" => {
                let (Some(name), Some(value)) = (
                    member.child_by_field_name("name"),
                    member.child_by_field_name("value"),
                ) else {
                    continue;
                };
                let Some(key) = property_name(name, src) else {
                    continue;
                };
                let value = unwrap_expression(value);
                if let Some(n) = integer_value(value, src) {
                    next = n.checked_add(1);
                }
                if let Some(text) = scalar_value(value, src) {
                    members.insert(key, text);
                }
            }
            "comment" => {}
            _ => {
                let Some(key) = property_name(member, src) else {
                    continue;
                };
                match next {
                    Some(n) => {
                        members.insert(key, n.to_string());
                        next = n.checked_add(1);
                    }
                    None => debug!(member = %key, "enum value out of range, skipping"),
                }
            }
        }
    }
    members
}

fn object_members(object: Node<'_>, src: &str) -> BTreeMap<String, String> {
    let mut members = BTreeMap::new();
    let mut cursor = object.walk();
    for pair in object.named_children(&mut cursor) {
        if pair.kind() != "pair" {
            continue;
        }
        let (Some(key), Some(value)) = (
            pair.child_by_field_name("key"),
            pair.child_by_field_name("value"),
        ) else {
            continue;
        };
        if let (Some(key), Some(value)) =
            (property_name(key, src), scalar_value(unwrap_expression(value), src))
        {
            members.insert(key, value);
        }
    }
    members
}

fn property_name(node: Node<'_>, src: &str) -> Option<String> {
    match node.kind() {
        "property_identifier" | "identifier" | "number" => Some(node_text(node, src).to_owned()),
        "string" => string_value(node, src),
        _ => None,
    }
}

fn scalar_value(node: Node<'_>, src: &str) -> Option<String> {
    match node.kind() {
        "string" | "template_string" => string_value(node, src),
        "number" | "true" | "false" => Some(node_text(node, src).to_owned()),
        "unary_expression" => integer_value(node, src).map(|n| n.to_string()),
        _ => None,
    }
}

/// Decimal integer literal, optionally negated (`-1`).
fn integer_value(node: Node<'_>, src: &str) -> Option<i64> {
    match node.kind() {
        "number" => node_text(node, src).parse().ok(),
        "unary_expression" => {
            let operator = node.child_by_field_name("operator")?;
            let argument = unwrap_expression(node.child_by_field_name("argument")?);
            let n = integer_value(argument, src)?;
            match node_text(operator, src) {
                "-" => n.checked_neg(),
                "+" => Some(n),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Strip `as const`, `satisfies T` and parentheses.
fn unwrap_expression(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while matches!(
        current.kind(),
        "as_expression" | "satisfies_expression" | "parenthesized_expression"
    ) {
        let mut cursor = current.walk();
        let inner = current
            .named_children(&mut cursor)
            .find(|n| n.kind() != "comment");
        match inner {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#"export enum ClientModules {
  Dashboard = "Dashboard",
  Reports = 'Reports',
  // settings live elsewhere
  "Audit Log" = `Audit Log`,
}

export enum Priority {
  Low,
  Medium = 5,
  High,
}

export const AdminModules = {
  Users: "User Management",
  "Roles": "Roles & Permissions",
} as const;

export const Release = "R7";

const Hidden = { Secret: "nope" };
enum Internal { A = "a" }
"#;

    #[test]
    fn string_enum_members() {
        let table = parse_module_symbols("Mods", MODULE).unwrap();
        assert_eq!(table.member("ClientModules", "Dashboard"), Some("Dashboard"));
        assert_eq!(table.member("ClientModules", "Reports"), Some("Reports"));
        assert_eq!(table.member("ClientModules", "Audit Log"), Some("Audit Log"));
    }

    #[test]
    fn numeric_enum_members_auto_increment() {
        let table = parse_module_symbols("Mods", MODULE).unwrap();
        assert_eq!(table.member("Priority", "Low"), Some("0"));
        assert_eq!(table.member("Priority", "Medium"), Some("5"));
        assert_eq!(table.member("Priority", "High"), Some("6"));
    }

    #[test]
    fn const_objects_and_strings() {
        let table = parse_module_symbols("Mods", MODULE).unwrap();
        assert_eq!(table.member("AdminModules", "Users"), Some("User Management"));
        assert_eq!(table.member("AdminModules", "Roles"), Some("Roles & Permissions"));
        assert_eq!(table.bare("Release"), Some("R7"));
    }

    #[test]
    fn unexported_declarations_are_ignored() {
        let table = parse_module_symbols("Mods", MODULE).unwrap();
        assert_eq!(table.member("Hidden", "Secret"), None);
        assert_eq!(table.member("Internal", "A"), None);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn broken_module_is_an_error() {
        assert!(parse_module_symbols("X", "export enum X {").is_err());
    }

    #[test]
    fn export_lists_pick_up_local_declarations() {
        let src = r#"enum ClientModules { Dashboard = "Dashboard" }
const Labels = { Login: "Login Page" };
const Hidden = "nope";
export { ClientModules, Labels as UiLabels };
export { Other } from "./other";
"#;
        let table = parse_module_symbols("Mods", src).unwrap();
        assert_eq!(table.member("ClientModules", "Dashboard"), Some("Dashboard"));
        assert_eq!(table.member("UiLabels", "Login"), Some("Login Page"));
        assert_eq!(table.member("Labels", "Login"), None);
        assert_eq!(table.bare("Hidden"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn default_export_uses_configured_name() {
        let table =
            parse_module_symbols("Modules", "export default { Dashboard: \"Dashboard\" } as const;\n")
                .unwrap();
        assert_eq!(table.member("Modules", "Dashboard"), Some("Dashboard"));

        let src = "enum Pages { Home = \"Home\" }\nexport default Pages;\n";
        let table = parse_module_symbols("Nav", src).unwrap();
        assert_eq!(table.member("Nav", "Home"), Some("Home"));
    }

    #[test]
    fn enum_numbering_stops_at_the_integer_limit() {
        let table =
            parse_module_symbols("E", "export enum E { A = 9223372036854775807, B, C = 1, D }\n")
                .unwrap();
        assert_eq!(table.member("E", "A"), Some("9223372036854775807"));
        assert_eq!(table.member("E", "B"), None);
        assert_eq!(table.member("E", "D"), Some("2"));
    }

    #[test]
    fn negative_enum_values() {
        let table = parse_module_symbols("E", "export enum E { A = -1, B, C = -(2) }\n").unwrap();
        assert_eq!(table.member("E", "A"), Some("-1"));
        assert_eq!(table.member("E", "B"), Some("0"));
        assert_eq!(table.member("E", "C"), Some("-2"));
    }

    #[test]
    fn json_flat_object_uses_configured_name() {
        let table =
            parse_json_symbols("Labels", r#"{"Login": "Login Page", "Count": 3, "Skip": null}"#)
                .unwrap();
        assert_eq!(table.member("Labels", "Login"), Some("Login Page"));
        assert_eq!(table.member("Labels", "Count"), Some("3"));
        assert_eq!(table.member("Labels", "Skip"), None);
    }

    #[test]
    fn json_nested_objects_use_their_own_key() {
        let table = parse_json_symbols(
            "ignored",
            r#"{"ClientModules": {"Dashboard": "Dashboard"}, "Version": "v2"}"#,
        )
        .unwrap();
        assert_eq!(table.member("ClientModules", "Dashboard"), Some("Dashboard"));
        assert_eq!(table.member("ignored", "Version"), Some("v2"));
    }

    #[test]
    fn json_non_object_is_an_error() {
        assert!(parse_json_symbols("X", "[1, 2]").is_err());
        assert!(parse_json_symbols("X", "{").is_err());
    }

    #[test]
    fn load_skips_missing_and_merges_later_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.ts");
        let second = dir.path().join("b.json");
        std::fs::write(&first, "export enum Mods { Home = \"Home\", Shop = \"Shop\" }\n").unwrap();
        std::fs::write(&second, r#"{"Mods": {"Home": "Homepage"}}"#).unwrap();

        let sources = BTreeMap::from([
            ("A".to_owned(), first),
            ("B".to_owned(), second),
            ("C".to_owned(), dir.path().join("missing.ts")),
        ]);
        let table = load_symbols(&sources);
        assert_eq!(table.member("Mods", "Home"), Some("Homepage"));
        assert_eq!(table.member("Mods", "Shop"), None);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Mods"]);
    }

    #[test]
    fn load_skips_unparsable_source() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();
        let table = load_symbols(&BTreeMap::from([("Bad".to_owned(), bad)]));
        assert!(table.is_empty());
    }

    #[test]
    fn member_and_bare_do_not_cross() {
        let mut table = SymbolTable::default();
        table.insert_text("Name", "value");
        table.insert_members("Group", BTreeMap::from([("A".to_owned(), "a".to_owned())]));
        assert_eq!(table.member("Name", "x"), None);
        assert_eq!(table.bare("Group"), None);
    }
}
