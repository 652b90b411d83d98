//! Static resolution of function call targets.
//!
//! The runtime looks functions up lazily, so a call to an unknown function only fails once
//! a rule body reaches it with matching input. Every call site is resolved up front against
//! the functions the module set defines and the runtime's builtins, the same way the runtime
//! resolves them: `data.`-qualified paths as-is, anything else relative to the calling
//! module's package. Import aliases are not consulted for calls.

use crate::module::RuleModule;
use regorus::unstable::{Lexer, Source, Token, TokenKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tfsentry_types::ids::DATA_ROOT_PREFIX;
use tracing::debug;

const KEYWORDS: &[&str] = &[
    "as", "contains", "default", "else", "every", "if", "import", "in", "not", "package", "some",
    "with",
];

/// A call site whose target is neither a defined function nor a builtin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedCall {
    pub path: String,
    pub line: u32,
    pub function: String,
}

impl fmt::Display for UnresolvedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: could not find function {}",
            self.path, self.line, self.function
        )
    }
}

#[derive(Debug, Default)]
struct CallSites {
    definitions: Vec<String>,
    calls: Vec<(String, u32)>,
}

/// Every call in `modules` that no module defines and the runtime has no builtin for.
pub fn unresolved_calls(modules: &[RuleModule]) -> Vec<UnresolvedCall> {
    let sites: Vec<(&RuleModule, CallSites)> =
        modules.iter().map(|m| (m, call_sites(m))).collect();
    let defined: BTreeSet<String> = sites
        .iter()
        .flat_map(|(module, s)| {
            s.definitions
                .iter()
                .map(move |name| format!("{}.{name}", module.package))
        })
        .collect();

    let mut builtins = BuiltinLookup::new();
    let mut unresolved = Vec::new();
    for (module, s) in &sites {
        for (function, line) in &s.calls {
            let resolved = if function.starts_with(DATA_ROOT_PREFIX) {
                defined.contains(function)
            } else {
                defined.contains(&format!("{}.{function}", module.package))
                    || builtins.exists(function)
            };
            if !resolved {
                unresolved.push(UnresolvedCall {
                    path: module.path.to_string(),
                    line: *line,
                    function: function.clone(),
                });
            }
        }
    }
    unresolved
}

/// Function heads and call sites of one module.
///
/// A head is a call-shaped name that opens a statement at nesting depth zero (or follows
/// `default`); every other call-shaped name is a call.
fn call_sites(module: &RuleModule) -> CallSites {
    let mut sites = CallSites::default();
    let tokens = match tokenize(module) {
        Ok(tokens) => tokens,
        Err(message) => {
            debug!(path = %module.path, error = %message, "skipping call resolution");
            return sites;
        }
    };

    let mut depth = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        let Token(kind, span) = &tokens[i];
        match kind {
            TokenKind::Symbol => match span.text() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            },
            TokenKind::Ident => {
                let start = i;
                let line = span.line;
                let mut name = span.text().to_string();
                while is_symbol(tokens.get(i + 1), ".")
                    && matches!(tokens.get(i + 2), Some(Token(TokenKind::Ident, _)))
                {
                    name.push('.');
                    name.push_str(tokens[i + 2].1.text());
                    i += 2;
                }

                let prev = start.checked_sub(1).map(|p| &tokens[p]);
                let called = is_symbol(tokens.get(i + 1), "(");
                if called && !is_symbol(prev, ".") && !KEYWORDS.contains(&name.as_str()) {
                    if depth == 0 && starts_statement(prev, line) {
                        sites.definitions.push(name);
                    } else {
                        sites.calls.push((name, line));
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    sites
}

fn tokenize(module: &RuleModule) -> Result<Vec<Token>, String> {
    let source = Source::from_contents(module.path.to_string(), module.source.to_string())
        .map_err(|err| format!("{err:#}"))?;
    let mut lexer = Lexer::new(&source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token().map_err(|err| format!("{err:#}"))?;
        if token.0 == TokenKind::Eof {
            return Ok(tokens);
        }
        tokens.push(token);
    }
}

fn is_symbol(token: Option<&Token>, symbol: &str) -> bool {
    matches!(token, Some(Token(TokenKind::Symbol, span)) if span.text() == symbol)
}

/// Whether a name on `line` preceded by `prev` opens a new top-level statement.
fn starts_statement(prev: Option<&Token>, line: u32) -> bool {
    let Some(Token(kind, span)) = prev else {
        return true;
    };
    match kind {
        TokenKind::Ident if span.text() == "default" => true,
        _ if span.line == line => false,
        TokenKind::Symbol => matches!(span.text(), "}" | ")" | "]"),
        TokenKind::Ident => !KEYWORDS.contains(&span.text()),
        _ => true,
    }
}

/// Asks an empty engine whether a name is a builtin, caching the answer.
struct BuiltinLookup {
    engine: regorus::Engine,
    known: BTreeMap<String, bool>,
}

impl BuiltinLookup {
    fn new() -> Self {
        Self {
            engine: regorus::Engine::new(),
            known: BTreeMap::new(),
        }
    }

    fn exists(&mut self, name: &str) -> bool {
        // Evaluating `print()` would write to stderr.
        if name == "print" {
            return true;
        }
        if let Some(known) = self.known.get(name) {
            return *known;
        }
        // No arguments: builtins reject the arity before doing any work.
        let exists = match self.engine.eval_query(format!("{name}()"), false) {
            Ok(_) => true,
            Err(err) => !format!("{err:#}").contains("could not find function"),
        };
        self.known.insert(name.to_string(), exists);
        exists
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::RegoVersion;
    use camino::Utf8Path;

    fn module(path: &str, src: &str) -> RuleModule {
        RuleModule::parse(Utf8Path::new(path), src, RegoVersion::V1).expect("parse")
    }

    const LIB: &str = r#"package lib.lines

import rego.v1

start(block) := object.get(block, ["__source", "startline"], 0)

label(block) := sprintf("line %d", [start(block)])
"#;

    #[test]
    fn heads_and_calls_are_told_apart() {
        let sites = call_sites(&module("lib.rego", LIB));
        assert_eq!(sites.definitions, vec!["start", "label"]);
        let calls: Vec<&str> = sites.calls.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(calls, vec!["object.get", "sprintf", "start"]);
        assert_eq!(sites.calls[0].1, 5);
    }

    #[test]
    fn builtins_and_defined_functions_resolve() {
        let user = module(
            "user.rego",
            r#"package checks.a

import rego.v1

deny contains msg if {
	some name
	b := input.resource.aws_s3_bucket[name]
	msg := sprintf("%s at %v", [name, data.lib.lines.start(b)])
}
"#,
        );
        assert!(unresolved_calls(&[module("lib.rego", LIB), user]).is_empty());
    }

    #[test]
    fn unknown_function_behind_input_is_reported() {
        let bad = module(
            "bad.rego",
            "package checks.bad\n\nimport rego.v1\n\ndeny contains msg if {\n\tinput.resource\n\tmsg := not_a_builtin(\"x\")\n}\n",
        );
        let unresolved = unresolved_calls(&[bad]);
        assert_eq!(
            unresolved,
            vec![UnresolvedCall {
                path: "bad.rego".to_string(),
                line: 7,
                function: "not_a_builtin".to_string(),
            }]
        );
        assert_eq!(
            unresolved[0].to_string(),
            "bad.rego:7: could not find function not_a_builtin"
        );
    }

    #[test]
    fn calls_through_import_aliases_do_not_resolve() {
        let aliased = module(
            "aliased.rego",
            "package checks.aliased\n\nimport rego.v1\n\nimport data.lib.lines\n\nx := lines.start({})\n",
        );
        let unresolved = unresolved_calls(&[module("lib.rego", LIB), aliased]);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].function, "lines.start");
    }

    #[test]
    fn missing_qualified_function_is_reported() {
        let user = module(
            "user.rego",
            "package checks.q\n\nimport rego.v1\n\nx := data.lib.lines.finish({})\n",
        );
        let unresolved = unresolved_calls(&[module("lib.rego", LIB), user]);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].function, "data.lib.lines.finish");
    }

    #[test]
    fn default_function_heads_count_as_definitions() {
        let src = "package checks.d\n\nimport rego.v1\n\ndefault f(_) := false\n\nf(x) if x == 1\n\ny := f(2)\n";
        assert!(unresolved_calls(&[module("d.rego", src)]).is_empty());
    }
}
