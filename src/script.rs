//! Line-oriented argument scripts.
//!
//! ```text
//! a: Socrates is mortal
//! b: assume He is a man
//! c: All men are mortal
//! x: assume b c supports a
//! y: c attacks x
//! ```
//!
//! Every statement binds a lowercase variable, either to a new claim or to a
//! relation from one or more claims to a claim or relation bound earlier.
//! Lines matching neither form are skipped.

use crate::error::{GraphError, Result};
use crate::model::{ArgumentGraph, Metadata, RelationKind, TargetRef};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static RELATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([a-z]+)\s*:\s*(assume\s+)?((?:[a-z]+\s+)+)(supports|attacks)\s+([a-z]+)$")
        .unwrap()
});
static CLAIM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([a-z]+)\s*:\s*(assume\s+)?(.+?)\s*$").unwrap());

/// Metadata key holding the variable a claim or relation was bound to.
pub const VARIABLE_KEY: &str = "variable";

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Claim {
        text: String,
    },
    Relation {
        sources: Vec<String>,
        kind: RelationKind,
        target: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Counted from 1.
    pub line: usize,
    pub variable: String,
    pub assumption: bool,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

/// Variable names mapped to what they were last bound to.
pub type Variables = BTreeMap<String, TargetRef>;

pub fn parse_script(input: &str) -> Script {
    let statements = input
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| parse_line(idx + 1, line.trim_end()))
        .collect();
    Script { statements }
}

fn parse_line(line: usize, text: &str) -> Option<Statement> {
    if let Some(caps) = RELATION_RE.captures(text) {
        let kind = match &caps[4] {
            "supports" => RelationKind::Support,
            _ => RelationKind::Attack,
        };
        return Some(Statement {
            line,
            variable: caps[1].to_string(),
            assumption: caps.get(2).is_some(),
            kind: StatementKind::Relation {
                sources: caps[3].split_whitespace().map(str::to_string).collect(),
                kind,
                target: caps[5].to_string(),
            },
        });
    }

    let caps = CLAIM_RE.captures(text)?;
    Some(Statement {
        line,
        variable: caps[1].to_string(),
        assumption: caps.get(2).is_some(),
        kind: StatementKind::Claim {
            text: caps[3].to_string(),
        },
    })
}

/// Adds the claims and relations of `script` to `graph` in statement order.
///
/// Errors carry the line of the failing statement. On error `graph` is left
/// as it was.
pub fn load_script(graph: &mut ArgumentGraph, script: &Script) -> Result<Variables> {
    let snapshot = graph.clone();
    let loaded = load_statements(graph, script);
    if loaded.is_err() {
        *graph = snapshot;
    }
    loaded
}

fn load_statements(graph: &mut ArgumentGraph, script: &Script) -> Result<Variables> {
    let mut variables = Variables::new();
    for statement in &script.statements {
        let bound = bind(graph, &variables, statement).map_err(|err| GraphError::Script {
            line: statement.line,
            source: Box::new(err),
        })?;
        if let Some(bound) = bound {
            variables.insert(statement.variable.clone(), bound);
        }
    }

    tracing::debug!(
        statements = script.statements.len(),
        variables = variables.len(),
        "loaded script"
    );
    Ok(variables)
}

fn bind(
    graph: &mut ArgumentGraph,
    variables: &Variables,
    statement: &Statement,
) -> Result<Option<TargetRef>> {
    let mut metadata = Metadata {
        assumption: statement.assumption,
        ..Metadata::default()
    };
    metadata
        .extra
        .insert(VARIABLE_KEY.to_string(), statement.variable.as_str().into());

    match &statement.kind {
        StatementKind::Claim { text } => {
            let id = graph.add_claim(text, metadata);
            Ok(Some(TargetRef::Claim(id)))
        }
        StatementKind::Relation {
            sources,
            kind,
            target,
        } => {
            let sources = sources
                .iter()
                .map(|name| match lookup(variables, name)? {
                    TargetRef::Claim(id) => Ok(id),
                    TargetRef::Relation(_) => Err(GraphError::RelationAsSource(name.clone())),
                })
                .collect::<Result<Vec<_>>>()?;
            let target = lookup(variables, target)?;
            let relation = graph.add_relation(sources, target, Some(*kind), metadata)?;
            Ok(relation.map(TargetRef::Relation))
        }
    }
}

fn lookup(variables: &Variables, name: &str) -> Result<TargetRef> {
    variables
        .get(name)
        .copied()
        .ok_or_else(|| GraphError::UnknownVariable(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::COMPOUND_TEXT;

    const SOCRATES: &str = "\
a: Socrates is mortal
b: assume He is a man

c: All men are mortal
# not a statement
x: assume b c supports a
y: c attacks x
";

    #[test]
    fn recognises_claims_and_relations() {
        let script = parse_script(SOCRATES);
        assert_eq!(script.statements.len(), 5);

        let b = &script.statements[1];
        assert_eq!((b.line, b.variable.as_str(), b.assumption), (2, "b", true));
        assert_eq!(
            b.kind,
            StatementKind::Claim {
                text: "He is a man".into()
            }
        );

        let x = &script.statements[3];
        assert_eq!((x.line, x.assumption), (6, true));
        assert_eq!(
            x.kind,
            StatementKind::Relation {
                sources: vec!["b".into(), "c".into()],
                kind: RelationKind::Support,
                target: "a".into(),
            }
        );

        let y = &script.statements[4];
        assert!(!y.assumption);
        assert!(matches!(
            y.kind,
            StatementKind::Relation {
                kind: RelationKind::Attack,
                ..
            }
        ));
    }

    #[test]
    fn trailing_whitespace_and_crlf_are_ignored() {
        let input = "a: Tweety flies  \r\nb: Tweety is a bird\r\nx: b supports a \r\n";
        let script = parse_script(input);
        assert_eq!(script.statements.len(), 3);
        assert_eq!(
            script.statements[0].kind,
            StatementKind::Claim {
                text: "Tweety flies".into()
            }
        );
        assert!(matches!(
            script.statements[2].kind,
            StatementKind::Relation { .. }
        ));
    }

    #[test]
    fn loads_compound_relations_and_relation_targets() {
        let mut graph = ArgumentGraph::new();
        let variables = load_script(&mut graph, &parse_script(SOCRATES)).unwrap();

        // Three claims plus the "&" claim; two feeders, the merged relation and y.
        assert_eq!(graph.claim_count(), 4);
        assert_eq!(graph.relation_count(), 4);

        let TargetRef::Relation(x) = variables["x"] else {
            panic!("x should be a relation");
        };
        let merged = graph.relation(x).unwrap();
        assert!(merged.metadata.merged && merged.metadata.assumption);
        assert_eq!(merged.metadata.extra[VARIABLE_KEY], "x");
        assert_eq!(graph.claim(merged.claim).unwrap().text, vec![COMPOUND_TEXT]);

        let TargetRef::Relation(y) = variables["y"] else {
            panic!("y should be a relation");
        };
        assert_eq!(graph.relation(y).unwrap().target, TargetRef::Relation(x));
        assert_eq!(graph.relation(y).unwrap().kind, Some(RelationKind::Attack));
    }

    #[test]
    fn unknown_variables_report_their_line() {
        let mut graph = ArgumentGraph::new();
        let script = parse_script("a: Tweety flies\nb: Tweety is a bird\nx: b n supports a\n");
        let err = load_script(&mut graph, &script).unwrap_err();
        assert_eq!(
            err,
            GraphError::Script {
                line: 3,
                source: Box::new(GraphError::UnknownVariable("n".into())),
            }
        );
        assert_eq!(
            err.to_string(),
            "parse error on line 3: variable \"n\" is unknown"
        );
        assert_eq!(graph.claim_count(), 0);

        let script = parse_script("a: A\nx: a supports q\n");
        assert!(matches!(
            load_script(&mut graph, &script),
            Err(GraphError::Script { line: 2, .. })
        ));
    }

    #[test]
    fn relations_cannot_be_sources() {
        let script = parse_script("a: A\nb: B\nx: b supports a\ny: x supports a\n");
        let err = load_script(&mut ArgumentGraph::new(), &script).unwrap_err();
        assert_eq!(
            err,
            GraphError::Script {
                line: 4,
                source: Box::new(GraphError::RelationAsSource("x".into())),
            }
        );
    }

    #[test]
    fn rebinding_a_variable_uses_the_latest_claim() {
        let mut graph = ArgumentGraph::new();
        let script = parse_script("a: first\na: second\nb: B\nx: b attacks a\n");
        let variables = load_script(&mut graph, &script).unwrap();
        let TargetRef::Claim(a) = variables["a"] else {
            panic!("a should be a claim");
        };
        assert_eq!(graph.claim(a).unwrap().text, vec!["second"]);
        assert_eq!(graph.incoming(a).len(), 1);
        assert_eq!(graph.claim_count(), 3);
    }
}
