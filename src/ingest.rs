//! Loading parser output into an [`ArgumentGraph`].
//!
//! A payload lists claims and relations under payload-local ids. Relations
//! may target relations, so they are added once their target exists:
//! claim-targeted relations first, then relation-targeted ones in rounds.

use crate::error::{GraphError, Result};
use crate::model::{ArgumentGraph, ClaimId, Metadata, RelationId, RelationKind, TargetRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Id of a claim or relation inside a payload. Numbers sort before strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadId {
    Number(i64),
    Text(String),
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadId::Number(n) => write!(f, "{n}"),
            PayloadId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PayloadId {
    fn from(value: i64) -> Self {
        PayloadId::Number(value)
    }
}

impl From<&str> for PayloadId {
    fn from(value: &str) -> Self {
        PayloadId::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEntry {
    pub id: PayloadId,
    pub text: String,
    #[serde(default)]
    pub assumption: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// `{"cls": "claim" | "relation", "id": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub cls: String,
    pub id: PayloadId,
}

impl Reference {
    pub fn claim(id: impl Into<PayloadId>) -> Self {
        Self {
            cls: "claim".to_string(),
            id: id.into(),
        }
    }

    pub fn relation(id: impl Into<PayloadId>) -> Self {
        Self {
            cls: "relation".to_string(),
            id: id.into(),
        }
    }

    fn targets_claim(&self) -> bool {
        self.cls == "claim"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEntry {
    pub id: PayloadId,
    pub sources: Vec<Reference>,
    pub target: Reference,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub assumption: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub claims: Vec<ClaimEntry>,
    #[serde(default)]
    pub relations: Vec<RelationEntry>,
}

/// Either a bare payload or a parse result wrapping it in `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadDocument {
    Wrapped { data: Payload },
    Bare(Payload),
}

impl From<PayloadDocument> for Payload {
    fn from(document: PayloadDocument) -> Self {
        match document {
            PayloadDocument::Wrapped { data } => data,
            PayloadDocument::Bare(payload) => payload,
        }
    }
}

/// Parses strict JSON, falling back to JSON5 for hand-written files.
pub fn parse_payload(input: &str) -> anyhow::Result<Payload> {
    match serde_json::from_str::<PayloadDocument>(input) {
        Ok(document) => Ok(document.into()),
        Err(json_err) => match json5::from_str::<PayloadDocument>(input) {
            Ok(document) => Ok(document.into()),
            Err(json5_err) => Err(anyhow::anyhow!(
                "invalid payload: {json_err} (as JSON5: {json5_err})"
            )),
        },
    }
}

/// Payload ids mapped to the handles they were loaded as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingested {
    pub claims: BTreeMap<PayloadId, ClaimId>,
    pub relations: BTreeMap<PayloadId, RelationId>,
}

impl Ingested {
    fn resolve_source(&self, source: &Reference) -> Result<ClaimId> {
        match source.cls.as_str() {
            "claim" => self.claims.get(&source.id).copied().ok_or_else(|| unknown(source)),
            other => Err(GraphError::UnknownClass(other.to_string())),
        }
    }

    fn resolve_target(&self, target: &Reference) -> Result<TargetRef> {
        match target.cls.as_str() {
            "claim" => self
                .claims
                .get(&target.id)
                .map(|id| TargetRef::Claim(*id))
                .ok_or_else(|| unknown(target)),
            "relation" => self
                .relations
                .get(&target.id)
                .map(|id| TargetRef::Relation(*id))
                .ok_or_else(|| unknown(target)),
            other => Err(GraphError::UnknownClass(other.to_string())),
        }
    }
}

fn unknown(reference: &Reference) -> GraphError {
    GraphError::UnknownReference {
        cls: reference.cls.clone(),
        id: reference.id.to_string(),
    }
}

/// Adds every claim and relation of `payload` to `graph`.
///
/// A relation with no sources adds nothing, so relations targeting it fail
/// with `UnknownReference`. A later claim with an already-used id replaces
/// the earlier one in the returned map. On error `graph` is left as it was.
pub fn load_payload(graph: &mut ArgumentGraph, payload: &Payload) -> Result<Ingested> {
    let snapshot = graph.clone();
    let loaded = load_entries(graph, payload);
    if loaded.is_err() {
        *graph = snapshot;
    }
    loaded
}

fn load_entries(graph: &mut ArgumentGraph, payload: &Payload) -> Result<Ingested> {
    let mut ingested = Ingested::default();

    for entry in &payload.claims {
        let metadata = Metadata {
            assumption: entry.assumption,
            scope: entry.scope.clone(),
            ..Metadata::default()
        };
        let id = graph.add_claim(&entry.text, metadata);
        ingested.claims.insert(entry.id.clone(), id);
    }

    let (mut pending, relation_targeted): (Vec<&RelationEntry>, Vec<&RelationEntry>) = payload
        .relations
        .iter()
        .partition(|entry| entry.target.targets_claim());
    pending.extend(relation_targeted);

    // A relation waiting on another pending relation is retried next round.
    // A round that adds nothing means the rest can never resolve.
    while !pending.is_empty() {
        let waiting: Vec<&PayloadId> = pending.iter().map(|entry| &entry.id).collect();
        let mut deferred = Vec::new();
        for entry in &pending {
            let blocked = entry.target.cls == "relation"
                && !ingested.relations.contains_key(&entry.target.id)
                && waiting.contains(&&entry.target.id);
            if blocked {
                deferred.push(*entry);
            } else {
                add_entry(graph, &mut ingested, entry)?;
            }
        }
        if deferred.len() == pending.len() {
            return Err(unknown(&deferred[0].target));
        }
        pending = deferred;
    }

    tracing::debug!(
        claims = ingested.claims.len(),
        relations = ingested.relations.len(),
        "ingested payload"
    );
    Ok(ingested)
}

fn add_entry(
    graph: &mut ArgumentGraph,
    ingested: &mut Ingested,
    entry: &RelationEntry,
) -> Result<()> {
    let mut sources: Vec<&Reference> = entry.sources.iter().collect();
    sources.sort_by(|a, b| a.id.cmp(&b.id));
    let sources = sources
        .into_iter()
        .map(|source| ingested.resolve_source(source))
        .collect::<Result<Vec<_>>>()?;
    let target = ingested.resolve_target(&entry.target)?;

    if ingested.relations.contains_key(&entry.id) {
        return Err(GraphError::DuplicateRelation(entry.id.to_string()));
    }

    let kind = entry.kind.as_deref().and_then(|token| {
        let kind = RelationKind::from_token(token);
        if kind.is_none() {
            tracing::warn!(
                relation = %entry.id,
                token,
                "unknown relation type, drawing as neutral"
            );
        }
        kind
    });
    let metadata = Metadata {
        assumption: entry.assumption,
        ..Metadata::default()
    };

    if let Some(id) = graph.add_relation(sources, target, kind, metadata)? {
        ingested.relations.insert(entry.id.clone(), id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::COMPOUND_TEXT;

    const SOCRATES: &str = r#"{
        "claims": [
            {"id": 1, "text": "Socrates is mortal"},
            {"id": 2, "text": "Socrates is a man"},
            {"id": 3, "text": "Men are mortal", "assumption": true}
        ],
        "relations": [
            {"id": 10, "sources": [{"cls": "claim", "id": 3}, {"cls": "claim", "id": 2}],
             "target": {"cls": "claim", "id": 1}, "type": "support"}
        ]
    }"#;

    fn claim_entry(id: i64, text: &str) -> ClaimEntry {
        ClaimEntry {
            id: PayloadId::Number(id),
            text: text.to_string(),
            assumption: false,
            scope: None,
        }
    }

    #[test]
    fn parses_bare_and_wrapped_payloads() {
        let bare = parse_payload(SOCRATES).unwrap();
        assert_eq!(bare.claims.len(), 3);
        assert_eq!(bare.relations[0].kind.as_deref(), Some("support"));

        let wrapped = parse_payload(&format!("{{\"data\": {SOCRATES}}}")).unwrap();
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn falls_back_to_json5() {
        let payload = parse_payload(
            "{claims: [{id: 'a', text: 'Hi',},], relations: [], // trailing\n}",
        )
        .unwrap();
        assert_eq!(payload.claims[0].id, PayloadId::from("a"));
        assert!(parse_payload("{claims: [").is_err());
    }

    #[test]
    fn compound_sources_are_sorted_by_id() {
        let payload = parse_payload(SOCRATES).unwrap();
        let mut graph = ArgumentGraph::new();
        let ingested = load_payload(&mut graph, &payload).unwrap();

        assert_eq!(graph.claim_count(), 4);
        assert_eq!(graph.relation_count(), 3);
        let man = ingested.claims[&PayloadId::Number(2)];
        let men = ingested.claims[&PayloadId::Number(3)];
        let neutral: Vec<ClaimId> = graph
            .relations()
            .filter(|relation| relation.kind.is_none())
            .map(|relation| relation.claim)
            .collect();
        assert_eq!(neutral, vec![man, men]);

        let merged = graph.relation(ingested.relations[&PayloadId::Number(10)]).unwrap();
        assert_eq!(graph.claim(merged.claim).unwrap().text, vec![COMPOUND_TEXT]);
        assert!(graph.claim(men).unwrap().metadata.assumption);
    }

    #[test]
    fn relation_targets_resolve_in_any_order() {
        let payload = Payload {
            claims: vec![
                claim_entry(1, "a"),
                claim_entry(2, "b"),
                claim_entry(3, "c"),
                claim_entry(4, "d"),
            ],
            relations: vec![
                RelationEntry {
                    id: PayloadId::Number(7),
                    sources: vec![Reference::claim(4i64)],
                    target: Reference::relation(6i64),
                    kind: Some("attack".into()),
                    assumption: false,
                },
                RelationEntry {
                    id: PayloadId::Number(6),
                    sources: vec![Reference::claim(3i64)],
                    target: Reference::relation(5i64),
                    kind: Some("attack".into()),
                    assumption: false,
                },
                RelationEntry {
                    id: PayloadId::Number(5),
                    sources: vec![Reference::claim(2i64)],
                    target: Reference::claim(1i64),
                    kind: Some("support".into()),
                    assumption: false,
                },
            ],
        };
        let mut graph = ArgumentGraph::new();
        let ingested = load_payload(&mut graph, &payload).unwrap();
        let attack = graph.relation(ingested.relations[&PayloadId::Number(7)]).unwrap();
        let attacked = ingested.relations[&PayloadId::Number(6)];
        assert_eq!(attack.target, TargetRef::Relation(attacked));
        assert_eq!(attack.kind, Some(RelationKind::Attack));
    }

    #[test]
    fn reports_bad_references() {
        let mut graph = ArgumentGraph::new();
        let missing = parse_payload(
            r#"{"claims": [{"id": 1, "text": "a"}],
                "relations": [{"id": 1, "sources": [{"cls": "claim", "id": 1}],
                  "target": {"cls": "claim", "id": 9}}]}"#,
        )
        .unwrap();
        assert_eq!(
            load_payload(&mut graph, &missing),
            Err(GraphError::UnknownReference { cls: "claim".into(), id: "9".into() })
        );

        let class = parse_payload(
            r#"{"claims": [{"id": 1, "text": "a"}],
                "relations": [{"id": 1, "sources": [{"cls": "instance", "id": 1}],
                  "target": {"cls": "claim", "id": 1}}]}"#,
        )
        .unwrap();
        assert_eq!(
            load_payload(&mut ArgumentGraph::new(), &class),
            Err(GraphError::UnknownClass("instance".into()))
        );

        let dangling = parse_payload(
            r#"{"claims": [{"id": 1, "text": "a"}],
                "relations": [{"id": 1, "sources": [{"cls": "claim", "id": 1}],
                  "target": {"cls": "relation", "id": 4}}]}"#,
        )
        .unwrap();
        assert_eq!(
            load_payload(&mut ArgumentGraph::new(), &dangling),
            Err(GraphError::UnknownReference { cls: "relation".into(), id: "4".into() })
        );
    }

    #[test]
    fn failed_load_leaves_the_graph_untouched() {
        let mut graph = ArgumentGraph::new();
        let existing = graph.add_claim("already here", Metadata::default());
        let payload = Payload {
            claims: vec![claim_entry(1, "a"), claim_entry(2, "b")],
            relations: vec![
                RelationEntry {
                    id: PayloadId::Number(1),
                    sources: vec![Reference::claim(2i64)],
                    target: Reference::claim(1i64),
                    kind: Some("support".into()),
                    assumption: false,
                },
                RelationEntry {
                    id: PayloadId::Number(2),
                    sources: vec![Reference::claim(1i64)],
                    target: Reference::claim(9i64),
                    kind: None,
                    assumption: false,
                },
            ],
        };

        assert!(load_payload(&mut graph, &payload).is_err());
        assert_eq!(graph.claim_ids(), vec![existing]);
        assert_eq!(graph.relation_count(), 0);
    }

    #[test]
    fn duplicate_relation_ids_are_rejected() {
        let payload = parse_payload(
            r#"{"claims": [{"id": 1, "text": "a"}, {"id": 2, "text": "b"}],
                "relations": [
                    {"id": 5, "sources": [{"cls": "claim", "id": 2}],
                      "target": {"cls": "claim", "id": 1}},
                    {"id": 5, "sources": [{"cls": "claim", "id": 1}],
                      "target": {"cls": "claim", "id": 2}}
                ]}"#,
        )
        .unwrap();
        assert_eq!(
            load_payload(&mut ArgumentGraph::new(), &payload),
            Err(GraphError::DuplicateRelation("5".into()))
        );
    }

    #[test]
    fn unknown_types_draw_as_neutral() {
        let payload = parse_payload(
            r#"{"claims": [{"id": 1, "text": "a"}, {"id": 2, "text": "b", "scope": "s1"}],
                "relations": [{"id": 1, "sources": [{"cls": "claim", "id": 2}],
                  "target": {"cls": "claim", "id": 1}, "type": "rebut"}]}"#,
        )
        .unwrap();
        let mut graph = ArgumentGraph::new();
        let ingested = load_payload(&mut graph, &payload).unwrap();
        let relation = graph.relation(ingested.relations[&PayloadId::Number(1)]).unwrap();
        assert_eq!(relation.kind, None);
        let b = graph.claim(ingested.claims[&PayloadId::Number(2)]).unwrap();
        assert_eq!(b.metadata.scope.as_deref(), Some("s1"));
    }
}
