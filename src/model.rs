use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{GraphError, Result};
use crate::geometry::{BoxGeom, Point, Rect};

/// Text of the claim synthesized to merge several sources into one relation.
pub const COMPOUND_TEXT: &str = "&";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationId(pub usize);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "claim #{}", self.0)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relation #{}", self.0)
    }
}

/// What a relation points at: a claim, or another relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "cls", content = "id", rename_all = "lowercase")]
pub enum TargetRef {
    Claim(ClaimId),
    Relation(RelationId),
}

impl From<ClaimId> for TargetRef {
    fn from(id: ClaimId) -> Self {
        TargetRef::Claim(id)
    }
}

impl From<RelationId> for TargetRef {
    fn from(id: RelationId) -> Self {
        TargetRef::Relation(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Support,
    Attack,
}

impl RelationKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "support" => Some(Self::Support),
            "attack" => Some(Self::Attack),
            _ => None,
        }
    }
}

/// Free-form data carried by claims and relations. Only the named fields
/// are interpreted by the renderer; anything else rides along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub assumption: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merged: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    pub fn assumption() -> Self {
        Self {
            assumption: true,
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Claim {
    pub id: ClaimId,
    pub text: Vec<String>,
    pub metadata: Metadata,
    pub ax: f32,
    pub ay: f32,
    pub dx: f32,
    pub dy: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl Claim {
    fn new(id: ClaimId, text: &str, metadata: Metadata) -> Self {
        Self {
            id,
            text: text.split('\n').map(str::to_string).collect(),
            metadata,
            ax: 0.0,
            ay: 0.0,
            dx: 0.0,
            dy: 0.0,
            width: None,
            height: None,
        }
    }

    pub fn x(&self) -> f32 {
        self.ax + self.dx
    }

    pub fn y(&self) -> f32 {
        self.ay + self.dy
    }

    pub fn size(&self) -> Option<(f32, f32)> {
        Some((self.width?, self.height?))
    }

    pub fn is_measured(&self) -> bool {
        self.size().is_some()
    }

    /// Drops the cached size so the next draw measures the text again.
    pub fn invalidate_size(&mut self) {
        self.width = None;
        self.height = None;
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.ax = x;
        self.ay = y;
    }

    /// Folds the drag offset into the anchor.
    pub fn commit_offset(&mut self) {
        self.ax += self.dx;
        self.ay += self.dy;
        self.dx = 0.0;
        self.dy = 0.0;
    }

    /// Effective box; unmeasured claims are zero-sized.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.x(),
            self.y(),
            self.width.unwrap_or(0.0),
            self.height.unwrap_or(0.0),
        )
    }

    pub fn center(&self) -> Point {
        let rect = self.rect();
        Point::new(rect.x + 0.5 * rect.width, rect.y + 0.5 * rect.height)
    }
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub id: RelationId,
    pub claim: ClaimId,
    pub target: TargetRef,
    pub kind: Option<RelationKind>,
    pub metadata: Metadata,
}

/// One or more source claims for `ArgumentGraph::add_relation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sources {
    One(ClaimId),
    Many(Vec<ClaimId>),
}

impl From<ClaimId> for Sources {
    fn from(id: ClaimId) -> Self {
        Sources::One(id)
    }
}

impl From<Vec<ClaimId>> for Sources {
    fn from(ids: Vec<ClaimId>) -> Self {
        Sources::Many(ids)
    }
}

impl From<&[ClaimId]> for Sources {
    fn from(ids: &[ClaimId]) -> Self {
        Sources::Many(ids.to_vec())
    }
}

impl<const N: usize> From<[ClaimId; N]> for Sources {
    fn from(ids: [ClaimId; N]) -> Self {
        Sources::Many(ids.to_vec())
    }
}

/// Relation query. Unset fields match anything; set fields must all match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationFilter {
    pub claim: Option<ClaimId>,
    pub target: Option<TargetRef>,
    pub kind: Option<RelationKind>,
}

impl RelationFilter {
    pub fn claim(id: ClaimId) -> Self {
        Self {
            claim: Some(id),
            ..Self::default()
        }
    }

    pub fn target(target: impl Into<TargetRef>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: RelationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, relation: &Relation) -> bool {
        self.claim.is_none_or(|claim| relation.claim == claim)
            && self.target.is_none_or(|target| relation.target == target)
            && self.kind.is_none_or(|kind| relation.kind == Some(kind))
    }
}

/// Handles removed by a cascading delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deleted {
    pub claims: Vec<ClaimId>,
    pub relations: Vec<RelationId>,
}

/// Claims and relations, stored by handle. Handles are never reused, so
/// map order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct ArgumentGraph {
    claims: BTreeMap<ClaimId, Claim>,
    relations: BTreeMap<RelationId, Relation>,
    next_claim: usize,
    next_relation: usize,
    revision: u64,
}

impl ArgumentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn add_claim(&mut self, text: &str, metadata: Metadata) -> ClaimId {
        let id = ClaimId(self.next_claim);
        self.next_claim += 1;
        self.claims.insert(id, Claim::new(id, text, metadata));
        self.touch();
        id
    }

    /// Adds a relation from `sources` to `target`.
    ///
    /// Several sources are first merged into a synthesized `&` claim; the
    /// returned handle is then the relation from that claim to `target`. An
    /// empty source list adds nothing and returns `None`. Every handle is
    /// checked before anything is created.
    pub fn add_relation(
        &mut self,
        sources: impl Into<Sources>,
        target: impl Into<TargetRef>,
        kind: Option<RelationKind>,
        metadata: Metadata,
    ) -> Result<Option<RelationId>> {
        let target = target.into();
        let source = match sources.into() {
            Sources::One(id) => id,
            Sources::Many(ids) => match ids.as_slice() {
                [] => return Ok(None),
                [single] => *single,
                many => {
                    for id in many {
                        self.check_source(*id)?;
                    }
                    self.check_target(target)?;

                    let compound = self.add_claim(COMPOUND_TEXT, Metadata::default());
                    for id in many {
                        self.push_relation(*id, TargetRef::Claim(compound), None, metadata.clone());
                    }
                    let merged = Metadata {
                        merged: true,
                        ..metadata
                    };
                    return Ok(Some(self.push_relation(compound, target, kind, merged)));
                }
            },
        };

        self.check_source(source)?;
        self.check_target(target)?;
        Ok(Some(self.push_relation(source, target, kind, metadata)))
    }

    fn push_relation(
        &mut self,
        claim: ClaimId,
        target: TargetRef,
        kind: Option<RelationKind>,
        metadata: Metadata,
    ) -> RelationId {
        let id = RelationId(self.next_relation);
        self.next_relation += 1;
        self.relations.insert(
            id,
            Relation {
                id,
                claim,
                target,
                kind,
                metadata,
            },
        );
        self.touch();
        id
    }

    fn check_source(&self, id: ClaimId) -> Result<()> {
        if self.claims.contains_key(&id) {
            return Ok(());
        }
        Err(GraphError::InvalidSource {
            found: self.describe_claim(id),
        })
    }

    fn check_target(&self, target: TargetRef) -> Result<()> {
        let found = match target {
            TargetRef::Claim(id) if self.claims.contains_key(&id) => return Ok(()),
            TargetRef::Relation(id) if self.relations.contains_key(&id) => return Ok(()),
            TargetRef::Claim(id) => self.describe_claim(id),
            TargetRef::Relation(id) => {
                if id.0 < self.next_relation {
                    format!("deleted {id}")
                } else {
                    format!("unknown {id}")
                }
            }
        };
        Err(GraphError::InvalidTarget { found })
    }

    fn describe_claim(&self, id: ClaimId) -> String {
        if id.0 < self.next_claim {
            format!("deleted {id}")
        } else {
            format!("unknown {id}")
        }
    }

    /// Claims that are never the source of a relation.
    pub fn find_root_claims(&self) -> Vec<ClaimId> {
        self.claims
            .keys()
            .copied()
            .filter(|id| !self.relations.values().any(|rel| rel.claim == *id))
            .collect()
    }

    /// Relations matching any of `criteria`, in insertion order.
    pub fn find_relations(&self, criteria: &[RelationFilter]) -> Vec<RelationId> {
        self.relations
            .values()
            .filter(|relation| criteria.iter().any(|filter| filter.matches(relation)))
            .map(|relation| relation.id)
            .collect()
    }

    /// Relations pointing at `target`.
    pub fn incoming(&self, target: impl Into<TargetRef>) -> Vec<RelationId> {
        self.find_relations(&[RelationFilter::target(target)])
    }

    /// Removes a claim or relation together with everything that depends on
    /// it: a claim takes every relation it is the source or target of, a
    /// relation takes every relation targeting it.
    pub fn delete(&mut self, entity: impl Into<TargetRef>) -> Deleted {
        let mut deleted = Deleted::default();
        match entity.into() {
            TargetRef::Claim(id) => self.delete_claim(id, &mut deleted),
            TargetRef::Relation(id) => self.delete_relation(id, &mut deleted),
        }
        if !deleted.claims.is_empty() || !deleted.relations.is_empty() {
            self.touch();
            tracing::debug!(
                claims = deleted.claims.len(),
                relations = deleted.relations.len(),
                "deleted entities"
            );
        }
        deleted
    }

    fn delete_claim(&mut self, id: ClaimId, deleted: &mut Deleted) {
        if self.claims.remove(&id).is_none() {
            return;
        }
        deleted.claims.push(id);

        let dependents: Vec<RelationId> = self
            .relations
            .values()
            .filter(|rel| rel.claim == id || rel.target == TargetRef::Claim(id))
            .map(|rel| rel.id)
            .collect();
        for relation in dependents {
            self.delete_relation(relation, deleted);
        }
    }

    fn delete_relation(&mut self, id: RelationId, deleted: &mut Deleted) {
        if self.relations.remove(&id).is_none() {
            return;
        }
        deleted.relations.push(id);

        let dependents = self.incoming(id);
        for relation in dependents {
            self.delete_relation(relation, deleted);
        }
    }

    pub fn claim(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.get(&id)
    }

    pub fn claim_mut(&mut self, id: ClaimId) -> Option<&mut Claim> {
        if self.claims.contains_key(&id) {
            self.touch();
        }
        self.claims.get_mut(&id)
    }

    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.get(&id)
    }

    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    pub fn claims_mut(&mut self) -> impl Iterator<Item = &mut Claim> {
        self.touch();
        self.claims.values_mut()
    }

    pub fn claim_ids(&self) -> Vec<ClaimId> {
        self.claims.keys().copied().collect()
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn contains(&self, entity: impl Into<TargetRef>) -> bool {
        match entity.into() {
            TargetRef::Claim(id) => self.claims.contains_key(&id),
            TargetRef::Relation(id) => self.relations.contains_key(&id),
        }
    }

    /// Sets the size of every claim that has none yet, using `measure` to
    /// size its text lines. Returns how many claims were measured.
    pub fn measure_claims(&mut self, mut measure: impl FnMut(&[String]) -> (f32, f32)) -> usize {
        let mut measured = 0;
        for claim in self.claims.values_mut().filter(|claim| !claim.is_measured()) {
            let (width, height) = measure(&claim.text);
            claim.width = Some(width);
            claim.height = Some(height);
            measured += 1;
        }
        if measured > 0 {
            self.touch();
        }
        measured
    }

    /// Forgets every measured size. Returns how many claims had one.
    pub fn invalidate_sizes(&mut self) -> usize {
        let mut dropped = 0;
        for claim in self.claims.values_mut().filter(|claim| claim.is_measured()) {
            claim.invalidate_size();
            dropped += 1;
        }
        if dropped > 0 {
            self.touch();
        }
        dropped
    }

    /// Top-left position of a claim or relation. A relation sits halfway
    /// between its source claim and its target.
    pub fn position(&self, entity: TargetRef) -> Option<Point> {
        match entity {
            TargetRef::Claim(id) => self.claim(id).map(|c| Point::new(c.x(), c.y())),
            TargetRef::Relation(id) => {
                let relation = self.relation(id)?;
                let from = self.position(TargetRef::Claim(relation.claim))?;
                Some(from.midpoint(self.position(relation.target)?))
            }
        }
    }

    pub fn center(&self, entity: TargetRef) -> Option<Point> {
        match entity {
            TargetRef::Claim(id) => self.claim(id).map(Claim::center),
            TargetRef::Relation(id) => {
                let relation = self.relation(id)?;
                let from = self.center(TargetRef::Claim(relation.claim))?;
                Some(from.midpoint(self.center(relation.target)?))
            }
        }
    }

    pub fn relation_center(&self, id: RelationId) -> Option<Point> {
        self.center(TargetRef::Relation(id))
    }

    /// Box used to attach lines: the claim's own box, or a 1×1 box at a
    /// relation's center.
    pub fn box_geom(&self, entity: TargetRef) -> Option<BoxGeom> {
        match entity {
            TargetRef::Claim(id) => {
                let claim = self.claim(id)?;
                let rect = claim.rect();
                Some(BoxGeom::new(claim.center(), rect.width, rect.height))
            }
            TargetRef::Relation(_) => Some(BoxGeom::new(self.center(entity)?, 1.0, 1.0)),
        }
    }

    /// Smallest rectangle enclosing every claim box.
    pub fn bounds(&self) -> Option<Rect> {
        let mut rects = self.claims.values().map(Claim::rect);
        let first = rects.next()?;
        let (mut min_x, mut min_y) = (first.x, first.y);
        let (mut max_x, mut max_y) = (first.right(), first.bottom());
        for rect in rects {
            min_x = min_x.min(rect.x);
            min_y = min_y.min(rect.y);
            max_x = max_x.max(rect.right());
            max_y = max_y.max(rect.bottom());
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}
