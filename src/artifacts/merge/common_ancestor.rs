//! Ancestry queries over the commit graph
//!
//! The finder takes a parent-loading function, so it runs the same against
//! the object store and against the in-memory graphs used in tests.
//!
//! ## Common ancestor search
//!
//! 1. Mark every ancestor of the current commit (itself included, every
//!    parent followed).
//! 2. Walk the target's ancestors breadth-first, parents in recorded order,
//!    and stop at the first commit marked in step 1.
//!
//! The first hit is *a* common ancestor. It is the nearest one on histories
//! without earlier merges, but on a DAG with criss-cross merges it is not
//! guaranteed to be a best common ancestor.

use crate::artifacts::objects::object_id::ObjectId;
use crate::error::Result;
use bitflags::bitflags;
use std::collections::{HashMap, VecDeque};
use std::fmt;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b000;
        const VISITED_FROM_CURRENT = 0b001;
        const VISITED_FROM_TARGET = 0b010;
        const RESULT = 0b100;
    }
}

impl fmt::Debug for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(VisitState::VISITED_FROM_CURRENT) {
            flags.push("CURRENT");
        }
        if self.contains(VisitState::VISITED_FROM_TARGET) {
            flags.push("TARGET");
        }
        if self.contains(VisitState::RESULT) {
            flags.push("RESULT");
        }
        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

pub struct AncestorFinder<ParentsLoaderFn>
where
    ParentsLoaderFn: Fn(&ObjectId) -> Result<Vec<ObjectId>>,
{
    parents_loader: ParentsLoaderFn,
}

impl<ParentsLoaderFn> AncestorFinder<ParentsLoaderFn>
where
    ParentsLoaderFn: Fn(&ObjectId) -> Result<Vec<ObjectId>>,
{
    pub fn new(parents_loader: ParentsLoaderFn) -> Self {
        Self { parents_loader }
    }

    /// Whether `ancestor` is reachable from `descendant` (a commit counts as
    /// its own ancestor).
    pub fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> Result<bool> {
        let mut found = false;
        self.walk(descendant, |oid| {
            found = oid == ancestor;
            !found
        })?;

        Ok(found)
    }

    pub fn find_common_ancestor(
        &self,
        current: &ObjectId,
        target: &ObjectId,
    ) -> Result<Option<ObjectId>> {
        let mut states = HashMap::<ObjectId, VisitState>::new();

        self.walk(current, |oid| {
            states.insert(oid.clone(), VisitState::VISITED_FROM_CURRENT);
            true
        })?;

        let mut common_ancestor = None;
        self.walk(target, |oid| {
            let state = states.entry(oid.clone()).or_insert(VisitState::NONE);
            *state |= VisitState::VISITED_FROM_TARGET;
            tracing::debug!(commit = %oid, state = ?*state, "visited from target");

            if state.contains(VisitState::VISITED_FROM_CURRENT) {
                *state |= VisitState::RESULT;
                common_ancestor = Some(oid.clone());
                return false;
            }
            true
        })?;

        tracing::debug!(%current, %target, base = ?common_ancestor, "common ancestor search done");
        Ok(common_ancestor)
    }

    /// Breadth-first walk over `start` and its ancestors, each visited once.
    /// `visit` returns `false` to stop early.
    fn walk(&self, start: &ObjectId, mut visit: impl FnMut(&ObjectId) -> bool) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        let mut queue = VecDeque::from([start.clone()]);

        while let Some(oid) = queue.pop_front() {
            if !seen.insert(oid.clone()) {
                continue;
            }
            if !visit(&oid) {
                break;
            }

            queue.extend((self.parents_loader)(&oid)?);
        }

        Ok(())
    }
}
