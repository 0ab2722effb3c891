//! Interval-forest reconstruction.
//!
//! The request log is flat: one row per completed scope, with the nesting
//! only implied by interval containment. This module rebuilds, per user,
//! the forest of trees in which every node's interval fully contains its
//! descendants' intervals and no two sibling intervals overlap. The
//! forest is a pure function of the record list and is rebuilt from
//! scratch on every use.
//!
//! Records sharing a user id must be well-nested: pairwise disjoint or
//! one fully containing the other. Unlike the log writer, the builder
//! verifies this and refuses to produce a tree from malformed input.

use std::collections::BTreeMap;

use thiserror::Error;

use loadlane_core::{ActionRecord, UserId};

/// Two intervals of one user overlap without either containing the other.
#[derive(Debug, Error)]
#[error(
    "intervals for user {user_id} overlap without nesting: \
     `{outer_name}` [{outer_start}, {outer_end}] vs `{inner_name}` [{inner_start}, {inner_end}]"
)]
pub struct MalformedIntervalError {
    /// User whose records are malformed.
    pub user_id: UserId,
    /// Name of the earlier-starting interval.
    pub outer_name: String,
    /// Start of the earlier-starting interval.
    pub outer_start: f64,
    /// End of the earlier-starting interval.
    pub outer_end: f64,
    /// Name of the later-starting interval.
    pub inner_name: String,
    /// Start of the later-starting interval.
    pub inner_start: f64,
    /// End of the later-starting interval.
    pub inner_end: f64,
}

/// One user's reconstructed forest.
///
/// `roots` and `children` index into `records`; children are in start
/// order, as are the roots.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorForest {
    /// Owning user.
    pub user_id: UserId,
    /// This user's records, in original log order.
    pub records: Vec<ActionRecord>,
    /// Indices of trees with no containing interval.
    pub roots: Vec<usize>,
    /// For each record index, the indices of its direct children.
    pub children: Vec<Vec<usize>>,
}

impl ActorForest {
    /// Builds one user's forest with a stack sweep over the records
    /// sorted by `(start ascending, end descending)`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedIntervalError`] when two intervals overlap
    /// without either containing the other.
    pub fn build(user_id: UserId, records: Vec<ActionRecord>) -> Result<Self, MalformedIntervalError> {
        // Stable sort: at identical (start, end) the earlier log record
        // stays first and becomes the ancestor.
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| {
            records[a]
                .start
                .total_cmp(&records[b].start)
                .then(records[b].end.total_cmp(&records[a].end))
        });

        let mut roots = Vec::new();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
        let mut stack: Vec<usize> = Vec::new();

        // One extra pass with `current = None` flushes the stack at end
        // of stream.
        for pos in 0..=order.len() {
            let current = order.get(pos).copied();

            while let Some(&top) = stack.last() {
                let top_contains_current = match current {
                    None => false,
                    Some(cur) => records[top].end >= records[cur].end,
                };
                if top_contains_current {
                    break;
                }

                if let Some(cur) = current {
                    // top.end < cur.end here; containment would need
                    // cur.start >= top.end (disjoint) to be legal.
                    if records[cur].start < records[top].end {
                        let (outer, inner) = (&records[top], &records[cur]);
                        return Err(MalformedIntervalError {
                            user_id,
                            outer_name: outer.name.clone(),
                            outer_start: outer.start,
                            outer_end: outer.end,
                            inner_name: inner.name.clone(),
                            inner_start: inner.start,
                            inner_end: inner.end,
                        });
                    }
                }

                stack.pop();
                match stack.last() {
                    Some(&parent) => children[parent].push(top),
                    None => roots.push(top),
                }
            }

            if let Some(cur) = current {
                stack.push(cur);
            }
        }

        Ok(Self {
            user_id,
            records,
            roots,
            children,
        })
    }

    /// Number of swimlane rows this forest needs: deepest nesting plus
    /// one, or zero when there are no records.
    #[must_use]
    pub fn rows(&self) -> usize {
        let mut max_depth = None;
        self.walk(|_, depth| {
            max_depth = Some(max_depth.map_or(depth, |d: usize| d.max(depth)));
        });
        max_depth.map_or(0, |d| d + 1)
    }

    /// Depth-first traversal: `visit(record_index, depth)` over every
    /// root in order and every child in child order.
    pub fn walk(&self, mut visit: impl FnMut(usize, usize)) {
        for &root in &self.roots {
            self.walk_node(root, 0, &mut visit);
        }
    }

    fn walk_node(&self, index: usize, depth: usize, visit: &mut impl FnMut(usize, usize)) {
        visit(index, depth);
        for &child in &self.children[index] {
            self.walk_node(child, depth + 1, visit);
        }
    }
}

/// Partitions the record list by user and builds each user's forest,
/// ascending by user id.
///
/// # Errors
///
/// Returns [`MalformedIntervalError`] for the first user whose records
/// are not well-nested.
pub fn build_forests(records: &[ActionRecord]) -> Result<Vec<ActorForest>, MalformedIntervalError> {
    let mut by_user: BTreeMap<UserId, Vec<ActionRecord>> = BTreeMap::new();
    for record in records {
        by_user
            .entry(record.user_id)
            .or_default()
            .push(record.clone());
    }

    tracing::debug!(
        records = records.len(),
        users = by_user.len(),
        "building interval forests"
    );

    by_user
        .into_iter()
        .map(|(user_id, records)| ActorForest::build(user_id, records))
        .collect()
}
