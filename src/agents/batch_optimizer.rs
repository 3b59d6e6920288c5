use crate::agents::dependency_graph::DependencyGraphReader;
use crate::composer::LockSnapshot;
use std::collections::HashMap;
use tracing::debug;

/// `name:version` entries that can be applied together.
pub type UpdateBatch = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Result of levelling a dependency arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelAssignment {
    pub levels: Vec<usize>,
    /// Edges ignored because they closed a cycle
    pub skipped_edges: Vec<(usize, usize)>,
}

/// Depth-first levelling over an index arena where `deps[i]` lists the nodes
/// `i` depends on. Nodes without dependencies sit at level 0; every other
/// node sits one above its highest dependency. An edge back into a node that
/// is still on the DFS stack is skipped, so cycles never stop the walk.
pub fn assign_levels(deps: &[Vec<usize>]) -> LevelAssignment {
    let n = deps.len();
    let mut state = vec![VisitState::Unvisited; n];
    let mut levels = vec![0usize; n];
    let mut skipped_edges = Vec::new();

    for root in 0..n {
        if state[root] != VisitState::Unvisited {
            continue;
        }

        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        state[root] = VisitState::InProgress;

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if top.1 < deps[node].len() {
                let dep = deps[node][top.1];
                top.1 += 1;
                match state[dep] {
                    VisitState::Unvisited => {
                        state[dep] = VisitState::InProgress;
                        stack.push((dep, 0));
                    }
                    VisitState::InProgress => skipped_edges.push((node, dep)),
                    VisitState::Done => {}
                }
                continue;
            }

            // Ancestors still on the stack are InProgress, so cycle edges drop out here
            let level = deps[node]
                .iter()
                .filter(|&&dep| state[dep] == VisitState::Done)
                .map(|&dep| levels[dep] + 1)
                .max()
                .unwrap_or(0);
            levels[node] = level;
            state[node] = VisitState::Done;
            stack.pop();
        }
    }

    LevelAssignment {
        levels,
        skipped_edges,
    }
}

/// Groups accepted updates into dependency-ordered batches.
///
/// Edges come from the *installed* requirements of each candidate, not from
/// the requirements of the version being installed.
pub struct BatchUpdateOptimizer<'a> {
    snapshot: &'a LockSnapshot,
}

impl<'a> BatchUpdateOptimizer<'a> {
    pub fn new(snapshot: &'a LockSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn optimize(&self, candidates: &[String]) -> Vec<UpdateBatch> {
        if candidates.is_empty() {
            return Vec::new();
        }
        if candidates.len() == 1 {
            return vec![candidates.to_vec()];
        }

        let deps = self.candidate_dependencies(candidates);
        if deps.iter().all(Vec::is_empty) {
            return vec![candidates.to_vec()];
        }

        let assignment = assign_levels(&deps);
        for (from, to) in &assignment.skipped_edges {
            debug!(
                from = %candidates[*from],
                to = %candidates[*to],
                "dependency cycle between candidates, ordering edge skipped"
            );
        }

        let max_level = assignment.levels.iter().copied().max().unwrap_or(0);
        let mut batches: Vec<UpdateBatch> = vec![Vec::new(); max_level + 1];
        for (candidate, level) in candidates.iter().zip(&assignment.levels) {
            batches[*level].push(candidate.clone());
        }
        batches.retain(|batch| !batch.is_empty());
        batches
    }

    /// In-scope edges: candidate `i` depends on candidate `j` when the
    /// installed copy of `i` requires `j`'s package.
    fn candidate_dependencies(&self, candidates: &[String]) -> Vec<Vec<usize>> {
        let index: HashMap<String, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (candidate_name(c).to_ascii_lowercase(), i))
            .collect();

        let graph = DependencyGraphReader::new(self.snapshot);

        candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let Some(requires) = graph.installed_requirements(candidate_name(candidate)) else {
                    return Vec::new();
                };
                let mut deps: Vec<usize> = requires
                    .keys()
                    .filter_map(|name| index.get(&name.to_ascii_lowercase()).copied())
                    .filter(|&j| j != i)
                    .collect();
                deps.sort_unstable();
                deps.dedup();
                deps
            })
            .collect()
    }
}

fn candidate_name(candidate: &str) -> &str {
    candidate
        .rsplit_once(':')
        .map(|(name, _)| name)
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::InstalledPackage;

    fn candidates(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_and_single_candidate() {
        let snapshot = LockSnapshot::default();
        let optimizer = BatchUpdateOptimizer::new(&snapshot);
        assert!(optimizer.optimize(&[]).is_empty());
        assert_eq!(
            optimizer.optimize(&candidates(&["acme/a:2.0"])),
            vec![vec!["acme/a:2.0".to_string()]]
        );
    }

    #[test]
    fn dependency_goes_first() {
        let snapshot = LockSnapshot::new(vec![
            InstalledPackage::new("a", "1.0").requiring("b", "^1.0"),
            InstalledPackage::new("b", "1.0"),
        ]);
        let batches = BatchUpdateOptimizer::new(&snapshot).optimize(&candidates(&["a:2.0", "b:2.0"]));
        assert_eq!(batches, vec![vec!["b:2.0".to_string()], vec!["a:2.0".to_string()]]);
    }

    #[test]
    fn unrelated_candidates_share_one_batch() {
        let snapshot = LockSnapshot::new(vec![
            InstalledPackage::new("acme/a", "1.0").requiring("acme/outside", "^1.0"),
            InstalledPackage::new("acme/b", "1.0"),
        ]);
        let input = candidates(&["acme/a:2.0", "acme/b:2.0", "acme/c:1.1"]);
        let batches = BatchUpdateOptimizer::new(&snapshot).optimize(&input);
        assert_eq!(batches, vec![input]);
    }

    #[test]
    fn linear_chain_yields_one_batch_per_link() {
        let snapshot = LockSnapshot::new(vec![
            InstalledPackage::new("acme/a", "1.0").requiring("acme/b", "^1.0"),
            InstalledPackage::new("acme/b", "1.0").requiring("acme/c", "^1.0"),
            InstalledPackage::new("acme/c", "1.0"),
        ]);
        let batches = BatchUpdateOptimizer::new(&snapshot)
            .optimize(&candidates(&["acme/a:2.0", "acme/b:2.0", "acme/c:2.0"]));
        assert_eq!(
            batches,
            vec![
                vec!["acme/c:2.0".to_string()],
                vec!["acme/b:2.0".to_string()],
                vec!["acme/a:2.0".to_string()],
            ]
        );
    }

    #[test]
    fn diamond_groups_siblings() {
        let snapshot = LockSnapshot::new(vec![
            InstalledPackage::new("acme/top", "1.0")
                .requiring("acme/left", "^1.0")
                .requiring("acme/right", "^1.0"),
            InstalledPackage::new("acme/left", "1.0").requiring("acme/base", "^1.0"),
            InstalledPackage::new("acme/right", "1.0").requiring("acme/base", "^1.0"),
            InstalledPackage::new("acme/base", "1.0"),
        ]);
        let batches = BatchUpdateOptimizer::new(&snapshot).optimize(&candidates(&[
            "acme/top:2.0",
            "acme/left:2.0",
            "acme/right:2.0",
            "acme/base:2.0",
        ]));
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], vec!["acme/base:2.0".to_string()]);
        assert_eq!(
            batches[1],
            vec!["acme/left:2.0".to_string(), "acme/right:2.0".to_string()]
        );
        assert_eq!(batches[2], vec!["acme/top:2.0".to_string()]);
    }

    #[test]
    fn cycle_is_skipped_not_fatal() {
        let assignment = assign_levels(&[vec![1], vec![2], vec![0]]);
        assert_eq!(assignment.skipped_edges, vec![(2, 0)]);
        assert_eq!(assignment.levels, vec![2, 1, 0]);
    }

    #[test]
    fn self_loop_and_isolated_nodes() {
        let assignment = assign_levels(&[vec![0], vec![], vec![1]]);
        assert_eq!(assignment.skipped_edges, vec![(0, 0)]);
        assert_eq!(assignment.levels, vec![0, 0, 1]);
    }

    #[test]
    fn every_candidate_lands_in_exactly_one_batch() {
        let snapshot = LockSnapshot::new(vec![
            InstalledPackage::new("acme/a", "1.0").requiring("acme/b", "^1.0"),
            InstalledPackage::new("acme/b", "1.0").requiring("acme/a", "^1.0"),
            InstalledPackage::new("acme/c", "1.0").requiring("acme/a", "^1.0"),
        ]);
        let input = candidates(&["acme/a:2.0", "acme/b:2.0", "acme/c:2.0"]);
        let batches = BatchUpdateOptimizer::new(&snapshot).optimize(&input);

        let mut flattened: Vec<String> = batches.into_iter().flatten().collect();
        flattened.sort();
        assert_eq!(flattened, input);
    }
}
