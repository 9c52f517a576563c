//! Backlog ordering.
//!
//! Produces the processing order used everywhere downstream: a
//! topological order of the dependency relation in which, whenever
//! several stories are ready, the one with the lowest
//! `(wave * WAVE_WEIGHT + priority, id)` goes first.
//!
//! Wave is an ordering attribute only. It never delays a story that has
//! no dependency on earlier waves.
//!
//! # Algorithm
//! Kahn's algorithm with a min-heap of ready stories.
//!
//! # Complexity
//! O((V + E) log V).
//!
//! # Reference
//! Kahn (1962), "Topological sorting of large networks"

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::error::AllocationError;
use crate::models::Story;

/// Returns indices into `stories` in processing order.
///
/// Expects a validated backlog. Unknown dependency IDs are ignored and
/// repeated dependencies count once. If a cycle prevents some stories
/// from ever becoming ready, returns [`AllocationError::CyclicDependency`]
/// listing them.
///
/// # Example
/// ```
/// use u_roadmap::models::Story;
/// use u_roadmap::ordering::ordered_ids;
///
/// let stories = vec![
///     Story::new("late", 1).with_wave(1),
///     Story::new("urgent", 1).with_priority(0),
///     Story::new("relaxed", 1).with_priority(5),
///     Story::new("blocked", 1).with_priority(0).with_dependency("relaxed"),
/// ];
/// let order = ordered_ids(&stories).unwrap();
/// assert_eq!(order, vec!["urgent", "relaxed", "blocked", "late"]);
/// ```
pub fn backlog_order(stories: &[Story]) -> Result<Vec<usize>, AllocationError> {
    let index: HashMap<&str, usize> = stories
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; stories.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); stories.len()];

    for (i, story) in stories.iter().enumerate() {
        let deps: BTreeSet<usize> = story
            .dependencies
            .iter()
            .filter_map(|d| index.get(d.as_str()).copied())
            .collect();
        in_degree[i] = deps.len();
        for dep in deps {
            dependents[dep].push(i);
        }
    }

    let mut ready: BinaryHeap<Reverse<(u64, &str, usize)>> = stories
        .iter()
        .enumerate()
        .filter(|(i, _)| in_degree[*i] == 0)
        .map(|(i, s)| Reverse((s.ordering_key(), s.id.as_str(), i)))
        .collect();

    let mut order = Vec::with_capacity(stories.len());
    while let Some(Reverse((_, _, i))) = ready.pop() {
        order.push(i);
        for &next in &dependents[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                let s = &stories[next];
                ready.push(Reverse((s.ordering_key(), s.id.as_str(), next)));
            }
        }
    }

    if order.len() < stories.len() {
        let cycle = stories
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, s)| s.id.clone())
            .collect();
        return Err(AllocationError::CyclicDependency { cycle });
    }

    Ok(order)
}

/// Story IDs in processing order.
pub fn ordered_ids(stories: &[Story]) -> Result<Vec<&str>, AllocationError> {
    Ok(backlog_order(stories)?
        .into_iter()
        .map(|i| stories[i].id.as_str())
        .collect())
}
