//! Input validation for allocation runs.
//!
//! Checks structural integrity of the backlog and the developer pool
//! before anything is scheduled. Detects:
//! - Empty and duplicate story IDs
//! - Duplicate developer IDs
//! - Story sizes off the point scale
//! - Dependencies on unknown stories
//! - Circular dependencies, including self-references
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.3 (DFS colouring)

use std::collections::{HashMap, HashSet};

use crate::error::AllocationError;
use crate::models::{Developer, Story, STORY_POINTS};

/// Validation result.
pub type ValidationResult = Result<(), Vec<AllocationError>>;

/// Validates the input of an allocation run.
///
/// Checks:
/// 1. Every story ID is non-empty and unique
/// 2. Every developer ID is unique
/// 3. Every story size is one of [`STORY_POINTS`]
/// 4. Every dependency references an existing story
/// 5. The dependency relation is acyclic
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(stories: &[Story], developers: &[Developer]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut story_ids = HashSet::new();
    for story in stories {
        if story.id.is_empty() {
            errors.push(AllocationError::EmptyStoryId);
        } else if !story_ids.insert(story.id.as_str()) {
            errors.push(AllocationError::DuplicateStory(story.id.clone()));
        }

        if !STORY_POINTS.contains(&story.size) {
            errors.push(AllocationError::InvalidStorySize {
                story: story.id.clone(),
                size: story.size,
            });
        }
    }

    let mut developer_ids = HashSet::new();
    for developer in developers {
        if !developer_ids.insert(developer.id.as_str()) {
            errors.push(AllocationError::DuplicateDeveloper(developer.id.clone()));
        }
    }

    for story in stories {
        for dep in &story.dependencies {
            if dep != &story.id && !story_ids.contains(dep.as_str()) {
                errors.push(AllocationError::UnknownDependency {
                    story: story.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    if let Err(cycle) = detect_cycle(stories) {
        errors.push(cycle);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Detects a cycle in the dependency relation.
///
/// # Algorithm
/// Depth-first traversal with a three-colour mark per story. Reaching a
/// story that is still in progress is a back edge, and the stories on the
/// traversal stack from that point on form the cycle. A story listing
/// itself as a dependency is reported as the 1-cycle `[id]`.
///
/// Dependencies on unknown IDs are skipped here; [`validate_input`]
/// reports them.
///
/// # Complexity
/// O(V + E).
pub fn detect_cycle(stories: &[Story]) -> Result<(), AllocationError> {
    let index: HashMap<&str, usize> = stories
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; stories.len()];
    let mut path: Vec<usize> = Vec::new();

    for root in 0..stories.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // Explicit stack of (story, next dependency position) keeps deep
        // chains off the call stack.
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::InProgress;
        path.push(root);

        while let Some(frame) = stack.last_mut() {
            let (node, pos) = *frame;
            let deps = &stories[node].dependencies;
            if pos == deps.len() {
                marks[node] = Mark::Done;
                stack.pop();
                path.pop();
                continue;
            }
            frame.1 += 1;

            let Some(&next) = index.get(deps[pos].as_str()) else {
                continue;
            };
            match marks[next] {
                Mark::InProgress => {
                    let from = path.iter().position(|&n| n == next).unwrap_or(0);
                    let cycle = path[from..]
                        .iter()
                        .map(|&n| stories[n].id.clone())
                        .collect();
                    return Err(AllocationError::CyclicDependency { cycle });
                }
                Mark::Unvisited => {
                    marks[next] = Mark::InProgress;
                    path.push(next);
                    stack.push((next, 0));
                }
                Mark::Done => {}
            }
        }
    }

    Ok(())
}
