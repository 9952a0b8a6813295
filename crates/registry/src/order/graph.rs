//! Dependency graph over the addins of one path.

use std::collections::VecDeque;

/// Directed graph where an edge `a -> b` means `a` must be resolved before `b`.
pub(crate) struct OrderGraph {
	dependents: Vec<Vec<usize>>,
	in_degree: Vec<usize>,
}

impl OrderGraph {
	pub(crate) fn new(nodes: usize) -> Self {
		Self {
			dependents: vec![Vec::new(); nodes],
			in_degree: vec![0; nodes],
		}
	}

	pub(crate) fn add_edge(&mut self, before: usize, after: usize) {
		self.dependents[before].push(after);
		self.in_degree[after] += 1;
	}

	/// Kahn's algorithm. Nodes with equal readiness come out in index order.
	///
	/// Returns the nodes that could not be scheduled when the graph is not acyclic:
	/// every cycle member plus everything that depends on a cycle.
	pub(crate) fn topological(&self) -> Result<Vec<usize>, Vec<usize>> {
		let mut in_degree = self.in_degree.clone();
		let mut queue: VecDeque<usize> = in_degree
			.iter()
			.enumerate()
			.filter(|&(_, &deg)| deg == 0)
			.map(|(idx, _)| idx)
			.collect();

		let mut sorted = Vec::with_capacity(in_degree.len());
		while let Some(idx) = queue.pop_front() {
			sorted.push(idx);
			for &dependent in &self.dependents[idx] {
				in_degree[dependent] -= 1;
				if in_degree[dependent] == 0 {
					queue.push_back(dependent);
				}
			}
		}

		if sorted.len() == in_degree.len() {
			Ok(sorted)
		} else {
			Err(in_degree
				.iter()
				.enumerate()
				.filter(|&(_, &deg)| deg > 0)
				.map(|(idx, _)| idx)
				.collect())
		}
	}
}
