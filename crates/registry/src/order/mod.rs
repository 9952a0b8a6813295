//! Order expressions and per-path order resolution.
//!
//! # Mental Model
//!
//! An addin is either *anchored* (any finite number, absent means `0`) or *chained*
//! (`>` markers followed by the id of another addin on the same path). A chained
//! addin sorts `depth` infinitesimal steps after its reference, so `">a"` lands
//! directly after `a` and `">>a"` lands after anything at `">a"`, yet both stay
//! in front of the next anchored number.
//!
//! Instead of adding a floating epsilon the resolved key is the pair
//! [`SortKey`] `(anchor, offset)`, compared lexicographically with the anchor
//! under [`f64::total_cmp`] and the offset as an exact integer.
//!
//! # Invariants
//!
//! - Every chained reference names an id declared on the same path.
//!   - Enforced in: [`resolve`] ([`crate::Error::UnresolvedReference`]).
//! - Chained references form no cycle.
//!   - Enforced in: [`resolve`] via [`graph::OrderGraph::topological`] ([`crate::Error::OrderCycle`]).
//! - A chained addin sorts strictly after its reference, whatever its declared depth.
//!   - Enforced in: [`resolve_keys`] (depth clamped to at least one).
//! - Equal keys keep registration order.
//!   - Enforced in: [`resolve`] (stable sort over insertion indices).

mod graph;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use self::graph::OrderGraph;
use crate::addin::Addin;
use crate::error::{Error, Result};

/// Marker prefix of a chained order expression.
pub const AFTER_MARKER: char = '>';

/// Ordering constraint of an addin.
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
	/// Numeric order; lower sorts first. Fractions are allowed.
	Anchored(f64),
	/// `depth` steps after the addin whose id is `target`. Resolution treats a depth of zero as one.
	After { target: String, depth: u32 },
}

impl Order {
	/// Directly after `target` (`">target"`).
	pub fn after(target: impl Into<String>) -> Self {
		Self::after_n(target, 1)
	}

	/// `depth` steps after `target`. A depth of zero is treated as one.
	pub fn after_n(target: impl Into<String>, depth: u32) -> Self {
		Self::After {
			target: target.into(),
			depth: depth.max(1),
		}
	}

	pub fn is_chained(&self) -> bool {
		matches!(self, Self::After { .. })
	}
}

impl Default for Order {
	fn default() -> Self {
		Self::Anchored(0.0)
	}
}

impl From<f64> for Order {
	fn from(value: f64) -> Self {
		Self::Anchored(value)
	}
}

impl From<i64> for Order {
	fn from(value: i64) -> Self {
		Self::Anchored(value as f64)
	}
}

impl From<i32> for Order {
	fn from(value: i32) -> Self {
		Self::Anchored(value.into())
	}
}

fn finite(value: f64) -> Option<f64> {
	value.is_finite().then_some(value)
}

impl FromStr for Order {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let expr = s.trim();
		let target = expr.trim_start_matches(AFTER_MARKER);
		let depth = expr.len() - target.len();

		if depth == 0 {
			return expr
				.parse::<f64>()
				.ok()
				.and_then(finite)
				.map(Self::Anchored)
				.ok_or_else(|| Error::InvalidOrder {
					expr: s.to_string(),
					reason: "expected a finite number or a `>` reference",
				});
		}

		let target = target.trim();
		if target.is_empty() {
			return Err(Error::InvalidOrder {
				expr: s.to_string(),
				reason: "missing reference id after `>`",
			});
		}
		let depth = u32::try_from(depth).map_err(|_| Error::InvalidOrder {
			expr: s.to_string(),
			reason: "too many `>` markers",
		})?;

		Ok(Self::After {
			target: target.to_string(),
			depth,
		})
	}
}

impl fmt::Display for Order {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Anchored(value) => write!(f, "{value}"),
			Self::After { target, depth } => {
				for _ in 0..*depth {
					write!(f, "{AFTER_MARKER}")?;
				}
				write!(f, "{target}")
			}
		}
	}
}

impl Serialize for Order {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		match self {
			Self::Anchored(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => serializer.serialize_i64(*value as i64),
			Self::Anchored(value) => serializer.serialize_f64(*value),
			Self::After { .. } => serializer.collect_str(self),
		}
	}
}

impl<'de> Deserialize<'de> for Order {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		struct OrderVisitor;

		impl Visitor<'_> for OrderVisitor {
			type Value = Order;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a numeric order or a `>id` reference")
			}

			fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Order, E> {
				Ok(Order::Anchored(v as f64))
			}

			fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Order, E> {
				Ok(Order::Anchored(v as f64))
			}

			fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Order, E> {
				finite(v)
					.map(Order::Anchored)
					.ok_or_else(|| E::custom(format_args!("order {v} is not a finite number")))
			}

			fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Order, E> {
				v.parse().map_err(E::custom)
			}

			fn visit_unit<E: de::Error>(self) -> std::result::Result<Order, E> {
				Ok(Order::default())
			}

			fn visit_none<E: de::Error>(self) -> std::result::Result<Order, E> {
				Ok(Order::default())
			}
		}

		deserializer.deserialize_any(OrderVisitor)
	}
}

/// Resolved sort key: `anchor + offset * epsilon`, with the epsilon kept symbolic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortKey {
	pub anchor: f64,
	pub offset: u64,
}

impl SortKey {
	/// Key of an anchored addin. `-0.0` is folded into `0.0` so both compare equal.
	pub fn anchored(anchor: f64) -> Self {
		Self {
			anchor: anchor + 0.0,
			offset: 0,
		}
	}
}

impl Ord for SortKey {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.anchor
			.total_cmp(&other.anchor)
			.then(self.offset.cmp(&other.offset))
	}
}

impl PartialOrd for SortKey {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for SortKey {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other).is_eq()
	}
}

impl Eq for SortKey {}

/// Produces the total order of one path's addins.
///
/// `addins` must be in registration order; the result is a fresh vector every call.
pub fn resolve(path: &str, addins: &[Arc<Addin>]) -> Result<Vec<Arc<Addin>>> {
	let keys = resolve_keys(path, addins)?;
	let mut indices: Vec<usize> = (0..addins.len()).collect();
	indices.sort_by_key(|&idx| keys[idx]);

	tracing::trace!(
		path,
		order = ?indices.iter().map(|&idx| addins[idx].describe(idx)).collect::<Vec<_>>(),
		"resolved addin order"
	);

	Ok(indices.into_iter().map(|idx| Arc::clone(&addins[idx])).collect())
}

/// Computes the [`SortKey`] of every addin, indexed like `addins`.
pub fn resolve_keys(path: &str, addins: &[Arc<Addin>]) -> Result<Vec<SortKey>> {
	let mut by_id: HashMap<&str, usize> = HashMap::with_capacity_and_hasher(addins.len(), Default::default());
	for (idx, addin) in addins.iter().enumerate() {
		if let Some(id) = addin.id()
			&& by_id.insert(id, idx).is_some()
		{
			return Err(Error::DuplicateId {
				path: path.to_string(),
				id: id.to_string(),
			});
		}
	}

	let mut graph = OrderGraph::new(addins.len());
	let mut targets: Vec<Option<usize>> = vec![None; addins.len()];
	for (idx, addin) in addins.iter().enumerate() {
		if let Order::After { target, .. } = &addin.order {
			let Some(&target_idx) = by_id.get(target.as_str()) else {
				return Err(Error::UnresolvedReference {
					path: path.to_string(),
					addin: addin.describe(idx),
					target: target.clone(),
				});
			};
			graph.add_edge(target_idx, idx);
			targets[idx] = Some(target_idx);
		}
	}

	let topo = graph.topological().map_err(|stuck| Error::OrderCycle {
		path: path.to_string(),
		members: cycle_members(&stuck, &targets)
			.into_iter()
			.map(|idx| addins[idx].describe(idx))
			.collect(),
	})?;

	let mut keys = vec![SortKey::default(); addins.len()];
	for idx in topo {
		keys[idx] = match (&addins[idx].order, targets[idx]) {
			(Order::After { depth, .. }, Some(target_idx)) => {
				let base = keys[target_idx];
				SortKey {
					anchor: base.anchor,
					offset: base.offset + u64::from((*depth).max(1)),
				}
			}
			(Order::Anchored(value), _) => SortKey::anchored(*value),
			(Order::After { .. }, None) => unreachable!("chained addin without a resolved target"),
		};
	}

	Ok(keys)
}

/// Extracts one actual cycle from the nodes Kahn's algorithm could not schedule.
///
/// Every stuck node is chained and its single target is stuck as well, so walking
/// targets from any stuck node must revisit a node. The cycle is rotated to start
/// at its lowest index and closed by repeating that node.
fn cycle_members(stuck: &[usize], targets: &[Option<usize>]) -> Vec<usize> {
	let Some(&start) = stuck.iter().min() else {
		return Vec::new();
	};

	let mut walk = Vec::new();
	let mut node = start;
	loop {
		if let Some(pos) = walk.iter().position(|&seen| seen == node) {
			let mut cycle = walk.split_off(pos);
			if let Some(min_pos) = cycle.iter().enumerate().min_by_key(|&(_, &idx)| idx).map(|(pos, _)| pos) {
				cycle.rotate_left(min_pos);
			}
			if let Some(&first) = cycle.first() {
				cycle.push(first);
			}
			return cycle;
		}
		walk.push(node);
		match targets[node] {
			Some(next) => node = next,
			None => return walk,
		}
	}
}
