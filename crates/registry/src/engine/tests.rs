use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

use super::*;
use crate::order::Order;

/// Artifact of the test builders: the addin id (or type) plus any nested artifacts.
fn label(addin: &Addin) -> String {
	addin.id().unwrap_or(addin.kind()).to_string()
}

fn engine_with_labels() -> Engine<String> {
	let engine = Engine::new();
	engine.add_builder_fn("Label", |addin, _cx| Ok(label(addin))).unwrap();
	engine
		.add_builder_fn("Nest", |addin, cx| {
			let nested = addin.payload.get_str("path").unwrap_or_default();
			let children = cx.build(nested)?;
			Ok(format!("{}[{}]", label(addin), children.join(",")))
		})
		.unwrap();
	engine
}

fn labelled(id: &str, order: impl Into<Order>) -> Addin {
	Addin::new("Label").with_id(id).with_order(order)
}

#[test]
fn build_before_start_is_not_ready() {
	let engine = engine_with_labels();
	engine.register("p", labelled("a", 0)).unwrap();

	assert!(matches!(engine.build("p"), Err(Error::NotReady { operation: "build" })));
	assert!(matches!(engine.addins("p"), Err(Error::NotReady { .. })));
	assert!(matches!(engine.builder("Label"), Err(Error::NotReady { .. })));
	assert_eq!(engine.state(), LifecycleState::NotReady);
}

#[test]
fn start_is_one_way_and_closes_registration() {
	let engine = engine_with_labels();
	engine.start().unwrap();

	assert!(engine.is_ready());
	assert!(matches!(engine.start(), Err(Error::AlreadyStarted { operation: "start" })));
	assert!(matches!(
		engine.register("p", labelled("late", 0)),
		Err(Error::AlreadyStarted { operation: "register" })
	));
	assert!(engine.build("p").unwrap().is_empty());
}

#[test]
fn build_follows_resolved_order_every_time() {
	let engine = engine_with_labels();
	engine.register("Express/Routes", labelled("c", 100)).unwrap();
	engine.register("Express/Routes", Addin::new("Label").with_order(Order::after_n("doSomethingWithUser", 2))).unwrap();
	engine.register("Express/Routes", labelled("doSomethingWithUser", Order::after("verifyUser"))).unwrap();
	engine.register("Express/Routes", labelled("verifyUser", 0)).unwrap();
	engine.register("Express/Routes", labelled("b", 50)).unwrap();
	engine.start().unwrap();

	let first = engine.build("Express/Routes").unwrap();
	assert_eq!(first, ["verifyUser", "doSomethingWithUser", "Label", "b", "c"]);
	assert_eq!(engine.build("Express/Routes").unwrap(), first);

	let resolved: Vec<String> = engine.addins("Express/Routes").unwrap().iter().map(|a| label(a)).collect();
	assert_eq!(resolved, first);

	let declared: Vec<String> = engine.declared("Express/Routes").unwrap().iter().map(|a| label(a)).collect();
	assert_eq!(declared, ["c", "Label", "doSomethingWithUser", "verifyUser", "b"]);
}

#[test]
fn empty_path_builds_nothing() {
	let engine = engine_with_labels();
	engine.start().unwrap();
	assert_eq!(engine.build("nothing/here").unwrap(), Vec::<String>::new());
}

#[test]
fn unknown_type_fails_before_any_builder_runs() {
	let calls = Arc::new(AtomicUsize::new(0));
	let engine: Engine<String> = Engine::new();
	let counter = Arc::clone(&calls);
	engine
		.add_builder_fn("Counted", move |addin, _cx| {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(label(addin))
		})
		.unwrap();
	engine.register("p", Addin::new("Counted").with_order(0)).unwrap();
	engine.register("p", Addin::new("Mystery").with_order(1)).unwrap();
	engine.start().unwrap();

	match engine.build("p") {
		Err(Error::UnknownType { kind }) => assert_eq!(kind, "Mystery"),
		other => panic!("expected UnknownType, got {other:?}"),
	}
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn order_errors_fail_before_any_builder_runs() {
	let calls = Arc::new(AtomicUsize::new(0));
	let engine: Engine<String> = Engine::new();
	let counter = Arc::clone(&calls);
	engine
		.add_builder_fn("Counted", move |addin, _cx| {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(label(addin))
		})
		.unwrap();
	engine.register("cycle", Addin::new("Counted").with_id("A").with_order(Order::after("B"))).unwrap();
	engine.register("cycle", Addin::new("Counted").with_id("B").with_order(Order::after("A"))).unwrap();
	engine.register("cycle", Addin::new("Counted").with_id("free")).unwrap();
	engine.register("dangling", Addin::new("Counted").with_order(Order::after("missingId"))).unwrap();
	engine.start().unwrap();

	assert!(matches!(engine.build("cycle"), Err(Error::OrderCycle { .. })));
	assert!(matches!(engine.build("dangling"), Err(Error::UnresolvedReference { .. })));
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn duplicate_id_is_rejected_at_registration() {
	let engine = engine_with_labels();
	engine.register("p", labelled("x", 0)).unwrap();
	assert!(matches!(engine.register("p", labelled("x", 1)), Err(Error::DuplicateId { .. })));
}

#[test]
fn one_builder_per_type() {
	let engine = engine_with_labels();
	match engine.add_builder_fn("Label", |_, _| Ok(String::new())) {
		Err(Error::DuplicateBuilder { kind }) => assert_eq!(kind, "Label"),
		other => panic!("expected DuplicateBuilder, got {other:?}"),
	}
	assert_eq!(engine.builder_kinds(), ["Label", "Nest"]);
}

#[test]
fn builders_can_be_added_after_start() {
	let engine: Engine<String> = Engine::new();
	engine.register("p", Addin::new("Late")).unwrap();
	engine.start().unwrap();
	assert!(matches!(engine.builder("Late"), Err(Error::UnknownType { .. })));

	engine.add_builder_fn("Late", |_, _| Ok("built".to_string())).unwrap();
	assert_eq!(engine.build("p").unwrap(), ["built"]);
}

#[test]
fn nested_paths_compose_into_trees() {
	let engine = engine_with_labels();
	engine.register("root", Addin::new("Nest").with_id("outer").with_field("path", "mid")).unwrap();
	engine.register("root", labelled("after", 10)).unwrap();
	engine.register("mid", Addin::new("Nest").with_id("inner").with_field("path", "leaf")).unwrap();
	engine.register("leaf", labelled("z", 2)).unwrap();
	engine.register("leaf", labelled("y", 1)).unwrap();
	engine.start().unwrap();

	assert_eq!(engine.build("root").unwrap(), ["outer[inner[y,z]]", "after"]);
}

#[test]
fn recursive_path_cycles_are_rejected() {
	let engine = engine_with_labels();
	engine.register("a", Addin::new("Nest").with_field("path", "b")).unwrap();
	engine.register("b", Addin::new("Nest").with_field("path", "a")).unwrap();
	engine.start().unwrap();

	match engine.build("a") {
		Err(Error::PathCycle { chain }) => assert_eq!(chain, ["a", "b", "a"]),
		other => panic!("expected PathCycle, got {other:?}"),
	}
}

#[test]
fn detached_rebuilds_of_an_active_path_are_rejected() {
	let engine = engine_with_labels();
	engine
		.add_builder_fn("Detached", |addin, cx| {
			let nested = addin.payload.get_str("path").unwrap_or_default();
			Ok(cx.engine().build(nested)?.join(","))
		})
		.unwrap();
	engine.register("a", Addin::new("Detached").with_field("path", "b")).unwrap();
	engine.register("b", Addin::new("Detached").with_field("path", "a")).unwrap();
	engine.register("c", Addin::new("Detached").with_field("path", "d")).unwrap();
	engine.register("d", Addin::new("Nest").with_field("path", "c")).unwrap();
	engine.register("leaf", labelled("x", 0)).unwrap();
	engine.register("ok", Addin::new("Detached").with_field("path", "leaf")).unwrap();
	engine.start().unwrap();

	match engine.build("a") {
		Err(Error::PathCycle { chain }) => assert_eq!(chain, ["a", "b", "a"]),
		other => panic!("expected PathCycle, got {other:?}"),
	}
	match engine.build("c") {
		Err(Error::PathCycle { chain }) => assert_eq!(chain, ["c", "d", "c"]),
		other => panic!("expected PathCycle, got {other:?}"),
	}

	// A failed build leaves nothing marked as active.
	assert_eq!(engine.build("ok").unwrap(), ["x"]);
	assert!(matches!(engine.build("b"), Err(Error::PathCycle { chain }) if chain == ["b", "a", "b"]));
}

#[test]
fn separate_engines_may_share_path_names() {
	let inner = Arc::new(engine_with_labels());
	inner.register("p", labelled("inner", 0)).unwrap();
	inner.start().unwrap();

	let outer: Engine<String> = Engine::new();
	let handle = Arc::clone(&inner);
	outer
		.add_builder_fn("Forward", move |_, _| Ok(handle.build("p")?.join(",")))
		.unwrap();
	outer.register("p", Addin::new("Forward")).unwrap();
	outer.start().unwrap();

	assert_eq!(outer.build("p").unwrap(), ["inner"]);
}

#[test]
fn context_tracks_depth_and_chain() {
	let engine: Engine<String> = Engine::new();
	engine
		.add_builder_fn("Where", |_, cx| Ok(format!("{}@{}", cx.chain().join(">"), cx.depth())))
		.unwrap();
	engine
		.add_builder_fn("Nest", |addin, cx| {
			let nested = addin.payload.get_str("path").unwrap_or_default();
			Ok(cx.build(nested)?.join(","))
		})
		.unwrap();
	engine.register("top", Addin::new("Nest").with_field("path", "child")).unwrap();
	engine.register("child", Addin::new("Where")).unwrap();
	engine.start().unwrap();

	assert_eq!(engine.build("top").unwrap(), ["top>child@1"]);
	assert_eq!(engine.build("child").unwrap(), ["child@0"]);
}

#[test]
fn builders_can_dispatch_addin_by_addin() {
	let engine = engine_with_labels();
	engine
		.add_builder_fn("Inline", |addin, cx| {
			let nested = addin.payload.get_str("path").unwrap_or_default();
			let mut parts = Vec::new();
			for child in cx.addins(nested)? {
				if child.kind() == "Label" {
					parts.push(cx.build_addin(&child)?);
				} else {
					parts.push(format!("skip:{}", child.kind()));
				}
			}
			Ok(parts.join("+"))
		})
		.unwrap();
	engine.register("host", Addin::new("Inline").with_field("path", "parts")).unwrap();
	engine.register("parts", labelled("two", 2)).unwrap();
	engine.register("parts", Addin::new("Other").with_order(1)).unwrap();
	engine.register("parts", labelled("zero", 0)).unwrap();
	engine.start().unwrap();

	assert_eq!(engine.build("host").unwrap(), ["zero+skip:Other+two"]);
}

#[derive(Debug, thiserror::Error)]
#[error("handler exploded")]
struct Exploded;

#[test]
fn builder_errors_pass_through_with_their_source() {
	let engine: Engine<String> = Engine::new();
	engine.add_builder_fn("Boom", |addin, _| Err(Error::builder(addin.kind(), Exploded))).unwrap();
	engine.register("p", Addin::new("Boom")).unwrap();
	engine.start().unwrap();

	let err = engine.build("p").unwrap_err();
	assert!(!err.is_composition_defect());
	let source = std::error::Error::source(&err).expect("builder error keeps its source");
	assert_eq!(source.to_string(), "handler exploded");
	assert!(source.downcast_ref::<Exploded>().is_some());
}

#[test]
fn register_declarations_is_atomic() {
	let engine = engine_with_labels();
	engine.register("p", labelled("taken", 0)).unwrap();

	let result = engine.register_declarations([
		Declaration::new("q").with(labelled("fine", 0)),
		Declaration::new("p").with(labelled("taken", 1)),
	]);
	assert!(matches!(result, Err(Error::DuplicateId { .. })));

	engine.start().unwrap();
	assert!(engine.build("q").unwrap().is_empty());
	assert_eq!(engine.paths().unwrap(), ["p"]);
}

crate::addin_module!("engine-tests", || vec![
	Declaration::new("engine-tests/Modules").with(Addin::new("Label").with_id("from-module")),
]);

#[test]
fn static_modules_are_registered() {
	assert!(crate::modules().iter().any(|m| m.name == "engine-tests"));

	let engine = engine_with_labels();
	engine.register_modules().unwrap();
	engine.start().unwrap();
	assert_eq!(engine.build("engine-tests/Modules").unwrap(), ["from-module"]);
}

#[tokio::test]
async fn start_after_registers_discovered_declarations() {
	let engine = engine_with_labels();
	engine.register("p", labelled("direct", 5)).unwrap();

	engine
		.start_after(async {
			Ok::<_, BoxError>(vec![
				Declaration::new("p").with(labelled("found", 1)),
				Declaration::new("q").with(labelled("other", 0)),
			])
		})
		.await
		.unwrap();

	assert!(engine.is_ready());
	assert_eq!(engine.build("p").unwrap(), ["found", "direct"]);
	assert_eq!(engine.build("q").unwrap(), ["other"]);
	assert!(matches!(
		engine.start_after(async { Ok::<_, BoxError>(Vec::new()) }).await,
		Err(Error::AlreadyStarted { .. })
	));
}

#[tokio::test]
async fn failed_discovery_rolls_back_to_not_ready() {
	let engine = engine_with_labels();
	engine.register("p", labelled("kept", 0)).unwrap();

	let err = engine
		.start_after(async { Err::<Vec<Declaration>, _>(BoxError::from("manifest unreadable")) })
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Discovery { .. }));
	assert_eq!(engine.state(), LifecycleState::NotReady);

	let err = engine
		.start_after(async { Ok::<_, BoxError>(vec![Declaration::new("p").with(labelled("kept", 1))]) })
		.await
		.unwrap_err();
	assert!(matches!(err, Error::DuplicateId { .. }));
	assert_eq!(engine.state(), LifecycleState::NotReady);

	engine.start().unwrap();
	assert_eq!(engine.build("p").unwrap(), ["kept"]);
}

#[tokio::test]
async fn registration_is_closed_while_discovery_runs() {
	let engine = engine_with_labels();
	let (tx, rx) = tokio::sync::oneshot::channel::<Vec<Declaration>>();

	let start = engine.start_after(async { rx.await.map_err(BoxError::from) });
	let during = async {
		tokio::task::yield_now().await;
		assert_eq!(engine.state(), LifecycleState::Starting);
		assert!(matches!(engine.register("p", labelled("racer", 0)), Err(Error::AlreadyStarted { .. })));
		tx.send(vec![Declaration::new("p").with(labelled("discovered", 0))]).unwrap();
	};

	let (started, ()) = tokio::join!(start, during);
	started.unwrap();
	assert_eq!(engine.build("p").unwrap(), ["discovered"]);
}
