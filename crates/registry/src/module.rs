//! Statically submitted addin modules.
//!
//! A module is a named function producing declaration groups. Modules are
//! collected with `inventory`, so independent crates contribute addins
//! without referencing each other; the host pulls them all in with
//! [`crate::Engine::register_modules`].

use crate::addin::Declaration;

/// A module descriptor contributing declarations at registration time.
pub struct ModuleDef {
	/// Unique module name. Modules register in name order.
	pub name: &'static str,
	/// Produces the module's declaration groups.
	pub declare: fn() -> Vec<Declaration>,
}

inventory::collect!(ModuleDef);

impl ModuleDef {
	pub const fn new(name: &'static str, declare: fn() -> Vec<Declaration>) -> Self {
		Self { name, declare }
	}
}

/// Every submitted module, sorted by name.
pub fn modules() -> Vec<&'static ModuleDef> {
	let mut modules: Vec<&'static ModuleDef> = inventory::iter::<ModuleDef>.into_iter().collect();
	modules.sort_by(|a, b| a.name.cmp(b.name));
	modules
}

/// Submits a [`ModuleDef`].
///
/// ```ignore
/// subdivision_registry::addin_module!("users", || vec![
/// 	Declaration::new("Express/Routes").with(Addin::new("Route").with_id("verifyUser")),
/// ]);
/// ```
#[macro_export]
macro_rules! addin_module {
	($name:expr, $declare:expr $(,)?) => {
		$crate::inventory::submit! {
			$crate::ModuleDef::new($name, $declare)
		}
	};
}
