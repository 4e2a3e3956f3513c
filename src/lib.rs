//! # DOM Binder
//!
//! Declarative, selector-driven data binding for HTML node trees. A binder
//! pairs a template with a [`BindingSpec`] (selector → instruction), compiles
//! the spec once, and then applies it to any number of data objects.
//!
//! ```text
//! let binder = Binder::new("<tr><td class=\"name\"></td></tr>",
//!     BindingSpec::new().text("td.name", "{givenName} {familyName}"))?;
//! let row = binder.bind(json!({"givenName": "Ada", "familyName": "Lovelace"}));
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Compile once**: every selector is checked against the template at
//!    construction. Malformed specifications fail there with a [`BinderError`];
//!    nothing in `bind`/`rebind` can fail.
//!
//! 2. **Pristine reset root**: each binder keeps one deep clone of its template
//!    that is never bound or mutated. Class, style and removable attributes are
//!    restored from it before every cycle, so repeated cuts never accumulate
//!    state.
//!
//! 3. **Two modes**: cookie-cutter binders clone the populated template per
//!    `bind` and can later `rebind` an instance in place; in-place binders
//!    populate the template itself and treat `bind` and `rebind` alike.
//!
//! 4. **Post-clone properties**: in-memory property bindings (`@pty.x`) do not
//!    survive cloning, so cookie-cutter binders apply them to each clone after
//!    it is made.
//!
//! 5. **Degrade, don't fail**: a getter whose path or expression fails at bind
//!    time yields an empty value for that binding only. Warnings are opt-in via
//!    [`BindOptions`].
//!
//! 6. **Live bound data**: listeners read the bound data from the bound node at
//!    dispatch time, so they observe the most recent `rebind`.

pub mod dom;

mod binder;
mod binding_spec;
mod compile;
mod error;
mod eval;
mod expression;
mod operation;
mod options;
mod reset;
mod resolve;
mod scope;
mod value;

#[cfg(test)]
mod binder_tests;
#[cfg(test)]
mod reset_tests;

pub use binder::{Binder, BinderBuilder, Template};
pub use binding_spec::{BindingSpec, Instruction};
pub use compile::CompiledBindings;
pub use error::{BinderError, Result};
pub use eval::{EvalError, Expr};
pub use expression::DataGetter;
pub use operation::{
    BindingOperation, EventBinding, EventContext, EventHandler, OperationKind, BOUND_EVENT,
};
pub use options::{binding_defaults, set_binding_defaults, BindMode, BindOptions};
pub use reset::{ResetManager, ResetOperation};
pub use resolve::{BindingTarget, NormalizedKey, Target, TargetSelector};
pub use scope::{BindFn, Scope};
pub use value::BindValue;
