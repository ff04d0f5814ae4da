//! Key binding table, default layouts, and first-match resolution

mod binding;
mod defaults;
mod resolver;

pub use binding::{Action, BindingTable, KeyBinding, SLOT_COUNT};
pub use defaults::{default_table, DefaultScheme};
pub use resolver::resolve;
