//! Recipe domain: which ingredients a menu item consumes, and how an order's
//! lines add up to one demand per ingredient.
//!
//! Pure logic. Storage of menu items and links lives in `larder-infra`.

pub mod demand;
pub mod menu;
pub mod order;
pub mod recipe;
pub mod resolver;

pub use demand::DemandVector;
pub use menu::{MenuItem, MenuItemId};
pub use order::OrderLine;
pub use recipe::{RecipeCatalog, RecipeLink};
pub use resolver::{RecipeResolver, ResolveError};
