pub mod compatibility_service;
pub mod outfit_service;
pub mod recipe_service;

pub use compatibility_service::CompatibilityService;
pub use outfit_service::{OutfitError, OutfitService};
pub use recipe_service::{RecipeError, RecipeService};
