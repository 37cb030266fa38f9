//! Client-side search and category filtering over the product list.

use crate::models::{Category, Product};
use crate::utils::contains_ignore_case;

/// Category selection, with `All` matching every product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Parse `"all"` or a category id
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Some(CategoryFilter::All)
        } else {
            Category::parse(s).map(CategoryFilter::Only)
        }
    }

    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    search: String,
    category: CategoryFilter,
}

impl CatalogFilter {
    pub fn new(search: &str, category: CategoryFilter) -> Self {
        Self {
            search: search.to_lowercase(),
            category,
        }
    }

    /// Search term matches the name or the description
    fn matches_search(&self, product: &Product) -> bool {
        contains_ignore_case(&product.name, &self.search)
            || product
                .description
                .as_ref()
                .map(|d| contains_ignore_case(d, &self.search))
                .unwrap_or(false)
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.matches_search(product) && self.category.matches(product.category)
    }

    /// Filter products, keeping their original order
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}
