//! Category selection policy.

use domain::Category;

/// Maps a product descriptor to an inventory category.
///
/// A fixed, ordered keyword list: the first keyword found in the
/// descriptor (case-insensitive substring) selects the category, the
/// fallback applies when nothing matches. The mapping is configuration —
/// the orchestrator never hardcodes tier names.
#[derive(Debug, Clone)]
pub struct CategoryPolicy {
    keywords: Vec<(String, Category)>,
    fallback: Category,
}

impl CategoryPolicy {
    /// Creates a policy from an ordered keyword list and a fallback.
    pub fn new(keywords: Vec<(String, Category)>, fallback: Category) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|(keyword, category)| (keyword.to_lowercase(), category))
            .collect();
        Self { keywords, fallback }
    }

    /// Resolves the category for a product descriptor.
    pub fn resolve(&self, product: &str) -> Category {
        let product = product.to_lowercase();
        self.keywords
            .iter()
            .find(|(keyword, _)| product.contains(keyword))
            .map(|(_, category)| *category)
            .unwrap_or(self.fallback)
    }

    /// Returns the fallback category.
    pub fn fallback(&self) -> Category {
        self.fallback
    }
}

impl Default for CategoryPolicy {
    /// The store's standard tier mapping: business before pro so that
    /// "Business Pro Bundle"-style descriptors resolve to the higher tier,
    /// education as the fallback.
    fn default() -> Self {
        Self::new(
            vec![
                ("business".to_string(), Category::Business),
                ("pro".to_string(), Category::Pro),
                ("education".to_string(), Category::Education),
                ("edu".to_string(), Category::Education),
            ],
            Category::Education,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_keywords_case_insensitively() {
        let policy = CategoryPolicy::default();
        assert_eq!(policy.resolve("Copilot Pro Seat"), Category::Pro);
        assert_eq!(policy.resolve("BUSINESS plan"), Category::Business);
        assert_eq!(policy.resolve("Education Edition"), Category::Education);
    }

    #[test]
    fn first_keyword_wins() {
        let policy = CategoryPolicy::default();
        assert_eq!(policy.resolve("Business Pro Bundle"), Category::Business);
    }

    #[test]
    fn unmatched_descriptor_falls_back() {
        let policy = CategoryPolicy::default();
        assert_eq!(policy.resolve("Mystery Box"), Category::Education);
        assert_eq!(policy.resolve(""), Category::Education);
    }

    #[test]
    fn custom_mapping_overrides_default() {
        let policy = CategoryPolicy::new(
            vec![("seat".to_string(), Category::Business)],
            Category::Pro,
        );
        assert_eq!(policy.resolve("Team Seat"), Category::Business);
        assert_eq!(policy.resolve("anything else"), Category::Pro);
    }
}
