//! Category Catalog: lookup and batch creation of event categories.

use common::CategoryId;
use store::{Category, RegistrationStore};

use crate::error::{DomainError, Result};
use crate::validation::{CategoryRequest, validate_categories};

/// Read and seed access to event categories.
pub struct CategoryCatalog<S: RegistrationStore> {
    store: S,
}

impl<S: RegistrationStore> CategoryCatalog<S> {
    /// Creates a new category catalog with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads a category, failing with a not-found error when absent.
    pub async fn get_by_id(&self, category_id: CategoryId) -> Result<Category> {
        self.store
            .get_category(category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", category_id))
    }

    /// Looks a category up by its exact name.
    pub async fn get_by_name(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        self.store
            .get_category_by_name(name)
            .await?
            .ok_or_else(|| DomainError::not_found("category", name))
    }

    /// Every stored category.
    pub async fn list(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    /// Creates every category in the batch, or none of them.
    ///
    /// A name that already exists fails the whole batch with a conflict.
    #[tracing::instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn create(&self, requests: &[CategoryRequest]) -> Result<Vec<Category>> {
        let categories = validate_categories(requests)?;
        let created = self.store.create_categories(categories).await?;
        tracing::info!(count = created.len(), "Categories created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConflictReason;
    use store::InMemoryStore;

    fn request(name: &str) -> CategoryRequest {
        CategoryRequest {
            name: name.to_string(),
            image_url: format!("https://img.example.com/{}.png", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn create_then_look_up() {
        let catalog = CategoryCatalog::new(InMemoryStore::new());

        let created = catalog
            .create(&[request("Music"), request("Sports")])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        let music = catalog.get_by_id(created[0].category_id).await.unwrap();
        assert_eq!(music.name, "Music");
        assert_eq!(
            catalog.get_by_name(" Sports ").await.unwrap().category_id,
            created[1].category_id
        );
        assert_eq!(catalog.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let catalog = CategoryCatalog::new(InMemoryStore::new());
        let result = catalog.get_by_id(CategoryId::new(42)).await;
        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "category",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn existing_name_fails_whole_batch() {
        let catalog = CategoryCatalog::new(InMemoryStore::new());
        catalog.create(&[request("Music")]).await.unwrap();

        let result = catalog.create(&[request("Theatre"), request("Music")]).await;

        assert!(matches!(
            result,
            Err(DomainError::Conflict(ConflictReason::Duplicate(_)))
        ));
        assert!(catalog.get_by_name("Theatre").await.is_err());
    }
}
