//! Favorite provider ids used by the "only favorites" filter

use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
pub trait FavoritesSource: Send + Sync {
    async fn favorite_ids(&self) -> HashSet<String>;
}

/// No favorites; "only favorites" then yields nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFavorites;

#[async_trait]
impl FavoritesSource for NoFavorites {
    async fn favorite_ids(&self) -> HashSet<String> {
        HashSet::new()
    }
}

/// Fixed set of favorite ids
#[derive(Debug, Default, Clone)]
pub struct StaticFavorites {
    ids: HashSet<String>,
}

impl StaticFavorites {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl FavoritesSource for StaticFavorites {
    async fn favorite_ids(&self) -> HashSet<String> {
        self.ids.clone()
    }
}
