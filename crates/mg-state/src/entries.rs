//! Ordered, unique-keyed storage shared by every registry

use mg_core::{Error, Output, Plugin, Resource, Result};

/// Item addressable by its `unique` key
pub trait Keyed: Clone + Send + Sync + 'static {
    fn unique(&self) -> &str;
}

impl Keyed for Resource {
    fn unique(&self) -> &str {
        &self.unique
    }
}

impl Keyed for Output {
    fn unique(&self) -> &str {
        &self.unique
    }
}

impl Keyed for Plugin {
    fn unique(&self) -> &str {
        &self.unique
    }
}

/// Insertion-ordered items with unique keys. Not synchronized; callers hold
/// their registry lock around every use.
#[derive(Debug, Clone)]
pub struct Entries<T> {
    items: Vec<T>,
}

impl<T: Keyed> Entries<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn position(&self, unique: &str) -> Option<usize> {
        self.items.iter().position(|item| item.unique() == unique)
    }

    pub fn contains(&self, unique: &str) -> bool {
        self.position(unique).is_some()
    }

    pub fn add(&mut self, item: T) -> Result<()> {
        if self.contains(item.unique()) {
            return Err(Error::duplicate_key(item.unique()));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, unique: &str) -> Result<T> {
        let position = self
            .position(unique)
            .ok_or_else(|| Error::not_found(unique))?;
        Ok(self.items.remove(position))
    }

    pub fn get(&self, unique: &str) -> Option<&T> {
        self.items.iter().find(|item| item.unique() == unique)
    }

    pub fn get_mut(&mut self, unique: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.unique() == unique)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.clone()
    }

    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Keyed> Default for Entries<T> {
    fn default() -> Self {
        Self::new()
    }
}
