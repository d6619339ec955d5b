//! Collision-resistant identifiers for waiters and domain items

use uuid::Uuid;

/// Generate a bare identifier
pub fn generate() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generate an identifier tagged with a readable prefix, e.g. `waiter-3f2a...`
pub fn generate_with_prefix(prefix: &str) -> String {
    format!("{}-{}", prefix, generate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_do_not_collide() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_prefix() {
        let id = generate_with_prefix("waiter");
        assert!(id.starts_with("waiter-"));
        assert_eq!(id.len(), "waiter-".len() + 32);
    }
}
