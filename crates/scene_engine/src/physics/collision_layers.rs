//! Collision group/mask filtering for physical bodies

/// Named collision groups. Bodies default to [`CollisionLayers::DEFAULT`] for
/// both their group and their mask.
pub struct CollisionLayers;

impl CollisionLayers {
    /// No collision layer
    pub const NONE: u32 = 0;

    /// All collision layers
    pub const ALL: u32 = 0xFFFF_FFFF;

    /// Default group for new bodies
    pub const DEFAULT: u32 = 1 << 0;

    /// Static environment geometry
    pub const ENVIRONMENT: u32 = 1 << 1;

    /// Trigger volumes (no physical response)
    pub const TRIGGER: u32 = 1 << 2;

    /// Debris and small physics objects
    pub const DEBRIS: u32 = 1 << 3;

    /// First bit free for application-defined groups
    pub const USER: u32 = 1 << 8;

    /// Check if two bodies should collide based on their groups and masks:
    /// A's group must be in B's mask and B's group must be in A's mask.
    pub fn should_collide(group_a: u32, mask_a: u32, group_b: u32, mask_b: u32) -> bool {
        (group_a & mask_b) != 0 && (group_b & mask_a) != 0
    }

    /// Helper to create a mask from multiple layers
    pub fn mask(layers: &[u32]) -> u32 {
        layers.iter().fold(0, |acc, &layer| acc | layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_collide_mutual() {
        assert!(CollisionLayers::should_collide(
            CollisionLayers::DEFAULT, CollisionLayers::ENVIRONMENT,
            CollisionLayers::ENVIRONMENT, CollisionLayers::ALL,
        ));
    }

    #[test]
    fn test_should_not_collide_one_way() {
        // Debris wants the environment, the environment ignores debris
        assert!(!CollisionLayers::should_collide(
            CollisionLayers::DEBRIS, CollisionLayers::ENVIRONMENT,
            CollisionLayers::ENVIRONMENT, CollisionLayers::DEFAULT,
        ));
    }

    #[test]
    fn test_mask_creation() {
        let mask = CollisionLayers::mask(&[CollisionLayers::DEFAULT, CollisionLayers::DEBRIS]);
        assert_eq!(mask, CollisionLayers::DEFAULT | CollisionLayers::DEBRIS);
    }
}
