//! Collider tags used for visibility rather than physical response.
//!
//! When culling is enabled every drawable, camera, light and environment
//! recorder owns a kinematic ghost collider tagged with a [`CullingType`].
//! Culling colliders never produce a physical response. The full matrix:
//!
//! | pair                                   | response      |
//! |----------------------------------------|---------------|
//! | Drawable × Camera                      | overlap only  |
//! | Drawable × LightSource                 | overlap only  |
//! | Drawable × EnvironmentRecorder         | overlap only  |
//! | any culling type × the same type       | ignored       |
//! | Camera × LightSource / EnvRecorder     | ignored       |
//! | LightSource × EnvironmentRecorder      | ignored       |
//! | any culling type × physical collider   | ignored       |

use super::backend::PairResponse;

/// Kind of culling collider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullingType {
    /// Bounds of a drawable
    Drawable,
    /// View volume of a camera
    Camera,
    /// Influence volume of a light
    LightSource,
    /// Capture volume of an environment recorder
    EnvironmentRecorder,
}

impl CullingType {
    /// Response between two culling colliders. The physics world's broadphase
    /// filter consults this for every culling pair.
    pub fn pair_response(self, other: Self) -> PairResponse {
        use CullingType::{Camera, Drawable, EnvironmentRecorder, LightSource};
        match (self, other) {
            (Drawable, Camera | LightSource | EnvironmentRecorder)
            | (Camera | LightSource | EnvironmentRecorder, Drawable) => PairResponse::OverlapOnly,
            _ => PairResponse::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CullingType; 4] = [
        CullingType::Drawable,
        CullingType::Camera,
        CullingType::LightSource,
        CullingType::EnvironmentRecorder,
    ];

    #[test]
    fn test_matrix_is_symmetric_and_never_physical() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.pair_response(b), b.pair_response(a), "{a:?} x {b:?}");
                assert_ne!(a.pair_response(b), PairResponse::Contact);
            }
        }
    }

    #[test]
    fn test_only_drawable_pairs_overlap() {
        let overlapping: Vec<_> = ALL
            .iter()
            .flat_map(|a| ALL.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| a.pair_response(*b) == PairResponse::OverlapOnly)
            .collect();

        assert_eq!(overlapping.len(), 6);
        assert!(overlapping.iter().all(|(a, b)| (*a == CullingType::Drawable) != (*b == CullingType::Drawable)));
    }
}
