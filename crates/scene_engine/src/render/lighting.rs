//! Light sources and the per-draw light container

use super::backend::{GraphicsBackend, UniformValue};
use crate::foundation::math::{utils, Color, Vec3};
use crate::scene::ComponentRef;
use crate::spatial::BoundingSphere;
use serde::{Deserialize, Serialize};

/// Kind of light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    /// Parallel rays affecting everything
    Directional,
    /// Omnidirectional light with a range
    Point,
    /// Cone shaped light with a range
    Spot,
}

/// Intensity channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intensity {
    /// Ambient channel
    Ambient,
    /// Diffuse channel
    Diffuse,
    /// Specular channel
    Specular,
}

/// Distance attenuation terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    /// Constant term
    pub constant: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub quadratic: f32,
    /// Distance beyond which the light has no effect
    pub range: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self { constant: 1.0, linear: 1.0, quadratic: 2.0, range: 5.0 }
    }
}

/// (range, constant, linear, quadratic)
const ATTENUATION_PRESETS: [(f32, f32, f32, f32); 12] = [
    (7.0, 1.0, 0.7, 1.8),
    (13.0, 1.0, 0.35, 0.44),
    (20.0, 1.0, 0.22, 0.20),
    (32.0, 1.0, 0.14, 0.07),
    (50.0, 1.0, 0.09, 0.032),
    (65.0, 1.0, 0.07, 0.017),
    (100.0, 1.0, 0.045, 0.0075),
    (160.0, 1.0, 0.27, 0.0028),
    (200.0, 1.0, 0.22, 0.0019),
    (325.0, 1.0, 0.14, 0.0007),
    (600.0, 1.0, 0.007, 0.0002),
    (3250.0, 1.0, 0.0014, 0.000007),
];

impl Attenuation {
    /// Preset terms for the smallest table range covering `range`.
    ///
    /// Ranges past the table use the last preset.
    pub fn from_range(range: f32) -> Self {
        let (r, constant, linear, quadratic) = ATTENUATION_PRESETS
            .iter()
            .copied()
            .find(|(r, ..)| *r >= range)
            .unwrap_or(ATTENUATION_PRESETS[ATTENUATION_PRESETS.len() - 1]);
        Self { constant, linear, quadratic, range: r }
    }

    /// Attenuation factor at `distance`
    pub fn factor(&self, distance: f32) -> f32 {
        if distance > self.range {
            return 0.0;
        }
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

/// Light component
#[derive(Debug, Clone, PartialEq)]
pub struct LightSource {
    light_type: LightType,
    ambient: Color,
    diffuse: Color,
    specular: Color,
    attenuation: Attenuation,
    cutoff: (f32, f32),
    mask: u32,
    cast_shadows: bool,
}

impl Default for LightSource {
    fn default() -> Self {
        Self::new(LightType::Point)
    }
}

impl LightSource {
    /// Light of the given type with default intensities
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            ambient: Color::BLACK,
            diffuse: Color::WHITE,
            specular: Color::WHITE,
            attenuation: Attenuation::default(),
            cutoff: (utils::deg_to_rad(10.0), utils::deg_to_rad(10.0)),
            mask: 1,
            cast_shadows: false,
        }
    }

    /// Directional, point or spot
    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Change the light type
    pub fn set_type(&mut self, light_type: LightType) -> &mut Self {
        self.light_type = light_type;
        self
    }

    /// Color of one intensity channel
    pub fn intensity(&self, channel: Intensity) -> Color {
        match channel {
            Intensity::Ambient => self.ambient,
            Intensity::Diffuse => self.diffuse,
            Intensity::Specular => self.specular,
        }
    }

    /// Set one intensity channel
    pub fn set_intensity(&mut self, channel: Intensity, color: Color) -> &mut Self {
        match channel {
            Intensity::Ambient => self.ambient = color,
            Intensity::Diffuse => self.diffuse = color,
            Intensity::Specular => self.specular = color,
        }
        self
    }

    /// Set all three channels at once
    pub fn set_intensities(&mut self, ambient: Color, diffuse: Color, specular: Color) -> &mut Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    /// Set every channel to the same color
    pub fn set_all_intensities(&mut self, color: Color) -> &mut Self {
        self.set_intensities(color, color, color)
    }

    /// Attenuation coefficients and range
    pub fn attenuation(&self) -> Attenuation {
        self.attenuation
    }

    /// Set attenuation coefficients and range
    pub fn set_attenuation(&mut self, constant: f32, linear: f32, quadratic: f32, range: f32) -> &mut Self {
        self.attenuation = Attenuation { constant, linear, quadratic, range };
        self
    }

    /// Pick attenuation terms from the preset table
    pub fn set_range(&mut self, range: f32) -> &mut Self {
        self.attenuation = Attenuation::from_range(range);
        self
    }

    /// Distance beyond which the light has no effect
    pub fn range(&self) -> f32 {
        self.attenuation.range
    }

    /// Spot cutoff angles (inner, outer) in radians
    pub fn cutoff(&self) -> (f32, f32) {
        self.cutoff
    }

    /// Set the spot cutoff angles in radians. The outer angle never goes below
    /// the inner one.
    pub fn set_cutoff(&mut self, inner: f32, outer: f32) -> &mut Self {
        self.cutoff = (inner, outer.max(inner));
        self
    }

    /// Render mask
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Set the render mask
    pub fn set_mask(&mut self, mask: u32) -> &mut Self {
        self.mask = mask;
        self
    }

    /// Whether the light casts shadows
    pub fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    /// Enable or disable shadow casting
    pub fn set_cast_shadows(&mut self, cast: bool) -> &mut Self {
        self.cast_shadows = cast;
        self
    }

    /// Whether a light placed at `position` facing `direction` reaches
    /// `bounds`. Directional lights always do.
    pub fn reaches(&self, position: Vec3, direction: Vec3, bounds: &BoundingSphere) -> bool {
        match self.light_type {
            LightType::Directional => true,
            LightType::Point => BoundingSphere::new(position, self.range()).intersects(bounds),
            LightType::Spot => {
                if !BoundingSphere::new(position, self.range()).intersects(bounds) {
                    return false;
                }
                let to_center = bounds.center - position;
                let distance = to_center.norm();
                if distance <= bounds.radius {
                    return true;
                }
                let Some(axis) = direction.try_normalize(f32::EPSILON) else {
                    return false;
                };
                // Widen the cone by the angle the sphere subtends
                let angle = (to_center.dot(&axis) / distance).clamp(-1.0, 1.0).acos();
                let spread = (bounds.radius / distance).clamp(-1.0, 1.0).asin();
                angle <= self.cutoff.1 + spread
            }
        }
    }
}

/// Snapshot of a light taken when it was selected for a draw
#[derive(Debug, Clone, PartialEq)]
pub struct LightInfo {
    /// Light component
    pub source: ComponentRef,
    /// World position
    pub position: Vec3,
    /// World direction
    pub direction: Vec3,
    /// Light settings
    pub light: LightSource,
}

/// Lights chosen for one draw call
#[derive(Debug, Clone, Default)]
pub struct LightContainer {
    directional: Vec<LightInfo>,
    point: Vec<LightInfo>,
    spot: Vec<LightInfo>,
}

impl LightContainer {
    /// Empty container
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, info: LightInfo) {
        match info.light.light_type() {
            LightType::Directional => self.directional.push(info),
            LightType::Point => self.point.push(info),
            LightType::Spot => self.spot.push(info),
        }
    }

    /// Number of selected lights
    pub fn len(&self) -> usize {
        self.directional.len() + self.point.len() + self.spot.len()
    }

    /// Whether no light was selected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selected directional lights
    pub fn directional(&self) -> &[LightInfo] {
        &self.directional
    }

    /// Selected point lights, nearest first
    pub fn point(&self) -> &[LightInfo] {
        &self.point
    }

    /// Selected spot lights, nearest first
    pub fn spot(&self) -> &[LightInfo] {
        &self.spot
    }

    /// Count of lights of one type
    pub fn count(&self, light_type: LightType) -> usize {
        match light_type {
            LightType::Directional => self.directional.len(),
            LightType::Point => self.point.len(),
            LightType::Spot => self.spot.len(),
        }
    }

    /// Every selected light, directional first
    pub fn iter(&self) -> impl Iterator<Item = &LightInfo> {
        self.directional.iter().chain(&self.point).chain(&self.spot)
    }

    /// Whether `source` was selected
    pub fn contains(&self, source: ComponentRef) -> bool {
        self.iter().any(|info| info.source == source)
    }

    /// Drop every selected light
    pub fn clear(&mut self) {
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
    }

    /// Upload the light block as uniforms
    pub fn apply(&self, backend: &mut dyn GraphicsBackend) {
        backend.set_uniform("u_num_directional_lights", UniformValue::Int(self.directional.len() as i32));
        backend.set_uniform("u_num_point_lights", UniformValue::Int(self.point.len() as i32));
        backend.set_uniform("u_num_spot_lights", UniformValue::Int(self.spot.len() as i32));

        for (i, info) in self.directional.iter().enumerate() {
            let prefix = format!("u_directional_lights[{}]", i);
            upload_channels(backend, &prefix, &info.light);
            backend.set_uniform(&format!("{}.direction", prefix), UniformValue::Vec3(info.direction));
        }

        for (i, info) in self.point.iter().enumerate() {
            let prefix = format!("u_point_lights[{}]", i);
            upload_channels(backend, &prefix, &info.light);
            backend.set_uniform(&format!("{}.position", prefix), UniformValue::Vec3(info.position));
            upload_attenuation(backend, &prefix, &info.light.attenuation());
        }

        for (i, info) in self.spot.iter().enumerate() {
            let prefix = format!("u_spot_lights[{}]", i);
            upload_channels(backend, &prefix, &info.light);
            backend.set_uniform(&format!("{}.position", prefix), UniformValue::Vec3(info.position));
            backend.set_uniform(&format!("{}.direction", prefix), UniformValue::Vec3(info.direction));
            upload_attenuation(backend, &prefix, &info.light.attenuation());
            let (inner, outer) = info.light.cutoff();
            backend.set_uniform(&format!("{}.cutoff", prefix), UniformValue::Float(inner.cos()));
            backend.set_uniform(&format!("{}.outer_cutoff", prefix), UniformValue::Float(outer.cos()));
        }
    }
}

fn upload_channels(backend: &mut dyn GraphicsBackend, prefix: &str, light: &LightSource) {
    backend.set_uniform(&format!("{}.ambient", prefix), UniformValue::Vec4(light.intensity(Intensity::Ambient).to_vec4()));
    backend.set_uniform(&format!("{}.diffuse", prefix), UniformValue::Vec4(light.intensity(Intensity::Diffuse).to_vec4()));
    backend.set_uniform(&format!("{}.specular", prefix), UniformValue::Vec4(light.intensity(Intensity::Specular).to_vec4()));
}

fn upload_attenuation(backend: &mut dyn GraphicsBackend, prefix: &str, attenuation: &Attenuation) {
    let terms = crate::foundation::math::Vec4::new(
        attenuation.constant,
        attenuation.linear,
        attenuation.quadratic,
        attenuation.range,
    );
    backend.set_uniform(&format!("{}.attenuation", prefix), UniformValue::Vec4(terms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::RecordingBackend;
    use approx::assert_relative_eq;

    #[test]
    fn test_light_defaults() {
        let light = LightSource::default();

        assert_eq!(light.light_type(), LightType::Point);
        assert_eq!(light.intensity(Intensity::Ambient), Color::BLACK);
        assert_eq!(light.intensity(Intensity::Diffuse), Color::WHITE);
        assert_eq!(light.intensity(Intensity::Specular), Color::WHITE);
        assert_eq!(light.attenuation(), Attenuation { constant: 1.0, linear: 1.0, quadratic: 2.0, range: 5.0 });
        assert_relative_eq!(light.cutoff().0, 10.0_f32.to_radians(), epsilon = 1e-6);
    }

    #[test]
    fn test_set_intensity_touches_one_channel() {
        let mut light = LightSource::default();
        light.set_intensity(Intensity::Diffuse, Color::RED);

        assert_eq!(light.intensity(Intensity::Diffuse), Color::RED);
        assert_eq!(light.intensity(Intensity::Specular), Color::WHITE);

        light.set_all_intensities(Color::GRAY);
        assert_eq!(light.intensity(Intensity::Ambient), Color::GRAY);
    }

    #[test]
    fn test_range_preset_picks_smallest_covering_entry() {
        assert_eq!(Attenuation::from_range(10.0).range, 13.0);
        assert_eq!(Attenuation::from_range(7.0).range, 7.0);
        assert_eq!(Attenuation::from_range(1e6).range, 3250.0);
        assert_relative_eq!(Attenuation::from_range(50.0).quadratic, 0.032);
        assert_eq!(Attenuation::default().factor(6.0), 0.0);
    }

    #[test]
    fn test_spot_cone_test() {
        let mut spot = LightSource::new(LightType::Spot);
        spot.set_range(20.0).set_cutoff(0.3, 0.4);
        let forward = Vec3::new(0.0, 0.0, -1.0);

        let ahead = BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0);
        let beside = BoundingSphere::new(Vec3::new(10.0, 0.0, -1.0), 1.0);

        assert!(spot.reaches(Vec3::zeros(), forward, &ahead));
        assert!(!spot.reaches(Vec3::zeros(), forward, &beside));
    }

    #[test]
    fn test_apply_uploads_counts() {
        let mut container = LightContainer::new();
        let source = ComponentRef::new(crate::scene::SceneId::next(), crate::scene::ComponentKey::default());
        container.push(LightInfo {
            source,
            position: Vec3::new(1.0, 2.0, 3.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            light: LightSource::new(LightType::Point),
        });

        let mut backend = RecordingBackend::new();
        container.apply(&mut backend);

        assert_eq!(backend.uniform_values("u_num_point_lights"), vec![UniformValue::Int(1)]);
        assert_eq!(
            backend.uniform_values("u_point_lights[0].position"),
            vec![UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0))]
        );
    }
}
