//! Per-scene renderer: bound component sets, light selection and the draw pass

use super::backend::GraphicsBackend;
use super::camera::CameraView;
use super::drawable::Drawable;
use super::lighting::{LightContainer, LightInfo, LightType};
use crate::config::RenderConfig;
use crate::foundation::math::{utils, Mat4, FORWARD};
use crate::scene::{ComponentKey, ComponentKind, ComponentRef, Graph, ObjectKey, SceneId};
use std::collections::HashSet;

/// Which bound set a component belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum BindSlot {
    Light,
    Camera,
    Drawable,
    EnvironmentRecorder,
}

/// Lights allowed per draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightLimits {
    /// Total lights per draw
    pub capacity: usize,
    /// Directional lights per draw
    pub directional: usize,
    /// Point lights per draw
    pub point: usize,
    /// Spot lights per draw
    pub spot: usize,
}

impl From<&RenderConfig> for LightLimits {
    fn from(config: &RenderConfig) -> Self {
        Self {
            capacity: config.max_lights_per_draw,
            directional: config.max_directional_lights,
            point: config.max_point_lights,
            spot: config.max_spot_lights,
        }
    }
}

/// Counters from one draw pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Render target binds (camera passes and environment faces)
    pub passes: usize,
    /// Drawables drawn
    pub draws: usize,
    /// Drawables rejected by culling
    pub culled: usize,
}

/// Viewer/drawable pairs whose culling volumes overlap
#[derive(Debug, Default)]
pub(crate) struct Visibility {
    pub(crate) cameras: HashSet<(ComponentKey, ComponentKey)>,
    pub(crate) recorders: HashSet<(ComponentKey, ComponentKey)>,
}

struct Queued<'a> {
    key: ComponentKey,
    drawable: &'a Drawable,
    model: Mat4,
    distance: f32,
}

#[derive(Default)]
struct DrawQueue<'a> {
    opaque: Vec<Queued<'a>>,
    sky: Vec<Queued<'a>>,
    translucent: Vec<Queued<'a>>,
}

impl<'a> DrawQueue<'a> {
    fn push(&mut self, item: Queued<'a>) {
        let material = item.drawable.material();
        if material.sky {
            self.sky.push(item);
        } else if material.translucent {
            self.translucent.push(item);
        } else {
            self.opaque.push(item);
        }
    }
}

/// Registry of the lights, cameras, drawables and environment recorders of
/// one scene, plus the draw orchestration over them.
///
/// Sets keep registration order and never hold a component that was
/// destroyed: components bind on creation and unbind on destruction.
pub struct Renderer {
    scene: SceneId,
    mask: u32,
    limits: LightLimits,
    culling: bool,
    lights: Vec<ComponentKey>,
    cameras: Vec<ComponentKey>,
    drawables: Vec<ComponentKey>,
    recorders: Vec<ComponentKey>,
}

impl Renderer {
    pub(crate) fn new(scene: SceneId, config: &RenderConfig) -> Self {
        Self {
            scene,
            mask: config.mask,
            limits: LightLimits::from(config),
            culling: config.culling,
            lights: Vec::new(),
            cameras: Vec::new(),
            drawables: Vec::new(),
            recorders: Vec::new(),
        }
    }

    /// Active render groups
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Change the active render groups. Components outside the mask stay
    /// bound but are skipped.
    pub fn set_mask(&mut self, mask: u32) -> &mut Self {
        self.mask = mask;
        self
    }

    /// Light selection limits
    pub fn light_limits(&self) -> LightLimits {
        self.limits
    }

    /// Change light selection limits
    pub fn set_light_limits(&mut self, limits: LightLimits) -> &mut Self {
        self.limits = limits;
        self
    }

    /// Whether drawing skips drawables outside the culling volumes
    pub fn culling_enabled(&self) -> bool {
        self.culling
    }

    fn set(&self, slot: BindSlot) -> &Vec<ComponentKey> {
        match slot {
            BindSlot::Light => &self.lights,
            BindSlot::Camera => &self.cameras,
            BindSlot::Drawable => &self.drawables,
            BindSlot::EnvironmentRecorder => &self.recorders,
        }
    }

    fn set_mut(&mut self, slot: BindSlot) -> &mut Vec<ComponentKey> {
        match slot {
            BindSlot::Light => &mut self.lights,
            BindSlot::Camera => &mut self.cameras,
            BindSlot::Drawable => &mut self.drawables,
            BindSlot::EnvironmentRecorder => &mut self.recorders,
        }
    }

    pub(crate) fn bind(&mut self, slot: BindSlot, key: ComponentKey) {
        let set = self.set_mut(slot);
        if set.contains(&key) {
            debug_assert!(false, "component bound twice");
            log::error!("{:?} component {:?} is already bound", slot, key);
            return;
        }
        set.push(key);
        log::debug!("Bound {:?} {:?}", slot, key);
    }

    pub(crate) fn unbind(&mut self, slot: BindSlot, key: ComponentKey) -> bool {
        let set = self.set_mut(slot);
        let Some(index) = set.iter().position(|k| *k == key) else {
            return false;
        };
        set.remove(index);
        log::debug!("Unbound {:?} {:?}", slot, key);
        true
    }

    fn refs(&self, slot: BindSlot) -> Vec<ComponentRef> {
        self.set(slot).iter().map(|key| ComponentRef::new(self.scene, *key)).collect()
    }

    /// Bound drawables in registration order
    pub fn bound_drawables(&self) -> Vec<ComponentRef> {
        self.refs(BindSlot::Drawable)
    }

    /// Bound lights in registration order
    pub fn bound_lights(&self) -> Vec<ComponentRef> {
        self.refs(BindSlot::Light)
    }

    /// Bound cameras in registration order
    pub fn bound_cameras(&self) -> Vec<ComponentRef> {
        self.refs(BindSlot::Camera)
    }

    /// Bound environment recorders in registration order
    pub fn bound_environment_recorders(&self) -> Vec<ComponentRef> {
        self.refs(BindSlot::EnvironmentRecorder)
    }

    fn live_drawable<'g>(&self, graph: &'g Graph, key: ComponentKey) -> Option<(&'g Drawable, ObjectKey)> {
        if !graph.component_live(key) {
            return None;
        }
        let component = graph.components.get(key)?;
        match &component.kind {
            ComponentKind::Drawable(drawable) => Some((drawable, component.owner)),
            _ => None,
        }
    }

    /// Lights affecting `drawable` this frame, at most `capacity` of them.
    ///
    /// Lights outside the renderer mask or the drawable's render group are
    /// dropped first. Directional lights follow in registration order. Point
    /// and spot lights must reach the drawable's world bounds and are taken
    /// nearest first.
    pub(crate) fn choose_lights(&self, graph: &Graph, drawable: ComponentKey) -> LightContainer {
        let mut container = LightContainer::new();
        let Some((target, owner)) = self.live_drawable(graph, drawable) else {
            return container;
        };
        let bounds = target.world_bounds(&graph.world_matrix(owner));
        let group_bit = target.group_bit();
        let capacity = self.limits.capacity;

        let eligible = self.lights.iter().filter_map(|key| {
            if !graph.component_live(*key) {
                return None;
            }
            let component = graph.components.get(*key)?;
            let ComponentKind::Light(light) = &component.kind else {
                return None;
            };
            if light.mask() & self.mask == 0 || light.mask() & group_bit == 0 {
                return None;
            }
            let world = graph.world_matrix(component.owner);
            Some(LightInfo {
                source: ComponentRef::new(self.scene, *key),
                position: utils::translation(&world),
                direction: world.transform_vector(&FORWARD).try_normalize(f32::EPSILON).unwrap_or(FORWARD),
                light: light.clone(),
            })
        });

        let mut local = Vec::new();
        let directional_cap = self.limits.directional.min(capacity);
        for info in eligible {
            match info.light.light_type() {
                LightType::Directional => {
                    if container.count(LightType::Directional) < directional_cap {
                        container.push(info);
                    }
                }
                LightType::Point | LightType::Spot => {
                    if info.light.reaches(info.position, info.direction, &bounds) {
                        let distance = (info.position - bounds.center).norm();
                        local.push((distance, info));
                    }
                }
            }
        }

        local.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, info) in local {
            if container.len() >= capacity {
                break;
            }
            let light_type = info.light.light_type();
            let cap = if light_type == LightType::Point { self.limits.point } else { self.limits.spot };
            if container.count(light_type) < cap {
                container.push(info);
            }
        }
        container
    }

    /// Draw every camera pass, after the environment recorders have recorded.
    pub(crate) fn draw(
        &self,
        graph: &Graph,
        visibility: Option<&Visibility>,
        backend: &mut dyn GraphicsBackend,
    ) -> DrawStats {
        let mut stats = DrawStats::default();
        self.record_environments(graph, visibility, backend, &mut stats);

        for bit in (0..32).map(|i| 1u32 << i).filter(|bit| self.mask & bit != 0) {
            for &camera_key in &self.cameras {
                if !graph.component_live(camera_key) {
                    continue;
                }
                let Some(component) = graph.components.get(camera_key) else { continue };
                let ComponentKind::Camera(camera) = &component.kind else { continue };
                if camera.mask() & bit == 0 {
                    continue;
                }

                let world = graph.world_matrix(component.owner);
                let view = camera.view(&world);
                let frustum = self.culling.then(|| camera.frustum(&world));
                backend.bind_target(camera.render_target(), camera.viewport());
                stats.passes += 1;

                let mut queue = DrawQueue::default();
                for &key in &self.drawables {
                    let Some((drawable, owner)) = self.live_drawable(graph, key) else { continue };
                    if drawable.group_bit() & bit == 0 || drawable.group_bit() & camera.mask() == 0 {
                        continue;
                    }
                    let model = graph.world_matrix(owner);
                    let bounds = drawable.world_bounds(&model);
                    if let Some(frustum) = &frustum {
                        let overlapping = visibility.map_or(true, |v| v.cameras.contains(&(camera_key, key)));
                        if !overlapping || !frustum.intersects_sphere(&bounds) {
                            stats.culled += 1;
                            continue;
                        }
                    }
                    let distance = (bounds.center - view.position).norm_squared();
                    queue.push(Queued { key, drawable, model, distance });
                }
                stats.draws += self.flush(graph, queue, &view, backend);
            }
        }
        stats
    }

    fn record_environments(
        &self,
        graph: &Graph,
        visibility: Option<&Visibility>,
        backend: &mut dyn GraphicsBackend,
        stats: &mut DrawStats,
    ) {
        for &recorder_key in &self.recorders {
            if !graph.component_live(recorder_key) {
                continue;
            }
            let Some(component) = graph.components.get(recorder_key) else { continue };
            let ComponentKind::EnvironmentRecorder(recorder) = &component.kind else { continue };
            if recorder.mask() & self.mask == 0 {
                continue;
            }

            let position = utils::translation(&graph.world_matrix(component.owner));
            let reach = recorder.reach(position);
            let visible: Vec<(ComponentKey, &Drawable, Mat4)> = self
                .drawables
                .iter()
                .filter_map(|&key| {
                    let (drawable, owner) = self.live_drawable(graph, key)?;
                    if owner == component.owner || drawable.group_bit() & recorder.mask() & self.mask == 0 {
                        return None;
                    }
                    let model = graph.world_matrix(owner);
                    let inside = match (self.culling, visibility) {
                        (true, Some(v)) => v.recorders.contains(&(recorder_key, key)),
                        _ => reach.intersects(&drawable.world_bounds(&model)),
                    };
                    inside.then_some((key, drawable, model))
                })
                .collect();

            for (target, viewport, view) in recorder.faces(position) {
                backend.bind_target(target, viewport);
                stats.passes += 1;
                let mut queue = DrawQueue::default();
                for &(key, drawable, model) in &visible {
                    let center = drawable.world_bounds(&model).center;
                    queue.push(Queued {
                        key,
                        drawable,
                        model,
                        distance: (center - position).norm_squared(),
                    });
                }
                stats.draws += self.flush(graph, queue, &view, backend);
            }
        }
    }

    /// Opaque front to back, then sky, then translucent back to front
    /// without depth writes. Returns the number of drawables drawn.
    fn flush(&self, graph: &Graph, mut queue: DrawQueue<'_>, view: &CameraView, backend: &mut dyn GraphicsBackend) -> usize {
        queue.opaque.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        queue.translucent.sort_by(|a, b| b.distance.total_cmp(&a.distance));

        for item in queue.opaque.iter().chain(&queue.sky) {
            self.draw_one(graph, item, view, backend);
        }
        if !queue.translucent.is_empty() {
            backend.set_depth_write(false);
            for item in &queue.translucent {
                self.draw_one(graph, item, view, backend);
            }
            backend.set_depth_write(true);
        }
        queue.opaque.len() + queue.sky.len() + queue.translucent.len()
    }

    fn draw_one(&self, graph: &Graph, item: &Queued<'_>, view: &CameraView, backend: &mut dyn GraphicsBackend) {
        let lights = if item.drawable.receive_lights() {
            self.choose_lights(graph, item.key)
        } else {
            LightContainer::new()
        };
        item.drawable.draw(&item.model, view, &lights, backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_bind_keeps_registration_order_and_unbind_removes() {
        let mut keys: SlotMap<ComponentKey, ()> = SlotMap::with_key();
        let (a, b, c) = (keys.insert(()), keys.insert(()), keys.insert(()));
        let mut renderer = Renderer::new(SceneId::next(), &RenderConfig::default());

        renderer.bind(BindSlot::Drawable, b);
        renderer.bind(BindSlot::Drawable, a);
        renderer.bind(BindSlot::Drawable, c);
        assert!(renderer.unbind(BindSlot::Drawable, a));
        assert!(!renderer.unbind(BindSlot::Drawable, a));
        assert!(!renderer.unbind(BindSlot::Light, b));

        let order: Vec<ComponentKey> = renderer.bound_drawables().iter().map(|r| r.key).collect();
        assert_eq!(order, vec![b, c]);
    }

    #[test]
    fn test_limits_follow_config() {
        let config = RenderConfig { max_lights_per_draw: 4, ..RenderConfig::default() };
        let renderer = Renderer::new(SceneId::next(), &config);

        assert_eq!(
            renderer.light_limits(),
            LightLimits { capacity: 4, directional: 2, point: 8, spot: 2 }
        );
    }
}
