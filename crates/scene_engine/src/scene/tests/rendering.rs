use super::{cube, quiet_config, scene};
use crate::config::EngineConfig;
use crate::foundation::math::{Color, Vec3};
use crate::render::{
    BackendCall, Camera, EnvironmentRecorder, LightSource, LightType, Material, RecordingBackend, UniformValue,
    Viewport,
};
use crate::scene::{ComponentRef, ObjectRef, Scene};
use approx::assert_relative_eq;

fn camera(scene: &mut Scene, config: &EngineConfig) -> (ObjectRef, ComponentRef) {
    let object = scene.create_object("camera").unwrap();
    let camera = Camera::perspective(&config.camera, Viewport::full(800, 600));
    (object, scene.create_camera(object, camera).unwrap())
}

fn drawable_at(scene: &mut Scene, name: &str, position: Vec3, material: Material) -> (ObjectRef, ComponentRef) {
    let object = scene.create_object(name).unwrap();
    scene.object_mut(object).unwrap().set_position(position);
    let mut drawable = cube();
    drawable.set_material(material);
    (object, scene.create_drawable(object, drawable).unwrap())
}

fn light_at(scene: &mut Scene, name: &str, position: Vec3, light_type: LightType) -> ComponentRef {
    let object = scene.create_object(name).unwrap();
    scene.object_mut(object).unwrap().set_position(position);
    let mut light = LightSource::new(light_type);
    light.set_range(50.0);
    scene.create_light(object, light).unwrap()
}

fn opaque(color: Color) -> Material {
    Material { diffuse: color, ..Material::default() }
}

#[test]
fn test_choose_lights_keeps_nearest_within_capacity() {
    let mut config = quiet_config();
    config.render.max_lights_per_draw = 4;
    let mut scene = Scene::new("lights", &config);
    let (_, target) = drawable_at(&mut scene, "target", Vec3::zeros(), Material::default());
    let sun = light_at(&mut scene, "sun", Vec3::new(0.0, 100.0, 0.0), LightType::Directional);
    // Farthest first so selection has to sort
    let points: Vec<ComponentRef> = (1..=5)
        .rev()
        .map(|i| light_at(&mut scene, &format!("p{}", i), Vec3::new(i as f32 * 2.0, 0.0, 0.0), LightType::Point))
        .collect();

    let lights = scene.choose_lights(target).unwrap();

    assert_eq!(lights.len(), 4);
    assert!(lights.contains(sun));
    assert_eq!(lights.count(LightType::Point), 3);
    let chosen: Vec<f32> = lights.point().iter().map(|info| info.position.x).collect();
    assert_eq!(chosen, vec![2.0, 4.0, 6.0]);
    assert!(lights.point().windows(2).all(|w| w[0].position.norm() <= w[1].position.norm()));
    assert!(!lights.contains(points[0]));
}

#[test]
fn test_moving_drawable_shifts_point_light_selection() {
    let mut config = quiet_config();
    config.render.max_lights_per_draw = 2;
    let mut scene = Scene::new("lights", &config);
    let (object, target) = drawable_at(&mut scene, "target", Vec3::zeros(), Material::default());
    for i in 0..6 {
        light_at(&mut scene, &format!("p{}", i), Vec3::new(i as f32 * 2.0, 0.0, 0.0), LightType::Point);
    }

    let mut selections = Vec::new();
    for x in [0.0, 4.5, 8.5] {
        scene.object_mut(object).unwrap().set_position(Vec3::new(x, 0.0, 0.0));
        let lights = scene.choose_lights(target).unwrap();
        let chosen: Vec<f32> = lights.point().iter().map(|info| info.position.x).collect();
        selections.push(chosen);
    }

    assert_eq!(selections, vec![vec![0.0, 2.0], vec![4.0, 6.0], vec![8.0, 10.0]]);
}

#[test]
fn test_earliest_directional_lights_win_when_capacity_is_short() {
    let mut config = quiet_config();
    config.render.max_lights_per_draw = 2;
    config.render.max_directional_lights = 4;
    let mut scene = Scene::new("suns", &config);
    let (_, target) = drawable_at(&mut scene, "target", Vec3::zeros(), Material::default());
    let suns: Vec<ComponentRef> = (0..3)
        .map(|i| light_at(&mut scene, &format!("sun{}", i), Vec3::new(0.0, 100.0, 0.0), LightType::Directional))
        .collect();
    light_at(&mut scene, "lamp", Vec3::new(1.0, 0.0, 0.0), LightType::Point);

    let lights = scene.choose_lights(target).unwrap();

    assert_eq!(lights.len(), 2);
    assert!(lights.contains(suns[0]));
    assert!(lights.contains(suns[1]));
    assert!(!lights.contains(suns[2]));
    assert_eq!(lights.count(LightType::Point), 0);
}

#[test]
fn test_choose_lights_skips_out_of_range_and_masked_lights() {
    let mut scene = scene();
    let (_, target) = drawable_at(&mut scene, "target", Vec3::zeros(), Material::default());
    let far = scene.create_object("far").unwrap();
    scene.object_mut(far).unwrap().set_position(Vec3::new(100.0, 0.0, 0.0));
    let mut weak = LightSource::new(LightType::Point);
    weak.set_range(5.0);
    scene.create_light(far, weak).unwrap();
    let masked = light_at(&mut scene, "masked", Vec3::new(1.0, 0.0, 0.0), LightType::Point);
    scene.light_mut(masked).unwrap().set_mask(0b10);

    assert!(scene.choose_lights(target).unwrap().is_empty());
}

#[test]
fn test_draw_orders_opaque_sky_translucent() {
    let config = quiet_config();
    let mut scene = Scene::new("buckets", &config);
    camera(&mut scene, &config);
    let glass = |color| Material { diffuse: color, translucent: true, ..Material::default() };
    drawable_at(&mut scene, "glass near", Vec3::new(0.0, 0.0, -5.0), glass(Color::BLACK));
    drawable_at(&mut scene, "glass far", Vec3::new(0.0, 0.0, -20.0), glass(Color::GRAY));
    drawable_at(&mut scene, "sky", Vec3::zeros(), Material { diffuse: Color::BLUE, sky: true, ..Material::default() });
    drawable_at(&mut scene, "wall far", Vec3::new(0.0, 0.0, -20.0), opaque(Color::RED));
    drawable_at(&mut scene, "wall near", Vec3::new(0.0, 0.0, -5.0), opaque(Color::GREEN));
    let mut backend = RecordingBackend::new();

    let stats = scene.draw(&mut backend);

    assert_eq!(stats.passes, 1);
    assert_eq!(stats.draws, 5);
    let expected: Vec<UniformValue> = [Color::GREEN, Color::RED, Color::BLUE, Color::GRAY, Color::BLACK]
        .into_iter()
        .map(|c| UniformValue::Vec4(c.to_vec4()))
        .collect();
    assert_eq!(backend.uniform_values("u_color"), expected);

    let depth: Vec<&BackendCall> = backend.calls.iter().filter(|c| matches!(c, BackendCall::SetDepthWrite(_))).collect();
    assert_eq!(depth, vec![&BackendCall::SetDepthWrite(false), &BackendCall::SetDepthWrite(true)]);
}

#[test]
fn test_render_groups_follow_masks() {
    let config = quiet_config();
    let mut scene = Scene::new("groups", &config);
    let (_, cam) = camera(&mut scene, &config);
    let (_, drawable) = drawable_at(&mut scene, "overlay", Vec3::new(0.0, 0.0, -5.0), Material::default());
    scene.drawable_mut(drawable).unwrap().set_render_group(3);

    assert_eq!(scene.draw(&mut RecordingBackend::new()).draws, 0);

    scene.camera_mut(cam).unwrap().set_mask(0b1001);
    scene.renderer_mut().set_mask(0b1001);
    let stats = scene.draw(&mut RecordingBackend::new());

    assert_eq!(stats.passes, 2);
    assert_eq!(stats.draws, 1);
}

#[test]
fn test_inactive_and_removed_drawables_are_not_drawn() {
    let config = quiet_config();
    let mut scene = Scene::new("hidden", &config);
    camera(&mut scene, &config);
    let (hidden, _) = drawable_at(&mut scene, "hidden", Vec3::new(0.0, 0.0, -5.0), Material::default());
    let (_, removed) = drawable_at(&mut scene, "removed", Vec3::new(0.0, 0.0, -6.0), Material::default());
    drawable_at(&mut scene, "shown", Vec3::new(0.0, 0.0, -7.0), Material::default());

    scene.set_active(hidden, false).unwrap();
    scene.remove_component(removed).unwrap();
    let mut backend = RecordingBackend::new();

    assert_eq!(scene.draw(&mut backend).draws, 1);
    assert_eq!(backend.draw_count(), 1);
}

#[test]
fn test_culling_skips_drawables_outside_the_view() {
    let mut config = quiet_config();
    config.render.culling = true;
    let mut scene = Scene::new("culling", &config);
    camera(&mut scene, &config);
    drawable_at(&mut scene, "ahead", Vec3::new(0.0, 0.0, -10.0), Material::default());
    drawable_at(&mut scene, "behind", Vec3::new(0.0, 0.0, 10.0), Material::default());
    scene.update(0.02);

    let stats = scene.draw(&mut RecordingBackend::new());

    assert_eq!(stats.draws, 1);
    assert_eq!(stats.culled, 1);
}

#[test]
fn test_drawable_uploads_camera_and_model() {
    let config = quiet_config();
    let mut scene = Scene::new("uniforms", &config);
    let (eye, _) = camera(&mut scene, &config);
    scene.object_mut(eye).unwrap().set_position(Vec3::new(0.0, 1.0, 0.0));
    drawable_at(&mut scene, "box", Vec3::new(0.0, 0.0, -5.0), Material::default());
    let mut backend = RecordingBackend::new();

    scene.draw(&mut backend);

    let Some(UniformValue::Vec3(position)) = backend.uniform_values("u_camera_position").first().copied() else {
        panic!("camera position was not uploaded");
    };
    assert_relative_eq!(position, Vec3::new(0.0, 1.0, 0.0));
    let Some(UniformValue::Mat4(model)) = backend.uniform_values("u_model").first().copied() else {
        panic!("model matrix was not uploaded");
    };
    assert_relative_eq!(model, scene.world_matrix(scene.find_child(scene.root(), "box", false).unwrap()).unwrap());
}

#[test]
fn test_environment_recorder_draws_every_face() {
    let mut scene = scene();
    let probe = scene.create_object("probe").unwrap();
    let recorder = scene.create_environment_recorder(probe, EnvironmentRecorder::new(128, 50.0)).unwrap();
    scene.create_drawable(probe, cube()).unwrap();
    drawable_at(&mut scene, "near", Vec3::new(0.0, 0.0, -5.0), Material::default());
    drawable_at(&mut scene, "far", Vec3::new(0.0, 0.0, -500.0), Material::default());

    let stats = scene.draw(&mut RecordingBackend::new());

    // The probe's own drawable and the far one stay out of the map
    assert_eq!(stats.passes, 6);
    assert_eq!(stats.draws, 6);
    assert_eq!(scene.renderer().bound_environment_recorders(), vec![recorder]);
}
