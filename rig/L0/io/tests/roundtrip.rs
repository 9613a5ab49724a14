//! Save-then-load round trips through real files.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use rig_core::{Constraint, RelaxSolver, Scene, Skeleton};
use rig_io::{Camera, ModelRef, SceneFile, SceneIoError, load_scene, save_scene};

fn skeleton() -> Skeleton {
    Skeleton::from_joints([
        ("pelvis", None, Vector3::new(0.0, 0.0, 10.0)),
        ("spine", Some(0), Vector3::new(0.0, 0.0, 14.0)),
        ("head", Some(1), Vector3::new(0.0, 0.0, 18.0)),
    ])
}

/// Two frames with both constraint kinds, posed away from rest so the
/// rotation rest matrix and snapshots are non-trivial.
fn authored_scene() -> Scene {
    let mut scene = Scene::with_skeleton(skeleton());
    for p in [
        Vector3::new(0.0, 0.0, 10.0),
        Vector3::new(2.0, 0.0, 10.0),
        Vector3::new(0.0, 2.0, 10.5),
        Vector3::new(0.1, 0.0, 14.0),
        Vector3::new(2.0, 0.3, 14.0),
        Vector3::new(0.0, 2.0, 14.2),
    ] {
        scene.add_particle(p, 1.0);
    }
    scene.set_radius(&[0], 2.5).unwrap();
    scene.toggle_pinned(&[3]).unwrap();
    scene.set_eye(5).unwrap();
    scene.add_frame([0, 1, 2]).unwrap();
    scene.add_frame([3, 4, 5]).unwrap();
    scene.add_distance_constraints(&[0, 3, 4]).unwrap();
    scene.add_rotation_constraint(0, 1, 35.0).unwrap();
    scene.save_positions(1).unwrap();
    scene.rotate_particles(&[3, 4, 5], 0.3, &Vector3::x(), None).unwrap();
    scene.bind_joint(0, 0, &[]).unwrap();
    scene.bind_joint(1, 1, &[3, 5]).unwrap();
    scene
}

#[test]
fn scene_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rig.txt");

    let mut file = SceneFile::new(authored_scene());
    file.camera = Some(Camera {
        origin: Vector3::new(10.0, -20.0, 15.0),
        yaw: 90.0,
        pitch: -15.0,
    });
    file.model = Some(ModelRef {
        scale: 1.5,
        name: "models/body.iqm".to_owned(),
    });
    save_scene(&file, &path).unwrap();

    let loaded = load_scene(&path, skeleton()).unwrap();
    assert_eq!(loaded.camera, file.camera);
    assert_eq!(loaded.model, file.model);
    assert!(loaded.unresolved_bindings.is_empty());

    let (a, b) = (&file.scene, &loaded.scene);
    assert_eq!(a.particles().len(), b.particles().len());
    for (p, q) in a.particles().iter().zip(b.particles()) {
        assert_relative_eq!(p.position, q.position, epsilon = 1e-12);
        assert_relative_eq!(p.radius(), q.radius());
        assert_eq!(p.is_pinned(), q.is_pinned());
        assert_eq!(p.is_eye(), q.is_eye());
        for (s, t) in p.snapshots.iter().zip(&q.snapshots) {
            assert_relative_eq!(*s, *t, epsilon = 1e-12);
        }
    }

    let topology = |s: &Scene| s.frames().iter().map(|f| f.particles()).collect::<Vec<_>>();
    assert_eq!(topology(a), topology(b));

    assert_eq!(a.constraints().len(), b.constraints().len());
    for (c, d) in a.constraints().iter().zip(b.constraints()) {
        match (c, d) {
            (Constraint::Distance(c), Constraint::Distance(d)) => {
                assert_eq!(c.particles, d.particles);
                assert_relative_eq!(c.distance, d.distance, epsilon = 1e-12);
            }
            (Constraint::Rotation(c), Constraint::Rotation(d)) => {
                assert_eq!(c.frames, d.frames);
                assert_relative_eq!(c.max_angle, d.max_angle, epsilon = 1e-12);
                assert_relative_eq!(c.rest, d.rest, epsilon = 1e-12);
            }
            _ => panic!("constraint kinds differ: {c:?} vs {d:?}"),
        }
    }

    for (j, k) in a.skeleton().joints().iter().zip(b.skeleton().joints()) {
        assert_eq!(j.is_bound(), k.is_bound());
        assert_relative_eq!(j.position(), k.position(), epsilon = 1e-9);
    }
}

#[test]
fn loaded_scene_simulates_like_the_saved_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rig.txt");
    let mut saved = authored_scene();
    // Motion state is not persisted
    saved.stop();
    save_scene(&SceneFile::new(saved.clone()), &path).unwrap();
    let mut loaded = load_scene(&path, skeleton()).unwrap().scene;

    let mut s1 = RelaxSolver::default();
    let mut s2 = RelaxSolver::default();
    for _ in 0..30 {
        s1.step(&mut saved, 1.0 / 60.0);
        s2.step(&mut loaded, 1.0 / 60.0);
    }
    for (p, q) in saved.particles().iter().zip(loaded.particles()) {
        assert_relative_eq!(p.position, q.position, epsilon = 1e-9);
    }
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_scene(dir.path().join("nope.txt"), Skeleton::new()).unwrap_err();
    assert!(matches!(err, SceneIoError::FileNotFound { .. }));
}

#[test]
fn binary_file_is_invalid_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rig.bin");
    std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();
    let err = load_scene(&path, Skeleton::new()).unwrap_err();
    assert!(matches!(err, SceneIoError::InvalidContent { .. }));
}
