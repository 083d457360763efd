use approx::assert_relative_eq;
use pawn_ngin::{
    Vector3,
    data_structures::{colour::Colour, transform::TransformOverride},
    input::InputFrame,
    render::headless::{Command, HeadlessExecutor},
    scene::{PropDesc, Scene, SceneConfig, SceneDesc},
};

use crate::common::test_utils::{Harness, MemoryAssets, open_field};

mod common;

const DT: f32 = 1.0 / 60.0;

fn two_maps() -> SceneDesc {
    let mut desc = SceneDesc::default();
    desc.props.push(PropDesc {
        model: "map.obj".into(),
        placement: TransformOverride {
            translate: Some(Vector3::new(0.0, -5.0, 0.0)),
            ..Default::default()
        },
        tint: Colour::rgb(10, 20, 30),
    });
    desc
}

#[test]
fn frame_commands_follow_the_stage_order() {
    let mut harness = Harness::new(&two_maps(), SceneConfig::default());
    let geometry = open_field();
    for _ in 0..3 {
        harness.scene.frame(
            &mut harness.ctx,
            &InputFrame::stick(0.0, 127.0),
            DT,
            &geometry,
            &mut harness.executor,
        );
        let frame = harness.executor.last_frame();
        assert_eq!(frame.len(), 7);
        assert!(matches!(frame[0], Command::BeginFrame { clear_colour } if clear_colour == Colour::rgb(160, 110, 200)));
        assert!(matches!(frame[1], Command::SetView { .. }));
        assert!(matches!(frame[2], Command::SetLights { active: 1 }));
        assert!(matches!(frame[3], Command::RunBlock { block: 0, joints: Some(_), .. }));
        assert!(matches!(frame[4], Command::RunBlock { block: 1, joints: None, .. }));
        assert!(matches!(frame[5], Command::RunBlock { block: 1, joints: None, .. }));
        assert!(matches!(frame[6], Command::EndFrame));
    }
    assert_eq!(harness.executor.commands.len(), 21);
}

#[test]
fn each_model_is_recorded_once() {
    let mut harness = Harness::new(&two_maps(), SceneConfig::default());
    let geometry = open_field();
    assert_eq!(harness.executor.recorded, vec!["snake.glb", "map.obj"]);
    for _ in 0..10 {
        harness.scene.frame(
            &mut harness.ctx,
            &InputFrame::stick(30.0, 127.0),
            DT,
            &geometry,
            &mut harness.executor,
        );
    }
    assert_eq!(harness.executor.recorded.len(), 2);
    let props = &harness.scene.props;
    assert!(std::sync::Arc::ptr_eq(props[0].block(), props[1].block()));
}

#[test]
fn submitted_joints_are_this_frames_matrices() {
    let mut harness = Harness::new(&SceneDesc::default(), SceneConfig::default());
    let geometry = open_field();
    let mut previous = None;
    for _ in 0..4 {
        harness.scene.frame(
            &mut harness.ctx,
            &InputFrame::default(),
            0.25,
            &geometry,
            &mut harness.executor,
        );
        let skeleton = &harness.scene.player.skeleton;
        assert!(!skeleton.is_stale());
        let expected: Vec<[[f32; 4]; 4]> = skeleton
            .matrices()
            .unwrap()
            .iter()
            .map(|&m| m.into())
            .collect();
        let Command::RunBlock { joints: Some(joints), .. } = &harness.executor.last_frame()[3]
        else {
            panic!("player block not submitted with joints");
        };
        assert_eq!(joints, &expected);
        // the idle clip bobs the root, so consecutive frames differ
        assert_ne!(previous.as_ref(), Some(joints));
        previous = Some(joints.clone());
    }
}

#[test]
fn material_follows_the_committed_transform() {
    let mut harness = Harness::new(&two_maps(), SceneConfig::default());
    let geometry = open_field();
    let report = harness.scene.frame(
        &mut harness.ctx,
        &InputFrame::stick(0.0, 127.0),
        DT,
        &geometry,
        &mut harness.executor,
    );
    let frame = harness.executor.last_frame();
    let Command::RunBlock { material, tint, .. } = &frame[3] else {
        panic!("expected the player block");
    };
    assert_relative_eq!(material.translation(), report.position, epsilon = 1e-5);
    assert_eq!(*tint, Colour::rgb(220, 100, 100));

    let Command::RunBlock { material, tint, .. } = &frame[5] else {
        panic!("expected the second prop");
    };
    assert_eq!(material.translation(), Vector3::new(0.0, -5.0, 0.0));
    assert_eq!(*tint, Colour::rgb(10, 20, 30));
}

#[test]
fn light_count_is_clamped_to_slots() {
    let config = SceneConfig {
        directional_lights: 9,
        ..Default::default()
    };
    let mut harness = Harness::new(&SceneDesc::default(), config);
    harness.scene.frame(
        &mut harness.ctx,
        &InputFrame::default(),
        DT,
        &open_field(),
        &mut harness.executor,
    );
    assert!(matches!(harness.executor.last_frame()[2], Command::SetLights { active: 4 }));
    assert_eq!(harness.ctx.light.active, 4);
}

#[test]
fn blending_mixes_the_secondary_clip() {
    let mut desc = SceneDesc::default();
    desc.player.secondary_clip = Some("Snake_Walk".into());
    let config = SceneConfig {
        blending: true,
        blend_weight: 0.5,
        ..Default::default()
    };
    let mut harness = Harness::new(&desc, config);
    harness.scene.frame(
        &mut harness.ctx,
        &InputFrame::default(),
        0.0,
        &open_field(),
        &mut harness.executor,
    );
    // idle at t=1 puts the root at (0, 0.5, 0), walk holds it at (4, 0, 0)
    let root = &harness.scene.player.skeleton.pose().joints[0];
    assert_relative_eq!(root.translation, Vector3::new(2.0, 0.25, 0.0), epsilon = 1e-6);
    let m = harness.scene.player.joint_matrices().unwrap()[0];
    assert_relative_eq!(m.w.x, 2.0, epsilon = 1e-6);
}

#[test]
fn setup_alone_submits_nothing() {
    let mut executor = HeadlessExecutor::new();
    let scene = Scene::setup(
        &MemoryAssets::new(),
        &mut executor,
        &SceneDesc::default(),
        &open_field(),
        SceneConfig::default(),
    )
    .unwrap();
    assert!(executor.commands.is_empty());
    assert!(scene.player.joint_matrices().is_some());
    assert_eq!(scene.player.base.as_ref().unwrap().time(), 1.0);
}
