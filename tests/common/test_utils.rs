use std::{collections::HashMap, sync::Arc};

use pawn_ngin::{
    Matrix4, SquareMatrix, Vector3, Zero,
    animation::{AnimationClip, Channel, Keyframes},
    collision::{HeightField, ObstacleField, Rect},
    context::FrameContext,
    data_structures::skeleton::{Joint, Pose, Skeleton},
    render::headless::{HeadlessBlock, HeadlessExecutor},
    resources::{AssetError, AssetSource, MeshData, ModelAsset, Vertex},
    scene::{Scene, SceneConfig, SceneDesc},
};

/// Serves models from memory, keyed by file name.
pub(crate) struct MemoryAssets {
    models: HashMap<String, ModelAsset>,
}

impl MemoryAssets {
    /// A skinned "snake.glb" and a static "map.obj", the names the default scene asks for.
    pub fn new() -> Self {
        let mut models = HashMap::new();
        models.insert("snake.glb".to_string(), snake());
        models.insert("map.obj".to_string(), static_model("map.obj"));
        Self { models }
    }

    pub fn without(mut self, name: &str) -> Self {
        self.models.remove(name);
        self
    }

    pub fn with(mut self, model: ModelAsset) -> Self {
        self.models.insert(model.name.clone(), model);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn load_model(&self, name: &str) -> Result<ModelAsset, AssetError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}

fn triangle(name: &str) -> MeshData {
    MeshData {
        name: name.to_string(),
        vertices: vec![
            Vertex::rigid([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex::rigid([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::rigid([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 1.0]),
        ],
        indices: vec![0, 2, 1],
    }
}

pub(crate) fn static_model(name: &str) -> ModelAsset {
    ModelAsset {
        name: name.to_string(),
        meshes: vec![triangle(name)],
        skeleton: None,
        clips: Vec::new(),
    }
}

/// Root joint with a tail one unit along +X.
pub(crate) fn snake_skeleton() -> Skeleton {
    let tail = Joint {
        translation: Vector3::new(1.0, 0.0, 0.0),
        ..Joint::identity()
    };
    Skeleton::new(
        vec!["root".into(), "tail".into()],
        vec![None, Some(0)],
        vec![Matrix4::identity(); 2],
        Pose::new(vec![Joint::identity(), tail]),
    )
    .unwrap()
}

/// Root bobs from 0 to 1 on Y over two seconds.
pub(crate) fn idle_clip() -> AnimationClip {
    AnimationClip::new(
        "Snake_Idle",
        vec![Channel {
            joint: 0,
            timestamps: vec![0.0, 2.0],
            keyframes: Keyframes::Translation(vec![Vector3::zero(), Vector3::new(0.0, 1.0, 0.0)]),
        }],
    )
}

/// Root held four units along +X.
pub(crate) fn walk_clip() -> AnimationClip {
    AnimationClip::new(
        "Snake_Walk",
        vec![Channel {
            joint: 0,
            timestamps: vec![0.0, 1.0],
            keyframes: Keyframes::Translation(vec![Vector3::new(4.0, 0.0, 0.0); 2]),
        }],
    )
}

fn snake() -> ModelAsset {
    ModelAsset {
        name: "snake.glb".to_string(),
        meshes: vec![triangle("snake")],
        skeleton: Some(snake_skeleton()),
        clips: vec![Arc::new(idle_clip()), Arc::new(walk_clip())],
    }
}

/// 200x200 open field centred on the origin, 10 unit cells.
pub(crate) fn open_field() -> HeightField {
    HeightField::flat(-100.0, -100.0, 10.0, 20, 20, 0.0).unwrap()
}

/// Open field with a wall filling `-30 <= x < -20`.
pub(crate) fn walled_field() -> HeightField {
    let mut field = open_field();
    for row in 0..field.rows() {
        field.block(7, row);
    }
    field
}

/// Same wall as [`walled_field`], built from obstacles.
pub(crate) fn walled_obstacles() -> ObstacleField {
    ObstacleField::new(Rect::new(-100.0, -100.0, 100.0, 100.0), 0.0)
        .with_obstacle(Rect::new(-30.0, -100.0, -20.0, 100.0))
}

pub(crate) struct Harness {
    pub scene: Scene<HeadlessBlock>,
    pub ctx: FrameContext,
    pub executor: HeadlessExecutor,
}

impl Harness {
    pub fn new(desc: &SceneDesc, config: SceneConfig) -> Self {
        Self::on(desc, config, &open_field())
    }

    pub fn on<G: pawn_ngin::collision::SurfaceQuery>(
        desc: &SceneDesc,
        config: SceneConfig,
        geometry: &G,
    ) -> Self {
        let mut executor = HeadlessExecutor::new();
        let scene = Scene::setup(&MemoryAssets::new(), &mut executor, desc, geometry, config)
            .expect("scene setup");
        Self {
            scene,
            ctx: FrameContext::default(),
            executor,
        }
    }
}
