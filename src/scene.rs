//! Scene setup and the per-frame loop.
//!
//! [`Scene::setup`] loads every model once, records one command block per
//! model and places the player. [`Scene::frame`] then runs, in this order:
//!
//! 1. input
//! 2. motion integration
//! 3. collision resolution
//! 4. transform commit
//! 5. animation and joint matrices
//! 6. camera and view
//! 7. lights
//! 8. block submission

use std::{collections::HashMap, sync::Arc};

use anyhow::Context as _;
use cgmath::{Vector3, Zero};

use crate::{
    animation::AnimationPlayer,
    camera::{self, Camera, CameraRig, ViewSetup},
    collision::{CollisionResolver, Resolution, Surface, SurfaceQuery},
    context::FrameContext,
    data_structures::{
        character::Character,
        colour::Colour,
        drawable::Drawable,
        transform::{Transform, TransformOverride},
    },
    input::{InputFrame, InputSource},
    motion::{MotionConfig, MotionStep},
    render::{CommandExecutor, CommandRecorder, DrawMode},
    resources::AssetSource,
};

/// Feature switches and tuning for the frame loop.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    /// Integrate stick input into motion.
    pub movement: bool,
    /// Mix the secondary animation into the base pose.
    pub blending: bool,
    /// Initial blend weight of the player.
    pub blend_weight: f32,
    pub motion: MotionConfig,
    pub collision: CollisionResolver,
    /// Damp the camera with the rig's smoothness instead of snapping.
    pub camera_smoothing: bool,
    pub directional_lights: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            movement: true,
            blending: false,
            blend_weight: 0.0,
            motion: MotionConfig::default(),
            collision: CollisionResolver::default(),
            camera_smoothing: true,
            directional_lights: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlayerDesc {
    pub model: String,
    pub spawn: Vector3<f32>,
    pub rotation: f32,
    pub scale: Vector3<f32>,
    pub tint: Colour,
    pub rig: CameraRig,
    /// Clip driving the skeleton, with its start time and whether it plays.
    pub base_clip: Option<(String, f32, bool)>,
    /// Clip mixed in when blending is enabled; always playing.
    pub secondary_clip: Option<String>,
}

impl Default for PlayerDesc {
    fn default() -> Self {
        Self {
            model: "snake.glb".into(),
            spawn: Vector3::new(-50.0, 0.0, 50.0),
            rotation: 0.0,
            scale: Vector3::new(10.0, 10.0, 10.0),
            tint: Colour::rgb(220, 100, 100),
            rig: CameraRig::default(),
            base_clip: Some(("Snake_Idle".into(), 1.0, true)),
            secondary_clip: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PropDesc {
    pub model: String,
    pub placement: TransformOverride,
    pub tint: Colour,
}

/// Everything [`Scene::setup`] loads.
#[derive(Clone, Debug)]
pub struct SceneDesc {
    pub player: PlayerDesc,
    pub props: Vec<PropDesc>,
}

impl Default for SceneDesc {
    fn default() -> Self {
        Self {
            player: PlayerDesc::default(),
            props: vec![PropDesc {
                model: "map.obj".into(),
                placement: TransformOverride {
                    scale: Some(Vector3::new(0.1, 0.1, 0.1)),
                    ..Default::default()
                },
                tint: Colour::WHITE,
            }],
        }
    }
}

/// What happened during one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub dt: f32,
    pub position: Vector3<f32>,
    pub rotation: f32,
    /// The desired move was corrected by collision.
    pub blocked: bool,
    pub camera: Camera,
    pub submitted: usize,
}

#[derive(Debug)]
pub struct Scene<B> {
    pub player: Character<B>,
    pub props: Vec<Drawable<B>>,
    pub config: SceneConfig,
}

impl<B> Scene<B> {
    /// Load and record everything in `desc`.
    ///
    /// Asset failures come back as an [`AssetError`](crate::resources::AssetError)
    /// inside the error chain. A spawn point the level reports as blocked or
    /// out of bounds is an error too.
    pub fn setup<A, R, G>(
        assets: &A,
        recorder: &mut R,
        desc: &SceneDesc,
        geometry: &G,
        config: SceneConfig,
    ) -> anyhow::Result<Self>
    where
        A: AssetSource + ?Sized,
        R: CommandRecorder<Block = B>,
        G: SurfaceQuery + ?Sized,
    {
        let player_desc = &desc.player;
        let model = assets
            .load_model(&player_desc.model)
            .with_context(|| format!("loading player model '{}'", player_desc.model))?;
        model.ensure_meshes()?;
        let skeleton = model.skeleton()?;
        let block = Arc::new(
            recorder
                .record(&model, DrawMode::Skinned)
                .with_context(|| format!("recording '{}'", model.name))?,
        );

        let mut spawn = player_desc.spawn;
        match geometry.surface_at(spawn.x, spawn.z) {
            Surface::Open { ground } => {
                if config.collision.ground_snap {
                    spawn.y = ground;
                }
            }
            other => anyhow::bail!("player spawn {:?} is not walkable ({:?})", spawn, other),
        }
        let mut transform = Transform::from(spawn).with_scale(player_desc.scale)?;
        transform.rotation = player_desc.rotation;

        let mut player = Character::new(
            Drawable::new(block, transform, player_desc.tint),
            skeleton,
            player_desc.rig.clone(),
        );
        if let Some((clip, time, playing)) = &player_desc.base_clip {
            let mut base = AnimationPlayer::new(model.clip(clip)?);
            base.set_time(*time);
            base.set_playing(*playing);
            player.base = Some(base);
        }
        if let Some(clip) = &player_desc.secondary_clip {
            let mut secondary = AnimationPlayer::new(model.clip(clip)?);
            secondary.set_playing(true);
            player.secondary = Some(secondary);
        }
        player.blend_weight = config.blend_weight;
        player.animate(0.0, config.blending);
        log::info!("player '{}' placed at {:?}", model.name, spawn);

        let mut blocks: HashMap<&str, Arc<B>> = HashMap::new();
        let mut props = Vec::with_capacity(desc.props.len());
        for prop in &desc.props {
            let block = match blocks.get(prop.model.as_str()) {
                Some(block) => block.clone(),
                None => {
                    let model = assets
                        .load_model(&prop.model)
                        .with_context(|| format!("loading prop '{}'", prop.model))?;
                    let block = Arc::new(
                        recorder
                            .record(&model, DrawMode::Static)
                            .with_context(|| format!("recording '{}'", model.name))?,
                    );
                    blocks.insert(&prop.model, block.clone());
                    block
                }
            };
            let mut drawable = Drawable::new(block, Transform::new(), prop.tint);
            drawable.set_model_transform(&prop.placement);
            props.push(drawable);
        }
        log::info!(
            "scene ready: {} props from {} recorded blocks",
            props.len(),
            blocks.len() + 1
        );

        Ok(Self {
            player,
            props,
            config,
        })
    }

    /// Run one frame with explicit input and frame time.
    pub fn frame<E, G>(
        &mut self,
        ctx: &mut FrameContext,
        input: &InputFrame,
        dt: f32,
        geometry: &G,
        executor: &mut E,
    ) -> FrameReport
    where
        E: CommandExecutor<Block = B>,
        G: SurfaceQuery + ?Sized,
    {
        ctx.frame += 1;
        log::trace!("frame {} dt {}", ctx.frame, dt);

        let transform = &mut self.player.mesh.transform;
        let step = if self.config.movement {
            self.config
                .motion
                .integrate(input.stick, transform.rotation, dt)
        } else {
            MotionStep {
                delta: Vector3::zero(),
                rotation: transform.rotation,
                velocity: Vector3::zero(),
            }
        };

        let from = transform.position;
        let resolution = if step.delta == Vector3::zero() {
            Resolution {
                position: from,
                blocked: false,
            }
        } else {
            self.config
                .collision
                .resolve(from, from + step.delta, geometry)
        };
        if resolution.blocked {
            log::debug!("move from {:?} corrected to {:?}", from, resolution.position);
        }

        transform.rotation = step.rotation;
        transform.position = resolution.position;
        self.player.velocity = if resolution.blocked && dt.is_finite() && dt > 0.0 {
            (resolution.position - from) / dt
        } else {
            step.velocity
        };
        self.player.mesh.commit();

        self.player.animate(dt, self.config.blending);

        let solved = camera::solve(&self.player.mesh.transform, &self.player.rig);
        let camera = match ctx.camera {
            Some(previous) if self.config.camera_smoothing => {
                previous.smooth_towards(solved, self.player.rig.smoothness, dt)
            }
            _ => solved,
        };
        ctx.camera = Some(camera);
        executor.begin_frame(ctx.clear_colour, &ctx.light.fog);
        executor.set_view(&ViewSetup::new(camera, &ctx.projection), &ctx.viewport);

        ctx.light.update(self.config.directional_lights);
        executor.set_lights(&ctx.light);

        self.player
            .mesh
            .submit(executor, self.player.skeleton.matrices());
        for prop in &self.props {
            prop.submit(executor, None);
        }
        executor.end_frame();

        FrameReport {
            frame: ctx.frame,
            dt,
            position: self.player.mesh.transform.position,
            rotation: self.player.mesh.transform.rotation,
            blocked: resolution.blocked,
            camera,
            submitted: 1 + self.props.len(),
        }
    }

    /// Poll `input`, measure the frame time and run [`Scene::frame`].
    pub fn step<E, G, I>(
        &mut self,
        ctx: &mut FrameContext,
        input: &mut I,
        geometry: &G,
        executor: &mut E,
    ) -> FrameReport
    where
        E: CommandExecutor<Block = B>,
        G: SurfaceQuery + ?Sized,
        I: InputSource + ?Sized,
    {
        let frame = input.poll();
        let dt = ctx.timer.tick();
        self.frame(ctx, &frame, dt, geometry, executor)
    }
}
