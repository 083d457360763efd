//! glTF skins and animations.
//!
//! The first skin of a document becomes the model's [`Skeleton`]. Joints are
//! reordered so that parents come before their children; vertex joint
//! indices and animation channels are remapped to that order.

use std::{collections::HashMap, sync::Arc};

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};

use super::{AssetError, ModelAsset, mesh};
use crate::{
    animation::{AnimationClip, Channel, Keyframes},
    data_structures::skeleton::{Joint, Pose, Skeleton},
};

fn quaternion([x, y, z, w]: [f32; 4]) -> Quaternion<f32> {
    Quaternion::new(w, x, y, z)
}

/// Parse a `.gltf` or `.glb` document. External buffers are fetched with `load_uri`.
pub fn parse_gltf(
    file_name: &str,
    bytes: &[u8],
    load_uri: impl Fn(&str) -> Result<Vec<u8>, AssetError>,
) -> Result<ModelAsset, AssetError> {
    let document = gltf::Gltf::from_slice(bytes).map_err(|e| AssetError::corrupt(file_name, e))?;

    let mut buffers = Vec::new();
    for buffer in document.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match document.blob.as_deref() {
                Some(blob) => buffers.push(blob.to_vec()),
                None => return Err(AssetError::corrupt(file_name, "missing binary chunk")),
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                return Err(AssetError::corrupt(file_name, "embedded data URIs are not supported"));
            }
            gltf::buffer::Source::Uri(uri) => buffers.push(load_uri(uri)?),
        }
    }

    let (skeleton, joint_of_node, remap) = match document.skins().next() {
        Some(skin) => {
            let rig = read_skeleton(file_name, &document, &skin, &buffers)?;
            (Some(rig.skeleton), rig.joint_of_node, Some(rig.remap))
        }
        None => (None, HashMap::new(), None),
    };
    if document.skins().count() > 1 {
        log::warn!("{} has several skins, only the first one is used", file_name);
    }

    let meshes = mesh::read_gltf_meshes(file_name, &document, &buffers, remap.as_deref())?;
    let clips = read_clips(&document, &buffers, &joint_of_node);

    Ok(ModelAsset {
        name: file_name.to_string(),
        meshes,
        skeleton,
        clips,
    })
}

struct Rig {
    skeleton: Skeleton,
    /// glTF node index to skeleton joint index.
    joint_of_node: HashMap<usize, usize>,
    /// Skin joint slot to skeleton joint index.
    remap: Vec<usize>,
}

fn read_skeleton(
    file_name: &str,
    document: &gltf::Gltf,
    skin: &gltf::Skin,
    buffers: &[Vec<u8>],
) -> Result<Rig, AssetError> {
    let joints: Vec<gltf::Node> = skin.joints().collect();
    let slot_of_node: HashMap<usize, usize> = joints
        .iter()
        .enumerate()
        .map(|(slot, node)| (node.index(), slot))
        .collect();
    let mut parent_of_node = HashMap::new();
    for node in document.nodes() {
        for child in node.children() {
            parent_of_node.insert(child.index(), node.index());
        }
    }

    // nearest ancestor that is also part of the skin
    let skin_parent = |node: usize| {
        let mut current = parent_of_node.get(&node);
        let mut hops = 0;
        while let Some(&parent) = current {
            if let Some(&slot) = slot_of_node.get(&parent) {
                return Some(slot);
            }
            hops += 1;
            if hops > parent_of_node.len() {
                break;
            }
            current = parent_of_node.get(&parent);
        }
        None
    };
    let slot_parents: Vec<Option<usize>> = joints.iter().map(|j| skin_parent(j.index())).collect();

    let depth = |slot: usize| {
        let mut depth = 0;
        let mut current = slot_parents[slot];
        while let Some(parent) = current {
            depth += 1;
            if depth > joints.len() {
                break;
            }
            current = slot_parents[parent];
        }
        depth
    };
    let mut order: Vec<usize> = (0..joints.len()).collect();
    order.sort_by_key(|&slot| depth(slot));
    let mut remap = vec![0; joints.len()];
    for (index, &slot) in order.iter().enumerate() {
        remap[slot] = index;
    }

    let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let slot_inverse_bind: Vec<Matrix4<f32>> = match reader.read_inverse_bind_matrices() {
        Some(matrices) => matrices.map(Matrix4::from).collect(),
        None => vec![Matrix4::identity(); joints.len()],
    };
    if slot_inverse_bind.len() != joints.len() {
        return Err(AssetError::corrupt(
            file_name,
            format!(
                "{} inverse bind matrices for {} joints",
                slot_inverse_bind.len(),
                joints.len()
            ),
        ));
    }

    let mut names = Vec::with_capacity(joints.len());
    let mut parents = Vec::with_capacity(joints.len());
    let mut inverse_bind = Vec::with_capacity(joints.len());
    let mut rest = Vec::with_capacity(joints.len());
    for &slot in &order {
        let node = &joints[slot];
        let (translation, rotation, scale) = node.transform().decomposed();
        names.push(
            node.name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("joint{}", slot)),
        );
        parents.push(slot_parents[slot].map(|p| remap[p]));
        inverse_bind.push(slot_inverse_bind[slot]);
        rest.push(Joint {
            translation: Vector3::from(translation),
            rotation: quaternion(rotation),
            scale: Vector3::from(scale),
        });
    }

    let skeleton = Skeleton::new(names, parents, inverse_bind, Pose::new(rest)).map_err(|source| {
        AssetError::Skeleton {
            name: file_name.to_string(),
            source,
        }
    })?;
    let joint_of_node = joints
        .iter()
        .enumerate()
        .map(|(slot, node)| (node.index(), remap[slot]))
        .collect();
    Ok(Rig {
        skeleton,
        joint_of_node,
        remap,
    })
}

fn read_clips(
    document: &gltf::Gltf,
    buffers: &[Vec<u8>],
    joint_of_node: &HashMap<usize, usize>,
) -> Vec<Arc<AnimationClip>> {
    let mut clips = Vec::new();
    for animation in document.animations() {
        let mut channels = Vec::new();
        for channel in animation.channels() {
            let Some(&joint) = joint_of_node.get(&channel.target().node().index()) else {
                continue;
            };
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let timestamps: Vec<f32> = match reader.read_inputs() {
                Some(inputs) => inputs.collect(),
                None => {
                    log::warn!("no timestamps in channel {}", channel.index());
                    Vec::new()
                }
            };
            let keyframes = match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(translation)) => {
                    Keyframes::Translation(translation.map(Vector3::from).collect())
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(rotation)) => {
                    Keyframes::Rotation(rotation.into_f32().map(quaternion).collect())
                }
                Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
                    Keyframes::Scale(scales.map(Vector3::from).collect())
                }
                Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) | None => {
                    Keyframes::Other
                }
            };
            channels.push(Channel {
                joint,
                timestamps,
                keyframes,
            });
        }
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation{}", animation.index()));
        clips.push(Arc::new(AnimationClip::new(name, channels)));
    }
    clips
}

#[cfg(test)]
mod tests {
    use super::*;

    // skin lists the head before its parents
    const RIG: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "root", "children": [1] },
            { "name": "spine", "translation": [0.0, 1.0, 0.0], "children": [2] },
            { "name": "head", "translation": [0.0, 1.0, 0.0] }
        ],
        "skins": [{ "joints": [2, 0, 1] }]
    }"#;

    fn no_buffers(uri: &str) -> Result<Vec<u8>, AssetError> {
        Err(AssetError::NotFound(uri.to_string()))
    }

    #[test]
    fn reorders_joints_parent_first() {
        let model = parse_gltf("rig.gltf", RIG.as_bytes(), no_buffers).unwrap();
        let skeleton = model.skeleton().unwrap();
        assert_eq!(skeleton.names(), ["root", "spine", "head"]);
        assert_eq!(skeleton.parents(), [None, Some(0), Some(1)]);
        assert_eq!(
            skeleton.rest_pose().joints[2].translation,
            Vector3::new(0.0, 1.0, 0.0)
        );
        assert!(model.meshes.is_empty());
        assert!(model.clips.is_empty());
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = parse_gltf("bad.gltf", b"{ not json", no_buffers).unwrap_err();
        assert!(matches!(err, AssetError::Corrupt { .. }));
    }
}
