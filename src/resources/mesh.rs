use std::io::{BufReader, Cursor};

use super::{AssetError, ModelAsset};

/// Vertex layout shared by static and skinned meshes.
///
/// Static meshes bind every vertex fully to joint 0; executors supply an
/// identity matrix there.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub joints: [u32; 4],
    pub weights: [f32; 4],
}

impl Vertex {
    pub fn rigid(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
            joints: [0; 4],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Fails if an index points past the vertex list or the list isn't made of triangles.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "mesh '{}' has {} indices, not a triangle list",
                self.name,
                self.indices.len()
            ));
        }
        match self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            Some(i) => Err(format!(
                "mesh '{}' indexes vertex {} of {}",
                self.name,
                i,
                self.vertices.len()
            )),
            None => Ok(()),
        }
    }
}

/// Parse a Wavefront OBJ. Materials are ignored; tints are set per drawable.
pub fn parse_obj(file_name: &str, bytes: &[u8]) -> Result<ModelAsset, AssetError> {
    let mut reader = BufReader::new(Cursor::new(bytes));
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Ok(Default::default()),
    )
    .map_err(|e| AssetError::corrupt(file_name, e))?;

    let meshes = models
        .iter()
        .map(|m| {
            let vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| {
                    Vertex::rigid(
                        [
                            m.mesh.positions[i * 3],
                            m.mesh.positions[i * 3 + 1],
                            m.mesh.positions[i * 3 + 2],
                        ],
                        [
                            m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                            m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                            m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                        ],
                        [
                            m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                            1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                        ],
                    )
                })
                .collect();
            let mesh = MeshData {
                name: m.name.clone(),
                vertices,
                indices: m.mesh.indices.clone(),
            };
            mesh.validate()
                .map_err(|reason| AssetError::corrupt(file_name, reason))?;
            Ok(mesh)
        })
        .collect::<Result<Vec<_>, AssetError>>()?;

    Ok(ModelAsset {
        name: file_name.to_string(),
        meshes,
        skeleton: None,
        clips: Vec::new(),
    })
}

/// Read every triangle primitive of a glTF document.
///
/// `joint_remap` maps skin joint slots to skeleton joint indices.
pub(crate) fn read_gltf_meshes(
    file_name: &str,
    document: &gltf::Gltf,
    buffers: &[Vec<u8>],
    joint_remap: Option<&[usize]>,
) -> Result<Vec<MeshData>, AssetError> {
    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "skipping non-triangle primitive {} of mesh {} in {}",
                    primitive.index(),
                    mesh.index(),
                    file_name
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| AssetError::corrupt(file_name, "primitive without positions"))?
                .collect();
            let normals: Vec<[f32; 3]> = reader.read_normals().map(|n| n.collect()).unwrap_or_default();
            let tex_coords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_default();
            let joints: Vec<[u16; 4]> = reader
                .read_joints(0)
                .map(|j| j.into_u16().collect())
                .unwrap_or_default();
            let weights: Vec<[f32; 4]> = reader
                .read_weights(0)
                .map(|w| w.into_f32().collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let mut vertices = Vec::with_capacity(positions.len());
            for (i, position) in positions.iter().enumerate() {
                let mut vertex = Vertex::rigid(
                    *position,
                    normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                );
                if let (Some(remap), Some(j), Some(w)) = (joint_remap, joints.get(i), weights.get(i)) {
                    for slot in 0..4 {
                        vertex.joints[slot] = *remap.get(j[slot] as usize).ok_or_else(|| {
                            AssetError::corrupt(file_name, format!("vertex joint {} out of range", j[slot]))
                        })? as u32;
                    }
                    vertex.weights = *w;
                }
                vertices.push(vertex);
            }

            let data = MeshData {
                name: mesh
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("mesh{}", mesh.index())),
                vertices,
                indices,
            };
            data.validate()
                .map_err(|reason| AssetError::corrupt(file_name, reason))?;
            meshes.push(data);
        }
    }
    Ok(meshes)
}
