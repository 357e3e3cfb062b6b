//! glTF 2.0 import.
//!
//! The default scene is flattened into mesh parts: node transforms are
//! accumulated into each part's local matrix and materials are reduced to
//! their metallic-roughness factors.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use gltf::buffer;

use crate::error::AssetError;
use crate::geometry::{MeshData, VERTEX_STRIDE};
use crate::scene::{MeshPart, StandardMaterial};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub name: String,
    pub parts: Vec<MeshPart>,
}

impl LoadedModel {
    /// Decodes a `.glb` or a self-contained `.gltf` document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        Self::from_slice_with_base(bytes, None)
    }

    /// Like [`LoadedModel::from_slice`], resolving relative buffer URIs
    /// against `base`.
    pub fn from_slice_with_base(bytes: &[u8], base: Option<&Path>) -> Result<Self, AssetError> {
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
        let buffers = gltf::import_buffers(&document, base, blob)?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| AssetError::Model("document has no scenes".into()))?;
        let name = scene.name().unwrap_or("model").to_string();

        let mut importer = Importer {
            buffers: &buffers,
            meshes: HashMap::new(),
            parts: Vec::new(),
        };
        for node in scene.nodes() {
            importer.visit(&node, Mat4::IDENTITY);
        }

        if importer.parts.is_empty() {
            return Err(AssetError::Model(format!(
                "scene {name:?} contains no triangle meshes"
            )));
        }
        Ok(Self {
            name,
            parts: importer.parts,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|part| part.mesh.triangle_count()).sum()
    }
}

struct Importer<'a> {
    buffers: &'a [buffer::Data],
    /// Decoded primitives keyed by (mesh, primitive) index, shared between
    /// nodes instancing the same mesh.
    meshes: HashMap<(usize, usize), Arc<MeshData>>,
    parts: Vec<MeshPart>,
}

impl Importer<'_> {
    fn visit(&mut self, node: &gltf::Node<'_>, parent: Mat4) {
        let local = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::debug!(
                        "skipping {:?} primitive {} of mesh {}",
                        primitive.mode(),
                        primitive.index(),
                        mesh.index()
                    );
                    continue;
                }
                let key = (mesh.index(), primitive.index());
                let data = match self.meshes.get(&key).cloned() {
                    Some(data) => data,
                    None => {
                        let Some(data) = self.decode(&primitive) else {
                            continue;
                        };
                        let data = Arc::new(data);
                        self.meshes.insert(key, Arc::clone(&data));
                        data
                    }
                };
                self.parts.push(MeshPart {
                    mesh: data,
                    material: material(&primitive.material()),
                    local,
                });
            }
        }

        for child in node.children() {
            self.visit(&child, local);
        }
    }

    fn decode(&self, primitive: &gltf::Primitive<'_>) -> Option<MeshData> {
        let buffers = self.buffers;
        let reader = primitive.reader(move |buffer| buffers.get(buffer.index()).map(|data| &**data));

        let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
        if positions.is_empty() {
            return None;
        }
        let normals: Option<Vec<[f32; 3]>> = reader
            .read_normals()
            .map(|normals| normals.collect::<Vec<_>>())
            .filter(|normals| normals.len() == positions.len());
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if indices.iter().any(|&i| i as usize >= positions.len()) {
            log::warn!("primitive {} references missing vertices", primitive.index());
            return None;
        }

        let mut vertices = Vec::with_capacity(positions.len() * VERTEX_STRIDE);
        for (i, position) in positions.iter().enumerate() {
            vertices.extend_from_slice(position);
            let normal = normals.as_ref().map_or(Vec3::ZERO, |n| Vec3::from(n[i]));
            vertices.extend_from_slice(&normal.to_array());
        }

        let mut mesh = MeshData::new(vertices, indices);
        if normals.is_none() {
            mesh.compute_normals();
        }
        Some(mesh)
    }
}

fn material(material: &gltf::Material<'_>) -> StandardMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    StandardMaterial {
        color: Vec3::new(r, g, b),
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
    }
}
