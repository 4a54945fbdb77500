//! Scene graph and hierarchical scene organization.
//!
//! Provides the [`SceneNode`] trait and its two implementations: [`ContainerNode`]
//! groups children under a shared transform and [`ModelNode`] owns GPU geometry
//! plus an instance buffer. glTF node trees are converted with [`to_scene_node`].

use std::ops::Range;

use cgmath::InnerSpace;
use log::warn;
use wgpu::{Device, util::DeviceExt};

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model,
        texture::SamplingMode,
    },
    render::Instanced,
};

/// Convert a glTF node (and, recursively, its children) into scene nodes.
///
/// `buffers` holds the binary payload of every glTF buffer, `materials` the
/// already uploaded materials indexed like the document's materials and
/// followed by one default material.
pub fn to_scene_node(
    node: gltf::scene::Node,
    buffers: &[Vec<u8>],
    device: &wgpu::Device,
    materials: &[model::Material],
) -> Box<dyn SceneNode> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let default_material = materials.len().saturating_sub(1);
    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let mesh_name = mesh.name().unwrap_or("unknown_mesh");
            let meshes = mesh
                .primitives()
                .filter_map(|primitive| {
                    let material = material_slot(primitive.material().index(), default_material);
                    read_primitive(mesh_name, &primitive, material, buffers, device)
                })
                .collect::<Vec<_>>();
            let model = model::Model {
                meshes,
                materials: materials.to_vec(),
            };
            Box::new(ModelNode::from_model(1, &name, device, model))
        }
        None => Box::new(ContainerNode::new(1, &name)),
    };
    let (position, rotation, scale) = node.transform().decomposed();
    let rotation = cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]);
    let instance = Instance {
        position: position.into(),
        rotation,
        scale: scale.into(),
    };
    scene_node.set_local_transform(0, instance);
    for child in node.children() {
        let child_node = to_scene_node(child, buffers, device, materials);
        scene_node.add_child(child_node);
    }

    scene_node
}

/// Material index of a primitive, falling back to the default slot.
pub fn material_slot(index: Option<usize>, default_material: usize) -> usize {
    index.unwrap_or(default_material)
}

fn read_primitive(
    mesh_name: &str,
    primitive: &gltf::Primitive,
    material: usize,
    buffers: &[Vec<u8>],
    device: &wgpu::Device,
) -> Option<model::Mesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let Some(positions) = reader.read_positions() else {
        warn!("primitive of {mesh_name} has no positions and is skipped");
        return None;
    };
    let mut vertices = positions
        .map(|position| model::ModelVertex {
            position,
            ..Default::default()
        })
        .collect::<Vec<_>>();
    if let Some(normals) = reader.read_normals() {
        vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        vertices
            .iter_mut()
            .zip(tex_coords)
            .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
    }

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
        None => (0..vertices.len() as u32).collect(),
    };

    match reader.read_tangents() {
        Some(tangents) => vertices.iter_mut().zip(tangents).for_each(|(vertex, tangent)| {
            // glTF stores the bitangent sign in w
            let tangent: cgmath::Vector4<f32> = tangent.into();
            let normal: cgmath::Vector3<f32> = vertex.normal.into();
            vertex.tangent = tangent.truncate().into();
            vertex.bitangent = (normal.cross(tangent.truncate()) * tangent.w).into();
        }),
        None => compute_tangents(&mut vertices, &indices),
    }

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{mesh_name} Vertex Buffer")),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{mesh_name} Index Buffer")),
        contents: bytemuck::cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    Some(model::Mesh {
        name: mesh_name.to_string(),
        vertex_buffer,
        index_buffer,
        num_elements: indices.len() as u32,
        material,
    })
}

/// Derive per-vertex tangents and bitangents from the UV layout of each triangle.
pub fn compute_tangents(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];
    for c in indices.chunks_exact(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }
        let v0 = vertices[i0];
        let v1 = vertices[i1];
        let v2 = vertices[i2];

        let pos0: cgmath::Vector3<f32> = v0.position.into();
        let pos1: cgmath::Vector3<f32> = v1.position.into();
        let pos2: cgmath::Vector3<f32> = v2.position.into();

        let uv0: cgmath::Vector2<f32> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<f32> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<f32> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // Flip the bitangent so normal maps authored for the glTF (right-handed) convention line up.
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            vertices[i].tangent = (tangent + cgmath::Vector3::from(vertices[i].tangent)).into();
            vertices[i].bitangent =
                (bitangent + cgmath::Vector3::from(vertices[i].bitangent)).into();
            triangles_included[i] += 1;
        }
    }

    for (vertex, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            continue;
        }
        let tangent = cgmath::Vector3::from(vertex.tangent);
        let bitangent = cgmath::Vector3::from(vertex.bitangent);
        if tangent.magnitude2() > 0.0 {
            vertex.tangent = tangent.normalize().into();
        }
        if bitangent.magnitude2() > 0.0 {
            vertex.bitangent = bitangent.normalize().into();
        }
    }
}

pub trait SceneNode {
    fn name(&self) -> &str;

    fn get_world_transforms(&self) -> Vec<Instance>;

    fn get_local_transform(&self, idx: usize) -> Option<Instance>;

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn set_local_transform(&mut self, idx: usize, instance: Instance);

    /// Upload the world transforms of this subtree to its instance buffers.
    fn write_to_buffers(&mut self, queue: &wgpu::Queue);

    /**
     * Multiple instances of a parent can be passed down to multiple instances of multiple children.
     * The argument `parents_world_transform` with a matching `range` size provides control over which instances are transformed.
     */
    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]);

    fn update_world_transform_all(&mut self) {
        let range = 0..self.instance_count();
        let identities = range.clone().map(|_| Instance::default()).collect::<Vec<_>>();
        self.update_world_transforms(range, &identities);
    }

    fn instance_count(&self) -> usize;

    /// Switch the texture sampling of every model in this subtree.
    fn set_sampling_mode(&mut self, device: &wgpu::Device, mode: SamplingMode);

    fn get_render(&self) -> Vec<Instanced<'_>>;

    /// Depth-first search for a node by name, this node included.
    fn find(&self, name: &str) -> Option<&dyn SceneNode> {
        if self.name() == name {
            return Some(self.as_dyn());
        }
        self.get_children().iter().find_map(|child| child.find(name))
    }

    fn as_dyn(&self) -> &dyn SceneNode;
}

/// Shared body of `update_world_transforms` for both node kinds.
fn propagate(
    instances: &mut [(Instance, Instance)],
    children: &mut [Box<dyn SceneNode>],
    range: Range<usize>,
    parents_world_transform: &[Instance],
) {
    if parents_world_transform.len() > instances.len() {
        warn!(
            "You tried to transform with len {}, but there are only {} instances to transform.",
            parents_world_transform.len(),
            instances.len()
        );
        return;
    }
    let Some(targets) = instances.get_mut(range.clone()) else {
        warn!(
            "You tried to transform range {}..{}, which is out of bounds for parent len {}.",
            range.start,
            range.end,
            instances.len(),
        );
        return;
    };
    let world_transforms = targets
        .iter_mut()
        .zip(parents_world_transform)
        .map(|((local, world), parent)| {
            *world = parent * &*local;
            world.clone()
        })
        .collect::<Vec<_>>();
    for child in children.iter_mut() {
        child.update_world_transforms(range.clone(), &world_transforms);
    }
}

pub struct ContainerNode {
    name: String,
    pub children: Vec<Box<dyn SceneNode>>,
    pub instances: Vec<(Instance, Instance)>,
}

impl ContainerNode {
    pub fn new(amount: usize, name: &str) -> Self {
        let instances = (0..amount)
            .map(|_| (Instance::default(), Instance::default()))
            .collect();
        Self {
            name: name.to_string(),
            instances,
            children: vec![],
        }
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]) {
        propagate(
            &mut self.instances,
            &mut self.children,
            range,
            parents_world_transform,
        );
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn set_sampling_mode(&mut self, device: &wgpu::Device, mode: SamplingMode) {
        self.children
            .iter_mut()
            .for_each(|child| child.set_sampling_mode(device, mode));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }

    fn as_dyn(&self) -> &dyn SceneNode {
        self
    }
}

pub struct ModelNode {
    name: String,
    children: Vec<Box<dyn SceneNode>>,
    instance_buffer: wgpu::Buffer,
    instances: Vec<(Instance, Instance)>,
    model: model::Model,
}

impl ModelNode {
    pub fn from_model(amount: usize, name: &str, device: &Device, model: model::Model) -> Self {
        let instances = (0..amount)
            .map(|_| (Instance::default(), Instance::default()))
            .collect::<Vec<_>>();

        let instance_data = instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect::<Vec<_>>();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Instance Buffer")),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            name: name.to_string(),
            children: vec![],
            instance_buffer,
            instances,
            model,
        }
    }

    pub fn model(&self) -> &model::Model {
        &self.model
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]) {
        propagate(
            &mut self.instances,
            &mut self.children,
            range,
            parents_world_transform,
        );
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        let raw_instances: Vec<InstanceRaw> = self
            .instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect();
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&raw_instances),
        );
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn set_sampling_mode(&mut self, device: &wgpu::Device, mode: SamplingMode) {
        self.model.set_sampling_mode(device, mode);
        self.children
            .iter_mut()
            .for_each(|child| child.set_sampling_mode(device, mode));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                amount: self.instances.len(),
            }])
            .collect()
    }

    fn as_dyn(&self) -> &dyn SceneNode {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::model::ModelVertex;

    fn vertex(position: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
        ModelVertex {
            position,
            tex_coords,
            normal: [0.0, 0.0, 1.0],
            ..Default::default()
        }
    }

    #[test]
    fn tangents_follow_the_u_direction() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.0, 0.0]),
            vertex([1.0, 0.0, 0.0], [1.0, 0.0]),
            vertex([0.0, 1.0, 0.0], [0.0, 1.0]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        for v in &vertices {
            assert!((v.tangent[0] - 1.0).abs() < 1e-5, "{:?}", v.tangent);
            assert!((v.bitangent[1] + 1.0).abs() < 1e-5, "{:?}", v.bitangent);
        }
    }

    #[test]
    fn degenerate_uvs_leave_tangents_untouched() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([1.0, 0.0, 0.0], [0.5, 0.5]),
            vertex([0.0, 1.0, 0.0], [0.5, 0.5]),
        ];
        compute_tangents(&mut vertices, &[0, 1, 2, 7, 8, 9]);
        assert!(vertices.iter().all(|v| v.tangent == [0.0; 3]));
    }

    #[test]
    fn container_propagates_world_transforms_to_children() {
        let mut parent = ContainerNode::new(1, "root");
        let mut child = ContainerNode::new(1, "child");
        child.set_local_transform(0, Instance::at(0.0, 1.0, 0.0));
        parent.add_child(Box::new(child));
        parent.set_local_transform(0, Instance::at(2.0, 0.0, 0.0));
        parent.update_world_transform_all();

        let child = parent.find("child").map(|c| c.get_world_transforms());
        assert_eq!(child, Some(vec![Instance::at(2.0, 1.0, 0.0)]));
    }

    #[test]
    fn primitives_without_material_use_the_default_slot() {
        assert_eq!(material_slot(None, 3), 3);
        assert_eq!(material_slot(Some(0), 3), 0);
        assert_eq!(material_slot(Some(2), 3), 2);
    }

    #[test]
    fn out_of_range_updates_are_ignored() {
        let mut node = ContainerNode::new(1, "n");
        node.update_world_transforms(3..5, &[Instance::at(1.0, 0.0, 0.0)]);
        assert_eq!(node.get_world_transforms(), vec![Instance::default()]);
    }
}
