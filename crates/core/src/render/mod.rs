use std::fmt;

use crate::{BlendShape, ShapeSet, WeightMap};

/// A renderable mesh that exposes named morph targets.
///
/// This is the only seam between the animation core and the rendering
/// engine. Capabilities are queried once when the mesh is attached.
pub trait MorphTargetMesh {
    /// Label used in logs.
    fn label(&self) -> &str {
        "mesh"
    }

    /// Morph targets this mesh carries.
    fn capabilities(&self) -> ShapeSet;

    /// Sets the influence of one morph target. `value` is within `[0, 1]`.
    fn set_shape_influence(&mut self, shape: BlendShape, value: f32);

    /// Called once when the owning scene detaches or tears down the mesh.
    fn release(&mut self) {}
}

struct MeshSlot {
    mesh: Box<dyn MorphTargetMesh>,
    capabilities: ShapeSet,
}

impl fmt::Debug for MeshSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshSlot")
            .field("label", &self.mesh.label())
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}

/// Rendering backend abstraction: the set of meshes that receive blended
/// weights each frame.
#[derive(Debug, Default)]
pub struct RenderGraph {
    meshes: Vec<MeshSlot>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self { meshes: Vec::new() }
    }

    pub fn register_mesh(&mut self, mesh: Box<dyn MorphTargetMesh>) {
        let capabilities = mesh.capabilities();
        tracing::debug!(
            mesh = mesh.label(),
            shapes = capabilities.len(),
            "registered morph target mesh"
        );
        self.meshes.push(MeshSlot { mesh, capabilities });
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Union of the shapes exposed by every registered mesh.
    pub fn exposed_shapes(&self) -> ShapeSet {
        self.meshes
            .iter()
            .flat_map(|slot| slot.capabilities.iter())
            .collect()
    }

    /// Pushes every weight to each mesh that exposes the shape. Shapes a mesh
    /// lacks are skipped for that mesh only.
    pub fn apply_weights(&mut self, weights: &WeightMap) {
        for slot in &mut self.meshes {
            for shape in slot.capabilities.iter() {
                let value = weights.get(shape).clamp(0.0, 1.0);
                slot.mesh.set_shape_influence(shape, value);
            }
        }
    }

    /// Releases and drops every mesh.
    pub fn release_all(&mut self) {
        for mut slot in self.meshes.drain(..) {
            tracing::debug!(mesh = slot.mesh.label(), "releasing morph target mesh");
            slot.mesh.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct Log {
        writes: Vec<(BlendShape, f32)>,
        released: bool,
    }

    struct FakeMesh {
        shapes: ShapeSet,
        log: Arc<Mutex<Log>>,
    }

    impl MorphTargetMesh for FakeMesh {
        fn capabilities(&self) -> ShapeSet {
            self.shapes
        }

        fn set_shape_influence(&mut self, shape: BlendShape, value: f32) {
            self.log.lock().unwrap().writes.push((shape, value));
        }

        fn release(&mut self) {
            self.log.lock().unwrap().released = true;
        }
    }

    fn fake(shapes: &[BlendShape]) -> (Box<FakeMesh>, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let mesh = FakeMesh {
            shapes: shapes.iter().copied().collect(),
            log: log.clone(),
        };
        (Box::new(mesh), log)
    }

    #[test]
    fn writes_only_exposed_shapes() {
        let (face, face_log) = fake(&[BlendShape::JawOpen, BlendShape::VisemeAA]);
        let (teeth, teeth_log) = fake(&[BlendShape::JawOpen]);
        let mut graph = RenderGraph::new();
        graph.register_mesh(face);
        graph.register_mesh(teeth);

        let mut weights = WeightMap::new();
        weights.set(BlendShape::JawOpen, 0.4);
        weights.set(BlendShape::VisemeAA, 0.5);
        weights.set(BlendShape::EyeBlinkLeft, 1.0);
        graph.apply_weights(&weights);

        assert_eq!(
            face_log.lock().unwrap().writes,
            vec![(BlendShape::VisemeAA, 0.5), (BlendShape::JawOpen, 0.4)]
        );
        assert_eq!(
            teeth_log.lock().unwrap().writes,
            vec![(BlendShape::JawOpen, 0.4)]
        );
        assert_eq!(graph.exposed_shapes().len(), 2);
    }

    #[test]
    fn clamps_before_writing() {
        let (mesh, log) = fake(&[BlendShape::JawOpen, BlendShape::VisemeO]);
        let mut graph = RenderGraph::new();
        graph.register_mesh(mesh);

        let mut weights = WeightMap::new();
        weights.set(BlendShape::JawOpen, 1.7);
        weights.set(BlendShape::VisemeO, -0.2);
        graph.apply_weights(&weights);

        for (_, value) in &log.lock().unwrap().writes {
            assert!((0.0..=1.0).contains(value));
        }
    }

    #[test]
    fn release_all_empties_graph() {
        let (mesh, log) = fake(&[BlendShape::JawOpen]);
        let mut graph = RenderGraph::new();
        graph.register_mesh(mesh);

        graph.release_all();

        assert!(graph.is_empty());
        assert!(log.lock().unwrap().released);
    }
}
