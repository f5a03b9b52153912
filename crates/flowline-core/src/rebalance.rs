//! Mesh rebalancing around the grounding line.
//!
//! Each step the mesh is rigidly translated so the located grounding line
//! falls exactly on a face, and the working fields are resampled onto it.

use crate::error::Result;
use crate::field::Field;
use crate::grounding_line::GroundingLine;
use crate::mesh::Mesh;

/// Fields resampled onto a mesh anchored at the grounding line.
#[derive(Debug, Clone)]
pub struct RebalancedFields {
    pub mesh: Mesh,
    pub ice: Field,
    pub bedrock: Field,
}

/// Translate `mesh` so that face `grounding_line.index` sits on `grounding_line.x`.
pub fn anchored_mesh(mesh: &Mesh, grounding_line: GroundingLine) -> Result<Mesh> {
    mesh.shifted_to_face(grounding_line.index, grounding_line.x)
}

/// Build the anchored mesh and resample `ice` and `bedrock` onto it from their
/// current cell-center samples.
pub fn rebalance(ice: &Field, bedrock: &Field, grounding_line: GroundingLine) -> Result<RebalancedFields> {
    ice.ensure_same_mesh(bedrock)?;
    let mesh = anchored_mesh(ice.mesh(), grounding_line)?;
    log::trace!(
        "mesh shifted by {:.4} to anchor face {} at {:.3}",
        mesh.x0() - ice.mesh().x0(),
        grounding_line.index,
        grounding_line.x
    );
    Ok(RebalancedFields {
        ice: ice.project_onto(&mesh),
        bedrock: bedrock.project_onto(&mesh),
        mesh,
    })
}
