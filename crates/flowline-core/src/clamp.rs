//! Iceberg removal: floating-eligible ice seaward of the grounding line is
//! held at flotation thickness instead of thinning further.

use crate::error::Result;
use crate::field::Field;
use crate::grounding_line::flotation_thickness;

/// Result of one clamp pass.
#[derive(Debug, Clone)]
pub struct Clamped {
    pub ice: Field,
    /// Cells raised to flotation thickness.
    pub cells: usize,
}

/// Raise every cell at or beyond `from_index` that sits below `c·b` to `c·b`.
///
/// Cells upstream of `from_index` are left alone even if momentarily below
/// flotation. The map is pointwise, so applying it twice changes nothing.
pub fn clamp_to_flotation(ice: &Field, bedrock: &Field, density_ratio: f64, from_index: usize) -> Result<Clamped> {
    ice.ensure_same_mesh(bedrock)?;
    let mut cells = 0;
    let values: Vec<f64> = ice
        .values()
        .iter()
        .zip(bedrock.values())
        .enumerate()
        .map(|(i, (&h, &b))| {
            let floor = flotation_thickness(density_ratio, b);
            if i >= from_index && h < floor {
                cells += 1;
                floor
            } else {
                h
            }
        })
        .collect();
    Ok(Clamped { ice: ice.with_values(values)?, cells })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowlineError;
    use crate::mesh::Mesh;
    use approx::assert_abs_diff_eq;

    const C: f64 = 0.09;

    fn fields(ice: &[f64], bed: &[f64]) -> (Field, Field) {
        let mesh = Mesh::new(0.0, 1.0, ice.len()).unwrap();
        (
            Field::new("ice", mesh, ice.to_vec()).unwrap(),
            Field::new("bed", mesh, bed.to_vec()).unwrap(),
        )
    }

    #[test]
    fn raises_only_seaward_cells_below_flotation() {
        let (h, b) = fields(&[10.0, 0.1, 8.0, 0.1, 9.0], &[50.0; 5]);
        let out = clamp_to_flotation(&h, &b, C, 3).unwrap();
        let v = out.ice.values();
        // Upstream dip at index 1 survives.
        assert_abs_diff_eq!(v[1], 0.1);
        assert_abs_diff_eq!(v[2], 8.0);
        assert_abs_diff_eq!(v[3], 4.5);
        assert_abs_diff_eq!(v[4], 9.0);
        assert_eq!(out.cells, 1);
    }

    #[test]
    fn clamping_is_idempotent() {
        let (h, b) = fields(&[10.0, 3.0, 1.0, 0.2, 0.0, 6.0], &[-5.0, 10.0, 20.0, 40.0, 60.0, 30.0]);
        let once = clamp_to_flotation(&h, &b, C, 2).unwrap();
        let twice = clamp_to_flotation(&once.ice, &b, C, 2).unwrap();
        assert_eq!(once.ice, twice.ice);
        assert_eq!(twice.cells, 0);
    }

    #[test]
    fn index_past_end_is_a_no_op() {
        let (h, b) = fields(&[0.0, 0.0], &[50.0, 50.0]);
        let out = clamp_to_flotation(&h, &b, C, 2).unwrap();
        assert_eq!(out.ice, h);
        assert_eq!(out.cells, 0);
    }

    #[test]
    fn mesh_mismatch_is_rejected() {
        let h = Field::constant("ice", Mesh::new(0.0, 1.0, 3).unwrap(), 1.0);
        let b = Field::constant("bed", Mesh::new(0.0, 1.0, 4).unwrap(), 1.0);
        assert!(matches!(clamp_to_flotation(&h, &b, C, 0), Err(FlowlineError::MeshMismatch { .. })));
    }
}
