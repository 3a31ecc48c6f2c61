//! Procedural brilliant-cut gem, used when no mesh file is available.
//!
//! Vertices are duplicated per facet so every face keeps a flat normal;
//! the crisp facet boundaries are what make the refraction read as a
//! cut stone rather than a blob.

use glam::Vec3;

use super::mesh::MeshData;

/// Number of main facets around the girdle.
const SIDES: usize = 8;
/// Table radius as a fraction of the girdle radius.
const TABLE_RATIO: f32 = 0.55;
/// Crown height above the girdle plane.
const CROWN_HEIGHT: f32 = 0.35;
/// Pavilion depth below the girdle plane.
const PAVILION_DEPTH: f32 = 0.85;

/// Generate a round brilliant-cut gem with unit girdle radius.
pub fn brilliant() -> MeshData {
    let mut mesh = MeshData {
        positions: Vec::new(),
        normals: Vec::new(),
        indices: Vec::new(),
    };

    let ring = |radius: f32, y: f32, offset: f32| -> Vec<Vec3> {
        (0..SIDES)
            .map(|i| {
                let a = (i as f32 + offset) / SIDES as f32 * std::f32::consts::TAU;
                Vec3::new(a.cos() * radius, y, a.sin() * radius)
            })
            .collect()
    };

    let table = ring(TABLE_RATIO, CROWN_HEIGHT, 0.5);
    let girdle = ring(1.0, 0.0, 0.0);
    let table_center = Vec3::new(0.0, CROWN_HEIGHT, 0.0);
    let culet = Vec3::new(0.0, -PAVILION_DEPTH, 0.0);

    // Table fan
    for i in 0..SIDES {
        push_facet(&mut mesh, table_center, table[i], table[(i + 1) % SIDES]);
    }

    // Crown facets: kite pairs between table edge and girdle
    for i in 0..SIDES {
        let next = (i + 1) % SIDES;
        push_facet(&mut mesh, table[i], girdle[i], girdle[next]);
        push_facet(&mut mesh, table[i], girdle[next], table[next]);
    }

    // Pavilion facets down to the culet
    for i in 0..SIDES {
        let next = (i + 1) % SIDES;
        push_facet(&mut mesh, girdle[i], culet, girdle[next]);
    }

    mesh
}

/// Append one flat-shaded triangle, winding counter-clockwise when seen
/// from outside (normal pointing away from the gem axis).
fn push_facet(mesh: &mut MeshData, a: Vec3, b: Vec3, c: Vec3) {
    let mut n = (b - a).cross(c - a);
    if n.length_squared() <= f32::EPSILON {
        return;
    }
    let centroid = (a + b + c) / 3.0;
    // Flip so the facet faces outward
    let (a, b, c) = if n.dot(centroid) < 0.0 {
        n = -n;
        (a, c, b)
    } else {
        (a, b, c)
    };
    let n = n.normalize().to_array();
    let base = mesh.positions.len() as u32;
    mesh.positions.extend([a.to_array(), b.to_array(), c.to_array()]);
    mesh.normals.extend([n, n, n]);
    mesh.indices.extend([base, base + 1, base + 2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facet_count() {
        let mesh = brilliant();
        // table fan + 2 crown tris per side + pavilion fan
        assert_eq!(mesh.triangle_count(), SIDES * 4);
        assert_eq!(mesh.positions.len(), mesh.normals.len());
    }

    #[test]
    fn no_degenerate_facets() {
        let mesh = brilliant();
        for tri in mesh.to_triangles() {
            let a = Vec3::from(tri.v0);
            let b = Vec3::from(tri.v1);
            let c = Vec3::from(tri.v2);
            let area = (b - a).cross(c - a).length() * 0.5;
            assert!(area > 1e-4, "degenerate facet, area {area}");
        }
    }

    #[test]
    fn facets_face_outward() {
        let mesh = brilliant();
        for (chunk, n) in mesh.indices.chunks_exact(3).zip(mesh.normals.chunks_exact(3)) {
            let centroid = chunk
                .iter()
                .map(|&i| Vec3::from(mesh.positions[i as usize]))
                .sum::<Vec3>()
                / 3.0;
            assert!(Vec3::from(n[0]).dot(centroid) >= 0.0);
        }
    }
}
