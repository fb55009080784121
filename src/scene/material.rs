//! Acoustic material properties used by the transmission and reflection
//! model (spec §3 "Material", §4.4 "Material transmission model").
//!
//! Materials are defined across the same three frequency bands as the rest
//! of the crate (see [`crate::math::Bands`]): low, mid, high.

use crate::math::Bands;

/// Acoustic properties of a surface texture.
///
/// - **absorption**: fraction of incident energy absorbed per band on
///   reflection (0.0 = perfectly reflective, 1.0 = fully absorbed).
/// - **transmission_thickness**: per-band distance (metres) of travel
///   through the material at which transmitted energy reaches zero,
///   feeding the linear falloff in [`crate::rays`]'s transmission step.
///   A thickness of `0.0` means the band is fully blocking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub absorption: Bands,
    pub transmission_thickness: Bands,
}

impl Material {
    pub const GENERIC: Self = Self {
        absorption: [0.10, 0.20, 0.30],
        transmission_thickness: [0.40, 0.20, 0.10],
    };

    pub const BRICK: Self = Self {
        absorption: [0.03, 0.04, 0.07],
        transmission_thickness: [0.10, 0.06, 0.03],
    };

    pub const CONCRETE: Self = Self {
        absorption: [0.05, 0.07, 0.08],
        transmission_thickness: [0.06, 0.03, 0.015],
    };

    pub const GLASS: Self = Self {
        absorption: [0.06, 0.03, 0.02],
        transmission_thickness: [0.25, 0.15, 0.08],
    };

    pub const PLASTER: Self = Self {
        absorption: [0.12, 0.06, 0.04],
        transmission_thickness: [0.30, 0.18, 0.10],
    };

    pub const WOOD: Self = Self {
        absorption: [0.11, 0.07, 0.06],
        transmission_thickness: [0.20, 0.10, 0.05],
    };

    pub const METAL: Self = Self {
        absorption: [0.20, 0.07, 0.06],
        transmission_thickness: [0.05, 0.02, 0.01],
    };

    pub const CARPET: Self = Self {
        absorption: [0.24, 0.69, 0.73],
        transmission_thickness: [0.02, 0.01, 0.005],
    };

    /// Fully open space: no absorption, unbounded transmission. Used for
    /// portals and trigger volumes that should not affect sound at all.
    pub const OPEN: Self = Self {
        absorption: [0.0, 0.0, 0.0],
        transmission_thickness: [f32::INFINITY, f32::INFINITY, f32::INFINITY],
    };

    /// True if the material absorbs nothing and transmits fully in every
    /// band — a no-op surface that a [`crate::bvh::visitors::MaterialLookup`]
    /// can use to skip the blocked-ray test.
    pub fn is_transparent(&self) -> bool {
        self.absorption.iter().all(|&a| a <= 0.0)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::GENERIC
    }
}

/// Maps texture indices to [`Material`]s. A model's faces each carry a
/// `texture_index` (spec §3 "Face") that is resolved against a table like
/// this one at query time.
#[derive(Debug, Clone)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self {
            materials: Vec::new(),
        }
    }

    pub fn with_presets() -> Self {
        let mut table = Self::new();
        table.add(Material::GENERIC);
        table.add(Material::BRICK);
        table.add(Material::CONCRETE);
        table.add(Material::GLASS);
        table.add(Material::PLASTER);
        table.add(Material::WOOD);
        table.add(Material::METAL);
        table.add(Material::CARPET);
        table
    }

    /// Adds a material, returning its texture index.
    pub fn add(&mut self, material: Material) -> u16 {
        let index = self.materials.len() as u16;
        self.materials.push(material);
        index
    }

    pub fn get(&self, index: u16) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_assigns_sequential_indices() {
        let mut table = MaterialTable::new();
        let a = table.add(Material::CONCRETE);
        let b = table.add(Material::WOOD);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(table.get(a), Some(&Material::CONCRETE));
        assert_eq!(table.get(b), Some(&Material::WOOD));
        assert_eq!(table.get(99), None);
    }

    #[test]
    fn presets_cover_the_common_surfaces() {
        let table = MaterialTable::with_presets();
        assert_eq!(table.len(), 8);
        assert_eq!(table.get(0), Some(&Material::GENERIC));
    }

    #[test]
    fn open_material_is_transparent() {
        assert!(Material::OPEN.is_transparent());
        assert!(!Material::CONCRETE.is_transparent());
    }
}
