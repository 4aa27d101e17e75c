use crate::error::{MeshError, MeshResult};
use crate::geometry::{Geometry, GeometryAttribute, COLOR, POSITION};
use crate::node::{property, NodeAttributes};

const COLOR_COMPONENTS: usize = 4;

/// Check a palette and divisor before derivation.
///
/// Returns the number of palette entries and the divisor as `usize`.
pub fn validate_palette(palette: &[f32], divisor: i64) -> MeshResult<(usize, usize)> {
    if divisor <= 0 {
        return Err(MeshError::invalid(
            property::COLOR_DIVISOR,
            format!("divisor must be positive, got {divisor}"),
        ));
    }
    if palette.is_empty() {
        return Err(MeshError::invalid(property::COLORS, "palette is empty"));
    }
    if palette.len() % COLOR_COMPONENTS != 0 {
        return Err(MeshError::invalid(
            property::COLORS,
            format!("palette length {} is not a multiple of 4", palette.len()),
        ));
    }
    Ok((palette.len() / COLOR_COMPONENTS, divisor as usize))
}

/// Fill `out` with banded colors: vertex `i` gets palette entry
/// `(i / divisor) % palette_len`.
///
/// Inputs are not checked; `divisor` must be non-zero, `palette` must hold
/// at least one RGBA entry, and `out.len()` must be a multiple of 4.
pub fn compute_colors(palette: &[f32], divisor: usize, out: &mut [f32]) {
    let entries = palette.len() / COLOR_COMPONENTS;
    for (i, slot) in out.chunks_exact_mut(COLOR_COMPONENTS).enumerate() {
        let idx = (i / divisor) % entries;
        slot.copy_from_slice(&palette[idx * COLOR_COMPONENTS..(idx + 1) * COLOR_COMPONENTS]);
    }
}

/// [`AttributeComputer`](super::AttributeComputer) for the `color` attribute.
///
/// Reads the node's `colors` palette and `colorDivisor`. An existing color
/// attribute is rewritten in place and flagged for re-upload; otherwise a
/// new one is added.
pub fn color_attribute(attributes: &NodeAttributes, geometry: &mut Geometry) -> MeshResult<()> {
    let palette = attributes.colors();
    let (_, divisor) = validate_palette(palette, attributes.color_divisor())?;

    let position = geometry
        .attribute(POSITION)
        .ok_or_else(|| MeshError::invalid(COLOR, "geometry has no position attribute"))?;
    if position.data.len() % 3 != 0 {
        return Err(MeshError::invalid(
            POSITION,
            "position length is not a multiple of 3",
        ));
    }
    let vertex_count = position.data.len() / 3;

    if let Some(existing) = geometry.attribute_mut(COLOR) {
        if existing.size != COLOR_COMPONENTS || existing.data.len() != vertex_count * COLOR_COMPONENTS {
            return Err(MeshError::invalid(
                COLOR,
                format!(
                    "existing color attribute holds {} floats, expected {}",
                    existing.data.len(),
                    vertex_count * COLOR_COMPONENTS
                ),
            ));
        }
        compute_colors(palette, divisor, &mut existing.data);
        existing.needs_update = true;
        log::trace!("updated {} colors in place", vertex_count);
        return Ok(());
    }

    let mut data = vec![0.0; vertex_count * COLOR_COMPONENTS];
    compute_colors(palette, divisor, &mut data);
    log::trace!("derived {} colors", vertex_count);
    geometry.add_attribute(COLOR, GeometryAttribute::new(COLOR_COMPONENTS, data))
}
