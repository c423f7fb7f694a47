//! Surface records
//!
//! A surface is a 100-byte header followed by its triangles, vertices and the
//! optional LOD collapse tables. Offsets are relative to the surface start.
//! Each vertex is followed by its morphs and then its weights, so vertices
//! have variable size and must be walked in order.

use glam::Vec3;
use log::trace;

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Result, SkelError};
use crate::mesh::{BoneWeight, MAX_WEIGHTS_PER_VERTEX, MorphOffset, Surface, Triangle, Vertex};

/// Size of the surface header
pub const SURFACE_HEADER_SIZE: usize = 100;

/// Size of the surface name field
pub const SURFACE_NAME_SIZE: usize = 64;

/// Size of a vertex without its morphs and weights
pub const VERTEX_SIZE: usize = 28;

/// Size of one morph entry
pub const MORPH_SIZE: usize = 16;

/// Size of one weight entry
pub const WEIGHT_SIZE: usize = 20;

/// Surface header as stored
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceHeader {
    pub ident: i32,
    pub name: String,
    pub num_triangles: usize,
    pub num_verts: usize,
    pub static_processed: i32,
    pub ofs_triangles: usize,
    pub ofs_verts: usize,
    pub ofs_collapse: usize,
    pub ofs_end: usize,
    pub ofs_collapse_index: usize,
}

impl SurfaceHeader {
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let ident = reader.read_i32_le()?;
        let name = reader.read_fixed_str(SURFACE_NAME_SIZE)?;
        let num_triangles = reader.read_count("numTriangles")?;
        let num_verts = reader.read_count("numVerts")?;
        let static_processed = reader.read_i32_le()?;
        let ofs_triangles = reader.read_count("ofsTriangles")?;
        let ofs_verts = reader.read_count("ofsVerts")?;
        let ofs_collapse = reader.read_count("ofsCollapse")?;
        let ofs_end_at = reader.position();
        let ofs_end = reader.read_count("ofsEnd")?;
        let ofs_collapse_index = reader.read_count("ofsCollapseIndex")?;

        if ofs_end < SURFACE_HEADER_SIZE {
            return Err(SkelError::InvalidField {
                field: "ofsEnd",
                value: ofs_end as i64,
                offset: ofs_end_at,
            });
        }

        Ok(Self {
            ident,
            name,
            num_triangles,
            num_verts,
            static_processed,
            ofs_triangles,
            ofs_verts,
            ofs_collapse,
            ofs_end,
            ofs_collapse_index,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_i32_le(self.ident);
        writer.write_fixed_str(&self.name, SURFACE_NAME_SIZE)?;
        writer.write_count("numTriangles", self.num_triangles)?;
        writer.write_count("numVerts", self.num_verts)?;
        writer.write_i32_le(self.static_processed);
        writer.write_count("ofsTriangles", self.ofs_triangles)?;
        writer.write_count("ofsVerts", self.ofs_verts)?;
        writer.write_count("ofsCollapse", self.ofs_collapse)?;
        writer.write_count("ofsEnd", self.ofs_end)?;
        writer.write_count("ofsCollapseIndex", self.ofs_collapse_index)?;
        Ok(())
    }
}

fn parse_vertex(
    reader: &mut ByteReader<'_>,
    surface: usize,
    vertex: usize,
    allow_morphs: bool,
) -> Result<Vertex> {
    let normal = reader.read_vec3()?;
    let uv = reader.read_vec2()?;
    let num_weights = reader.read_count("numWeights")?;
    let num_morphs_at = reader.position();
    let num_morphs = reader.read_count("numMorphs")?;

    if num_weights == 0 {
        return Err(SkelError::InvalidWeights {
            surface,
            vertex,
            reason: "vertex has no weights".to_string(),
        });
    }
    if num_weights > MAX_WEIGHTS_PER_VERTEX {
        return Err(SkelError::TooManyInfluences {
            surface,
            vertex,
            count: num_weights,
            max: MAX_WEIGHTS_PER_VERTEX,
        });
    }
    if num_morphs > 0 && !allow_morphs {
        return Err(SkelError::InvalidField {
            field: "numMorphs",
            value: num_morphs as i64,
            offset: num_morphs_at,
        });
    }
    reader.check(reader.position(), num_morphs.saturating_mul(MORPH_SIZE))?;

    let mut morphs = Vec::with_capacity(num_morphs);
    for _ in 0..num_morphs {
        morphs.push(MorphOffset {
            target: reader.read_count("morph target")?,
            offset: reader.read_vec3()?,
        });
    }

    let mut weights = Vec::with_capacity(num_weights);
    for _ in 0..num_weights {
        weights.push(BoneWeight {
            bone: reader.read_count("weight bone")?,
            weight: reader.read_f32_le()?,
            offset: reader.read_vec3()?,
        });
    }

    Ok(Vertex {
        position: Vec3::ZERO,
        normal,
        uv,
        weights,
        morphs,
    })
}

fn parse_table(reader: &mut ByteReader<'_>, at: usize, count: usize) -> Result<Vec<i32>> {
    reader.set_position(at);
    reader.check(at, count.saturating_mul(4))?;
    (0..count).map(|_| reader.read_i32_le()).collect()
}

/// Parse the surface starting at the reader's position and leave the reader
/// at the next surface
///
/// Vertex positions are left at zero; they depend on the skeleton.
pub fn parse_surface(
    reader: &mut ByteReader<'_>,
    index: usize,
    allow_morphs: bool,
) -> Result<Surface> {
    let start = reader.position();
    let header = SurfaceHeader::parse(reader)?;
    trace!(
        "Surface {} '{}': {} triangles, {} vertices",
        index, header.name, header.num_triangles, header.num_verts
    );

    reader.set_position(start + header.ofs_triangles);
    reader.check(reader.position(), header.num_triangles.saturating_mul(12))?;
    let mut triangles = Vec::with_capacity(header.num_triangles);
    for _ in 0..header.num_triangles {
        let mut indices = [0u32; 3];
        for slot in &mut indices {
            let at = reader.position();
            let value = reader.read_i32_le()?;
            *slot = u32::try_from(value).map_err(|_| SkelError::InvalidField {
                field: "triangle index",
                value: i64::from(value),
                offset: at,
            })?;
        }
        triangles.push(Triangle { indices });
    }

    reader.set_position(start + header.ofs_verts);
    reader.check(reader.position(), header.num_verts.saturating_mul(VERTEX_SIZE))?;
    let mut vertices = Vec::with_capacity(header.num_verts);
    for vertex in 0..header.num_verts {
        vertices.push(parse_vertex(reader, index, vertex, allow_morphs)?);
    }

    let collapse_map = if header.ofs_collapse == 0 {
        Vec::new()
    } else {
        parse_table(reader, start + header.ofs_collapse, header.num_verts)?
    };
    let collapse_index = if header.ofs_collapse_index == 0 {
        Vec::new()
    } else {
        parse_table(reader, start + header.ofs_collapse_index, header.num_verts)?
    };

    reader.set_position(start + header.ofs_end);

    Ok(Surface {
        name: header.name,
        vertices,
        triangles,
        collapse_map,
        collapse_index,
        ident: header.ident,
        static_processed: header.static_processed,
    })
}

fn vertex_size(vertex: &Vertex) -> usize {
    VERTEX_SIZE + vertex.morphs.len() * MORPH_SIZE + vertex.weights.len() * WEIGHT_SIZE
}

/// Write one surface in the canonical layout
pub fn write_surface(writer: &mut ByteWriter, surface: &Surface) -> Result<()> {
    let ofs_triangles = SURFACE_HEADER_SIZE;
    let ofs_verts = ofs_triangles + surface.triangles.len() * 12;
    let mut cursor = ofs_verts + surface.vertices.iter().map(vertex_size).sum::<usize>();
    let ofs_collapse = if surface.collapse_map.is_empty() {
        0
    } else {
        cursor
    };
    cursor += surface.collapse_map.len() * 4;
    let ofs_collapse_index = if surface.collapse_index.is_empty() {
        0
    } else {
        cursor
    };
    cursor += surface.collapse_index.len() * 4;

    SurfaceHeader {
        ident: surface.ident,
        name: surface.name.clone(),
        num_triangles: surface.triangles.len(),
        num_verts: surface.vertices.len(),
        static_processed: surface.static_processed,
        ofs_triangles,
        ofs_verts,
        ofs_collapse,
        ofs_end: cursor,
        ofs_collapse_index,
    }
    .write(writer)?;

    for triangle in &surface.triangles {
        for index in triangle.indices {
            writer.write_count("triangle index", index as usize)?;
        }
    }

    for vertex in &surface.vertices {
        writer.write_vec3(vertex.normal);
        writer.write_vec2(vertex.uv);
        writer.write_count("numWeights", vertex.weights.len())?;
        writer.write_count("numMorphs", vertex.morphs.len())?;
        for morph in &vertex.morphs {
            writer.write_count("morph target", morph.target)?;
            writer.write_vec3(morph.offset);
        }
        for weight in &vertex.weights {
            writer.write_count("weight bone", weight.bone)?;
            writer.write_f32_le(weight.weight);
            writer.write_vec3(weight.offset);
        }
    }

    for value in surface.collapse_map.iter().chain(&surface.collapse_index) {
        writer.write_i32_le(*value);
    }
    Ok(())
}
