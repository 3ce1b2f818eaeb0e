use crate::foundation::core::{ColorChannel, Eye, EyeTiles, MeshCoord, NUM_COLOR_CHANNELS, NUM_EYES};
use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Read-only grids per mesh: one per eye and colour channel.
pub const MESH_GRIDS: usize = NUM_EYES * NUM_COLOR_CHANNELS;

/// Grid count of the flat blob layout, which appends three scratch grids.
pub const MESH_BLOB_GRIDS: usize = MESH_GRIDS + NUM_COLOR_CHANNELS;

/// Distortion mesh: `(tiles.wide + 1) x (tiles.high + 1)` vertices for each of the six
/// eye/channel grids, stored eye-major then red, green, blue.
#[derive(Clone, Debug, PartialEq)]
pub struct DistortionMesh {
    tiles: EyeTiles,
    coords: Vec<MeshCoord>,
}

impl DistortionMesh {
    /// Length of the flat blob (six grids plus three scratch grids) for `tiles`.
    pub fn blob_len(tiles: EyeTiles) -> usize {
        MESH_BLOB_GRIDS * tiles.vertices_per_grid()
    }

    /// Build from the six read-only grids laid end to end.
    pub fn from_grids(tiles: EyeTiles, coords: Vec<MeshCoord>) -> TimewarpResult<Self> {
        let expected = MESH_GRIDS * tiles.vertices_per_grid();
        if coords.len() != expected {
            return Err(TimewarpError::validation(format!(
                "distortion mesh for {}x{} tiles needs {expected} coords, got {}",
                tiles.wide,
                tiles.high,
                coords.len()
            )));
        }
        Ok(Self { tiles, coords })
    }

    /// Adopt a flat blob in either the six-grid or the nine-grid layout; scratch grids are
    /// ignored.
    pub fn from_blob(tiles: EyeTiles, blob: &[MeshCoord]) -> TimewarpResult<Self> {
        let grid = tiles.vertices_per_grid();
        if blob.len() != MESH_GRIDS * grid && blob.len() != MESH_BLOB_GRIDS * grid {
            return Err(TimewarpError::misuse(format!(
                "mesh blob holds {} coords, expected {} or {}",
                blob.len(),
                MESH_GRIDS * grid,
                MESH_BLOB_GRIDS * grid
            )));
        }
        Ok(Self {
            tiles,
            coords: blob[..MESH_GRIDS * grid].to_vec(),
        })
    }

    /// Uniform `(x / wide, y / high)` grid over `[0,1]^2`, identical for every eye and channel.
    pub fn identity(tiles: EyeTiles) -> Self {
        let stride = tiles.vertex_stride();
        let one: Vec<MeshCoord> = (0..tiles.vertices_per_grid())
            .map(|i| {
                let (x, y) = (i % stride, i / stride);
                MeshCoord::new(x as f32 / tiles.wide as f32, y as f32 / tiles.high as f32)
            })
            .collect();
        let coords = one.repeat(MESH_GRIDS);
        Self { tiles, coords }
    }

    pub fn tiles(&self) -> EyeTiles {
        self.tiles
    }

    pub fn grid(&self, eye: Eye, channel: ColorChannel) -> &[MeshCoord] {
        let n = self.tiles.vertices_per_grid();
        let start = (eye.index() * NUM_COLOR_CHANNELS + channel.index()) * n;
        &self.coords[start..start + n]
    }

    pub fn grid_mut(&mut self, eye: Eye, channel: ColorChannel) -> &mut [MeshCoord] {
        let n = self.tiles.vertices_per_grid();
        let start = (eye.index() * NUM_COLOR_CHANNELS + channel.index()) * n;
        &mut self.coords[start..start + n]
    }

    /// Flat nine-grid blob with zeroed scratch grids.
    pub fn to_blob(&self) -> Vec<MeshCoord> {
        let mut out = Vec::with_capacity(Self::blob_len(self.tiles));
        out.extend_from_slice(&self.coords);
        out.resize(Self::blob_len(self.tiles), MeshCoord::default());
        out
    }
}
