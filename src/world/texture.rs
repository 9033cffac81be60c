// Format-agnostic repository of images used for walls, sprites and overlays.
// Wall textures are addressed by the map's cell id; sprites by any id.

use std::collections::HashMap;
use std::ops::Index;

use crate::renderer::Rgba;

/// Runtime handle for a texture in this bank.
///
/// Wall textures share the id space with map cells, so id `0` (an empty
/// cell) never holds a texture.
pub type TextureId = u16;

/// Palette index. `0` is the transparent / key colour.
pub type ColorIndex = u8;

pub const TRANSPARENT: ColorIndex = 0;

/// Row-major palette-indexed image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub name: String,
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<ColorIndex>,
}

impl Texture {
    /// Single-colour `w × h` image.
    pub fn solid<S: Into<String>>(name: S, w: usize, h: usize, color: ColorIndex) -> Self {
        Self {
            name: name.into(),
            w,
            h,
            pixels: vec![color; w * h],
        }
    }

    /// Build from rows of hex digits, `.` meaning transparent.
    ///
    /// ```text
    /// ".22."
    /// "2442"
    /// ```
    pub fn from_rows<S: Into<String>>(name: S, rows: &[&str]) -> Result<Self, TextureError> {
        let h = rows.len();
        let w = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if w == 0 || h == 0 {
            return Err(TextureError::ZeroSize);
        }
        let mut pixels = Vec::with_capacity(w * h);
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != w {
                return Err(TextureError::Ragged {
                    row: y,
                    expected: w,
                    found,
                });
            }
            pixels.extend(
                row.chars()
                    .map(|c| c.to_digit(16).map(|d| d as ColorIndex).unwrap_or(TRANSPARENT)),
            );
        }
        Ok(Self {
            name: name.into(),
            w,
            h,
            pixels,
        })
    }

    /// Texel at (`x`, `y`); out-of-range reads are transparent.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> ColorIndex {
        if x >= self.w || y >= self.h {
            return TRANSPARENT;
        }
        self.pixels[y * self.w + x]
    }
}

/// Things that can go wrong when using the bank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second texture with an existing name.
    #[error("texture name `{0}` already present in bank")]
    Duplicate(String),

    /// Requested ID is `0` or beyond the id space.
    #[error("texture id {0} out of range")]
    BadId(TextureId),

    #[error("texture has zero width or height")]
    ZeroSize,

    #[error("texture row {row} is {found} texels wide, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// 16-entry colour table (0x00RRGGBB).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette(pub [Rgba; 16]);

impl Default for Palette {
    fn default() -> Self {
        Palette([
            0x00_000000, 0x00_FFFFFF, 0x00_FF2121, 0x00_FF93C4, 0x00_FF8135, 0x00_FFF609,
            0x00_249CA3, 0x00_78DC52, 0x00_003FAD, 0x00_87F2FF, 0x00_8E2EC4, 0x00_A4839F,
            0x00_5C406C, 0x00_E5CDC4, 0x00_91463D, 0x00_000000,
        ])
    }
}

impl Index<ColorIndex> for Palette {
    type Output = Rgba;
    fn index(&self, idx: ColorIndex) -> &Rgba {
        &self.0[(idx & 0x0F) as usize]
    }
}

/// Sparse cache of textures.
///
/// * Stores exactly one copy of every name.
/// * Missing ids are not errors for the renderer – it simply skips them.
///
/// **Thread-safety:** access `TextureBank` from a single thread; the
/// renderer never shares it.
#[derive(Clone, Debug, Default)]
pub struct TextureBank {
    by_name: HashMap<String, TextureId>,
    data: Vec<Option<Texture>>,
    palette: Palette,
}

impl TextureBank {
    pub fn new(palette: Palette) -> Self {
        Self {
            by_name: HashMap::new(),
            data: vec![None],
            palette,
        }
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    /// Number of textures stored.
    pub fn len(&self) -> usize {
        self.data.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id of a loaded texture by name.
    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    /// Borrow a texture by id; gaps in the id space yield `None`.
    #[inline]
    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.data.get(id as usize).and_then(Option::as_ref)
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert under `name` at the next free id past the current end.
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        tex: Texture,
    ) -> Result<TextureId, TextureError> {
        let id = self.data.len().max(1);
        if id > TextureId::MAX as usize {
            return Err(TextureError::BadId(TextureId::MAX));
        }
        self.insert_at(id as TextureId, name, tex)?;
        Ok(id as TextureId)
    }

    /// Insert under `name` at a fixed id, e.g. the cell id a map uses.
    /// An existing texture at `id` is replaced.
    pub fn insert_at<S: Into<String>>(
        &mut self,
        id: TextureId,
        name: S,
        tex: Texture,
    ) -> Result<(), TextureError> {
        let name = name.into();
        if id == 0 {
            return Err(TextureError::BadId(id));
        }
        if self.by_name.contains_key(&name) {
            return Err(TextureError::Duplicate(name));
        }
        if tex.w == 0 || tex.h == 0 {
            return Err(TextureError::ZeroSize);
        }
        let slot = id as usize;
        if slot >= self.data.len() {
            self.data.resize(slot + 1, None);
        }
        if let Some(old) = self.data[slot].take() {
            log::warn!("texture {id} `{}` replaced by `{name}`", old.name);
            self.by_name.remove(&old.name);
        }
        self.data[slot] = Some(tex);
        self.by_name.insert(name, id);
        Ok(())
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
