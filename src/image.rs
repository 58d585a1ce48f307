/// Raw image payload carried by volumes and scene view thumbnails.
///
/// Scalars are owned, so cloning an image always produces an independent
/// copy. Decoding and encoding image files is left to the host's storage
/// layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageData {
    dimensions: [u32; 3],
    components: u8,
    scalars: Vec<u8>,
}

impl ImageData {
    /// A zero-filled image, or `None` if its size doesn't fit in memory.
    pub fn new(dimensions: [u32; 3], components: u8) -> Option<Self> {
        let len = scalar_count(dimensions, components)?;

        Some(Self {
            dimensions,
            components,
            scalars: vec![0; len],
        })
    }

    /// Wraps existing scalars, returning `None` if their length doesn't match
    /// the dimensions.
    pub fn from_scalars(dimensions: [u32; 3], components: u8, scalars: Vec<u8>) -> Option<Self> {
        if scalar_count(dimensions, components)? != scalars.len() {
            return None;
        }

        Some(Self {
            dimensions,
            components,
            scalars,
        })
    }

    pub fn dimensions(&self) -> [u32; 3] {
        self.dimensions
    }

    pub fn components(&self) -> u8 {
        self.components
    }

    pub fn scalars(&self) -> &[u8] {
        &self.scalars
    }

    pub fn scalars_mut(&mut self) -> &mut [u8] {
        &mut self.scalars
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
    }
}

fn scalar_count(dimensions: [u32; 3], components: u8) -> Option<usize> {
    dimensions
        .iter()
        .try_fold(components as usize, |count, &extent| {
            count.checked_mul(extent as usize)
        })
}
