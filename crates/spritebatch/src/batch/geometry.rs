use super::Vertex;

/// Fixed-capacity CPU-side quad storage plus the constant index pattern.
///
/// Quad `i` uses indices `{4i, 4i+1, 4i+2, 4i+2, 4i+3, 4i}`. Indices are built
/// once at construction and never change.
#[derive(Debug, Clone)]
pub struct GeometryBuffer {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    capacity: usize,
}

impl GeometryBuffer {
    pub fn new(capacity: usize) -> Self {
        let indices = (0..capacity as u32)
            .flat_map(|quad| {
                let i = quad * 4;
                [i, i + 1, i + 2, i + 2, i + 3, i]
            })
            .collect();

        Self {
            vertices: Vec::with_capacity(capacity * 4),
            indices,
            capacity,
        }
    }

    /// Appends one quad and returns its index within the batch.
    ///
    /// # Panics
    /// If the buffer is full. Callers flush first.
    pub fn append(&mut self, quad: [Vertex; 4]) -> usize {
        assert!(!self.is_full(), "geometry buffer overflow (capacity {})", self.capacity);
        let slot = self.len();
        self.vertices.extend_from_slice(&quad);
        slot
    }

    /// Number of buffered quads.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len() / 4
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Vertices of the buffered quads (the populated prefix).
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Full index pattern for `capacity` quads.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Indices needed to draw the buffered quads.
    #[inline]
    pub fn index_count(&self) -> u32 {
        (self.len() * 6) as u32
    }

    /// Drops buffered quads; keeps the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.vertices.clear();
    }
}
