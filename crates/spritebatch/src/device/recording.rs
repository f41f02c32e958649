//! In-memory [`Device`] that records calls, for tests.

use std::collections::{HashMap, HashSet};

use crate::batch::Vertex;

use super::{
    BufferId, Device, DeviceError, DeviceResult, ModuleId, ProgramId, ShaderStage, TextureDesc,
    TextureId,
};

/// Device operations that can be made to fail.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) enum Op {
    Compile(ShaderStage),
    Link,
    Uniform,
    CreateBuffer,
    CreateTexture,
    BindTexture,
    WriteVertices,
    Draw,
    Clear,
}

/// A draw call as the device saw it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Draw {
    pub index_count: u32,
    /// Prefix of the vertex buffer covered by the draw.
    pub vertices: Vec<Vertex>,
    /// Texture bound to each unit at draw time.
    pub units: Vec<Option<TextureId>>,
    pub program: Option<ProgramId>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    BindTexture { slot: u32, texture: TextureId },
    WriteVertices { count: usize },
    Draw(Draw),
    SetClearColor([f32; 4]),
    Clear,
    Uniform { name: String, value: i32 },
}

pub(crate) struct RecordingDevice {
    slots: u32,
    next_id: u32,
    failing: HashSet<Op>,

    pub calls: Vec<Call>,

    modules: HashMap<ModuleId, ShaderStage>,
    programs: HashSet<ProgramId>,
    current_program: Option<ProgramId>,
    vertex_buffers: HashMap<BufferId, (usize, Vec<Vertex>)>,
    index_buffers: HashMap<BufferId, Vec<u32>>,
    textures: HashMap<TextureId, (TextureDesc, Vec<u8>)>,
    units: Vec<Option<TextureId>>,
}

impl RecordingDevice {
    pub fn new(slots: u32) -> Self {
        Self {
            slots,
            next_id: 1,
            failing: HashSet::new(),
            calls: Vec::new(),
            modules: HashMap::new(),
            programs: HashSet::new(),
            current_program: None,
            vertex_buffers: HashMap::new(),
            index_buffers: HashMap::new(),
            textures: HashMap::new(),
            units: vec![None; slots as usize],
        }
    }

    /// Makes every later `op` fail until [`succeed`](Self::succeed) is called.
    pub fn fail(&mut self, op: Op) {
        self.failing.insert(op);
    }

    pub fn succeed(&mut self, op: Op) {
        self.failing.remove(&op);
    }

    pub fn draws(&self) -> Vec<&Draw> {
        self.calls
            .iter()
            .filter_map(|c| if let Call::Draw(d) = c { Some(d) } else { None })
            .collect()
    }

    pub fn unit(&self, slot: u32) -> Option<TextureId> {
        self.units.get(slot as usize).copied().flatten()
    }

    pub fn live_buffers(&self) -> usize {
        self.vertex_buffers.len() + self.index_buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_modules(&self) -> usize {
        self.modules.len()
    }

    pub fn texture_pixels(&self, id: TextureId) -> Option<&[u8]> {
        self.textures.get(&id).map(|(_, px)| px.as_slice())
    }

    pub fn index_data(&self, id: BufferId) -> Option<&[u32]> {
        self.index_buffers.get(&id).map(Vec::as_slice)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn check(&self, op: Op) -> DeviceResult<()> {
        if self.failing.contains(&op) {
            Err(DeviceError::new(format!("injected {op:?} failure")))
        } else {
            Ok(())
        }
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Device for RecordingDevice {
    fn max_texture_slots(&self) -> u32 {
        self.slots
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DeviceResult<ModuleId> {
        self.check(Op::Compile(stage))?;
        if source.trim().is_empty() {
            return Err(DeviceError::new("empty shader source"));
        }
        let id = ModuleId(self.alloc());
        self.modules.insert(id, stage);
        Ok(id)
    }

    fn link_program(&mut self, vertex: ModuleId, fragment: ModuleId) -> DeviceResult<ProgramId> {
        self.check(Op::Link)?;
        if self.modules.get(&vertex) != Some(&ShaderStage::Vertex)
            || self.modules.get(&fragment) != Some(&ShaderStage::Fragment)
        {
            return Err(DeviceError::new("stage mismatch"));
        }
        let id = ProgramId(self.alloc());
        self.programs.insert(id);
        Ok(id)
    }

    fn delete_shader(&mut self, module: ModuleId) {
        self.modules.remove(&module);
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: ProgramId) -> DeviceResult<()> {
        if !self.programs.contains(&program) {
            return Err(DeviceError::new("unknown program"));
        }
        self.current_program = Some(program);
        Ok(())
    }

    fn set_uniform_i32(&mut self, program: ProgramId, name: &str, value: i32) -> DeviceResult<()> {
        self.check(Op::Uniform)?;
        if !self.programs.contains(&program) {
            return Err(DeviceError::new("unknown program"));
        }
        self.calls.push(Call::Uniform { name: name.to_owned(), value });
        Ok(())
    }

    fn create_vertex_buffer(&mut self, vertex_capacity: usize) -> DeviceResult<BufferId> {
        self.check(Op::CreateBuffer)?;
        let id = BufferId(self.alloc());
        self.vertex_buffers.insert(id, (vertex_capacity, Vec::new()));
        Ok(id)
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> DeviceResult<BufferId> {
        self.check(Op::CreateBuffer)?;
        let id = BufferId(self.alloc());
        self.index_buffers.insert(id, indices.to_vec());
        Ok(id)
    }

    fn write_vertices(&mut self, buffer: BufferId, vertices: &[Vertex]) -> DeviceResult<()> {
        self.check(Op::WriteVertices)?;
        let (capacity, data) = self
            .vertex_buffers
            .get_mut(&buffer)
            .ok_or_else(|| DeviceError::new("unknown vertex buffer"))?;
        if vertices.len() > *capacity {
            return Err(DeviceError::new("vertex buffer overrun"));
        }
        if data.len() < vertices.len() {
            data.resize(vertices.len(), Vertex::default());
        }
        data[..vertices.len()].copy_from_slice(vertices);
        self.calls.push(Call::WriteVertices { count: vertices.len() });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.vertex_buffers.remove(&buffer);
        self.index_buffers.remove(&buffer);
    }

    fn create_texture(&mut self, desc: &TextureDesc, rgba: &[u8]) -> DeviceResult<TextureId> {
        self.check(Op::CreateTexture)?;
        if rgba.len() != (desc.width * desc.height * 4) as usize {
            return Err(DeviceError::new("texture size mismatch"));
        }
        let id = TextureId(self.alloc());
        self.textures.insert(id, (*desc, rgba.to_vec()));
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        for unit in self.units.iter_mut().filter(|u| **u == Some(texture)) {
            *unit = None;
        }
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) -> DeviceResult<()> {
        self.check(Op::BindTexture)?;
        if !self.textures.contains_key(&texture) {
            return Err(DeviceError::new("unknown texture"));
        }
        let unit = self
            .units
            .get_mut(slot as usize)
            .ok_or_else(|| DeviceError::new("texture unit out of range"))?;
        *unit = Some(texture);
        self.calls.push(Call::BindTexture { slot, texture });
        Ok(())
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.calls.push(Call::SetClearColor(rgba));
    }

    fn clear(&mut self) -> DeviceResult<()> {
        self.check(Op::Clear)?;
        self.calls.push(Call::Clear);
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        vertices: BufferId,
        indices: BufferId,
        index_count: u32,
    ) -> DeviceResult<()> {
        self.check(Op::Draw)?;
        let index_len = self
            .index_buffers
            .get(&indices)
            .ok_or_else(|| DeviceError::new("unknown index buffer"))?
            .len();
        if index_count as usize > index_len {
            return Err(DeviceError::new("index buffer overrun"));
        }
        let (_, data) = self
            .vertex_buffers
            .get(&vertices)
            .ok_or_else(|| DeviceError::new("unknown vertex buffer"))?;

        // 6 indices address 4 vertices.
        let used = (index_count as usize / 6 * 4).min(data.len());
        self.calls.push(Call::Draw(Draw {
            index_count,
            vertices: data[..used].to_vec(),
            units: self.units.clone(),
            program: self.current_program,
        }));
        Ok(())
    }
}
