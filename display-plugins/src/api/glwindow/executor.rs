use crate::backend::hmd::OverlayMesh;
use crate::backend::hmd::OverlayVertex;
use display_plugins_api::Batch;
use display_plugins_api::Command;
use display_plugins_api::Error;
use display_plugins_api::Eye;
use display_plugins_api::FramebufferTarget;
use display_plugins_api::Geometry;
use display_plugins_api::PerEye;
use display_plugins_api::PipelineKind;
use display_plugins_api::TextureSource;
use display_plugins_api::Uniforms;
use euclid::default::Size2D;
use euclid::default::Transform3D;
use gleam::gl;
use gleam::gl::Gl;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

const POSITION_ATTRIB: gl::GLuint = 0;
const TEXCOORD_ATTRIB: gl::GLuint = 1;
const CURSOR_TEXTURE_SIZE: usize = 64;

const QUAD_VS: &str = "#version 150
in vec3 aPosition;
in vec2 aTexCoord;
out vec2 vTexCoord;
void main() {
    vTexCoord = aTexCoord;
    gl_Position = vec4(aPosition.xy, 0.0, 1.0);
}
";

const PRESENT_VS: &str = "#version 150
uniform vec4 uUvRect;
in vec3 aPosition;
in vec2 aTexCoord;
out vec2 vTexCoord;
void main() {
    vTexCoord = uUvRect.xy + aTexCoord * uUvRect.zw;
    gl_Position = vec4(aPosition.xy, 0.0, 1.0);
}
";

const MVP_VS: &str = "#version 150
uniform mat4 uMvp;
in vec3 aPosition;
in vec2 aTexCoord;
out vec2 vTexCoord;
void main() {
    vTexCoord = aTexCoord;
    gl_Position = uMvp * vec4(aPosition, 1.0);
}
";

const TEXTURE_FS: &str = "#version 150
uniform sampler2D uTexture;
in vec2 vTexCoord;
out vec4 fragColor;
void main() {
    fragColor = texture(uTexture, vTexCoord);
}
";

// The scene texture holds both eyes side by side.
const REPROJECTION_FS: &str = "#version 150
uniform sampler2D uTexture;
uniform mat3 uReprojection;
uniform mat4 uProjections[2];
uniform mat4 uInverseProjections[2];
in vec2 vTexCoord;
out vec4 fragColor;
void main() {
    int eye = vTexCoord.x < 0.5 ? 0 : 1;
    vec2 eyeCoord = vec2(fract(vTexCoord.x * 2.0), vTexCoord.y);
    vec4 view = uInverseProjections[eye] * vec4(eyeCoord * 2.0 - 1.0, 0.0, 1.0);
    view /= view.w;
    vec4 clip = uProjections[eye] * vec4(uReprojection * view.xyz, 1.0);
    vec2 source = clip.xy / clip.w * 0.5 + 0.5;
    if (any(lessThan(source, vec2(0.0))) || any(greaterThan(source, vec2(1.0)))) {
        fragColor = vec4(0.0, 0.0, 0.0, 1.0);
        return;
    }
    source.x = (source.x + float(eye)) * 0.5;
    fragColor = texture(uTexture, source);
}
";

const OVERLAY_FS: &str = "#version 150
uniform sampler2D uTexture;
uniform float uAlpha;
uniform vec2 uGlowPoints[2];
uniform vec4 uGlowColors[2];
in vec2 vTexCoord;
out vec4 fragColor;
void main() {
    vec4 color = texture(uTexture, vTexCoord);
    color.a *= uAlpha;
    for (int i = 0; i < 2; i++) {
        if (uGlowPoints[i].x < 0.0) {
            continue;
        }
        float glow = 1.0 - smoothstep(0.0, 0.02, distance(vTexCoord, uGlowPoints[i]));
        color = mix(color, vec4(uGlowColors[i].rgb, 1.0), glow * uGlowColors[i].a);
    }
    fragColor = color;
}
";

const LASER_FS: &str = "#version 150
uniform vec4 uColor;
out vec4 fragColor;
void main() {
    fragColor = uColor;
}
";

// Even window rows show the left half of the texture, odd rows the right.
const INTERLEAVED_FS: &str = "#version 150
uniform sampler2D uTexture;
uniform vec2 uSize;
in vec2 vTexCoord;
out vec4 fragColor;
void main() {
    float row = floor(vTexCoord.y * uSize.y);
    float offset = mod(row, 2.0) < 1.0 ? 0.0 : 0.5;
    fragColor = texture(uTexture, vec2(vTexCoord.x * 0.5 + offset, vTexCoord.y));
}
";

struct Program {
    id: gl::GLuint,
}

impl Program {
    fn link(gl: &dyn Gl, vertex: &str, fragment: &str) -> Result<Program, Error> {
        let vs = compile_shader(gl, gl::VERTEX_SHADER, vertex)?;
        let fs = compile_shader(gl, gl::FRAGMENT_SHADER, fragment)?;
        let id = gl.create_program();
        gl.attach_shader(id, vs);
        gl.attach_shader(id, fs);
        gl.bind_attrib_location(id, POSITION_ATTRIB, "aPosition");
        gl.bind_attrib_location(id, TEXCOORD_ATTRIB, "aTexCoord");
        gl.link_program(id);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        let mut status = [0];
        unsafe {
            gl.get_program_iv(id, gl::LINK_STATUS, &mut status);
        }
        if status[0] == 0 {
            let log = gl.get_program_info_log(id);
            gl.delete_program(id);
            return Err(Error::Context(format!("program link failed: {}", log)));
        }

        gl.use_program(id);
        gl.uniform_1i(gl.get_uniform_location(id, "uTexture"), 0);
        gl.use_program(0);
        Ok(Program { id })
    }

    fn location(&self, gl: &dyn Gl, name: &str) -> gl::GLint {
        gl.get_uniform_location(self.id, name)
    }
}

fn compile_shader(gl: &dyn Gl, kind: gl::GLenum, source: &str) -> Result<gl::GLuint, Error> {
    let shader = gl.create_shader(kind);
    gl.shader_source(shader, &[source.as_bytes()]);
    gl.compile_shader(shader);
    let mut status = [0];
    unsafe {
        gl.get_shader_iv(shader, gl::COMPILE_STATUS, &mut status);
    }
    if status[0] == 0 {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(Error::Context(format!("shader compile failed: {}", log)));
    }
    Ok(shader)
}

struct Mesh {
    vao: gl::GLuint,
    buffers: Vec<gl::GLuint>,
    mode: gl::GLenum,
    count: gl::GLsizei,
    indexed: bool,
}

impl Mesh {
    fn new(gl: &dyn Gl, mode: gl::GLenum, vertices: &[OverlayVertex], indices: Option<&[u16]>) -> Mesh {
        let vao = gl.gen_vertex_arrays(1)[0];
        gl.bind_vertex_array(vao);

        let mut buffers = gl.gen_buffers(2);
        gl.bind_buffer(gl::ARRAY_BUFFER, buffers[0]);
        gl::buffer_data(gl, gl::ARRAY_BUFFER, vertices, gl::STATIC_DRAW);
        let stride = mem::size_of::<OverlayVertex>() as gl::GLsizei;
        gl.vertex_attrib_pointer(POSITION_ATTRIB, 3, gl::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(POSITION_ATTRIB);
        let uv_offset = mem::size_of::<[f32; 3]>() as gl::GLuint;
        gl.vertex_attrib_pointer(TEXCOORD_ATTRIB, 2, gl::FLOAT, false, stride, uv_offset);
        gl.enable_vertex_attrib_array(TEXCOORD_ATTRIB);

        let count = match indices {
            Some(indices) => {
                gl.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, buffers[1]);
                gl::buffer_data(gl, gl::ELEMENT_ARRAY_BUFFER, indices, gl::STATIC_DRAW);
                indices.len()
            },
            None => {
                gl.delete_buffers(&buffers[1..]);
                buffers.truncate(1);
                vertices.len()
            },
        };
        gl.bind_vertex_array(0);

        Mesh {
            vao,
            buffers,
            mode,
            count: count as gl::GLsizei,
            indexed: indices.is_some(),
        }
    }

    fn draw(&self, gl: &dyn Gl) {
        gl.bind_vertex_array(self.vao);
        if self.indexed {
            gl.draw_elements(self.mode, self.count, gl::UNSIGNED_SHORT, 0);
        } else {
            gl.draw_arrays(self.mode, 0, self.count);
        }
        gl.bind_vertex_array(0);
    }

    fn delete(&self, gl: &dyn Gl) {
        gl.delete_buffers(&self.buffers);
        gl.delete_vertex_arrays(&[self.vao]);
    }
}

fn vertex(x: f32, y: f32, z: f32, u: f32, v: f32) -> OverlayVertex {
    OverlayVertex {
        position: [x, y, z],
        uv: [u, v],
    }
}

struct CompositeTarget {
    framebuffer: gl::GLuint,
    texture: gl::GLuint,
    size: Size2D<u32>,
}

/// Runs recorded batches against a GL context. Must only be used while that
/// context is current.
pub(crate) struct BatchExecutor {
    gl: Rc<dyn Gl>,
    programs: HashMap<PipelineKind, Program>,
    quad: Mesh,
    sphere: Mesh,
    laser: Mesh,
    cursor_texture: gl::GLuint,
    composite: Option<CompositeTarget>,
    pipeline: Option<PipelineKind>,
}

impl BatchExecutor {
    pub fn new(gl: Rc<dyn Gl>) -> Result<BatchExecutor, Error> {
        let sources = [
            (PipelineKind::Present, PRESENT_VS, TEXTURE_FS),
            (PipelineKind::Reprojection, QUAD_VS, REPROJECTION_FS),
            (PipelineKind::Overlay, MVP_VS, OVERLAY_FS),
            (PipelineKind::Cursor, MVP_VS, TEXTURE_FS),
            (PipelineKind::Laser, MVP_VS, LASER_FS),
            (PipelineKind::Interleaved, QUAD_VS, INTERLEAVED_FS),
        ];
        let mut programs = HashMap::new();
        for &(kind, vertex, fragment) in &sources {
            let program = Program::link(&*gl, vertex, fragment).map_err(|err| {
                error!("Failed to build {:?} pipeline ({})", kind, err);
                err
            })?;
            programs.insert(kind, program);
        }

        let quad = [
            vertex(-1.0, -1.0, 0.0, 0.0, 0.0),
            vertex(1.0, -1.0, 0.0, 1.0, 0.0),
            vertex(-1.0, 1.0, 0.0, 0.0, 1.0),
            vertex(1.0, 1.0, 0.0, 1.0, 1.0),
        ];
        let quad = Mesh::new(&*gl, gl::TRIANGLE_STRIP, &quad, None);
        let mesh = OverlayMesh::build();
        let sphere = Mesh::new(&*gl, gl::TRIANGLES, &mesh.vertices, Some(&mesh.indices[..]));
        let line = [vertex(0.0, 0.0, 0.0, 0.0, 0.0), vertex(0.0, 0.0, -1.0, 1.0, 0.0)];
        let laser = Mesh::new(&*gl, gl::LINES, &line, None);
        let cursor_texture = upload_texture(&*gl, CURSOR_TEXTURE_SIZE as u32, CURSOR_TEXTURE_SIZE as u32, Some(&reticle_image()[..]));

        debug!("GL executor ready ({} overlay triangles)", mesh.indices.len() / 3);
        Ok(BatchExecutor {
            gl,
            programs,
            quad,
            sphere,
            laser,
            cursor_texture,
            composite: None,
            pipeline: None,
        })
    }

    pub fn execute(&mut self, batch: &Batch) {
        for command in batch.commands() {
            match *command {
                Command::SetFramebuffer(target) => self.bind_framebuffer(target),
                Command::SetViewport(rect) => {
                    self.gl.viewport(rect.origin.x, rect.origin.y, rect.size.width, rect.size.height)
                },
                Command::Clear(color) => {
                    self.gl.clear_color(color[0], color[1], color[2], color[3]);
                    self.gl.clear(gl::COLOR_BUFFER_BIT);
                },
                Command::SetPipeline(kind) => self.bind_pipeline(kind),
                Command::SetTexture(source) => self.bind_texture(source),
                Command::SetUniforms(ref uniforms) => self.set_uniforms(uniforms),
                Command::Draw(geometry) => self.draw(geometry),
            }
        }
        self.gl.use_program(0);
        self.pipeline = None;

        let err = self.gl.get_error();
        if err != gl::NO_ERROR {
            error!("GL error 0x{:x} after {} commands", err, batch.commands().len());
        }
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget) {
        match target {
            FramebufferTarget::Default => self.gl.bind_framebuffer(gl::FRAMEBUFFER, 0),
            FramebufferTarget::Composite(size) => {
                let stale = self.composite.as_ref().map_or(true, |composite| composite.size != size);
                if stale {
                    self.delete_composite();
                    self.composite = Some(self.create_composite(size));
                }
                if let Some(ref composite) = self.composite {
                    self.gl.bind_framebuffer(gl::FRAMEBUFFER, composite.framebuffer);
                }
            },
        }
    }

    fn create_composite(&self, size: Size2D<u32>) -> CompositeTarget {
        debug!("Creating {}x{} composite target", size.width, size.height);
        let texture = upload_texture(&*self.gl, size.width, size.height, None);
        let framebuffer = self.gl.gen_framebuffers(1)[0];
        self.gl.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
        self.gl.framebuffer_texture_2d(gl::FRAMEBUFFER, gl::COLOR_ATTACHMENT0, gl::TEXTURE_2D, texture, 0);
        let status = self.gl.check_frame_buffer_status(gl::FRAMEBUFFER);
        if status != gl::FRAMEBUFFER_COMPLETE {
            error!("Composite framebuffer incomplete (0x{:x})", status);
        }
        CompositeTarget {
            framebuffer,
            texture,
            size,
        }
    }

    fn delete_composite(&mut self) {
        if let Some(composite) = self.composite.take() {
            self.gl.delete_framebuffers(&[composite.framebuffer]);
            self.gl.delete_textures(&[composite.texture]);
        }
    }

    fn bind_pipeline(&mut self, kind: PipelineKind) {
        let program = match self.programs.get(&kind) {
            Some(program) => program,
            None => return,
        };
        self.gl.use_program(program.id);
        if kind.is_blended() {
            self.gl.enable(gl::BLEND);
            self.gl.blend_func(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
        } else {
            self.gl.disable(gl::BLEND);
        }
        self.pipeline = Some(kind);
    }

    fn bind_texture(&self, source: TextureSource) {
        let texture = match source {
            TextureSource::External(id) => id,
            TextureSource::Composite => self.composite.as_ref().map_or(0, |composite| composite.texture),
            TextureSource::Cursor => self.cursor_texture,
        };
        self.gl.active_texture(gl::TEXTURE0);
        self.gl.bind_texture(gl::TEXTURE_2D, texture);
    }

    fn set_uniforms(&self, uniforms: &Uniforms) {
        let program = match self.pipeline.and_then(|kind| self.programs.get(&kind)) {
            Some(program) => program,
            None => {
                warn!("Uniforms set without a pipeline");
                return;
            },
        };
        let gl = &*self.gl;
        match *uniforms {
            Uniforms::Present { uv_rect } => {
                gl.uniform_4fv(program.location(gl, "uUvRect"), &uv_rect);
            },
            Uniforms::Reprojection {
                reprojection,
                ref projections,
                ref inverse_projections,
            } => {
                gl.uniform_matrix_3fv(program.location(gl, "uReprojection"), false, &reprojection);
                gl.uniform_matrix_4fv(program.location(gl, "uProjections"), false, &per_eye_matrices(projections));
                gl.uniform_matrix_4fv(
                    program.location(gl, "uInverseProjections"),
                    false,
                    &per_eye_matrices(inverse_projections),
                );
            },
            Uniforms::Overlay {
                ref mvp,
                alpha,
                glow_points,
                glow_colors,
            } => {
                gl.uniform_matrix_4fv(program.location(gl, "uMvp"), false, &mvp.to_array());
                gl.uniform_1f(program.location(gl, "uAlpha"), alpha);
                let points: Vec<f32> = glow_points.iter().flatten().cloned().collect();
                gl.uniform_2fv(program.location(gl, "uGlowPoints"), &points);
                let colors: Vec<f32> = glow_colors.iter().flatten().cloned().collect();
                gl.uniform_4fv(program.location(gl, "uGlowColors"), &colors);
            },
            Uniforms::Cursor { ref mvp } => {
                gl.uniform_matrix_4fv(program.location(gl, "uMvp"), false, &mvp.to_array());
            },
            Uniforms::Laser { ref mvp, color } => {
                gl.uniform_matrix_4fv(program.location(gl, "uMvp"), false, &mvp.to_array());
                gl.uniform_4fv(program.location(gl, "uColor"), &color);
            },
            Uniforms::Interleaved { size } => {
                gl.uniform_2f(program.location(gl, "uSize"), size.width as f32, size.height as f32);
            },
        }
    }

    fn draw(&self, geometry: Geometry) {
        if self.pipeline.is_none() {
            warn!("Draw of {:?} without a pipeline", geometry);
            return;
        }
        match geometry {
            Geometry::Quad => self.quad.draw(&*self.gl),
            Geometry::OverlaySphere => self.sphere.draw(&*self.gl),
            Geometry::LaserLine => self.laser.draw(&*self.gl),
        }
    }

    pub fn deinit(&mut self) {
        self.delete_composite();
        let gl = &*self.gl;
        for program in self.programs.values() {
            gl.delete_program(program.id);
        }
        self.programs.clear();
        self.quad.delete(gl);
        self.sphere.delete(gl);
        self.laser.delete(gl);
        gl.delete_textures(&[self.cursor_texture]);
    }
}

// Matrices are row-vector, so their row-major storage is GL's column-major.
fn per_eye_matrices(matrices: &PerEye<Transform3D<f32>>) -> Vec<f32> {
    let mut values = Vec::with_capacity(32);
    for eye in Eye::BOTH.iter() {
        values.extend_from_slice(&matrices[*eye].to_array());
    }
    values
}

fn upload_texture(gl: &dyn Gl, width: u32, height: u32, pixels: Option<&[u8]>) -> gl::GLuint {
    let texture = gl.gen_textures(1)[0];
    gl.bind_texture(gl::TEXTURE_2D, texture);
    gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as gl::GLint);
    gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as gl::GLint);
    gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as gl::GLint);
    gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as gl::GLint);
    gl.tex_image_2d(
        gl::TEXTURE_2D,
        0,
        gl::RGBA as gl::GLint,
        width as gl::GLsizei,
        height as gl::GLsizei,
        0,
        gl::RGBA,
        gl::UNSIGNED_BYTE,
        pixels,
    );
    gl.bind_texture(gl::TEXTURE_2D, 0);
    texture
}

// White ring with a dot in the middle, on a transparent background.
fn reticle_image() -> Vec<u8> {
    let size = CURSOR_TEXTURE_SIZE;
    let center = (size as f32 - 1.0) / 2.0;
    let mut pixels = Vec::with_capacity(size * size * 4);
    for y in 0..size {
        for x in 0..size {
            let dx = (x as f32 - center) / center;
            let dy = (y as f32 - center) / center;
            let r = (dx * dx + dy * dy).sqrt();
            let opaque = (0.7..=0.95).contains(&r) || r < 0.15;
            let alpha = if opaque { 255 } else { 0 };
            pixels.extend_from_slice(&[255, 255, 255, alpha]);
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reticle_is_a_ring_with_a_dot() {
        let pixels = reticle_image();
        let size = CURSOR_TEXTURE_SIZE;
        assert_eq!(pixels.len(), size * size * 4);
        let alpha = |x: usize, y: usize| pixels[(y * size + x) * 4 + 3];
        assert_eq!(alpha(size / 2, size / 2), 255);
        assert_eq!(alpha(0, 0), 0);
        assert_eq!(alpha(size / 2, 2), 255);
        assert_eq!(alpha(size / 2, size / 4), 0);
    }

    #[test]
    fn per_eye_matrices_are_left_then_right() {
        let matrices = PerEye::new(Transform3D::identity(), Transform3D::translation(1.0, 2.0, 3.0));
        let values = per_eye_matrices(&matrices);
        assert_eq!(values.len(), 32);
        assert_eq!(values[0], 1.0);
        assert_eq!(&values[28..31], &[1.0, 2.0, 3.0]);
    }
}
