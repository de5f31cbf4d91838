// src/program.rs
//! The host renderer's shader-compilation surface: the fixed-function
//! physical-material GLSL templates and the build object a material's patch
//! hook transforms before module creation.

use std::borrow::Cow;

/// Fixed-function vertex template. The patch hook injects projection
/// declarations before `void main() {` and projection statements right
/// after it.
pub const BASE_VERTEX_SHADER: &str = r#"
uniform mat4 modelMatrix;
uniform mat4 viewMatrix;
uniform mat4 projectionMatrix;
uniform mat3 normalMatrix;

attribute vec3 position;
attribute vec3 normal;

#ifdef USE_INSTANCING
attribute mat4 instanceMatrix;
#endif

varying vec3 vNormal;

void main() {
	mat4 batchedModelMatrix = modelMatrix;
	#ifdef USE_INSTANCING
	batchedModelMatrix = modelMatrix * instanceMatrix;
	#endif

	vNormal = normalMatrix * normal;
	gl_Position = projectionMatrix * viewMatrix * batchedModelMatrix * vec4(position, 1.0);
}
"#;

/// Fixed-function fragment template. The patch hook replaces the
/// `diffuseColor` declaration line wholesale, so the line below must stay
/// byte-identical to [`DIFFUSE_COLOR_FRAGMENT`].
pub const BASE_FRAGMENT_SHADER: &str = r#"
uniform vec3 diffuse;
uniform float opacity;

varying vec3 vNormal;

void main() {
	vec4 diffuseColor = vec4( diffuse, opacity );

	vec3 lightDirection = normalize(vec3(0.5, 0.8, 0.6));
	float incidence = max(dot(normalize(vNormal), lightDirection), 0.0);

	gl_FragColor = vec4(diffuseColor.rgb * (0.35 + 0.65 * incidence), diffuseColor.a);
}
"#;

/// The literal the fragment patch targets.
pub const DIFFUSE_COLOR_FRAGMENT: &str = "vec4 diffuseColor = vec4( diffuse, opacity );";

/// One shader-program build, handed to a material's patch hook exactly once
/// per program compilation.
///
/// Hosts drawing instanced geometry add the `USE_INSTANCING` define before
/// invoking the hook; the projection patch keys its per-instance attribute
/// path off it.
#[derive(Debug, Clone)]
pub struct ShaderBuild {
    pub defines: Vec<(String, String)>,
    pub vertex_source: String,
    pub fragment_source: String,
}

impl ShaderBuild {
    /// A build seeded from the fixed-function templates.
    pub fn base() -> Self {
        Self {
            defines: Vec::new(),
            vertex_source: BASE_VERTEX_SHADER.to_string(),
            fragment_source: BASE_FRAGMENT_SHADER.to_string(),
        }
    }

    /// Set a define, replacing any existing value for the same name.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.defines.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.defines.push((name, value));
        }
    }

    pub fn remove_define(&mut self, name: &str) {
        self.defines.retain(|(n, _)| n != name);
    }

    pub fn has_define(&self, name: &str) -> bool {
        self.defines.iter().any(|(n, _)| n == name)
    }
}

impl Default for ShaderBuild {
    fn default() -> Self {
        Self::base()
    }
}

/// Compile the (patched) sources into vertex and fragment modules. The
/// build's defines are fed to the GLSL frontend.
pub fn create_shader_modules(
    device: &wgpu::Device,
    build: &ShaderBuild,
) -> (wgpu::ShaderModule, wgpu::ShaderModule) {
    let defines: naga::FastHashMap<String, String> = build.defines.iter().cloned().collect();

    let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("projected_material_vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(build.vertex_source.as_str()),
            stage: naga::ShaderStage::Vertex,
            defines: defines.clone(),
        },
    });
    let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("projected_material_fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(build.fragment_source.as_str()),
            stage: naga::ShaderStage::Fragment,
            defines,
        },
    });

    (vertex, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_carry_the_patch_targets() {
        assert!(BASE_VERTEX_SHADER.contains("void main() {"));
        assert!(BASE_FRAGMENT_SHADER.contains("void main() {"));
        assert!(BASE_FRAGMENT_SHADER.contains(DIFFUSE_COLOR_FRAGMENT));
    }

    #[test]
    fn test_define_replaces_existing_value() {
        let mut build = ShaderBuild::base();
        build.define("ORTHOGRAPHIC", "");
        build.define("ORTHOGRAPHIC", "1");
        assert_eq!(
            build.defines,
            vec![("ORTHOGRAPHIC".to_string(), "1".to_string())]
        );

        build.remove_define("ORTHOGRAPHIC");
        assert!(!build.has_define("ORTHOGRAPHIC"));
    }
}
