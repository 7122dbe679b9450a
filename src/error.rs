//! Structural errors raised while compiling the generated scene.
//!
//! Over-constrained placements and short highway walks are not errors: they
//! are logged where they happen and generation carries on.

use thiserror::Error;

use crate::render::placeholder::GeometryKind;
use crate::render::shaders::ShaderKey;

/// A configuration defect. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CityGenError {
    #[error("geometry kind {0:?} has no registered primitive")]
    UnregisteredGeometry(GeometryKind),

    #[error("shader '{0}' is not registered")]
    UnregisteredShader(ShaderKey),

    #[error("attribute '{name}' of shader '{shader}' declares {components} components, expected 1 to 4")]
    InvalidAttribute {
        shader: ShaderKey,
        name: &'static str,
        components: usize,
    },

    #[error("attribute '{name}' is declared twice by shader '{shader}'")]
    DuplicateAttribute {
        shader: ShaderKey,
        name: &'static str,
    },
}
