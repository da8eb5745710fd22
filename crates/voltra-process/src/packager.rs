//! Turns a user-supplied computation into a submittable [`ComputationImage`].

use voltra_types::{ClientId, ComputationImage, Dependency};

use crate::error::ProcessError;

/// Severity of a single packaging diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal or fatal static diagnostic produced while packaging.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// The raw material a caller hands the packager: an already-serialized
/// payload, its transitive dependency manifest, and any diagnostics the
/// upstream compilation step produced.
///
/// This crate treats `payload` as opaque; producing it is out of scope.
#[derive(Debug, Clone)]
pub struct ComputationSource {
    pub payload: Vec<u8>,
    pub return_type_tag: String,
    pub dependencies: Vec<Dependency>,
    pub name: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The result of a successful packaging pass.
#[derive(Debug, Clone)]
pub struct PackagedComputation {
    pub image: ComputationImage,
    pub warnings: Vec<String>,
}

/// Builds [`ComputationImage`]s, embedding the controller's `clientId` and
/// assigning a stable content-addressed name when the caller doesn't supply
/// one.
pub struct ComputationPackager {
    client_id: ClientId,
}

impl ComputationPackager {
    pub fn new(client_id: ClientId) -> Self {
        Self { client_id }
    }

    /// Packages `source`, failing `CompilationError` if any diagnostic is
    /// fatal. Non-fatal diagnostics are returned as `warnings`.
    pub fn package(&self, source: ComputationSource) -> Result<PackagedComputation, ProcessError> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for diagnostic in source.diagnostics {
            match diagnostic.severity {
                Severity::Error => errors.push(diagnostic.message),
                Severity::Warning => warnings.push(diagnostic.message),
            }
        }
        if !errors.is_empty() {
            return Err(ProcessError::CompilationError(errors.join("; ")));
        }

        let mut dependencies = source.dependencies;
        dependencies.sort_by(|a, b| a.assembly_id.cmp(&b.assembly_id));

        let name = source
            .name
            .unwrap_or_else(|| content_address(&source.payload, &dependencies));

        let image = ComputationImage {
            client_id: self.client_id,
            name,
            payload: source.payload,
            return_type_tag: source.return_type_tag,
            dependencies,
        };

        if postcard::to_allocvec(&image).is_err() {
            return Err(ProcessError::ComputationNotSerializable(
                "packaged image failed to encode".into(),
            ));
        }

        Ok(PackagedComputation { image, warnings })
    }
}

/// A `blake3` digest over the payload bytes followed by the sorted
/// dependency manifest, rendered as a hex string. Deterministic for a given
/// `(payload, dependencies)` pair regardless of the input dependency order.
fn content_address(payload: &[u8], sorted_dependencies: &[Dependency]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(payload);
    for dep in sorted_dependencies {
        hasher.update(dep.assembly_id.as_bytes());
        hasher.update(&dep.size.to_le_bytes());
        hasher.update(dep.hash.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(id: &str) -> Dependency {
        Dependency {
            assembly_id: id.into(),
            size: 10,
            hash: format!("hash-{id}"),
        }
    }

    fn source(deps: Vec<Dependency>) -> ComputationSource {
        ComputationSource {
            payload: vec![1, 2, 3],
            return_type_tag: "i32".into(),
            dependencies: deps,
            name: None,
            diagnostics: vec![],
        }
    }

    #[test]
    fn content_address_is_stable_regardless_of_dependency_order() {
        let packager = ComputationPackager::new(ClientId::new());
        let a = packager
            .package(source(vec![dep("b"), dep("a")]))
            .unwrap();
        let b = packager
            .package(source(vec![dep("a"), dep("b")]))
            .unwrap();
        assert_eq!(a.image.name, b.image.name);
    }

    #[test]
    fn fatal_diagnostics_fail_packaging() {
        let packager = ComputationPackager::new(ClientId::new());
        let mut src = source(vec![]);
        src.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message: "missing symbol `foo`".into(),
        });
        let err = packager.package(src).unwrap_err();
        assert!(matches!(err, ProcessError::CompilationError(msg) if msg.contains("foo")));
    }

    #[test]
    fn warning_diagnostics_do_not_fail_packaging() {
        let packager = ComputationPackager::new(ClientId::new());
        let mut src = source(vec![]);
        src.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message: "unused dependency `bar`".into(),
        });
        let result = packager.package(src).unwrap();
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn an_explicit_name_is_not_overwritten() {
        let packager = ComputationPackager::new(ClientId::new());
        let mut src = source(vec![]);
        src.name = Some("my-computation".into());
        let result = packager.package(src).unwrap();
        assert_eq!(result.image.name, "my-computation");
    }
}
